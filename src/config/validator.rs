use std::collections::HashSet;

use log::warn;

use crate::error::{AppError, Result};

use super::Config;

/// Validate the fully layered configuration and surface every issue at once.
pub fn validate_config(config: &Config) -> Result<()> {
    let mut issues = Vec::new();

    validate_credentials(config, &mut issues);
    validate_target(config, &mut issues);
    validate_limits(config, &mut issues);

    if config.start >= config.end {
        warn!(
            "date range {} .. {} is empty; no history will be requested",
            config.start, config.end
        );
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::Config(issues))
    }
}

fn validate_credentials(config: &Config, issues: &mut Vec<String>) {
    let credentials = &config.credentials;
    if credentials.client_id.trim().is_empty() {
        issues.push("client_id must not be empty".to_string());
    }
    if credentials.client_secret.trim().is_empty() {
        issues.push("client_secret must not be empty".to_string());
    }
    if credentials.account_id.trim().is_empty() {
        issues.push("account_id must not be empty".to_string());
    }
}

fn validate_target(config: &Config, issues: &mut Vec<String>) {
    if config.symbol.trim().is_empty() {
        issues.push("symbol must not be empty".to_string());
    }

    if config.timeframes.is_empty() {
        issues.push("at least one timeframe must be configured".to_string());
    }

    let mut seen = HashSet::new();
    for timeframe in &config.timeframes {
        if !seen.insert(*timeframe) {
            issues.push(format!("timeframe {timeframe} is listed more than once"));
        }
    }

    if config.output.as_os_str().is_empty() {
        issues.push("output_file must not be empty".to_string());
    }

    if config.endpoints.base_url.trim().is_empty() {
        issues.push("base_url must not be empty".to_string());
    }
    if config.endpoints.auth_url.trim().is_empty() {
        issues.push("auth_url must not be empty".to_string());
    }

    if config.fetch_depth && config.depth_levels == 0 {
        issues.push("depth_levels must be greater than zero".to_string());
    }
}

fn validate_limits(config: &Config, issues: &mut Vec<String>) {
    let limits = &config.limits;
    if limits.max_days_per_request == 0 {
        issues.push("limits.max_days_per_request must be greater than zero".to_string());
    }
    if limits.page_size == 0 {
        issues.push("limits.page_size must be greater than zero".to_string());
    }
    if limits.cooldown_every == 0 {
        issues.push("limits.cooldown_every must be greater than zero".to_string());
    }
    if limits.auth_attempts == 0 {
        issues.push("limits.auth_attempts must be greater than zero".to_string());
    }
}
