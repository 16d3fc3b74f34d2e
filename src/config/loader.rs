use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, Context, Result};
use crate::utils::parse_date_bound;

use super::{Config, SavePolicy, Timeframe};

pub const ENV_CLIENT_ID: &str = "CTRADER_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "CTRADER_CLIENT_SECRET";
pub const ENV_ACCOUNT_ID: &str = "CTRADER_ACCOUNT_ID";

/// Read a JSON config file and layer it over the built-in defaults.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read config JSON at {}", path.display()))?;

    parse_config(&json, Config::builtin())
        .map_err(|err| AppError::message(format!("{}: {err}", path.display())))
}

/// Apply a JSON document on top of `base`. Every key is optional.
pub fn parse_config(json: &str, base: Config) -> Result<Config> {
    let raw: RawConfig = serde_json::from_str(json).context("failed to parse config JSON")?;
    raw.apply(base)
}

/// Credentials from the environment win over anything read from disk.
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides_from(config, |name| std::env::var(name).ok());
}

fn apply_overrides_from<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(value) = non_empty(ENV_CLIENT_ID) {
        config.credentials.client_id = value;
    }
    if let Some(value) = non_empty(ENV_CLIENT_SECRET) {
        config.credentials.client_secret = value;
    }
    if let Some(value) = non_empty(ENV_ACCOUNT_ID) {
        config.credentials.account_id = value;
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    client_id: Option<String>,
    client_secret: Option<String>,
    account_id: Option<String>,
    auth_url: Option<String>,
    base_url: Option<String>,
    symbol: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    timeframes: Option<Vec<String>>,
    output_file: Option<String>,
    depth_levels: Option<u32>,
    fetch_depth: Option<bool>,
    check_connectivity: Option<bool>,
    save_policy: Option<RawSavePolicy>,
    #[serde(default)]
    limits: RawLimits,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum RawSavePolicy {
    Strict,
    Lenient,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawLimits {
    max_days_per_request: Option<u32>,
    page_size: Option<u32>,
    request_pause_ms: Option<u64>,
    cooldown_every: Option<u32>,
    cooldown_secs: Option<u64>,
    timeframe_pause_ms: Option<u64>,
    default_retry_after_secs: Option<u64>,
    auth_attempts: Option<u32>,
}

impl RawConfig {
    fn apply(self, mut config: Config) -> Result<Config> {
        if let Some(value) = self.client_id {
            config.credentials.client_id = value;
        }
        if let Some(value) = self.client_secret {
            config.credentials.client_secret = value;
        }
        if let Some(value) = self.account_id {
            config.credentials.account_id = value;
        }
        if let Some(value) = self.auth_url {
            config.endpoints.auth_url = value;
        }
        if let Some(value) = self.base_url {
            config.endpoints.base_url = value;
        }
        if let Some(value) = self.symbol {
            config.symbol = value;
        }
        if let Some(value) = self.start_date {
            config.start = parse_date_bound(&value)
                .map_err(|err| AppError::message(format!("start_date `{value}`: {err}")))?;
        }
        if let Some(value) = self.end_date {
            config.end = parse_date_bound(&value)
                .map_err(|err| AppError::message(format!("end_date `{value}`: {err}")))?;
        }
        if let Some(labels) = self.timeframes {
            config.timeframes = labels
                .iter()
                .map(|label| label.parse::<Timeframe>())
                .collect::<Result<Vec<_>>>()?;
        }
        if let Some(value) = self.output_file {
            config.output = PathBuf::from(value);
        }
        if let Some(value) = self.depth_levels {
            config.depth_levels = value;
        }
        if let Some(value) = self.fetch_depth {
            config.fetch_depth = value;
        }
        if let Some(value) = self.check_connectivity {
            config.check_connectivity = value;
        }
        if let Some(policy) = self.save_policy {
            config.save_policy = match policy {
                RawSavePolicy::Strict => SavePolicy::Strict,
                RawSavePolicy::Lenient => SavePolicy::Lenient,
            };
        }

        self.limits.apply(&mut config);
        Ok(config)
    }
}

impl RawLimits {
    fn apply(self, config: &mut Config) {
        let limits = &mut config.limits;
        if let Some(value) = self.max_days_per_request {
            limits.max_days_per_request = value;
        }
        if let Some(value) = self.page_size {
            limits.page_size = value;
        }
        if let Some(value) = self.request_pause_ms {
            limits.request_pause = Duration::from_millis(value);
        }
        if let Some(value) = self.cooldown_every {
            limits.cooldown_every = value;
        }
        if let Some(value) = self.cooldown_secs {
            limits.cooldown = Duration::from_secs(value);
        }
        if let Some(value) = self.timeframe_pause_ms {
            limits.timeframe_pause = Duration::from_millis(value);
        }
        if let Some(value) = self.default_retry_after_secs {
            limits.default_retry_after = Duration::from_secs(value);
        }
        if let Some(value) = self.auth_attempts {
            limits.auth_attempts = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::iso_utc;

    #[test]
    fn layers_json_over_builtin_defaults() {
        let json = r#"{
            "client_id": "abc",
            "client_secret": "shh",
            "account_id": "42",
            "symbol": "xauusd",
            "start_date": "2021-03-01",
            "end_date": "2021-04-01T12:00:00Z",
            "timeframes": ["H1", "d1"],
            "save_policy": "lenient",
            "limits": { "max_days_per_request": 10, "request_pause_ms": 0 }
        }"#;

        let config = parse_config(json, Config::builtin()).expect("config parses");

        assert_eq!(config.credentials.account_id, "42");
        assert_eq!(config.symbol, "xauusd");
        assert_eq!(iso_utc(config.start), "2021-03-01T00:00:00Z");
        assert_eq!(iso_utc(config.end), "2021-04-01T12:00:00Z");
        assert_eq!(config.timeframes, vec![Timeframe::H1, Timeframe::D1]);
        assert_eq!(config.save_policy, SavePolicy::Lenient);
        assert_eq!(config.limits.max_days_per_request, 10);
        assert_eq!(config.limits.request_pause, Duration::ZERO);
        assert_eq!(config.limits.cooldown_every, 25);
        assert_eq!(config.depth_levels, 10);
    }

    #[test]
    fn rejects_unknown_timeframe_at_load_time() {
        let json = r#"{ "timeframes": ["M1", "W1"] }"#;
        let err = parse_config(json, Config::builtin()).expect_err("W1 must be rejected");
        assert!(
            err.to_string().contains("unknown timeframe `W1`"),
            "unexpected error message: {err}"
        );
    }

    #[test]
    fn rejects_unknown_keys() {
        let json = r#"{ "symbl": "EURUSD" }"#;
        assert!(parse_config(json, Config::builtin()).is_err());
    }

    #[test]
    fn env_overrides_skip_blank_values() {
        let mut config = Config::builtin();
        config.credentials.client_id = "from-file".to_string();

        apply_overrides_from(&mut config, |name| match name {
            ENV_CLIENT_ID => Some("   ".to_string()),
            ENV_CLIENT_SECRET => Some("env-secret".to_string()),
            _ => None,
        });

        assert_eq!(config.credentials.client_id, "from-file");
        assert_eq!(config.credentials.client_secret, "env-secret");
        assert_eq!(config.credentials.account_id, "");
    }
}
