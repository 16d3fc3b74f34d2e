use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

pub mod loader;
pub mod timeframe;
pub mod validator;

pub use loader::{apply_env_overrides, load_config_file, parse_config};
pub use timeframe::{parse_timeframe_list, Timeframe};
pub use validator::validate_config;

pub const DEFAULT_AUTH_URL: &str = "https://connect.ctrader.com/oauth2/token";
pub const DEFAULT_BASE_URL: &str = "https://api.ctrader.com/connect";
pub const API_VERSION: &str = "2.1";

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub account_id: String,
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub auth_url: String,
    pub base_url: String,
}

impl Endpoints {
    /// Join a path below the API base, tolerating a trailing slash on the base.
    pub fn api(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Pacing knobs for the history loop and the auth back-off.
#[derive(Debug, Clone)]
pub struct RateLimits {
    pub max_days_per_request: u32,
    pub page_size: u32,
    pub request_pause: Duration,
    pub cooldown_every: u32,
    pub cooldown: Duration,
    pub timeframe_pause: Duration,
    pub default_retry_after: Duration,
    pub auth_attempts: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            max_days_per_request: 30,
            page_size: 5000,
            request_pause: Duration::from_millis(1500),
            cooldown_every: 25,
            cooldown: Duration::from_secs(60),
            timeframe_pause: Duration::from_secs(2),
            default_retry_after: Duration::from_secs(60),
            auth_attempts: 3,
        }
    }
}

/// Whether empty timeframes block writing the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SavePolicy {
    #[default]
    Strict,
    Lenient,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub endpoints: Endpoints,
    pub symbol: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timeframes: Vec<Timeframe>,
    pub output: PathBuf,
    pub limits: RateLimits,
    pub depth_levels: u32,
    pub fetch_depth: bool,
    pub check_connectivity: bool,
    pub save_policy: SavePolicy,
}

impl Config {
    pub fn builtin() -> Self {
        Config {
            credentials: Credentials::default(),
            endpoints: Endpoints {
                auth_url: DEFAULT_AUTH_URL.to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
            },
            symbol: "EURUSD".to_string(),
            start: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2022, 12, 31, 0, 0, 0).unwrap(),
            timeframes: Timeframe::ALL.to_vec(),
            output: PathBuf::from("ctrader_data_2020-2022.json"),
            limits: RateLimits::default(),
            depth_levels: 10,
            fetch_depth: true,
            check_connectivity: true,
            save_policy: SavePolicy::Strict,
        }
    }
}
