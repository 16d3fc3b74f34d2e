use reqwest::StatusCode;
use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Chrono(#[from] chrono::ParseError),
    #[error("{context} returned HTTP {status}: {body}")]
    Status {
        context: String,
        status: StatusCode,
        body: String,
    },
    #[error("rate limited by {context} after {attempts} attempts")]
    RateLimited { context: String, attempts: u32 },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("symbol `{symbol}` not found for account {account_id}")]
    SymbolNotFound { symbol: String, account_id: String },
    #[error("no candles collected for timeframes: {}", .0.join(", "))]
    IncompleteData(Vec<String>),
    #[error("invalid configuration:\n  - {}", .0.join("\n  - "))]
    Config(Vec<String>),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        AppError::Message(msg.into())
    }

    pub fn status(context: impl Into<String>, status: StatusCode, body: impl Into<String>) -> Self {
        AppError::Status {
            context: context.into(),
            status,
            body: body.into(),
        }
    }
}
