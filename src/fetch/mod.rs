use std::fmt;

use crate::error::Result;

pub mod auth;
pub mod decode;
pub mod depth;
pub mod history;
pub mod pacing;
pub mod session;
pub mod symbols;
pub mod transport;

pub use depth::MarketDepth;
pub use history::{date_windows, Candle, DateWindow, FetchOutcome, TimeframeHistory, WindowReport};
pub use pacing::{Pause, RequestThrottle, RetryPolicy, ThreadPause};
pub use session::ApiSession;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};

pub type FetchResult<T> = Result<T>;

/// Opaque identifier the API assigns to a symbol; numeric ids are kept in
/// their decimal string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolId(pub String);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::time::Duration;

    use reqwest::StatusCode;

    use crate::config::{Endpoints, RateLimits};
    use crate::error::AppError;

    use super::{ApiRequest, ApiResponse, ApiSession, FetchResult, Pause, Transport};

    /// Replays canned responses in order and records every request it sees.
    pub struct ScriptedTransport {
        responses: VecDeque<FetchResult<ApiResponse>>,
        pub requests: Vec<ApiRequest>,
        pub bearer: Option<String>,
    }

    impl ScriptedTransport {
        pub fn new(responses: Vec<FetchResult<ApiResponse>>) -> Self {
            Self {
                responses: responses.into(),
                requests: Vec::new(),
                bearer: None,
            }
        }

        pub fn urls(&self) -> Vec<&str> {
            self.requests.iter().map(|r| r.url.as_str()).collect()
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(&mut self, request: &ApiRequest) -> FetchResult<ApiResponse> {
            self.requests.push(request.clone());
            self.responses
                .pop_front()
                .unwrap_or_else(|| Err(AppError::message("connection refused")))
        }

        fn set_bearer_token(&mut self, token: &str) -> FetchResult<()> {
            self.bearer = Some(token.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct RecordingPause {
        pub pauses: Vec<Duration>,
    }

    impl Pause for RecordingPause {
        fn pause(&mut self, duration: Duration) {
            self.pauses.push(duration);
        }
    }

    pub fn ok(body: &str) -> FetchResult<ApiResponse> {
        status(StatusCode::OK, body)
    }

    pub fn status(status: StatusCode, body: &str) -> FetchResult<ApiResponse> {
        Ok(ApiResponse {
            status,
            retry_after: None,
            body: body.to_string(),
        })
    }

    pub fn rate_limited(retry_after: Option<u64>) -> FetchResult<ApiResponse> {
        Ok(ApiResponse {
            status: StatusCode::TOO_MANY_REQUESTS,
            retry_after,
            body: String::new(),
        })
    }

    pub fn transport_error(message: &str) -> FetchResult<ApiResponse> {
        Err(AppError::message(message))
    }

    pub fn test_endpoints() -> Endpoints {
        Endpoints {
            auth_url: "https://auth.example.test/oauth2/token".to_string(),
            base_url: "https://api.example.test/connect".to_string(),
        }
    }

    pub fn test_session(
        transport: ScriptedTransport,
    ) -> ApiSession<ScriptedTransport, RecordingPause> {
        ApiSession::new(
            transport,
            RecordingPause::default(),
            test_endpoints(),
            RateLimits::default(),
        )
    }
}
