use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::StatusCode;

use crate::error::{AppError, Context};

use super::FetchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    PostForm,
}

/// A single call against the API, independent of the HTTP stack.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub timeout: Duration,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            form: Vec::new(),
            timeout,
        }
    }

    pub fn post_form(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: Method::PostForm,
            ..Self::get(url, timeout)
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn field(mut self, key: &str, value: impl ToString) -> Self {
        self.form.push((key.to_string(), value.to_string()));
        self
    }

    /// Look up a query parameter by name.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Status, body and the one header the back-off logic cares about.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub retry_after: Option<u64>,
    pub body: String,
}

impl ApiResponse {
    pub fn is_rate_limited(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS
    }

    /// Turn a non-success status into an error carrying the response body.
    pub fn error_for_status(self, context: &str) -> FetchResult<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(AppError::status(context, self.status, self.body))
        }
    }
}

/// Seam between the session logic and the wire.
///
/// An `Err` means the request never produced an HTTP response (connect
/// failure, timeout, unreadable body). HTTP error statuses come back as `Ok`.
pub trait Transport {
    fn execute(&mut self, request: &ApiRequest) -> FetchResult<ApiResponse>;

    /// Attach `Authorization: Bearer <token>` to every subsequent request.
    fn set_bearer_token(&mut self, token: &str) -> FetchResult<()>;
}

/// Blocking reqwest client plus the session-wide headers.
pub struct HttpTransport {
    client: Client,
    headers: HeaderMap,
}

impl HttpTransport {
    pub fn new() -> FetchResult<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to construct blocking HTTP client")?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self { client, headers })
    }
}

impl Transport for HttpTransport {
    fn execute(&mut self, request: &ApiRequest) -> FetchResult<ApiResponse> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::PostForm => self.client.post(&request.url).form(&request.form),
        };

        let response = builder
            .headers(self.headers.clone())
            .query(&request.query)
            .timeout(request.timeout)
            .send()?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text()?;

        Ok(ApiResponse {
            status,
            retry_after,
            body,
        })
    }

    fn set_bearer_token(&mut self, token: &str) -> FetchResult<()> {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .context("Access token is not a valid header value")?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// `Retry-After` is only honoured in its integer-seconds form.
pub fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integer_retry_after_only() {
        assert_eq!(parse_retry_after(" 12 "), Some(12));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after("-3"), None);
    }

    #[test]
    fn builds_history_style_request() {
        let request = ApiRequest::get("https://example.test/h", Duration::from_secs(20))
            .query("symbolId", 7)
            .query("timeframe", "OneHour");

        assert_eq!(request.method, Method::Get);
        assert_eq!(request.query_value("symbolId"), Some("7"));
        assert_eq!(request.query_value("timeframe"), Some("OneHour"));
        assert_eq!(request.query_value("pageSize"), None);
    }

    #[test]
    fn error_for_status_keeps_body() {
        let response = ApiResponse {
            status: StatusCode::FORBIDDEN,
            retry_after: None,
            body: "denied".to_string(),
        };
        let err = response.error_for_status("history").expect_err("403 is an error");
        assert_eq!(err.to_string(), "history returned HTTP 403 Forbidden: denied");
    }
}
