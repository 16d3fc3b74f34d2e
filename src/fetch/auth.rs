use std::fmt::Debug;
use std::time::Duration;

use log::{error, info, warn};
use serde::Deserialize;

use crate::config::Credentials;
use crate::error::{AppError, Result};

use super::decode::parse_body;
use super::pacing::{Pause, RetryPolicy};
use super::session::ApiSession;
use super::transport::{ApiRequest, Transport};

const AUTH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse").finish_non_exhaustive()
    }
}

impl<T: Transport, P: Pause> ApiSession<T, P> {
    /// Client-credentials grant. On success every later request carries the
    /// bearer token. Only 429 is retried, up to `limits.auth_attempts` times.
    pub fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        let policy = RetryPolicy::bounded(
            self.limits.auth_attempts,
            self.limits.default_retry_after,
        );
        let request = ApiRequest::post_form(self.endpoints.auth_url.clone(), AUTH_TIMEOUT)
            .field("grant_type", "client_credentials")
            .field("client_id", &credentials.client_id)
            .field("client_secret", &credentials.client_secret);

        let mut attempts = 0;
        loop {
            attempts += 1;
            info!("Requesting access token (attempt {attempts})...");

            let response = self.transport.execute(&request).map_err(|err| {
                error!("Token request failed: {err}");
                AppError::Auth(err.to_string())
            })?;

            if response.is_rate_limited() {
                if !policy.allows_retry(attempts) {
                    error!("Token endpoint still rate limiting after {attempts} attempts");
                    return Err(AppError::RateLimited {
                        context: "token endpoint".to_string(),
                        attempts,
                    });
                }
                let delay = policy.delay_for(&response);
                warn!("Token endpoint rate limited, retrying in {}s", delay.as_secs());
                self.pause.pause(delay);
                continue;
            }

            if !response.status.is_success() {
                error!("Authentication rejected ({}): {}", response.status, response.body);
                return Err(AppError::Auth(format!(
                    "token endpoint returned {}: {}",
                    response.status, response.body
                )));
            }

            let token: TokenResponse = parse_body(&response.body, "token")
                .map_err(|err| AppError::Auth(err.to_string()))?;
            if token.access_token.trim().is_empty() {
                return Err(AppError::Auth("token endpoint returned an empty access_token".to_string()));
            }

            self.transport.set_bearer_token(&token.access_token)?;
            self.access_token = Some(token.access_token);
            info!("Authenticated");
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{
        ok, rate_limited, status, test_session, transport_error, ScriptedTransport,
    };
    use crate::fetch::Method;
    use reqwest::StatusCode;

    fn credentials() -> Credentials {
        Credentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            account_id: "1001".to_string(),
        }
    }

    #[test]
    fn installs_bearer_token() {
        let transport = ScriptedTransport::new(vec![ok(r#"{"access_token":"tok-1","expires_in":3600}"#)]);
        let mut session = test_session(transport);

        session.authenticate(&credentials()).expect("authenticates");

        assert!(session.is_authenticated());
        let transport = session.transport();
        assert_eq!(transport.bearer.as_deref(), Some("tok-1"));

        let request = &transport.requests[0];
        assert_eq!(request.method, Method::PostForm);
        assert!(request
            .form
            .contains(&("grant_type".to_string(), "client_credentials".to_string())));
        assert!(request
            .form
            .contains(&("client_id".to_string(), "client".to_string())));
    }

    #[test]
    fn retries_rate_limit_with_header_or_default_delay() {
        let transport = ScriptedTransport::new(vec![
            rate_limited(Some(5)),
            rate_limited(None),
            ok(r#"{"access_token":"tok-2"}"#),
        ]);
        let mut session = test_session(transport);

        session.authenticate(&credentials()).expect("third attempt succeeds");

        assert_eq!(
            session.pauser().pauses,
            vec![Duration::from_secs(5), Duration::from_secs(60)]
        );
        assert_eq!(session.transport().requests.len(), 3);
    }

    #[test]
    fn gives_up_after_three_rate_limited_attempts() {
        let transport = ScriptedTransport::new(vec![
            rate_limited(Some(1)),
            rate_limited(Some(1)),
            rate_limited(Some(1)),
            ok(r#"{"access_token":"never"}"#),
        ]);
        let mut session = test_session(transport);

        let err = session.authenticate(&credentials()).expect_err("attempts exhausted");

        assert!(matches!(err, AppError::RateLimited { attempts: 3, .. }));
        assert_eq!(session.transport().requests.len(), 3);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn other_status_is_fatal_without_retry() {
        let transport = ScriptedTransport::new(vec![
            status(StatusCode::UNAUTHORIZED, "invalid_client"),
            ok(r#"{"access_token":"never"}"#),
        ]);
        let mut session = test_session(transport);

        let err = session.authenticate(&credentials()).expect_err("401 is fatal");

        assert!(err.to_string().contains("invalid_client"));
        assert_eq!(session.transport().requests.len(), 1);
    }

    #[test]
    fn transport_error_is_fatal_without_retry() {
        let transport = ScriptedTransport::new(vec![
            transport_error("timed out"),
            ok(r#"{"access_token":"never"}"#),
        ]);
        let mut session = test_session(transport);

        let err = session.authenticate(&credentials()).expect_err("no retry");

        assert!(matches!(err, AppError::Auth(_)));
        assert_eq!(session.transport().requests.len(), 1);
        assert!(session.pauser().pauses.is_empty());
    }

    #[test]
    fn missing_access_token_is_an_auth_failure() {
        let transport = ScriptedTransport::new(vec![ok(r#"{"token_type":"bearer"}"#)]);
        let mut session = test_session(transport);

        let err = session.authenticate(&credentials()).expect_err("no token");
        assert!(matches!(err, AppError::Auth(_)));
    }
}
