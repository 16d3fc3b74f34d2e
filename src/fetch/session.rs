use std::time::Duration;

use log::{error, info};

use crate::config::{Config, Endpoints, RateLimits};
use crate::error::{AppError, Result};

use super::pacing::{Pause, RequestThrottle, ThreadPause};
use super::transport::{ApiRequest, HttpTransport, Transport};
use super::SymbolId;

pub(crate) const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Client context for one run: transport, pacing, and what the run has learned
/// so far (bearer token, symbol id, request count).
pub struct ApiSession<T: Transport, P: Pause> {
    pub(crate) transport: T,
    pub(crate) pause: P,
    pub(crate) endpoints: Endpoints,
    pub(crate) limits: RateLimits,
    pub(crate) throttle: RequestThrottle,
    pub(crate) access_token: Option<String>,
    pub(crate) symbol_id: Option<SymbolId>,
}

impl ApiSession<HttpTransport, ThreadPause> {
    pub fn connect(config: &Config) -> Result<Self> {
        Ok(Self::new(
            HttpTransport::new()?,
            ThreadPause,
            config.endpoints.clone(),
            config.limits.clone(),
        ))
    }
}

impl<T: Transport, P: Pause> ApiSession<T, P> {
    pub fn new(transport: T, pause: P, endpoints: Endpoints, limits: RateLimits) -> Self {
        let throttle = RequestThrottle::new(limits.cooldown_every, limits.cooldown);
        Self {
            transport,
            pause,
            endpoints,
            limits,
            throttle,
            access_token: None,
            symbol_id: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn pauser(&self) -> &P {
        &self.pause
    }

    pub fn limits(&self) -> &RateLimits {
        &self.limits
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn symbol_id(&self) -> Option<&SymbolId> {
        self.symbol_id.as_ref()
    }

    pub fn pause_for(&mut self, duration: Duration) {
        self.pause.pause(duration);
    }

    /// `GET {base}/ping`; anything but 200 is treated as unreachable.
    pub fn check_connectivity(&mut self) -> Result<()> {
        info!("Checking API connectivity...");
        let request = ApiRequest::get(self.endpoints.api("ping"), PING_TIMEOUT);
        let response = self.transport.execute(&request).map_err(|err| {
            error!("API connectivity check failed: {err}");
            err
        })?;

        if response.status.as_u16() == 200 {
            info!("API reachable");
            Ok(())
        } else {
            error!("API connectivity check returned {}", response.status);
            Err(AppError::status("ping", response.status, response.body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{ok, status, test_session, ScriptedTransport};
    use reqwest::StatusCode;

    #[test]
    fn ping_requires_200() {
        let mut session = test_session(ScriptedTransport::new(vec![ok("pong")]));
        session.check_connectivity().expect("200 is reachable");
        assert!(session.transport().requests[0].url.ends_with("/ping"));

        let mut session = test_session(ScriptedTransport::new(vec![status(
            StatusCode::SERVICE_UNAVAILABLE,
            "",
        )]));
        assert!(session.check_connectivity().is_err());
    }

    #[test]
    fn ping_transport_error_is_fatal() {
        let mut session = test_session(ScriptedTransport::new(vec![]));
        assert!(session.check_connectivity().is_err());
    }
}
