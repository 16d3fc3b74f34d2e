use std::thread;
use std::time::Duration;

use log::warn;

use super::transport::ApiResponse;

/// Every deliberate wait in a run goes through this.
pub trait Pause {
    fn pause(&mut self, duration: Duration);
}

pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// How often a rate-limited call may be retried and how long to wait when
/// the server does not say.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub default_delay: Duration,
}

impl RetryPolicy {
    pub fn bounded(max_attempts: u32, default_delay: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            default_delay,
        }
    }

    pub fn unbounded(default_delay: Duration) -> Self {
        Self {
            max_attempts: None,
            default_delay,
        }
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }

    /// Delay for a 429: the `Retry-After` seconds, or the policy default.
    pub fn delay_for(&self, response: &ApiResponse) -> Duration {
        response
            .retry_after
            .map(Duration::from_secs)
            .unwrap_or(self.default_delay)
    }
}

/// Run-wide request counter that forces a cooldown every `every` requests.
#[derive(Debug, Clone)]
pub struct RequestThrottle {
    every: u32,
    cooldown: Duration,
    issued: u32,
}

impl RequestThrottle {
    pub fn new(every: u32, cooldown: Duration) -> Self {
        Self {
            every: every.max(1),
            cooldown,
            issued: 0,
        }
    }

    /// Call before issuing a request; pauses and resets once the budget is spent.
    pub fn before_request(&mut self, pause: &mut dyn Pause) {
        if self.issued >= self.every {
            warn!(
                "{} requests issued, cooling down for {}s",
                self.issued,
                self.cooldown.as_secs()
            );
            pause.pause(self.cooldown);
            self.issued = 0;
        }
    }

    pub fn record_request(&mut self) {
        self.issued += 1;
    }

    pub fn issued(&self) -> u32 {
        self.issued
    }
}
