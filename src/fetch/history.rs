use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::Timeframe;
use crate::error::{AppError, Result};
use crate::utils::iso_from_millis;

use super::decode::parse_body;
use super::pacing::{Pause, RetryPolicy};
use super::session::ApiSession;
use super::transport::{ApiRequest, Transport};

const HISTORY_TIMEOUT: Duration = Duration::from_secs(20);

/// One OHLCV bar as written to the output document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    #[serde(rename = "ts")]
    pub timestamp: i64,
    #[serde(rename = "dt")]
    pub datetime: String,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: f64,
}

#[derive(Debug, Deserialize)]
struct HistoryPayload {
    #[serde(default)]
    candles: Vec<RawCandle>,
}

#[derive(Debug, Deserialize)]
struct RawCandle {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl RawCandle {
    fn normalize(self) -> Result<Candle> {
        Ok(Candle {
            timestamp: self.timestamp,
            datetime: iso_from_millis(self.timestamp)?,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}

/// Inclusive request bounds for a single history call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn window_from(start: DateTime<Utc>, range_end: DateTime<Utc>, max_days: u32) -> DateWindow {
    let span = chrono::Duration::days(i64::from(max_days.max(1)));
    DateWindow {
        start,
        end: (start + span).min(range_end),
    }
}

fn next_start(window: &DateWindow) -> DateTime<Utc> {
    window.end + chrono::Duration::seconds(1)
}

/// Windows the history loop walks for `[start, end)` when every call succeeds.
pub fn date_windows(start: DateTime<Utc>, end: DateTime<Utc>, max_days: u32) -> Vec<DateWindow> {
    let mut windows = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let window = window_from(cursor, end, max_days);
        cursor = next_start(&window);
        windows.push(window);
    }
    windows
}

#[derive(Debug)]
pub enum FetchOutcome {
    Complete,
    /// The loop stopped early; candles gathered before the failure are kept.
    Interrupted(AppError),
}

#[derive(Debug)]
pub struct TimeframeHistory {
    pub timeframe: Timeframe,
    pub candles: Vec<Candle>,
    pub outcome: FetchOutcome,
}

impl TimeframeHistory {
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Complete)
    }
}

/// Emitted after each successful window so callers can render progress.
#[derive(Debug, Clone)]
pub struct WindowReport {
    pub timeframe: Timeframe,
    pub window: DateWindow,
    pub candles: usize,
    pub accumulated: usize,
    pub fraction_done: f64,
}

impl<T: Transport, P: Pause> ApiSession<T, P> {
    /// Walk `[start, end)` in windows of at most `max_days_per_request`,
    /// concatenating candles in response order.
    ///
    /// A 429 re-issues the same window after the advertised delay with no
    /// retry cap. Any other failure ends this timeframe and returns what was
    /// collected so far.
    pub fn fetch_history<F>(
        &mut self,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        mut on_window: F,
    ) -> TimeframeHistory
    where
        F: FnMut(&WindowReport),
    {
        let mut candles = Vec::new();

        let Some(symbol_id) = self.symbol_id.clone() else {
            return TimeframeHistory {
                timeframe,
                candles,
                outcome: FetchOutcome::Interrupted(AppError::message(
                    "symbol must be resolved before fetching history",
                )),
            };
        };

        info!("Fetching {timeframe} history from {start} to {end}");
        let policy = RetryPolicy::unbounded(self.limits.default_retry_after);
        let total_secs = (end - start).num_seconds().max(1) as f64;
        let url = self.endpoints.api("marketdata/history");
        let mut window_start = start;

        while window_start < end {
            self.throttle.before_request(&mut self.pause);

            let window = window_from(window_start, end, self.limits.max_days_per_request);
            let request = ApiRequest::get(url.as_str(), HISTORY_TIMEOUT)
                .query("symbolId", &symbol_id)
                .query("timeframe", timeframe.wire_token())
                .query("from", window.start.timestamp_millis())
                .query("to", window.end.timestamp_millis())
                .query("pageSize", self.limits.page_size);

            let response = match self.transport.execute(&request) {
                Ok(response) => response,
                Err(err) => return interrupted(timeframe, candles, err),
            };
            self.throttle.record_request();

            if response.is_rate_limited() {
                let delay = policy.delay_for(&response);
                warn!(
                    "{timeframe} history rate limited, retrying window {} in {}s",
                    window.start,
                    delay.as_secs()
                );
                self.pause.pause(delay);
                continue;
            }

            let batch = match response
                .error_for_status("history endpoint")
                .and_then(|response| decode_candles(&response.body))
            {
                Ok(batch) => batch,
                Err(err) => return interrupted(timeframe, candles, err),
            };

            debug!(
                "{timeframe} window {} .. {} returned {} candles",
                window.start,
                window.end,
                batch.len()
            );
            let batch_len = batch.len();
            candles.extend(batch);

            let covered = (window.end - start).num_seconds() as f64;
            on_window(&WindowReport {
                timeframe,
                window,
                candles: batch_len,
                accumulated: candles.len(),
                fraction_done: (covered / total_secs).clamp(0.0, 1.0),
            });

            window_start = next_start(&window);
            self.pause.pause(self.limits.request_pause);
        }

        info!("{timeframe}: collected {} candles", candles.len());
        TimeframeHistory {
            timeframe,
            candles,
            outcome: FetchOutcome::Complete,
        }
    }
}

fn interrupted(timeframe: Timeframe, candles: Vec<Candle>, err: AppError) -> TimeframeHistory {
    error!(
        "{timeframe} history stopped after {} candles: {err}",
        candles.len()
    );
    TimeframeHistory {
        timeframe,
        candles,
        outcome: FetchOutcome::Interrupted(err),
    }
}

fn decode_candles(body: &str) -> Result<Vec<Candle>> {
    let payload: HistoryPayload = parse_body(body, "history")?;
    payload
        .candles
        .into_iter()
        .map(RawCandle::normalize)
        .collect()
}
