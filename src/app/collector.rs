use std::path::PathBuf;

use chrono::Utc;
use log::{info, warn};

use crate::app::progress::ProgressSink;
use crate::config::{Config, Timeframe};
use crate::error::Result;
use crate::fetch::{ApiSession, Pause, Transport};
use crate::records::{save_document, OutputDocument};

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output: PathBuf,
    pub candles: usize,
    pub interrupted: Vec<Timeframe>,
    pub depth_captured: bool,
}

/// Drives one collection run: preconditions, history per timeframe, depth,
/// then a single write of the output document.
pub struct Collector<T: Transport, P: Pause> {
    config: Config,
    session: ApiSession<T, P>,
}

impl<T: Transport, P: Pause> Collector<T, P> {
    pub fn new(config: Config, session: ApiSession<T, P>) -> Self {
        Self { config, session }
    }

    pub fn session(&self) -> &ApiSession<T, P> {
        &self.session
    }

    pub fn run(&mut self, progress: &mut dyn ProgressSink) -> Result<RunSummary> {
        let config = &self.config;
        info!(
            "Collecting {} from {} to {}",
            config.symbol,
            config.start.date_naive(),
            config.end.date_naive()
        );

        if config.check_connectivity {
            self.session.check_connectivity()?;
        }
        self.session.authenticate(&config.credentials)?;
        self.session
            .resolve_symbol(&config.credentials.account_id, &config.symbol)?;

        let mut document = OutputDocument::new(config, Utc::now());
        let mut interrupted = Vec::new();

        for (index, timeframe) in config.timeframes.iter().copied().enumerate() {
            if index > 0 {
                self.session.pause_for(config.limits.timeframe_pause);
            }

            progress.timeframe_started(timeframe);
            let history = self
                .session
                .fetch_history(timeframe, config.start, config.end, |report| {
                    progress.window_done(report)
                });
            progress.timeframe_finished(&history);

            if !history.is_complete() {
                warn!(
                    "{timeframe} is incomplete; keeping {} candles",
                    history.candles.len()
                );
                interrupted.push(timeframe);
            }
            document.ohlcv.insert(timeframe, history.candles);
        }

        if config.fetch_depth {
            document.market_depth = self.session.fetch_market_depth(config.depth_levels);
        }

        save_document(&document, &config.output, config.save_policy)?;

        Ok(RunSummary {
            output: config.output.clone(),
            candles: document.ohlcv.total_candles(),
            interrupted,
            depth_captured: document.market_depth.is_some(),
        })
    }
}
