use std::time::Duration;

use chrono::Utc;
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::iso_utc;

use super::decode::parse_body;
use super::pacing::Pause;
use super::session::ApiSession;
use super::transport::{ApiRequest, Transport};

const DEPTH_TIMEOUT: Duration = Duration::from_secs(15);

/// Order book snapshot; each level is serialized as `[price, volume]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketDepth {
    pub timestamp: String,
    pub bids: Vec<(f64, f64)>,
    pub asks: Vec<(f64, f64)>,
}

#[derive(Debug, Deserialize)]
struct DepthPayload {
    bids: Vec<DepthLevel>,
    asks: Vec<DepthLevel>,
}

#[derive(Debug, Deserialize)]
struct DepthLevel {
    price: f64,
    volume: f64,
}

fn levels(raw: Vec<DepthLevel>) -> Vec<(f64, f64)> {
    raw.into_iter().map(|level| (level.price, level.volume)).collect()
}

impl<T: Transport, P: Pause> ApiSession<T, P> {
    /// Single depth snapshot. Failures are logged and reported as `None`;
    /// they never abort the run.
    pub fn fetch_market_depth(&mut self, levels: u32) -> Option<MarketDepth> {
        info!("Fetching market depth ({levels} levels)...");
        match self.try_fetch_market_depth(levels) {
            Ok(depth) => {
                info!(
                    "Market depth captured: {} bids, {} asks",
                    depth.bids.len(),
                    depth.asks.len()
                );
                Some(depth)
            }
            Err(err) => {
                error!("Failed to fetch market depth: {err}");
                None
            }
        }
    }

    fn try_fetch_market_depth(&mut self, level_count: u32) -> Result<MarketDepth> {
        let symbol_id = self
            .symbol_id
            .clone()
            .ok_or_else(|| AppError::message("symbol must be resolved before fetching depth"))?;

        let request = ApiRequest::get(
            self.endpoints.api(&format!("marketdata/depth/{symbol_id}")),
            DEPTH_TIMEOUT,
        )
        .query("levels", level_count);

        let response = self
            .transport
            .execute(&request)?
            .error_for_status("depth endpoint")?;
        let payload: DepthPayload = parse_body(&response.body, "depth")?;

        Ok(MarketDepth {
            timestamp: iso_utc(Utc::now()),
            bids: levels(payload.bids),
            asks: levels(payload.asks),
        })
    }
}
