use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{error, info};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::config::{Config, SavePolicy, Timeframe, API_VERSION};
use crate::error::{AppError, Context, Result};
use crate::fetch::{Candle, MarketDepth};
use crate::utils::iso_utc;

#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub symbol: String,
    pub account_id: String,
    pub date_range: DateRange,
    pub generated_at: String,
    pub api_version: String,
    pub timeframes: Vec<String>,
}

/// Candle series keyed by timeframe label, serialized in insertion order.
#[derive(Debug, Clone, Default)]
pub struct OhlcvSeries(Vec<(Timeframe, Vec<Candle>)>);

impl OhlcvSeries {
    /// Replace the series for `timeframe`, keeping its original position.
    pub fn insert(&mut self, timeframe: Timeframe, candles: Vec<Candle>) {
        match self.0.iter_mut().find(|(tf, _)| *tf == timeframe) {
            Some(entry) => entry.1 = candles,
            None => self.0.push((timeframe, candles)),
        }
    }

    pub fn get(&self, timeframe: Timeframe) -> Option<&[Candle]> {
        self.0
            .iter()
            .find(|(tf, _)| *tf == timeframe)
            .map(|(_, candles)| candles.as_slice())
    }

    pub fn total_candles(&self) -> usize {
        self.0.iter().map(|(_, candles)| candles.len()).sum()
    }
}

impl Serialize for OhlcvSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (timeframe, candles) in &self.0 {
            map.serialize_entry(timeframe.label(), candles)?;
        }
        map.end()
    }
}

/// The single JSON document a run produces.
#[derive(Debug, Clone, Serialize)]
pub struct OutputDocument {
    pub meta: Meta,
    pub ohlcv: OhlcvSeries,
    pub market_depth: Option<MarketDepth>,
    #[serde(skip)]
    configured: Vec<Timeframe>,
}

impl OutputDocument {
    pub fn new(config: &Config, generated_at: DateTime<Utc>) -> Self {
        Self {
            meta: Meta {
                symbol: config.symbol.clone(),
                account_id: config.credentials.account_id.clone(),
                date_range: DateRange {
                    start: iso_utc(config.start),
                    end: iso_utc(config.end),
                },
                generated_at: iso_utc(generated_at),
                api_version: API_VERSION.to_string(),
                timeframes: config
                    .timeframes
                    .iter()
                    .map(|tf| tf.label().to_string())
                    .collect(),
            },
            ohlcv: OhlcvSeries::default(),
            market_depth: None,
            configured: config.timeframes.clone(),
        }
    }

    /// Configured timeframes that ended up with no candles at all.
    pub fn empty_timeframes(&self) -> Vec<Timeframe> {
        self.configured
            .iter()
            .copied()
            .filter(|tf| self.ohlcv.get(*tf).map_or(true, |candles| candles.is_empty()))
            .collect()
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;
        buffer.push(b'\n');
        Ok(buffer)
    }
}

/// Write the document to `path`. Under `SavePolicy::Strict` nothing is
/// written when a configured timeframe has no candles.
pub fn save_document(document: &OutputDocument, path: &Path, policy: SavePolicy) -> Result<()> {
    let empty = document.empty_timeframes();
    for timeframe in &empty {
        error!("No candles collected for timeframe {timeframe}");
    }

    if policy == SavePolicy::Strict && !empty.is_empty() {
        error!("Refusing to save incomplete data to {}", path.display());
        return Err(AppError::IncompleteData(
            empty.iter().map(|tf| tf.label().to_string()).collect(),
        ));
    }

    let bytes = document.to_json()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create output directory {}", parent.display())
        })?;
    }

    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    file.write_all(&bytes)
        .with_context(|| format!("Failed to write output file {}", path.display()))?;

    info!(
        "Saved {} candles across {} timeframes to {}",
        document.ohlcv.total_candles(),
        document.meta.timeframes.len(),
        path.display()
    );
    Ok(())
}
