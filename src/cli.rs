use std::path::PathBuf;

use clap::Parser;
use crossterm::style::Stylize;

use crate::config::{parse_timeframe_list, Config, SavePolicy};
use crate::error::Result;
use crate::utils::parse_date_bound;

#[derive(Parser, Debug, Default)]
#[command(name = "ctrader-collector")]
#[command(about = "Download historical cTrader candles and a depth snapshot into one JSON file")]
#[command(version)]
pub struct Cli {
    /// JSON config file layered over the built-in defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Symbol name, matched case-insensitively against the account catalog
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// Range start, `YYYY-MM-DD` or RFC 3339
    #[arg(long)]
    pub start: Option<String>,

    /// Range end (exclusive), `YYYY-MM-DD` or RFC 3339
    #[arg(long)]
    pub end: Option<String>,

    /// Comma separated timeframe labels, e.g. `M1,H1,D1`
    #[arg(short, long)]
    pub timeframes: Option<String>,

    /// Output JSON path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Save even when some timeframe produced no candles
    #[arg(long)]
    pub allow_partial: bool,

    /// Do not request the market depth snapshot
    #[arg(long)]
    pub skip_depth: bool,

    /// Append log output to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Flags are the last layer and override the config file and environment.
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if let Some(symbol) = &self.symbol {
            config.symbol = symbol.clone();
        }
        if let Some(start) = &self.start {
            config.start = parse_date_bound(start)?;
        }
        if let Some(end) = &self.end {
            config.end = parse_date_bound(end)?;
        }
        if let Some(list) = &self.timeframes {
            config.timeframes = parse_timeframe_list(list)?;
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if self.allow_partial {
            config.save_policy = SavePolicy::Lenient;
        }
        if self.skip_depth {
            config.fetch_depth = false;
        }
        Ok(())
    }
}

pub fn show_banner(config: &Config) {
    let rule = "=".repeat(60);
    println!("{}", rule.as_str().blue());
    println!("{}", format!("cTrader data collector | {}", config.symbol).blue());
    println!(
        "{}",
        format!(
            "Range: {} to {} | Timeframes: {}",
            config.start.date_naive(),
            config.end.date_naive(),
            config
                .timeframes
                .iter()
                .map(|tf| tf.label())
                .collect::<Vec<_>>()
                .join(", ")
        )
        .blue()
    );
    println!("{}", rule.as_str().blue());
}
