use std::fs::OpenOptions;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::style::Stylize;
use env_logger::{Builder, Env, Target};

use ctrader_collector::app;
use ctrader_collector::cli::Cli;

fn init_logging(cli: &Cli) -> Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    if let Some(path) = &cli.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
        builder.write_style(env_logger::WriteStyle::Never);
    }
    builder.init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    match app::run(&cli) {
        Ok(summary) => {
            println!(
                "{}",
                format!(
                    "✓ Saved {} candles to {}",
                    summary.candles,
                    summary.output.display()
                )
                .green()
            );
            if !summary.interrupted.is_empty() {
                let labels: Vec<&str> = summary.interrupted.iter().map(|tf| tf.label()).collect();
                println!(
                    "{}",
                    format!("! Incomplete timeframes: {}", labels.join(", ")).yellow()
                );
            }
            if !summary.depth_captured {
                println!("{}", "! Market depth not captured".yellow());
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", format!("✗ Run failed: {err}").red());
            Err(err.into())
        }
    }
}
