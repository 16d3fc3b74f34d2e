use log::info;

use crate::app::collector::{Collector, RunSummary};
use crate::app::progress::ConsoleProgress;
use crate::cli::{show_banner, Cli};
use crate::config::{apply_env_overrides, load_config_file, validate_config, Config};
use crate::error::Result;
use crate::fetch::ApiSession;

/// Layer defaults, config file, environment and flags into one validated config.
pub fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            load_config_file(path)?
        }
        None => Config::builtin(),
    };
    apply_env_overrides(&mut config);
    cli.apply_to(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

/// Entry point used by `main`.
pub fn run(cli: &Cli) -> Result<RunSummary> {
    let config = resolve_config(cli)?;
    show_banner(&config);

    let session = ApiSession::connect(&config)?;
    let mut collector = Collector::new(config, session);
    let mut progress = ConsoleProgress::new();
    let summary = collector.run(&mut progress)?;

    info!(
        "Run finished in {}s",
        progress.elapsed().as_secs()
    );
    Ok(summary)
}
