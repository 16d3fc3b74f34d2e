pub mod bootstrap;
pub mod collector;
pub mod progress;

pub use bootstrap::{resolve_config, run};
pub use collector::{Collector, RunSummary};
pub use progress::{ConsoleProgress, ProgressSink, SilentProgress};
