use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

use crossterm::style::Stylize;
use crossterm::{cursor, queue, terminal};

use crate::config::Timeframe;
use crate::fetch::{TimeframeHistory, WindowReport};
use crate::utils::format_clock;

const BAR_WIDTH: usize = 50;

/// Receives history progress while a run is in flight.
pub trait ProgressSink {
    fn timeframe_started(&mut self, _timeframe: Timeframe) {}
    fn window_done(&mut self, report: &WindowReport);
    fn timeframe_finished(&mut self, _history: &TimeframeHistory) {}
}

pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn window_done(&mut self, _report: &WindowReport) {}
}

/// Single-line bar redrawn in place on stdout.
pub struct ConsoleProgress {
    out: Stdout,
    started: Instant,
    timeframe_started: Instant,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            out: io::stdout(),
            started: now,
            timeframe_started: now,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn draw(&mut self, report: &WindowReport) -> io::Result<()> {
        let elapsed = self.timeframe_started.elapsed();
        let line = format!(
            "{} |{}| {:>5.1}% | {} candles | elapsed {} | eta {}",
            report.timeframe,
            render_bar(report.fraction_done),
            report.fraction_done * 100.0,
            report.accumulated,
            format_clock(elapsed),
            estimate_remaining(elapsed, report.fraction_done)
                .map(format_clock)
                .unwrap_or_else(|| "--:--:--".to_string()),
        );

        queue!(
            self.out,
            cursor::MoveToColumn(0),
            terminal::Clear(terminal::ClearType::CurrentLine)
        )?;
        write!(self.out, "{}", line.yellow())?;
        self.out.flush()
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn timeframe_started(&mut self, timeframe: Timeframe) {
        self.timeframe_started = Instant::now();
        let _ = writeln!(self.out, "{}", format!("Fetching {timeframe} candles").blue());
    }

    fn window_done(&mut self, report: &WindowReport) {
        let _ = self.draw(report);
    }

    fn timeframe_finished(&mut self, history: &TimeframeHistory) {
        let summary = format!("{}: {} candles", history.timeframe, history.candles.len());
        let styled = if history.is_complete() {
            format!("✓ {summary}").green()
        } else {
            format!("✗ {summary} (incomplete)").red()
        };
        let _ = writeln!(self.out);
        let _ = writeln!(self.out, "{styled}");
    }
}

pub fn render_bar(fraction: f64) -> String {
    let filled = ((fraction.clamp(0.0, 1.0)) * BAR_WIDTH as f64) as usize;
    format!("{}{}", "█".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

/// Linear extrapolation from the share of the range already covered.
pub fn estimate_remaining(elapsed: Duration, fraction: f64) -> Option<Duration> {
    if fraction <= 0.0 {
        return None;
    }
    let total = elapsed.as_secs_f64() / fraction.min(1.0);
    Some(Duration::from_secs_f64((total - elapsed.as_secs_f64()).max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_is_fixed_width() {
        assert_eq!(render_bar(0.0), "-".repeat(50));
        assert_eq!(render_bar(1.0), "█".repeat(50));
        let half = render_bar(0.5);
        assert_eq!(half.chars().filter(|c| *c == '█').count(), 25);
        assert_eq!(half.chars().count(), 50);
    }

    #[test]
    fn eta_extrapolates_linearly() {
        assert_eq!(estimate_remaining(Duration::from_secs(30), 0.0), None);
        assert_eq!(
            estimate_remaining(Duration::from_secs(30), 0.25),
            Some(Duration::from_secs(90))
        );
        assert_eq!(
            estimate_remaining(Duration::from_secs(30), 1.0),
            Some(Duration::ZERO)
        );
    }
}
