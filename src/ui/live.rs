//! Live process table for `ironsight watch`

use std::cmp::Ordering;
use std::io::{self, Write};

use crossterm::{
    cursor::MoveTo,
    execute,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use ironsight_sampler::constants::{APP_VERSION, DISPLAY_NAME, VISIBLE_ROWS_OVERHEAD};
use ironsight_sampler::{DerivedMetric, SampleEvent};

use super::table::{metric_header, metric_row};
use super::utils::{cpu_color, truncate_string};

/// What the live table currently shows
#[derive(Debug, Default)]
pub struct LiveView {
    metrics: Vec<DerivedMetric>,
    sequence: u64,
    last_error: Option<String>,
    pub interval_ms: u64,
}

impl LiveView {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            ..Self::default()
        }
    }

    /// Takes in a published poll. Metrics are kept busiest first.
    pub fn apply(&mut self, event: SampleEvent) {
        match event {
            SampleEvent::Metrics { sequence, mut metrics } => {
                metrics.sort_by(|a, b| {
                    b.cpu_percent
                        .partial_cmp(&a.cpu_percent)
                        .unwrap_or(Ordering::Equal)
                });
                self.metrics = metrics;
                self.sequence = sequence;
                self.last_error = None;
            }
            SampleEvent::Failed { sequence, error } => {
                self.sequence = sequence;
                self.last_error = Some(error.to_string());
            }
        }
    }

    pub fn metrics(&self) -> &[DerivedMetric] {
        &self.metrics
    }

    fn total_cpu(&self) -> f64 {
        self.metrics.iter().map(|m| m.cpu_percent).sum()
    }
}

/// Renders the live view to the terminal
pub fn render(stdout: &mut io::Stdout, view: &LiveView) -> io::Result<()> {
    let (width, height) = terminal::size()?;
    let width = width as usize;
    let visible_rows = (height as usize).saturating_sub(VISIBLE_ROWS_OVERHEAD);

    execute!(stdout, MoveTo(0, 0), Clear(ClearType::All))?;

    let title = format!(" {} v{}", DISPLAY_NAME, APP_VERSION);
    let stats = format!(
        "Processes: {}  |  CPU: {:5.1}%  |  Poll #{}  |  Refresh: {} ms ",
        view.metrics.len(),
        view.total_cpu().min(100.0),
        view.sequence,
        view.interval_ms
    );
    execute!(
        stdout,
        SetBackgroundColor(Color::DarkBlue),
        SetForegroundColor(Color::White),
        Print(format!(
            "{}{:>pad$}",
            title,
            stats,
            pad = width.saturating_sub(title.len())
        )),
        ResetColor,
        Print("\r\n")
    )?;

    execute!(
        stdout,
        SetBackgroundColor(Color::DarkGrey),
        SetForegroundColor(Color::White),
        Print(format!("{:width$}", metric_header(), width = width)),
        ResetColor,
        Print("\r\n")
    )?;

    for metric in view.metrics.iter().take(visible_rows) {
        let line = truncate_string(&metric_row(metric), width);
        execute!(
            stdout,
            SetForegroundColor(cpu_color(metric.cpu_percent)),
            Print(line),
            ResetColor,
            Print("\r\n")
        )?;
    }

    let footer = match &view.last_error {
        Some(err) => (format!(" Last poll failed: {}", err), Color::Red),
        None => (" q/Esc: Quit  [/]: Slower/faster refresh".to_string(), Color::DarkGrey),
    };
    execute!(
        stdout,
        MoveTo(0, height.saturating_sub(1)),
        SetForegroundColor(footer.1),
        Print(footer.0),
        ResetColor
    )?;

    stdout.flush()
}
