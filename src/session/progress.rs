// Progress - The feedback capability injected into connect and dispatch
//
// Every `begin` is answered by exactly one `finish`. Callers rely on the
// terminal notification to decide whether to continue.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

/// Terminal state reported for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Ok,
    Timeout,
    /// The peer answered with something that is not a valid response
    ProtocolError,
    /// The link failed underneath the operation
    LinkError,
    Failed,
}

impl ProgressStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Timeout => write!(f, "timeout"),
            Self::ProtocolError => write!(f, "SMP error"),
            Self::LinkError => write!(f, "OS error"),
            Self::Failed => write!(f, "error"),
        }
    }
}

/// Receives progress notifications from the session core
pub trait ProgressSink: Send + Sync {
    /// An operation started
    fn begin(&self, description: &str);

    /// Bytes moved so far in a transfer of `total` bytes
    fn advance(&self, _offset: u64, _total: u64) {}

    /// The current operation ended
    fn finish(&self, status: ProgressStatus);
}

// ============================================================================
// NULL SINK
// ============================================================================

/// Discards all notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn begin(&self, _description: &str) {}

    fn finish(&self, _status: ProgressStatus) {}
}

// ============================================================================
// LOG SINK
// ============================================================================

/// Reports progress through tracing, for non-interactive use
#[derive(Debug, Default)]
pub struct LogSink {
    current: Mutex<Option<String>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for LogSink {
    fn begin(&self, description: &str) {
        info!("{}", description);
        if let Ok(mut current) = self.current.lock() {
            *current = Some(description.to_string());
        }
    }

    fn advance(&self, offset: u64, total: u64) {
        info!("{}/{} bytes", offset, total);
    }

    fn finish(&self, status: ProgressStatus) {
        let description = self.current.lock().ok().and_then(|mut c| c.take()).unwrap_or_default();
        if status.is_ok() {
            info!("{} {}", description, status);
        } else {
            warn!("{} {}", description, status);
        }
    }
}

// ============================================================================
// SPINNER SINK
// ============================================================================

struct Active {
    bar: ProgressBar,
    description: String,
    is_transfer: bool,
}

/// Terminal spinners and transfer bars
#[derive(Default)]
pub struct SpinnerSink {
    active: Mutex<Option<Active>>,
}

impl SpinnerSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn transfer_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{msg:.bold.blue} [{bar:40.cyan/blue}] {percent:>3}% • {bytes}/{total_bytes} • {bytes_per_sec} • {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

impl ProgressSink for SpinnerSink {
    fn begin(&self, description: &str) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(Self::spinner_style());
        bar.set_message(description.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        if let Ok(mut active) = self.active.lock() {
            if let Some(previous) = active.take() {
                previous.bar.finish_and_clear();
            }
            *active = Some(Active {
                bar,
                description: description.to_string(),
                is_transfer: false,
            });
        }
    }

    fn advance(&self, offset: u64, total: u64) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(active) = active.as_mut() {
                if !active.is_transfer {
                    active.bar.disable_steady_tick();
                    active.bar.set_style(Self::transfer_style());
                    active.is_transfer = true;
                }
                active.bar.set_length(total);
                active.bar.set_position(offset);
            }
        }
    }

    fn finish(&self, status: ProgressStatus) {
        let Ok(mut active) = self.active.lock() else {
            return;
        };
        let Some(active) = active.take() else {
            return;
        };

        active.bar.finish_and_clear();
        if status.is_ok() {
            eprintln!(
                "{} {} {}",
                style("✓").green().bold(),
                active.description,
                style(status).green()
            );
        } else {
            eprintln!(
                "{} {} {}",
                style("✗").red().bold(),
                active.description,
                style(status).red()
            );
        }
    }
}
