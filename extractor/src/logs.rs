//! Logging setup and progress helpers.
//!
//! Library code logs through `tracing` with structured fields. The helpers
//! below emit the short step-by-step progress lines shown during a run.

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Log level for progress lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
}

impl LogLevel {
    fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Info => "",
            LogLevel::Success => "✓ ",
            LogLevel::Warning => "⚠️  ",
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug` with
/// `verbose`. Calling this twice is harmless.
pub fn init(verbose: bool) {
    let default = if verbose { "rsi_extract=debug,info" } else { "info" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Emit one progress line at `level`.
pub fn log(level: LogLevel, msg: impl Into<String>) {
    let line = format!("{}{}", level.prefix(), msg.into());
    match level {
        LogLevel::Info | LogLevel::Success => info!("{}", line),
        LogLevel::Warning => warn!("{}", line),
    }
}

/// Convenient logging functions
pub fn log_info(msg: impl Into<String>) {
    log(LogLevel::Info, msg);
}

pub fn log_success(msg: impl Into<String>) {
    log(LogLevel::Success, msg);
}

pub fn log_warning(msg: impl Into<String>) {
    log(LogLevel::Warning, msg);
}
