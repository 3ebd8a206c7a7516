//! Utility functions for the CLI

use crate::error::{CliError, CliResult};
use callstate_core::{CallStatus, NotificationKind, Notifier};
use colored::{ColoredString, Colorize};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize tracing; `RUST_LOG` wins over `verbose`
pub fn init_tracing(verbose: bool) -> CliResult<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| CliError::General(format!("Failed to set tracing subscriber: {}", e)))?;

    Ok(())
}

/// Utility for colored console output
pub struct ColoredOutput;

impl ColoredOutput {
    pub fn success(msg: &str) -> ColoredString {
        msg.green().bold()
    }

    pub fn error(msg: &str) -> ColoredString {
        msg.red().bold()
    }

    pub fn warning(msg: &str) -> ColoredString {
        msg.yellow().bold()
    }

    pub fn info(msg: &str) -> ColoredString {
        msg.blue()
    }

    pub fn dim(msg: &str) -> ColoredString {
        msg.dimmed()
    }

    pub fn highlight(msg: &str) -> ColoredString {
        msg.cyan().bold()
    }

    pub fn status(status: CallStatus) -> ColoredString {
        match status {
            CallStatus::Idle => Self::dim("idle"),
            CallStatus::Loading => Self::warning("loading"),
            CallStatus::Succeeded => Self::success("succeeded"),
            CallStatus::Failed => Self::error("failed"),
        }
    }
}

/// Prints notifications to stderr so they never mix with rendered output
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, title: &str, message: &str, kind: NotificationKind) {
        let label = format!("[{}]", title);
        match kind {
            NotificationKind::Success => eprintln!("{} {}", ColoredOutput::success(&label), message),
            NotificationKind::Error => eprintln!("{} {}", ColoredOutput::error(&label), message),
        }
    }
}

/// Format duration in a human-readable way
pub fn format_duration(duration: std::time::Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{:.1}m", ms as f64 / 60_000.0)
    }
}

/// Truncate text to a maximum number of characters with ellipsis
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Validate file exists
pub fn validate_file_exists(path: &std::path::Path) -> CliResult<()> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a longer payload", 10), "a longe...");
    }

    #[test]
    fn test_validate_file_exists() {
        let err = validate_file_exists(std::path::Path::new("/definitely/not/here.yaml"))
            .unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }
}
