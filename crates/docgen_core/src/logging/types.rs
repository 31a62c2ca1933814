//! Logging levels and batch log settings.

use serde::{Deserialize, Serialize};

/// Severity of a batch log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// How a [`BatchLogger`](super::BatchLogger) writes its file.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Lines below this level are dropped.
    pub level: LogLevel,
    /// Keep converter output out of the log unless a conversion fails,
    /// and only report progress when it crosses `progress_step`.
    pub compact: bool,
    /// Percent between progress lines in compact mode.
    pub progress_step: u32,
    /// Converter lines kept for the failure tail.
    pub error_tail: usize,
    /// Prefix lines with the wall-clock time.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            progress_step: 20,
            error_tail: 20,
            timestamps: true,
        }
    }
}

/// Receives every formatted batch log line, e.g. to echo it on the terminal.
pub type ConsoleCallback = Box<dyn Fn(&str) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parses_from_config_value() {
        let level: LogLevel = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(level, LogLevel::Warn);
        assert_eq!(level.as_filter(), "warn");
        assert!(LogLevel::Debug < LogLevel::Info);
    }
}
