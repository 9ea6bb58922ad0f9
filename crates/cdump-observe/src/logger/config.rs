use std::io::IsTerminal;

use crate::logger::format::LoggerFormat;

/// Logger settings of the dump tool.
///
/// Logs always go to stderr: stdout is reserved for analysis reports.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directive, e.g. `info` or `cdump=debug,cdump.exec=trace`.
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: false,
            use_color: std::io::stderr().is_terminal(),
        }
    }
}
