use std::io;

use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, fmt::time::OffsetTime, layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Builds the filter and output layer for `cfg` and installs them globally.
pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = parse_filter(&cfg.level)?;
    let output = output_layer(cfg)?;
    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(classify)
}

fn output_layer(cfg: &LoggerConfig) -> Result<OutputLayer, LoggerError> {
    Ok(match cfg.format {
        LoggerFormat::Text => fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(cfg.use_color)
            .with_target(cfg.with_targets)
            .with_timer(local_timer())
            .boxed(),
        LoggerFormat::Json => fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(local_timer())
            .boxed(),
        LoggerFormat::Journald => journald_layer()?,
    })
}

fn parse_filter(directive: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(directive).map_err(|e| LoggerError::InvalidLogLevel {
        directive: directive.to_string(),
        reason: e.to_string(),
    })
}

/// RFC 3339 timestamps in the local offset, UTC when it cannot be determined.
fn local_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn classify(e: impl std::fmt::Display) -> LoggerError {
    let msg = e.to_string();
    if msg.contains("already been set") {
        LoggerError::AlreadyInitialized
    } else {
        LoggerError::InitializationFailed(msg)
    }
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald_layer() -> Result<OutputLayer, LoggerError> {
    let layer = tracing_journald::layer()
        .map_err(|e| LoggerError::InitializationFailed(format!("journald: {e}")))?
        .with_syslog_identifier("cdump".to_string());
    Ok(layer.boxed())
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald_layer() -> Result<OutputLayer, LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
