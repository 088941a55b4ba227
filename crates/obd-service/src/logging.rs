//! Logging bootstrap

use crate::config::{LogFormat, LoggingConfig};
use crate::error::ServiceError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn parse_level(level: &str) -> Result<Level, ServiceError> {
    level
        .parse::<Level>()
        .map_err(|_| ServiceError::Logging(format!("unknown log level '{}'", level)))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ServiceError> {
    let level = parse_level(&config.level)?;
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = match config.format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    installed.map_err(|e| ServiceError::Logging(e.to_string()))
}
