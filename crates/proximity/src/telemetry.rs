//! Logging setup for hosts embedding the engine

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::ProximityError;

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install a global `tracing` subscriber
pub fn init_logging(level: Level, format: LogFormat) -> Result<(), ProximityError> {
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = match format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };

    result.map_err(|e| ProximityError::Logging(e.to_string()))
}
