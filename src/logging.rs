//! Tracing initialization
//! Structured logging with env-filter, plain or JSON output per LoggingConfig

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize the global tracing subscriber from the loaded configuration.
///
/// `RUST_LOG` still overrides the configured level when set. Must run after
/// the `.env` file is loaded, otherwise levels set there are ignored.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_lowercase()));

    match config.format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init(),
        LogFormat::Plain => fmt().with_env_filter(filter).init(),
    }
}
