//! Logging setup

use tempra_core::{TempraError, TempraResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::LoggingConfig;

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level. Calling this twice is an error.
pub fn init_logging(config: &LoggingConfig) -> TempraResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| TempraError::Config(format!("invalid log level {:?}: {}", config.level, e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| TempraError::Config(format!("logging already initialised: {}", e)))
}
