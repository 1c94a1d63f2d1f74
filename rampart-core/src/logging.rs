//! Logging and tracing setup

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{},h2=warn,hyper=warn", config.level)))?;

    let registry = tracing_subscriber::registry().with(filter);

    match config.format.to_lowercase().as_str() {
        "json" => registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .try_init()?,
        _ => registry.with(fmt::layer().pretty()).try_init()?,
    }

    Ok(())
}
