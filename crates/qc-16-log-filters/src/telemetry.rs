//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence over the configured level.

use crate::domain::config::LoggingConfig;
use crate::domain::error::GatewayError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// Fails if the level directive is invalid or a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), GatewayError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| GatewayError::Telemetry(e.to_string()))?;

    if config.json {
        // JSON output for containers/production
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| GatewayError::Telemetry(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| GatewayError::Telemetry(e.to_string()))?;
    }

    tracing::info!(level = %config.level, json = config.json, "Tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::default();
        // Another test may already have installed a subscriber
        let _ = init_tracing(&config);
        assert!(matches!(
            init_tracing(&config),
            Err(GatewayError::Telemetry(_))
        ));
    }
}
