//! Error conversions from infrastructure types.
//!
//! These conversions involve I/O types and belong in the adapters layer.

use crate::domain::config::ConfigError;
use crate::domain::GatewayError;

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::Bind(e.to_string())
    }
}

impl From<ConfigError> for GatewayError {
    fn from(e: ConfigError) -> Self {
        GatewayError::Config(e.to_string())
    }
}
