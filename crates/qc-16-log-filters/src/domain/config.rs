//! Service configuration with validation.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterServiceConfig {
    /// HTTP JSON-RPC server configuration
    pub http: HttpConfig,
    /// Filter lifetime configuration
    pub filters: FilterConfig,
    /// Query limits
    pub limits: LimitsConfig,
    /// Timeouts for calls into the chain
    pub timeouts: TimeoutConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl FilterServiceConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        if self.http.max_batch_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_batch_size cannot be 0".into(),
            ));
        }

        if self.filters.ttl.is_zero() {
            return Err(ConfigError::InvalidTimeout("filter ttl cannot be 0".into()));
        }

        if self.filters.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "sweep_interval cannot be 0".into(),
            ));
        }

        if self.filters.max_filters == 0 {
            return Err(ConfigError::InvalidLimit("max_filters cannot be 0".into()));
        }

        if self.limits.max_block_range == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_block_range cannot be 0".into(),
            ));
        }

        if self.limits.max_log_results == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_log_results cannot be 0".into(),
            ));
        }

        if self.timeouts.log_query.is_zero() || self.timeouts.height_query.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "query timeouts cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8545)
    pub port: u16,
    /// Enable HTTP server
    pub enabled: bool,
    /// Max request body size in bytes (default: 1MB)
    pub max_request_size: usize,
    /// Max number of requests in a batch
    pub max_batch_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8545,
            enabled: true,
            max_request_size: 1024 * 1024,
            max_batch_size: 100,
        }
    }
}

/// Filter lifetime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Filters not polled for longer than this are removed
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// How often the background sweep runs
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Max live filters across all clients
    pub max_filters: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(30),
            max_filters: 10_000,
        }
    }
}

/// Query limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max block range for eth_getLogs / eth_getFilterLogs, and max blocks
    /// covered by a single eth_getFilterChanges poll
    pub max_block_range: u64,
    /// Max results for eth_getLogs / eth_getFilterLogs
    pub max_log_results: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_block_range: 10_000,
            max_log_results: 10_000,
        }
    }
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout for a log source query
    #[serde(with = "humantime_serde")]
    pub log_query: Duration,
    /// Timeout for a height resolution
    #[serde(with = "humantime_serde")]
    pub height_query: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            log_query: Duration::from_secs(60),
            height_query: Duration::from_secs(5),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() != 0 {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        } else {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be checked before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
