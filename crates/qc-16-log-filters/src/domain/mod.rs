//! Domain layer for the log filter subsystem.
//!
//! Pure types, matching rules, configuration and errors. No I/O lives here.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod matching;
pub mod types;

// Re-exports for convenience
pub use config::{FilterConfig, FilterServiceConfig, LimitsConfig, LoggingConfig, TimeoutConfig};
pub use descriptor::{FilterCriteria, FilterDescriptor, TopicSlot};
pub use error::{ApiError, ApiResult, FilterError, FilterResult, GatewayError, SourceError};
pub use types::*;
