//! Error types for the log filter subsystem.
//!
//! `FilterError` is the domain taxonomy. `ApiError` is its JSON-RPC 2.0 wire
//! form, with codes following the Ethereum JSON-RPC conventions (EIP-1474).

use crate::domain::types::{BlockRef, FilterId, Hash};
use serde::Serialize;
use std::fmt;

/// Standard JSON-RPC 2.0 error codes
pub mod codes {
    // JSON-RPC 2.0 standard errors (-32700 to -32600)
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // Server errors (-32000 to -32099)
    pub const SERVER_ERROR: i32 = -32000;
    pub const RESOURCE_NOT_FOUND: i32 = -32001;
    pub const RESOURCE_UNAVAILABLE: i32 = -32002;
    pub const LIMIT_EXCEEDED: i32 = -32005;
}

/// Filter subsystem errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// Resolved lower bound is above the resolved upper bound
    #[error("invalid block range: from block {from} is after to block {to}")]
    InvalidRange { from: u64, to: u64 },

    /// Referenced block has not been produced yet
    #[error("block {block} is not available yet")]
    HeightUnavailable { block: BlockRef },

    /// Unknown, uninstalled or expired filter
    #[error("filter not found: {0}")]
    NotFound(FilterId),

    /// Transient failure reaching the height resolver or log source
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Malformed request parameters
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Request exceeds a configured limit
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Block hash not known to the log source
    #[error("unknown block: {0:?}")]
    UnknownBlock(Hash),
}

impl FilterError {
    /// Only transient backend failures may be retried with the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FilterError::Unavailable(_))
    }
}

/// Errors reported by the outbound ports (height resolver, log source).
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("timeout")]
    Timeout,
}

impl From<SourceError> for FilterError {
    fn from(e: SourceError) -> Self {
        FilterError::Unavailable(e.to_string())
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone)]
pub struct ApiError {
    /// JSON-RPC error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Optional additional data
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create error with additional data
    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Parse error - invalid JSON
    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(
            codes::PARSE_ERROR,
            format!("Parse error: {}", details.into()),
        )
    }

    /// Invalid request - not a valid JSON-RPC request
    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_REQUEST,
            format!("Invalid request: {}", details.into()),
        )
    }

    /// Method not found
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    /// Invalid parameters
    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_PARAMS,
            format!("Invalid params: {}", details.into()),
        )
    }

    /// Internal error
    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            codes::INTERNAL_ERROR,
            format!("Internal error: {}", details.into()),
        )
    }

    /// Limit exceeded (batch size, block range, result count)
    pub fn limit_exceeded(limit: impl Into<String>) -> Self {
        Self::new(
            codes::LIMIT_EXCEEDED,
            format!("Limit exceeded: {}", limit.into()),
        )
    }

    /// Whether a client may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        self.data
            .as_ref()
            .and_then(|d| d.get("retryable"))
            .and_then(|r| r.as_bool())
            .unwrap_or(false)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ApiError", 3)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;
        if let Some(ref data) = self.data {
            state.serialize_field("data", data)?;
        }
        state.end()
    }
}

impl From<FilterError> for ApiError {
    fn from(e: FilterError) -> Self {
        match e {
            FilterError::InvalidRange { .. } | FilterError::InvalidArgument(_) => {
                ApiError::invalid_params(e.to_string())
            }
            // Clients match on the exact "filter not found" message.
            FilterError::NotFound(_) => ApiError::new(codes::SERVER_ERROR, "filter not found"),
            FilterError::HeightUnavailable { .. } | FilterError::UnknownBlock(_) => {
                ApiError::new(codes::RESOURCE_NOT_FOUND, e.to_string())
            }
            FilterError::Unavailable(_) => ApiError::with_data(
                codes::RESOURCE_UNAVAILABLE,
                e.to_string(),
                serde_json::json!({ "retryable": true }),
            ),
            FilterError::LimitExceeded(ref what) => ApiError::limit_exceeded(what.clone()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_syntax() || e.is_eof() {
            ApiError::parse_error(e.to_string())
        } else {
            ApiError::invalid_params(e.to_string())
        }
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Service-level errors (not JSON-RPC, internal use)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Logging setup error
    #[error("telemetry error: {0}")]
    Telemetry(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(FilterError::Unavailable("down".into()).is_retryable());
        assert!(!FilterError::NotFound(FilterId(1)).is_retryable());
        assert!(!FilterError::InvalidRange { from: 10, to: 0 }.is_retryable());
        assert!(!FilterError::InvalidArgument("bad".into()).is_retryable());
        assert!(!FilterError::HeightUnavailable { block: BlockRef::Number(9) }.is_retryable());
    }

    #[test]
    fn test_source_error_maps_to_unavailable() {
        let err: FilterError = SourceError::Timeout.into();
        assert!(matches!(err, FilterError::Unavailable(_)));
    }

    #[test]
    fn test_api_error_codes() {
        let err: ApiError = FilterError::InvalidRange { from: 10, to: 0 }.into();
        assert_eq!(err.code, codes::INVALID_PARAMS);
        assert!(err.message.contains("from block 10"));

        let err: ApiError = FilterError::NotFound(FilterId(7)).into();
        assert_eq!(err.code, codes::SERVER_ERROR);
        assert_eq!(err.message, "filter not found");

        let err: ApiError = FilterError::Unavailable("log source".into()).into();
        assert_eq!(err.code, codes::RESOURCE_UNAVAILABLE);
        assert!(err.is_retryable());

        let err: ApiError = FilterError::LimitExceeded("too many filters".into()).into();
        assert_eq!(err.code, codes::LIMIT_EXCEEDED);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_serialization() {
        let err = ApiError::invalid_params("missing filter id");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("-32602"));
        assert!(json.contains("missing filter id"));
        assert!(!json.contains("data"));
    }

    #[test]
    fn test_from_serde_error() {
        let json_err: Result<serde_json::Value, _> = serde_json::from_str("invalid json");
        let api_err: ApiError = json_err.unwrap_err().into();
        assert_eq!(api_err.code, codes::PARSE_ERROR);
    }
}
