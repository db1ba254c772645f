//! Inbound ports (driving ports).
//!
//! The API that the JSON-RPC layer uses to drive the filter subsystem.

use crate::domain::error::FilterResult;
use crate::domain::types::{Filter, FilterId, LogRecord};
use async_trait::async_trait;

/// Ethereum log filter API (Driving Port)
#[async_trait]
pub trait EthFilterApi: Send + Sync {
    /// Install a log filter and return its id.
    async fn new_filter(&self, filter: Filter) -> FilterResult<FilterId>;

    /// Logs matched since the previous poll (or since creation).
    async fn get_filter_changes(&self, id: FilterId) -> FilterResult<Vec<LogRecord>>;

    /// All logs matching the filter over its full configured range.
    async fn get_filter_logs(&self, id: FilterId) -> FilterResult<Vec<LogRecord>>;

    /// One-shot log query; nothing is stored.
    async fn get_logs(&self, filter: Filter) -> FilterResult<Vec<LogRecord>>;

    /// Remove a filter. `false` if it did not exist.
    async fn uninstall_filter(&self, id: FilterId) -> bool;
}
