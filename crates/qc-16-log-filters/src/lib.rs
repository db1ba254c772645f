// Allow missing docs for internal items in development
#![allow(missing_docs)]

//! QC-16 Log Filters - Ethereum JSON-RPC event log filters.
//!
//! Lets clients install standing log filters, poll them for logs matched
//! since the previous poll, fetch all logs of a filter, and run one-shot
//! `eth_getLogs` queries.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     LOG FILTERS (qc-16)                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │   HTTP JSON-RPC (POST /)   /health   /metrics                │
//! │                │                                             │
//! │   router → FilterRpc → EthFilterApi (LogFilterService)       │
//! │                │                    │                        │
//! │        FilterRegistry           LogMatcher                   │
//! │   (map lock + per-filter      (resolve range, fetch,         │
//! │    lock, cursor, TTL sweep)    match address/topics)         │
//! └────────────────────────────────────┼─────────────────────────┘
//!                                      │
//!                       HeightResolver + LogSource
//!                          (chain collaborators)
//! ```
//!
//! # Methods
//!
//! - `eth_newFilter`: install a filter, returns its hex id
//! - `eth_getFilterChanges`: logs in blocks not yet delivered to this filter
//! - `eth_getFilterLogs`: every log in the filter's range; no cursor change
//! - `eth_getLogs`: one-shot query by range or by `blockHash`
//! - `eth_uninstallFilter`: `false` if the id is unknown
//!
//! `pending` resolves to the current head, like `latest`.
//!
//! # Usage
//!
//! ```ignore
//! use qc_16_log_filters::{FilterGatewayService, FilterServiceConfig, InMemoryChain};
//!
//! let chain = Arc::new(InMemoryChain::new());
//! let mut gateway = FilterGatewayService::new(FilterServiceConfig::default(), chain.clone(), chain)?;
//! gateway.start().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod middleware;
pub mod ports;
pub mod router;
pub mod rpc;
pub mod server;
pub mod service;
pub mod telemetry;

// Re-exports for public API
pub use adapters::InMemoryChain;
pub use domain::config::FilterServiceConfig;
pub use domain::error::{ApiError, ApiResult, FilterError, FilterResult, GatewayError, SourceError};
pub use domain::types::*;
pub use middleware::RpcMetrics;
pub use ports::{EthFilterApi, HeightResolver, LogSource, ManualTimeSource, SystemTimeSource, TimeSource};
pub use server::FilterGatewayService;
pub use service::{FilterRegistry, FilterStatsSnapshot, LogFilterService, LogMatcher};
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
