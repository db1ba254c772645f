//! Application services.
//!
//! `LogFilterService` drives the filter lifecycle; `FilterRegistry` owns the
//! installed filters and `LogMatcher` talks to the chain.

pub mod filter_service;
pub mod matcher;
pub mod registry;

pub use filter_service::LogFilterService;
pub use matcher::LogMatcher;
pub use registry::{cleanup_task, FilterGuard, FilterRegistry, FilterStats, FilterStatsSnapshot};
