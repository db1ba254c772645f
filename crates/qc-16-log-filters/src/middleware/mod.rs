//! HTTP middleware for the JSON-RPC endpoint.
//!
//! Layer order: Request → Trace → BodyLimit → Handler. Tracing and body
//! limits come from `tower-http`; request metrics are recorded by the
//! handler.

pub mod metrics;

pub use metrics::{RequestTimer, RpcMetrics};
