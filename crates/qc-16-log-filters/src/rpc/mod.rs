//! RPC method handlers for JSON-RPC API.

pub mod filter;

pub use filter::FilterRpc;

use crate::ports::EthFilterApi;
use std::sync::Arc;

/// All RPC handlers
pub struct RpcHandlers {
    pub filter: FilterRpc,
}

impl RpcHandlers {
    /// Create all RPC handlers over the filter API
    pub fn new(api: Arc<dyn EthFilterApi>) -> Self {
        Self {
            filter: FilterRpc::new(api),
        }
    }
}
