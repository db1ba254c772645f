//! JSON-RPC method dispatch.
//!
//! Maps method names to `FilterRpc` calls and decodes positional params.

use crate::domain::error::ApiError;
use crate::domain::types::{Filter, FilterId};
use crate::middleware::RpcMetrics;
use crate::rpc::RpcHandlers;
use crate::service::FilterRegistry;
use serde::Serialize;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub rpc_handlers: Arc<RpcHandlers>,
    pub metrics: Arc<RpcMetrics>,
    pub registry: Arc<FilterRegistry>,
}

/// Route JSON-RPC method to appropriate handler.
pub async fn route_method(
    state: &AppState,
    method: &str,
    params: Option<&serde_json::Value>,
) -> Result<serde_json::Value, ApiError> {
    let filters = &state.rpc_handlers.filter;

    match method {
        "eth_newFilter" => {
            let filter: Filter = parse_param(params, 0)?;
            to_json(filters.new_filter(filter).await?)
        }
        "eth_getFilterChanges" => {
            let id: FilterId = parse_param(params, 0)?;
            to_json(filters.get_filter_changes(id).await?)
        }
        "eth_getFilterLogs" => {
            let id: FilterId = parse_param(params, 0)?;
            to_json(filters.get_filter_logs(id).await?)
        }
        "eth_getLogs" => {
            // Only an absent filter object defaults; a malformed one is rejected
            let filter: Filter = match param_at(params, 0) {
                Some(_) => parse_param(params, 0)?,
                None => Filter::default(),
            };
            to_json(filters.get_logs(filter).await?)
        }
        "eth_uninstallFilter" => {
            let id: FilterId = parse_param(params, 0)?;
            to_json(filters.uninstall_filter(id).await?)
        }
        _ => Err(ApiError::method_not_found(method)),
    }
}

fn to_json<T: Serialize>(value: T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::internal(e.to_string()))
}

/// Parse a required parameter from JSON-RPC params array.
fn parse_param<T: serde::de::DeserializeOwned>(
    params: Option<&serde_json::Value>,
    index: usize,
) -> Result<T, ApiError> {
    let param = param_at(params, index).ok_or_else(|| {
        ApiError::invalid_params(format!("Missing parameter at index {}", index))
    })?;

    serde_json::from_value(param.clone()).map_err(|e| {
        ApiError::invalid_params(format!("Invalid parameter at index {}: {}", index, e))
    })
}

fn param_at(params: Option<&serde_json::Value>, index: usize) -> Option<&serde_json::Value> {
    params.and_then(|p| {
        if p.is_array() {
            p.get(index)
        } else if index == 0 {
            Some(p)
        } else {
            None
        }
    })
}
