//! Filter JSON-RPC methods: `eth_newFilter`, `eth_getFilterChanges`,
//! `eth_getFilterLogs`, `eth_getLogs`, `eth_uninstallFilter`.

use crate::domain::error::ApiResult;
use crate::domain::types::{Filter, FilterId, LogRecord};
use crate::ports::EthFilterApi;
use std::sync::Arc;
use tracing::instrument;

/// Filter RPC methods handler
pub struct FilterRpc {
    api: Arc<dyn EthFilterApi>,
}

impl FilterRpc {
    pub fn new(api: Arc<dyn EthFilterApi>) -> Self {
        Self { api }
    }

    /// eth_newFilter - Installs a log filter, returns its id
    #[instrument(skip(self, filter))]
    pub async fn new_filter(&self, filter: Filter) -> ApiResult<FilterId> {
        Ok(self.api.new_filter(filter).await?)
    }

    /// eth_getFilterChanges - Logs matched since the last poll
    #[instrument(skip(self))]
    pub async fn get_filter_changes(&self, id: FilterId) -> ApiResult<Vec<LogRecord>> {
        Ok(self.api.get_filter_changes(id).await?)
    }

    /// eth_getFilterLogs - All logs matching an installed filter
    #[instrument(skip(self))]
    pub async fn get_filter_logs(&self, id: FilterId) -> ApiResult<Vec<LogRecord>> {
        Ok(self.api.get_filter_logs(id).await?)
    }

    /// eth_getLogs - Returns logs matching filter
    #[instrument(skip(self, filter))]
    pub async fn get_logs(&self, filter: Filter) -> ApiResult<Vec<LogRecord>> {
        Ok(self.api.get_logs(filter).await?)
    }

    /// eth_uninstallFilter - `false` for an unknown id, never an error
    #[instrument(skip(self))]
    pub async fn uninstall_filter(&self, id: FilterId) -> ApiResult<bool> {
        Ok(self.api.uninstall_filter(id).await)
    }
}
