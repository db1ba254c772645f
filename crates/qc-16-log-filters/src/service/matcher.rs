//! Log matcher: block range resolution and log retrieval.
//!
//! Wraps the outbound ports with per-call timeouts and applies the pure
//! matching rules from `domain::matching` to whatever the log source returns.

use crate::domain::config::TimeoutConfig;
use crate::domain::descriptor::FilterCriteria;
use crate::domain::error::{FilterError, FilterResult};
use crate::domain::matching::{check_range, filter_logs};
use crate::domain::types::{BlockNumber, BlockRef, Hash, LogRecord};
use crate::ports::{HeightResolver, LogSource};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves block references and fetches matching logs.
pub struct LogMatcher {
    resolver: Arc<dyn HeightResolver>,
    source: Arc<dyn LogSource>,
    timeouts: TimeoutConfig,
}

impl LogMatcher {
    pub fn new(
        resolver: Arc<dyn HeightResolver>,
        source: Arc<dyn LogSource>,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            resolver,
            source,
            timeouts,
        }
    }

    /// Current head of the chain.
    pub async fn head(&self) -> FilterResult<BlockNumber> {
        self.resolve_bound(BlockRef::Latest).await
    }

    /// Map one block reference to a concrete height at call time.
    ///
    /// `earliest` is 0 and `pending` is the current head: logs of a block
    /// that has not been produced cannot be delivered, and treating the next
    /// height as deliverable would move poll cursors past it.
    pub async fn resolve_bound(&self, block: BlockRef) -> FilterResult<BlockNumber> {
        let query = match block {
            BlockRef::Earliest => return Ok(0),
            BlockRef::Pending => BlockRef::Latest,
            other => other,
        };

        match self.resolve_with_timeout(query).await? {
            Some(height) => Ok(height),
            None => Err(FilterError::HeightUnavailable { block }),
        }
    }

    /// Resolve both bounds and require `from <= to`.
    pub async fn resolve_range(
        &self,
        from: BlockRef,
        to: BlockRef,
    ) -> FilterResult<(BlockNumber, BlockNumber)> {
        let from = self.resolve_bound(from).await?;
        let to = self.resolve_bound(to).await?;
        check_range(from, to)
    }

    /// Fetch logs for `from..=to` and keep those matching `criteria`.
    pub async fn fetch_matching(
        &self,
        criteria: &FilterCriteria,
        from: BlockNumber,
        to: BlockNumber,
    ) -> FilterResult<Vec<LogRecord>> {
        let logs = match tokio::time::timeout(
            self.timeouts.log_query,
            self.source.logs_in_range(from, to),
        )
        .await
        {
            Ok(Ok(logs)) => logs,
            Ok(Err(e)) => {
                warn!(from = from, to = to, error = %e, "Log source query failed");
                return Err(e.into());
            }
            Err(_) => {
                warn!(
                    from = from,
                    to = to,
                    timeout_ms = self.timeouts.log_query.as_millis() as u64,
                    "Log source query timed out"
                );
                return Err(FilterError::Unavailable(format!(
                    "log query for blocks {}..={} timed out",
                    from, to
                )));
            }
        };

        let fetched = logs.len();
        let matched = filter_logs(logs, criteria);
        debug!(from = from, to = to, fetched = fetched, matched = matched.len(), "Matched logs");
        Ok(matched)
    }

    /// Fetch the logs of a single block by hash and keep those matching.
    pub async fn fetch_block_matching(
        &self,
        criteria: &FilterCriteria,
        block_hash: Hash,
    ) -> FilterResult<Vec<LogRecord>> {
        let logs = match tokio::time::timeout(
            self.timeouts.log_query,
            self.source.logs_for_block_hash(block_hash),
        )
        .await
        {
            Ok(Ok(Some(logs))) => logs,
            Ok(Ok(None)) => return Err(FilterError::UnknownBlock(block_hash)),
            Ok(Err(e)) => {
                warn!(block_hash = ?block_hash, error = %e, "Log source query failed");
                return Err(e.into());
            }
            Err(_) => {
                return Err(FilterError::Unavailable(format!(
                    "log query for block {:?} timed out",
                    block_hash
                )))
            }
        };

        Ok(filter_logs(logs, criteria))
    }

    async fn resolve_with_timeout(&self, block: BlockRef) -> FilterResult<Option<BlockNumber>> {
        match tokio::time::timeout(self.timeouts.height_query, self.resolver.resolve(block)).await
        {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(block = %block, "Height resolution timed out");
                Err(FilterError::Unavailable(format!(
                    "height resolution for {} timed out",
                    block
                )))
            }
        }
    }
}
