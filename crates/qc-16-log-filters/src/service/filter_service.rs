//! `EthFilterApi` implementation over the registry and the log matcher.

use crate::domain::config::{FilterServiceConfig, LimitsConfig};
use crate::domain::descriptor::FilterCriteria;
use crate::domain::error::{FilterError, FilterResult};
use crate::domain::types::{BlockNumber, BlockRef, Filter, FilterId, LogRecord};
use crate::ports::{EthFilterApi, HeightResolver, LogSource, TimeSource};
use crate::service::matcher::LogMatcher;
use crate::service::registry::FilterRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Log filter service.
///
/// Holds the registry behind an `Arc` so the server can run the expiration
/// sweep against the same instance.
pub struct LogFilterService {
    registry: Arc<FilterRegistry>,
    matcher: LogMatcher,
    limits: LimitsConfig,
}

impl LogFilterService {
    pub fn new(
        config: &FilterServiceConfig,
        resolver: Arc<dyn HeightResolver>,
        source: Arc<dyn LogSource>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            registry: Arc::new(FilterRegistry::new(&config.filters, clock)),
            matcher: LogMatcher::new(resolver, source, config.timeouts.clone()),
            limits: config.limits.clone(),
        }
    }

    pub fn registry(&self) -> &Arc<FilterRegistry> {
        &self.registry
    }

    /// Initial poll cursor for a new filter.
    ///
    /// Concrete bounds are used as given. A symbolic bound is pinned to the
    /// height it resolves to now; on a chain with no blocks yet it is 0.
    async fn initial_cursor(&self, from: BlockRef) -> FilterResult<BlockNumber> {
        if let Some(height) = from.concrete() {
            return Ok(height);
        }
        match self.matcher.resolve_bound(from).await {
            Ok(height) => Ok(height),
            Err(FilterError::HeightUnavailable { .. }) => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn check_span(&self, from: BlockNumber, to: BlockNumber) -> FilterResult<()> {
        let span = to.saturating_sub(from).saturating_add(1);
        if span > self.limits.max_block_range {
            return Err(FilterError::LimitExceeded(format!(
                "block range {} exceeds maximum of {}",
                span, self.limits.max_block_range
            )));
        }
        Ok(())
    }

    fn check_results(&self, logs: &[LogRecord]) -> FilterResult<()> {
        if logs.len() > self.limits.max_log_results {
            return Err(FilterError::LimitExceeded(format!(
                "query returned more than {} logs",
                self.limits.max_log_results
            )));
        }
        Ok(())
    }

    /// Resolve the full range of `criteria`, fetch and match, within limits.
    async fn query_range(&self, criteria: &FilterCriteria) -> FilterResult<Vec<LogRecord>> {
        let (from, to) = self
            .matcher
            .resolve_range(criteria.from_block, criteria.to_block)
            .await?;
        self.check_span(from, to)?;
        let logs = self.matcher.fetch_matching(criteria, from, to).await?;
        self.check_results(&logs)?;
        Ok(logs)
    }
}

#[async_trait]
impl EthFilterApi for LogFilterService {
    #[instrument(skip(self, filter))]
    async fn new_filter(&self, filter: Filter) -> FilterResult<FilterId> {
        if filter.block_hash.is_some() {
            return Err(FilterError::InvalidArgument(
                "blockHash is not supported for installed filters".to_string(),
            ));
        }

        let criteria = FilterCriteria::from_request(&filter)?;
        criteria.validate_static_range()?;

        let cursor = self.initial_cursor(criteria.from_block).await?;
        self.registry.install(criteria, cursor)
    }

    #[instrument(skip_all, fields(filter_id = %id))]
    async fn get_filter_changes(&self, id: FilterId) -> FilterResult<Vec<LogRecord>> {
        let mut filter = self.registry.acquire(id).await?;
        let cursor = filter.cursor();

        // Unproduced blocks are delivered by a later poll
        let head = match self.matcher.head().await {
            Ok(head) => Some(head),
            Err(FilterError::HeightUnavailable { .. }) => None,
            Err(e) => return Err(e),
        };
        let to = match head {
            Some(head) => match filter.descriptor().criteria.to_block.concrete() {
                Some(to) => Some(to.min(head)),
                None => Some(
                    self.matcher
                        .resolve_bound(filter.descriptor().criteria.to_block)
                        .await?
                        .min(head),
                ),
            },
            None => None,
        };

        let to = match to {
            Some(to) if to >= cursor => to,
            _ => {
                filter.touch();
                self.registry.stats().record_poll(0);
                debug!(cursor = cursor, head = ?head, "No new blocks");
                return Ok(Vec::new());
            }
        };

        let to = to.min(
            cursor.saturating_add(self.limits.max_block_range.saturating_sub(1)),
        );
        let logs = self
            .matcher
            .fetch_matching(&filter.descriptor().criteria, cursor, to)
            .await?;

        filter.advance_cursor(to);
        filter.touch();
        self.registry.stats().record_poll(logs.len());
        debug!(from = cursor, to = to, matched = logs.len(), "Delivered filter changes");
        Ok(logs)
    }

    #[instrument(skip_all, fields(filter_id = %id))]
    async fn get_filter_logs(&self, id: FilterId) -> FilterResult<Vec<LogRecord>> {
        let mut filter = self.registry.acquire(id).await?;
        let logs = self.query_range(&filter.descriptor().criteria).await?;
        filter.touch();
        Ok(logs)
    }

    #[instrument(skip(self, filter))]
    async fn get_logs(&self, filter: Filter) -> FilterResult<Vec<LogRecord>> {
        let criteria = FilterCriteria::from_request(&filter)?;

        if let Some(block_hash) = filter.block_hash {
            if filter.from_block.is_some() || filter.to_block.is_some() {
                return Err(FilterError::InvalidArgument(
                    "blockHash cannot be combined with fromBlock/toBlock".to_string(),
                ));
            }
            let logs = self
                .matcher
                .fetch_block_matching(&criteria, block_hash)
                .await?;
            self.check_results(&logs)?;
            return Ok(logs);
        }

        criteria.validate_static_range()?;
        self.query_range(&criteria).await
    }

    #[instrument(skip_all, fields(filter_id = %id))]
    async fn uninstall_filter(&self, id: FilterId) -> bool {
        self.registry.uninstall(id).await
    }
}
