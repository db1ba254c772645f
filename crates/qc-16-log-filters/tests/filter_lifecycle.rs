//! # Filter Lifecycle Tests for Log Filters (qc-16)
//!
//! Drives `LogFilterService` through the `EthFilterApi` port against an
//! in-memory chain.
//!
//! ## Test Categories
//!
//! 1. **Identifiers** - Concurrent creation, uniqueness, ordering
//! 2. **Delivery** - Incremental polls, full fetches, topic isolation
//! 3. **Retry Safety** - Failing and slow log sources leave cursors intact
//! 4. **Concurrency** - Parallel polls of one filter never double-deliver
//! 5. **Expiration** - Idle TTL, sweep, uninstall

use async_trait::async_trait;
use qc_16_log_filters::domain::config::FilterServiceConfig;
use qc_16_log_filters::{
    Address, BlockNumber, BlockRef, EthFilterApi, Filter, FilterAddress, FilterError, FilterId,
    FilterTopic, Hash, HeightResolver, InMemoryChain, LogFilterService, LogMatcher, LogRecord,
    LogSource, ManualTimeSource, SourceError,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

// =============================================================================
// TEST HELPERS
// =============================================================================

fn topic(b: u8) -> Hash {
    Hash::repeat_byte(b)
}

fn emitter(b: u8) -> Address {
    Address::repeat_byte(b)
}

fn make_service(chain: Arc<InMemoryChain>) -> Arc<LogFilterService> {
    make_service_with(chain, FilterServiceConfig::default()).0
}

fn make_service_with(
    chain: Arc<InMemoryChain>,
    config: FilterServiceConfig,
) -> (Arc<LogFilterService>, Arc<ManualTimeSource>) {
    let clock = Arc::new(ManualTimeSource::new(1_700_000_000_000));
    let service = LogFilterService::new(&config, chain.clone(), chain, clock.clone());
    (Arc::new(service), clock)
}

fn range(from: BlockRef, to: BlockRef) -> Filter {
    Filter {
        from_block: Some(from),
        to_block: Some(to),
        ..Default::default()
    }
}

fn positions(logs: &[LogRecord]) -> Vec<(BlockNumber, u64)> {
    logs.iter().map(|l| (l.block_number, l.log_index)).collect()
}

/// Chain with one log per block `0..blocks`, each emitted by `emitter(1)`.
fn chain_with_logs(blocks: u64) -> Arc<InMemoryChain> {
    let chain = Arc::new(InMemoryChain::new());
    for _ in 0..blocks {
        chain.push_block(vec![(emitter(1), vec![topic(0xaa)])]);
    }
    chain
}

/// Log source that fails while `failing` is set.
struct FlakyLogSource {
    chain: Arc<InMemoryChain>,
    failing: AtomicBool,
}

#[async_trait]
impl LogSource for FlakyLogSource {
    async fn logs_in_range(
        &self,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<LogRecord>, SourceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Connection("log index unreachable".into()));
        }
        self.chain.logs_in_range(from, to).await
    }

    async fn logs_for_block_hash(
        &self,
        block_hash: Hash,
    ) -> Result<Option<Vec<LogRecord>>, SourceError> {
        self.chain.logs_for_block_hash(block_hash).await
    }
}

/// Log source that never answers in time.
struct StalledLogSource;

#[async_trait]
impl LogSource for StalledLogSource {
    async fn logs_in_range(
        &self,
        _from: BlockNumber,
        _to: BlockNumber,
    ) -> Result<Vec<LogRecord>, SourceError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }

    async fn logs_for_block_hash(
        &self,
        _block_hash: Hash,
    ) -> Result<Option<Vec<LogRecord>>, SourceError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }
}

/// Height resolver whose backend is down.
struct DownResolver;

#[async_trait]
impl HeightResolver for DownResolver {
    async fn resolve(&self, _block: BlockRef) -> Result<Option<BlockNumber>, SourceError> {
        Err(SourceError::Timeout)
    }
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

#[tokio::test]
async fn test_concurrent_creates_get_distinct_increasing_ids() {
    let service = make_service(Arc::new(InMemoryChain::with_height(3)));

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.new_filter(Filter::default()).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }
    ids.sort();

    let unique: HashSet<FilterId> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 50);
    assert_eq!(ids.first(), Some(&FilterId(1)));
    assert_eq!(ids.last(), Some(&FilterId(50)));
}

#[tokio::test]
async fn test_ids_not_reused_after_uninstall() {
    let service = make_service(Arc::new(InMemoryChain::with_height(0)));
    let first = service.new_filter(Filter::default()).await.unwrap();
    assert!(service.uninstall_filter(first).await);
    let second = service.new_filter(Filter::default()).await.unwrap();
    assert!(second > first);
}

// =============================================================================
// DELIVERY
// =============================================================================

#[tokio::test]
async fn test_end_to_end_logs_then_changes() {
    // Height 5 with a single log at height 3
    let chain = Arc::new(InMemoryChain::new());
    for height in 0..=5 {
        if height == 3 {
            chain.push_block(vec![(emitter(7), vec![topic(0x01)])]);
        } else {
            chain.push_block(Vec::new());
        }
    }
    let service = make_service(chain);

    let filter = Filter {
        topics: Some(vec![Some(FilterTopic::Multiple(vec![]))]),
        ..range(BlockRef::Number(0), BlockRef::Latest)
    };
    let id = service.new_filter(filter).await.unwrap();

    let all = service.get_filter_logs(id).await.unwrap();
    assert_eq!(positions(&all), vec![(3, 0)]);

    // get_filter_logs must not have moved the cursor
    let changes = service.get_filter_changes(id).await.unwrap();
    assert_eq!(positions(&changes), vec![(3, 0)]);

    let again = service.get_filter_changes(id).await.unwrap();
    assert!(again.is_empty());

    // Full fetch is repeatable
    assert_eq!(service.get_filter_logs(id).await.unwrap(), all);
}

#[tokio::test]
async fn test_second_poll_without_progress_is_empty() {
    let chain = chain_with_logs(4);
    let service = make_service(chain.clone());
    let id = service
        .new_filter(range(BlockRef::Earliest, BlockRef::Latest))
        .await
        .unwrap();

    let first = service.get_filter_changes(id).await.unwrap();
    assert_eq!(first.len(), 4);
    assert!(service.get_filter_changes(id).await.unwrap().is_empty());

    chain.push_block(vec![(emitter(1), vec![])]);
    let next = service.get_filter_changes(id).await.unwrap();
    assert_eq!(positions(&next), vec![(4, 0)]);
}

#[tokio::test]
async fn test_disjoint_topics_isolated() {
    let chain = Arc::new(InMemoryChain::with_height(1));
    let service = make_service(chain.clone());

    let by_topic = |t: u8| Filter {
        topics: Some(vec![Some(FilterTopic::Single(topic(t)))]),
        ..Default::default()
    };
    let a = service.new_filter(by_topic(0x0a)).await.unwrap();
    let b = service.new_filter(by_topic(0x0b)).await.unwrap();

    chain.push_block(vec![
        (emitter(1), vec![topic(0x0a)]),
        (emitter(1), vec![topic(0x0b)]),
        (emitter(1), vec![topic(0x0c)]),
    ]);

    let logs_a = service.get_filter_changes(a).await.unwrap();
    let logs_b = service.get_filter_changes(b).await.unwrap();
    assert_eq!(positions(&logs_a), vec![(2, 0)]);
    assert_eq!(positions(&logs_b), vec![(2, 1)]);
}

#[tokio::test]
async fn test_address_and_topic_combined() {
    let chain = Arc::new(InMemoryChain::new());
    chain.push_block(vec![
        (emitter(1), vec![topic(0x0a), topic(0x0b)]),
        (emitter(2), vec![topic(0x0a), topic(0x0b)]),
        (emitter(1), vec![topic(0x0b), topic(0x0a)]),
    ]);
    let service = make_service(chain);

    let filter = Filter {
        address: Some(FilterAddress::Multiple(vec![emitter(1), emitter(3)])),
        topics: Some(vec![None, Some(FilterTopic::Single(topic(0x0b)))]),
        ..range(BlockRef::Earliest, BlockRef::Latest)
    };
    let logs = service.get_logs(filter).await.unwrap();
    assert_eq!(positions(&logs), vec![(0, 0)]);
}

#[tokio::test]
async fn test_pending_treated_as_latest() {
    let chain = chain_with_logs(3);
    let service = make_service(chain);

    let pending = service
        .get_logs(range(BlockRef::Pending, BlockRef::Pending))
        .await
        .unwrap();
    let latest = service
        .get_logs(range(BlockRef::Latest, BlockRef::Latest))
        .await
        .unwrap();
    assert_eq!(pending, latest);
    assert_eq!(positions(&latest), vec![(2, 0)]);
}

// =============================================================================
// RANGE ERRORS
// =============================================================================

#[tokio::test]
async fn test_inverted_range_rejected() {
    let chain = Arc::new(InMemoryChain::with_height(20));
    let service = make_service(chain.clone());

    assert_eq!(
        service
            .get_logs(range(BlockRef::Number(10), BlockRef::Earliest))
            .await,
        Err(FilterError::InvalidRange { from: 10, to: 0 })
    );

    let matcher = LogMatcher::new(chain.clone(), chain, Default::default());
    assert_eq!(
        matcher
            .resolve_range(BlockRef::Number(10), BlockRef::Earliest)
            .await,
        Err(FilterError::InvalidRange { from: 10, to: 0 })
    );
}

#[tokio::test]
async fn test_symbolic_inversion_detected_at_query_time() {
    let chain = Arc::new(InMemoryChain::with_height(5));
    let service = make_service(chain);

    // Accepted at creation: `latest` is not resolved yet
    let id = service
        .new_filter(range(BlockRef::Number(5), BlockRef::Latest))
        .await
        .unwrap();
    assert_ok!(service.get_filter_logs(id).await);

    assert_eq!(
        service
            .get_logs(range(BlockRef::Latest, BlockRef::Number(2)))
            .await,
        Err(FilterError::InvalidRange { from: 5, to: 2 })
    );
}

#[tokio::test]
async fn test_future_block_is_height_unavailable() {
    let service = make_service(Arc::new(InMemoryChain::with_height(5)));
    let result = service
        .get_logs(range(BlockRef::Number(3), BlockRef::Number(9)))
        .await;
    assert_eq!(
        result,
        Err(FilterError::HeightUnavailable {
            block: BlockRef::Number(9)
        })
    );
}

// =============================================================================
// RETRY SAFETY
// =============================================================================

#[tokio::test]
async fn test_unavailable_source_does_not_advance_cursor() {
    let chain = chain_with_logs(3);
    let source = Arc::new(FlakyLogSource {
        chain: chain.clone(),
        failing: AtomicBool::new(false),
    });
    let clock = Arc::new(ManualTimeSource::new(0));
    let service = LogFilterService::new(
        &FilterServiceConfig::default(),
        chain.clone(),
        source.clone(),
        clock,
    );

    let id = service
        .new_filter(range(BlockRef::Earliest, BlockRef::Latest))
        .await
        .unwrap();

    source.failing.store(true, Ordering::SeqCst);
    let err = assert_err!(service.get_filter_changes(id).await);
    assert!(matches!(err, FilterError::Unavailable(_)));
    assert!(err.is_retryable());

    source.failing.store(false, Ordering::SeqCst);
    let logs = service.get_filter_changes(id).await.unwrap();
    assert_eq!(positions(&logs), vec![(0, 0), (1, 0), (2, 0)]);
}

#[tokio::test]
async fn test_stalled_source_times_out_as_unavailable() {
    let chain = chain_with_logs(2);
    let mut config = FilterServiceConfig::default();
    config.timeouts.log_query = Duration::from_millis(50);
    let service = LogFilterService::new(
        &config,
        chain,
        Arc::new(StalledLogSource),
        Arc::new(ManualTimeSource::new(0)),
    );

    let id = service
        .new_filter(range(BlockRef::Earliest, BlockRef::Latest))
        .await
        .unwrap();
    let result = service.get_filter_changes(id).await;
    assert!(matches!(result, Err(FilterError::Unavailable(_))));
}

#[tokio::test]
async fn test_resolver_outage_is_unavailable() {
    let chain = Arc::new(InMemoryChain::with_height(1));
    let service = LogFilterService::new(
        &FilterServiceConfig::default(),
        Arc::new(DownResolver),
        chain,
        Arc::new(ManualTimeSource::new(0)),
    );

    let result = service.new_filter(Filter::default()).await;
    assert!(matches!(result, Err(FilterError::Unavailable(_))));

    // Concrete bounds need no resolution at creation
    let id = service
        .new_filter(range(BlockRef::Number(0), BlockRef::Number(1)))
        .await
        .unwrap();
    assert!(matches!(
        service.get_filter_changes(id).await,
        Err(FilterError::Unavailable(_))
    ));
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_polls_never_double_deliver() {
    let chain = chain_with_logs(20);
    let mut config = FilterServiceConfig::default();
    config.limits.max_block_range = 3;
    let (service, _) = make_service_with(chain, config);

    let id = service
        .new_filter(range(BlockRef::Earliest, BlockRef::Latest))
        .await
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                let mut seen = Vec::new();
                for _ in 0..4 {
                    seen.extend(service.get_filter_changes(id).await.unwrap());
                }
                seen
            })
        })
        .collect();

    let mut delivered = Vec::new();
    for handle in handles {
        delivered.extend(handle.await.unwrap());
    }

    let unique: HashSet<_> = positions(&delivered).into_iter().collect();
    assert_eq!(unique.len(), delivered.len(), "a log was delivered twice");
    assert_eq!(delivered.len(), 20, "a log was skipped");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_polls_on_different_filters_do_not_block_each_other() {
    let chain = chain_with_logs(5);
    let mut config = FilterServiceConfig::default();
    config.timeouts.log_query = Duration::from_secs(5);
    let source = Arc::new(FlakyLogSource {
        chain: chain.clone(),
        failing: AtomicBool::new(false),
    });
    let service = Arc::new(LogFilterService::new(
        &config,
        chain,
        source,
        Arc::new(ManualTimeSource::new(0)),
    ));

    let a = service
        .new_filter(range(BlockRef::Earliest, BlockRef::Latest))
        .await
        .unwrap();
    let b = service
        .new_filter(range(BlockRef::Earliest, BlockRef::Latest))
        .await
        .unwrap();

    // Hold filter `a` locked while `b` is polled
    let guard = service.registry().acquire(a).await.unwrap();
    let polled = tokio::time::timeout(Duration::from_secs(1), service.get_filter_changes(b)).await;
    assert_eq!(polled.unwrap().unwrap().len(), 5);
    drop(guard);
}

// =============================================================================
// EXPIRATION AND UNINSTALL
// =============================================================================

#[tokio::test]
async fn test_idle_filter_expires() {
    let mut config = FilterServiceConfig::default();
    config.filters.ttl = Duration::from_secs(300);
    let (service, clock) = make_service_with(Arc::new(InMemoryChain::with_height(2)), config);

    let kept = service.new_filter(Filter::default()).await.unwrap();
    let idle = service.new_filter(Filter::default()).await.unwrap();

    clock.advance(200_000);
    assert_ok!(service.get_filter_changes(kept).await);
    clock.advance(200_000);

    assert_eq!(service.registry().sweep_expired(), 1);
    assert_eq!(
        service.get_filter_changes(idle).await,
        Err(FilterError::NotFound(idle))
    );
    assert_ok!(service.get_filter_changes(kept).await);
    assert!(!service.uninstall_filter(idle).await);

    let stats = service.registry().stats_snapshot();
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.active, 1);
}

#[tokio::test]
async fn test_expired_filter_rejected_before_sweep() {
    let (service, clock) = make_service_with(
        Arc::new(InMemoryChain::with_height(0)),
        FilterServiceConfig::default(),
    );
    let id = service.new_filter(Filter::default()).await.unwrap();

    clock.advance(Duration::from_secs(301).as_millis() as u64);
    assert_eq!(
        service.get_filter_logs(id).await,
        Err(FilterError::NotFound(id))
    );
}

#[tokio::test]
async fn test_uninstall_then_uninstall_again() {
    let service = make_service(Arc::new(InMemoryChain::with_height(0)));
    let id = service.new_filter(Filter::default()).await.unwrap();

    assert!(service.uninstall_filter(id).await);
    assert!(!service.uninstall_filter(id).await);
    assert_eq!(
        service.get_filter_changes(id).await,
        Err(FilterError::NotFound(id))
    );
    assert!(!service.uninstall_filter(FilterId(9_999)).await);
}

#[tokio::test]
async fn test_filter_quota() {
    let mut config = FilterServiceConfig::default();
    config.filters.max_filters = 2;
    let (service, _) = make_service_with(Arc::new(InMemoryChain::with_height(0)), config);

    let first = service.new_filter(Filter::default()).await.unwrap();
    service.new_filter(Filter::default()).await.unwrap();
    assert!(matches!(
        service.new_filter(Filter::default()).await,
        Err(FilterError::LimitExceeded(_))
    ));

    assert!(service.uninstall_filter(first).await);
    assert_ok!(service.new_filter(Filter::default()).await);
}
