//! Filter registry: id allocation, per-filter locking and expiration.
//!
//! Two lock levels:
//! - the map lock (`parking_lot::RwLock`) guards insertion and removal only
//!   and is never held across an `.await`;
//! - each filter has its own async mutex so that one slow poll never blocks
//!   polls of other filters, while two polls of the same filter serialize.
//!
//! A filter that is removed (uninstalled or expired) is flagged under its own
//! lock before leaving the map, so a caller already waiting on that lock sees
//! the flag and reports `NotFound` instead of resurrecting it.

use crate::domain::config::FilterConfig;
use crate::domain::descriptor::{FilterCriteria, FilterDescriptor};
use crate::domain::error::{FilterError, FilterResult};
use crate::domain::types::{BlockNumber, FilterId};
use crate::ports::TimeSource;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

struct FilterState {
    descriptor: FilterDescriptor,
    /// Last access, in `TimeSource` milliseconds
    last_touched: u64,
    removed: bool,
}

impl FilterState {
    fn is_expired(&self, now: u64, ttl_ms: u64) -> bool {
        now.saturating_sub(self.last_touched) >= ttl_ms
    }
}

/// Exclusive access to one live filter.
///
/// Holding the guard blocks other operations on the same filter only.
pub struct FilterGuard {
    inner: OwnedMutexGuard<FilterState>,
    clock: Arc<dyn TimeSource>,
}

impl FilterGuard {
    pub fn descriptor(&self) -> &FilterDescriptor {
        &self.inner.descriptor
    }

    pub fn id(&self) -> FilterId {
        self.inner.descriptor.id
    }

    pub fn cursor(&self) -> BlockNumber {
        self.inner.descriptor.cursor
    }

    /// Record that everything up to `delivered_to` has been returned.
    pub fn advance_cursor(&mut self, delivered_to: BlockNumber) {
        self.inner.descriptor.advance_cursor(delivered_to);
    }

    /// Restart the expiration clock after a successful access.
    pub fn touch(&mut self) {
        self.inner.last_touched = self.clock.now_millis();
    }
}

/// Registry counters
#[derive(Debug, Default)]
pub struct FilterStats {
    pub created: AtomicU64,
    pub uninstalled: AtomicU64,
    pub expired: AtomicU64,
    pub polls: AtomicU64,
    pub logs_delivered: AtomicU64,
}

impl FilterStats {
    /// Record a completed `eth_getFilterChanges`
    pub fn record_poll(&self, delivered: usize) {
        self.polls.fetch_add(1, Ordering::Relaxed);
        self.logs_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self, active: usize) -> FilterStatsSnapshot {
        FilterStatsSnapshot {
            active,
            created: self.created.load(Ordering::Relaxed),
            uninstalled: self.uninstalled.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            polls: self.polls.load(Ordering::Relaxed),
            logs_delivered: self.logs_delivered.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`FilterStats`], as reported on `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterStatsSnapshot {
    pub active: usize,
    pub created: u64,
    pub uninstalled: u64,
    pub expired: u64,
    pub polls: u64,
    pub logs_delivered: u64,
}

/// Store of installed filters.
pub struct FilterRegistry {
    filters: RwLock<HashMap<FilterId, Arc<Mutex<FilterState>>>>,
    /// Next id to hand out; ids start at 1 and are never reused
    next_id: AtomicU64,
    ttl_ms: u64,
    max_filters: usize,
    clock: Arc<dyn TimeSource>,
    stats: FilterStats,
}

impl FilterRegistry {
    pub fn new(config: &FilterConfig, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            filters: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            ttl_ms: config.ttl.as_millis() as u64,
            max_filters: config.max_filters,
            clock,
            stats: FilterStats::default(),
        }
    }

    /// Store a new filter whose poll cursor starts at `cursor`.
    ///
    /// At the quota, idle filters past their TTL are swept first so that
    /// only live filters count against it.
    pub fn install(&self, criteria: FilterCriteria, cursor: BlockNumber) -> FilterResult<FilterId> {
        if self.len() >= self.max_filters {
            let swept = self.sweep_expired();
            debug!(swept = swept, "Swept expired filters at quota");
        }

        let now = self.clock.now_millis();
        let mut filters = self.filters.write();

        if filters.len() >= self.max_filters {
            warn!(max_filters = self.max_filters, "Filter quota reached");
            return Err(FilterError::LimitExceeded(format!(
                "at most {} filters may be installed",
                self.max_filters
            )));
        }

        let id = FilterId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let state = FilterState {
            descriptor: FilterDescriptor::new(id, criteria, cursor),
            last_touched: now,
            removed: false,
        };
        filters.insert(id, Arc::new(Mutex::new(state)));
        self.stats.created.fetch_add(1, Ordering::Relaxed);

        debug!(filter_id = %id, cursor = cursor, "Installed filter");
        Ok(id)
    }

    /// Lock a live filter.
    ///
    /// Waits while another operation holds the same filter. Returns
    /// `NotFound` for unknown, uninstalled and expired filters. The caller
    /// refreshes expiration with [`FilterGuard::touch`] once its access
    /// succeeded.
    pub async fn acquire(&self, id: FilterId) -> FilterResult<FilterGuard> {
        let entry = self
            .filters
            .read()
            .get(&id)
            .cloned()
            .ok_or(FilterError::NotFound(id))?;

        let mut guard = entry.lock_owned().await;
        if guard.removed {
            return Err(FilterError::NotFound(id));
        }

        if guard.is_expired(self.clock.now_millis(), self.ttl_ms) {
            self.expire_locked(&mut guard);
            return Err(FilterError::NotFound(id));
        }

        Ok(FilterGuard {
            inner: guard,
            clock: self.clock.clone(),
        })
    }

    /// Remove a filter. `false` if it was unknown, already removed or expired.
    pub async fn uninstall(&self, id: FilterId) -> bool {
        let entry = match self.filters.read().get(&id).cloned() {
            Some(entry) => entry,
            None => return false,
        };

        let mut guard = entry.lock().await;
        if guard.removed {
            return false;
        }
        if guard.is_expired(self.clock.now_millis(), self.ttl_ms) {
            self.expire_locked(&mut guard);
            return false;
        }

        guard.removed = true;
        self.filters.write().remove(&id);
        self.stats.uninstalled.fetch_add(1, Ordering::Relaxed);
        debug!(filter_id = %id, "Uninstalled filter");
        true
    }

    /// Remove every filter idle for at least the TTL.
    ///
    /// Filters currently locked by an operation are in use and are skipped.
    /// Returns the number of filters removed.
    pub fn sweep_expired(&self) -> usize {
        let entries: Vec<_> = self
            .filters
            .read()
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect();

        let now = self.clock.now_millis();
        let mut expired = Vec::new();
        for (id, entry) in entries {
            let Ok(mut state) = entry.try_lock() else {
                continue;
            };
            if !state.removed && state.is_expired(now, self.ttl_ms) {
                state.removed = true;
                expired.push(id);
            }
        }

        if !expired.is_empty() {
            let mut filters = self.filters.write();
            for id in &expired {
                filters.remove(id);
            }
            self.stats
                .expired
                .fetch_add(expired.len() as u64, Ordering::Relaxed);
        }

        expired.len()
    }

    /// Number of installed filters, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.filters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.read().is_empty()
    }

    pub fn stats(&self) -> &FilterStats {
        &self.stats
    }

    pub fn stats_snapshot(&self) -> FilterStatsSnapshot {
        self.stats.snapshot(self.len())
    }

    fn expire_locked(&self, state: &mut FilterState) {
        let id = state.descriptor.id;
        state.removed = true;
        self.filters.write().remove(&id);
        self.stats.expired.fetch_add(1, Ordering::Relaxed);
        warn!(filter_id = %id, "Filter expired");
    }
}

/// Background sweep of expired filters. Runs until the task is aborted.
pub async fn cleanup_task(registry: Arc<FilterRegistry>, interval: Duration) {
    let mut sweep_interval = tokio::time::interval(interval);
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        sweep_interval.tick().await;
        let removed = registry.sweep_expired();
        if removed > 0 {
            debug!(removed = removed, "Swept expired filters");
        }
    }
}
