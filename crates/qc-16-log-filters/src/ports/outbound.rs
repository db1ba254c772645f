//! Outbound ports (driven ports).
//!
//! Dependencies the filter subsystem needs from the rest of the node: the
//! chain's height resolution, the log index, and a clock.

use crate::domain::error::SourceError;
use crate::domain::types::{BlockNumber, BlockRef, Hash, LogRecord};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Turns a block reference into a concrete height.
#[async_trait]
pub trait HeightResolver: Send + Sync {
    /// Resolve `block` against the current chain.
    ///
    /// Returns `Ok(None)` when the referenced block has not been produced yet
    /// (a number above the head, or any tag on an empty chain).
    async fn resolve(&self, block: BlockRef) -> Result<Option<BlockNumber>, SourceError>;
}

/// Read access to the log index.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// All logs emitted in blocks `from..=to`, ordered by block number then
    /// log index.
    async fn logs_in_range(
        &self,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<LogRecord>, SourceError>;

    /// All logs of the block with the given hash, or `None` if the hash is
    /// unknown.
    async fn logs_for_block_hash(
        &self,
        block_hash: Hash,
    ) -> Result<Option<Vec<LogRecord>>, SourceError>;
}

/// Time source trait for testability
pub trait TimeSource: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> u64;
}

/// System time implementation
#[derive(Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            // Clock before Unix epoch - return 0 rather than panic
            .unwrap_or(0)
    }
}

/// Manually advanced clock for expiration tests
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now: AtomicU64,
}

impl ManualTimeSource {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_time_source() {
        let clock = ManualTimeSource::new(1_000);
        assert_eq!(clock.now_millis(), 1_000);
        clock.advance(250);
        assert_eq!(clock.now_millis(), 1_250);
    }

    #[test]
    fn test_system_time_source_is_after_epoch() {
        assert!(SystemTimeSource.now_millis() > 0);
    }
}
