//! Pure log matching.
//!
//! Topic filters are order-dependent. A log with topics `[A, B]` is matched by:
//! - `[]` anything
//! - `[A]` A in first position (and anything after)
//! - `[null, B]` anything in first position AND B in second position
//! - `[A, B]` A in first position AND B in second position
//! - `[[A, B], [A, B]]` (A OR B) in first position AND (A OR B) in second position

use crate::domain::descriptor::FilterCriteria;
use crate::domain::error::{FilterError, FilterResult};
use crate::domain::types::{BlockNumber, LogRecord};

/// Whether `log` satisfies the address set and topic pattern of `criteria`.
///
/// Block bounds are not checked; callers fetch logs for the resolved range.
pub fn matches(criteria: &FilterCriteria, log: &LogRecord) -> bool {
    if !criteria.addresses.is_empty() && !criteria.addresses.contains(&log.address) {
        return false;
    }

    for (i, slot) in criteria.topics.iter().enumerate() {
        if slot.is_empty() {
            continue;
        }
        match log.topics.get(i) {
            Some(topic) if slot.contains(topic) => {}
            _ => return false,
        }
    }

    true
}

/// Keep matching logs, preserving input order.
pub fn filter_logs(logs: Vec<LogRecord>, criteria: &FilterCriteria) -> Vec<LogRecord> {
    logs.into_iter().filter(|log| matches(criteria, log)).collect()
}

/// Require `from <= to` on resolved bounds.
pub fn check_range(from: BlockNumber, to: BlockNumber) -> FilterResult<(BlockNumber, BlockNumber)> {
    if from > to {
        return Err(FilterError::InvalidRange { from, to });
    }
    Ok((from, to))
}
