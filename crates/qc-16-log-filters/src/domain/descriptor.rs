//! Normalized filter criteria and the stored filter descriptor.

use crate::domain::error::{FilterError, FilterResult};
use crate::domain::types::{
    Address, BlockNumber, BlockRef, Filter, FilterAddress, FilterId, FilterTopic, Hash,
    MAX_TOPICS,
};
use std::collections::HashSet;

/// Acceptable values for one topic position. Empty means wildcard.
pub type TopicSlot = HashSet<Hash>;

/// What a filter selects: block bounds, emitters and topic pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub from_block: BlockRef,
    pub to_block: BlockRef,
    /// Empty set matches any address
    pub addresses: HashSet<Address>,
    /// Positional topic pattern, at most `MAX_TOPICS` slots
    pub topics: Vec<TopicSlot>,
}

impl FilterCriteria {
    pub fn new(from_block: BlockRef, to_block: BlockRef) -> Self {
        Self {
            from_block,
            to_block,
            ..Default::default()
        }
    }

    pub fn with_addresses(mut self, addresses: impl IntoIterator<Item = Address>) -> Self {
        self.addresses = addresses.into_iter().collect();
        self
    }

    pub fn with_topics(mut self, topics: Vec<TopicSlot>) -> Self {
        self.topics = topics;
        self
    }

    /// Normalize a JSON-RPC filter object.
    ///
    /// Missing bounds default to `latest`. `blockHash` is not interpreted here.
    pub fn from_request(filter: &Filter) -> FilterResult<Self> {
        let addresses = match &filter.address {
            None => HashSet::new(),
            Some(FilterAddress::Single(addr)) => HashSet::from([*addr]),
            Some(FilterAddress::Multiple(addrs)) => addrs.iter().copied().collect(),
        };

        let topics = match &filter.topics {
            None => Vec::new(),
            Some(slots) => {
                if slots.len() > MAX_TOPICS {
                    return Err(FilterError::InvalidArgument(format!(
                        "too many topic positions: {} > {}",
                        slots.len(),
                        MAX_TOPICS
                    )));
                }
                slots
                    .iter()
                    .map(|slot| match slot {
                        None => TopicSlot::new(),
                        Some(FilterTopic::Single(t)) => TopicSlot::from([*t]),
                        Some(FilterTopic::Multiple(ts)) => ts.iter().copied().collect(),
                    })
                    .collect()
            }
        };

        Ok(Self {
            from_block: filter.from_block.unwrap_or_default(),
            to_block: filter.to_block.unwrap_or_default(),
            addresses,
            topics,
        })
    }

    /// Reject bounds that are both concrete and inverted.
    ///
    /// Symbolic bounds are checked later, once resolved at query time.
    pub fn validate_static_range(&self) -> FilterResult<()> {
        if let (Some(from), Some(to)) = (self.from_block.concrete(), self.to_block.concrete()) {
            if from > to {
                return Err(FilterError::InvalidRange { from, to });
            }
        }
        Ok(())
    }
}

/// A registered filter.
///
/// `cursor` is the next height not yet delivered through
/// `eth_getFilterChanges`; it only moves forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDescriptor {
    pub id: FilterId,
    pub criteria: FilterCriteria,
    pub cursor: BlockNumber,
}

impl FilterDescriptor {
    pub fn new(id: FilterId, criteria: FilterCriteria, cursor: BlockNumber) -> Self {
        Self {
            id,
            criteria,
            cursor,
        }
    }

    /// Move the cursor past `delivered_to`. Never moves it backwards.
    pub fn advance_cursor(&mut self, delivered_to: BlockNumber) {
        self.cursor = self.cursor.max(delivered_to.saturating_add(1));
    }
}
