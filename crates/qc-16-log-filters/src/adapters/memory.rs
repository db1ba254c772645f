//! In-memory chain adapter.
//!
//! Implements both `HeightResolver` and `LogSource` over a vector of blocks.
//! Used by tests and by the standalone server when no node is attached.

use crate::domain::error::SourceError;
use crate::domain::types::{Address, BlockNumber, BlockRef, Bytes, Hash, LogRecord};
use crate::ports::{HeightResolver, LogSource};
use async_trait::async_trait;
use parking_lot::RwLock;

struct Block {
    hash: Hash,
    logs: Vec<LogRecord>,
}

/// A chain of blocks held in memory. Block `n` is at index `n`.
#[derive(Default)]
pub struct InMemoryChain {
    blocks: RwLock<Vec<Block>>,
}

impl InMemoryChain {
    /// Empty chain: no head yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain with empty blocks `0..=height`.
    pub fn with_height(height: BlockNumber) -> Self {
        let chain = Self::new();
        for _ in 0..=height {
            chain.push_block(Vec::new());
        }
        chain
    }

    /// Append a block with one log per `(emitter, topics)` entry and return
    /// its number.
    pub fn push_block(&self, logs: Vec<(Address, Vec<Hash>)>) -> BlockNumber {
        let mut blocks = self.blocks.write();
        let number = blocks.len() as BlockNumber;
        let hash = block_hash_for(number);

        let logs = logs
            .into_iter()
            .enumerate()
            .map(|(i, (address, topics))| LogRecord {
                address,
                topics,
                data: Bytes::new(),
                block_number: number,
                block_hash: hash,
                transaction_hash: Hash::from_low_u64_be((number << 32) | i as u64),
                transaction_index: i as u64,
                log_index: i as u64,
                removed: false,
            })
            .collect();

        blocks.push(Block { hash, logs });
        number
    }

    /// Current head, `None` for an empty chain.
    pub fn height(&self) -> Option<BlockNumber> {
        self.blocks.read().len().checked_sub(1).map(|h| h as BlockNumber)
    }

    pub fn block_hash(&self, number: BlockNumber) -> Option<Hash> {
        self.blocks.read().get(number as usize).map(|b| b.hash)
    }
}

fn block_hash_for(number: BlockNumber) -> Hash {
    let mut hash = Hash::from_low_u64_be(number);
    hash.0[0] = 0xb1;
    hash
}

#[async_trait]
impl HeightResolver for InMemoryChain {
    async fn resolve(&self, block: BlockRef) -> Result<Option<BlockNumber>, SourceError> {
        let head = match self.height() {
            Some(head) => head,
            None => return Ok(None),
        };
        Ok(match block {
            BlockRef::Number(n) => (n <= head).then_some(n),
            BlockRef::Earliest => Some(0),
            // No separate finality notion here
            BlockRef::Latest | BlockRef::Pending | BlockRef::Safe | BlockRef::Finalized => {
                Some(head)
            }
        })
    }
}

#[async_trait]
impl LogSource for InMemoryChain {
    async fn logs_in_range(
        &self,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<LogRecord>, SourceError> {
        let blocks = self.blocks.read();
        let logs = blocks
            .iter()
            .skip(from as usize)
            .take(to.saturating_sub(from).saturating_add(1) as usize)
            .flat_map(|b| b.logs.iter().cloned())
            .collect();
        Ok(logs)
    }

    async fn logs_for_block_hash(
        &self,
        block_hash: Hash,
    ) -> Result<Option<Vec<LogRecord>>, SourceError> {
        Ok(self
            .blocks
            .read()
            .iter()
            .find(|b| b.hash == block_hash)
            .map(|b| b.logs.clone()))
    }
}
