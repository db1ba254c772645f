//! Core types for the log filter subsystem with JSON-RPC serialization.
//!
//! All types follow Ethereum JSON-RPC conventions with hex string serialization.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// Re-export primitive types for convenience
pub use primitive_types::{H160 as Address, H256 as Hash};

/// Block number type (u64)
pub type BlockNumber = u64;

/// Maximum number of indexed topics an event log can carry.
pub const MAX_TOPICS: usize = 4;

/// Block reference for filter bounds.
///
/// Symbolic tags are stored unresolved and mapped to concrete heights at
/// query time, so `latest` always means the head at the moment of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockRef {
    /// Concrete block height
    Number(BlockNumber),
    /// Genesis block (height 0)
    Earliest,
    /// Current head of the canonical chain
    #[default]
    Latest,
    /// Next block; resolved to the current head (see `LogMatcher`)
    Pending,
    /// Latest safe head, as reported by the height resolver
    Safe,
    /// Latest finalized block, as reported by the height resolver
    Finalized,
}

impl BlockRef {
    /// Height this reference denotes without consulting the chain, if any.
    pub fn concrete(&self) -> Option<BlockNumber> {
        match self {
            BlockRef::Number(n) => Some(*n),
            BlockRef::Earliest => Some(0),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&'static str> {
        match self {
            BlockRef::Number(_) => None,
            BlockRef::Earliest => Some("earliest"),
            BlockRef::Latest => Some("latest"),
            BlockRef::Pending => Some("pending"),
            BlockRef::Safe => Some("safe"),
            BlockRef::Finalized => Some("finalized"),
        }
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_tag() {
            Some(tag) => f.write_str(tag),
            None => write!(f, "0x{:x}", self.concrete().unwrap_or_default()),
        }
    }
}

impl FromStr for BlockRef {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "latest" => Ok(BlockRef::Latest),
            "earliest" => Ok(BlockRef::Earliest),
            "pending" => Ok(BlockRef::Pending),
            "safe" => Ok(BlockRef::Safe),
            "finalized" => Ok(BlockRef::Finalized),
            other => parse_quantity(other)
                .map(BlockRef::Number)
                .ok_or("invalid block number or tag"),
        }
    }
}

impl From<BlockNumber> for BlockRef {
    fn from(n: BlockNumber) -> Self {
        BlockRef::Number(n)
    }
}

impl Serialize for BlockRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BlockRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BlockRefVisitor;

        impl<'de> de::Visitor<'de> for BlockRefVisitor {
            type Value = BlockRef;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a block tag, a hex quantity or a number")
            }

            fn visit_str<E>(self, value: &str) -> Result<BlockRef, E>
            where
                E: de::Error,
            {
                BlockRef::from_str(value).map_err(de::Error::custom)
            }

            fn visit_u64<E>(self, value: u64) -> Result<BlockRef, E>
            where
                E: de::Error,
            {
                Ok(BlockRef::Number(value))
            }
        }

        deserializer.deserialize_any(BlockRefVisitor)
    }
}

/// Parse a `0x`-prefixed hex quantity or a plain decimal string.
fn parse_quantity(s: &str) -> Option<u64> {
    if let Some(hex_str) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex_str.is_empty() {
            return None;
        }
        u64::from_str_radix(hex_str, 16).ok()
    } else {
        s.parse::<u64>().ok()
    }
}

/// Serde helper for `u64` fields encoded as JSON-RPC hex quantities.
pub mod quantity {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{:x}", value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Num(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(n),
            Raw::Str(s) => super::parse_quantity(&s)
                .ok_or_else(|| de::Error::custom(format!("invalid quantity: {}", s))),
        }
    }
}

/// Filter identifier, serialized as a hex quantity (`"0x1"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(pub u64);

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl Serialize for FilterId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        quantity::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for FilterId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        quantity::deserialize(deserializer).map(FilterId)
    }
}

/// Bytes wrapper with hex serialization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn new() -> Self {
        Bytes(Vec::new())
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Bytes(v)
    }
}

impl Serialize for Bytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s)
            .map(Bytes)
            .map_err(|_| de::Error::custom("invalid hex bytes"))
    }
}

/// Event log as emitted by a transaction and returned by the log source.
///
/// Logs are only selected here, never mutated or reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Contract that emitted the log
    pub address: Address,
    /// Indexed topics (0 to 4)
    pub topics: Vec<Hash>,
    /// Non-indexed payload
    #[serde(default)]
    pub data: Bytes,
    #[serde(with = "quantity")]
    pub block_number: BlockNumber,
    pub block_hash: Hash,
    pub transaction_hash: Hash,
    #[serde(with = "quantity")]
    pub transaction_index: u64,
    #[serde(with = "quantity")]
    pub log_index: u64,
    /// True if the log was removed by a chain reorganization
    #[serde(default)]
    pub removed: bool,
}

/// Filter object for eth_newFilter and eth_getLogs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    /// From block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_block: Option<BlockRef>,
    /// To block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_block: Option<BlockRef>,
    /// Contract addresses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<FilterAddress>,
    /// Topics (up to 4)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<Option<FilterTopic>>>,
    /// Block hash (alternative to from_block/to_block)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<Hash>,
}

/// Filter address - single or multiple
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterAddress {
    Single(Address),
    Multiple(Vec<Address>),
}

/// Filter topic - single or multiple
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterTopic {
    Single(Hash),
    Multiple(Vec<Hash>),
}
