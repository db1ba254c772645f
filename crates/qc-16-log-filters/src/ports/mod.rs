//! Ports layer.
//!
//! Defines the interfaces (traits) for:
//! - Driving ports (inbound) - API for the JSON-RPC layer
//! - Driven ports (outbound) - Dependencies on the chain and log index

pub mod inbound;
pub mod outbound;

pub use inbound::EthFilterApi;
pub use outbound::{HeightResolver, LogSource, ManualTimeSource, SystemTimeSource, TimeSource};
