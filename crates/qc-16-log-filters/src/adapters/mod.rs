//! Adapters for the log filter subsystem.
//!
//! Infrastructure implementations of the outbound ports.

mod error_conversions;
pub mod memory;

pub use memory::InMemoryChain;
