//! System components around the engine.
//!
//! This module organizes the pieces that connect the engine to its host and memory: the
//! clock-domain crossing queues, the address map, the memory side, and the builder that
//! assembles them into a `System`.

/// Clock-domain crossing queues.
pub mod async_fifo;

/// System builder for assembling components.
pub mod builder;

/// Host address map.
pub mod interconnect;

/// Memory side: controllers and backing store.
pub mod memory;

/// Control-register target trait.
pub mod traits;

pub use builder::{Domain, HostReply, HostRequest, System};
