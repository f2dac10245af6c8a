//! Memory-facing request and response types, and the engine's port buffers.
//!
//! Each downstream port holds at most one outgoing request and one incoming response at a
//! time. The surrounding system moves packets between these buffers and the clock-domain
//! crossing toward memory.

use crate::engine::rob::SeqNum;

/// Memory operation kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemOp {
    /// Read `addr`; the response carries the value.
    Load,
    /// Write `data` to `addr`; the response is an acknowledgement.
    Store,
}

/// A memory request emitted by a lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemRequest {
    /// Operation kind.
    pub op: MemOp,
    /// Target address.
    pub addr: u64,
    /// Store data; ignored for loads.
    pub data: u64,
    /// A posted store expects no response from memory.
    pub posted: bool,
}

impl MemRequest {
    /// A load from `addr`.
    pub const fn load(addr: u64) -> Self {
        Self {
            op: MemOp::Load,
            addr,
            data: 0,
            posted: false,
        }
    }

    /// A store of `data` to `addr`.
    pub const fn store(addr: u64, data: u64) -> Self {
        Self {
            op: MemOp::Store,
            addr,
            data,
            posted: false,
        }
    }

    /// A store of `data` to `addr` that memory does not acknowledge.
    pub const fn posted_store(addr: u64, data: u64) -> Self {
        Self {
            op: MemOp::Store,
            addr,
            data,
            posted: true,
        }
    }
}

/// A request tagged with its reorder-buffer sequence number, as it travels to memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemPacket {
    /// Reorder-buffer sequence number.
    pub seq: SeqNum,
    /// Port the request left from; responses come back on the same port.
    pub port: usize,
    /// The request.
    pub request: MemRequest,
}

/// A response returning from memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemResponse {
    /// Sequence number of the request being answered.
    pub seq: SeqNum,
    /// Port the request left from.
    pub port: usize,
    /// Loaded value; zero for store acknowledgements.
    pub data: u64,
}

/// Single-entry request/response buffers of one downstream port.
#[derive(Clone, Debug, Default)]
pub struct DownstreamPort {
    /// Request waiting to be handed to the memory queue.
    pub req_buf: Option<MemPacket>,
    /// Response delivered by the memory queue, not yet absorbed by the engine.
    pub resp_buf: Option<MemResponse>,
}

impl DownstreamPort {
    /// Returns true while either buffer is occupied.
    pub const fn is_busy(&self) -> bool {
        self.req_buf.is_some() || self.resp_buf.is_some()
    }
}
