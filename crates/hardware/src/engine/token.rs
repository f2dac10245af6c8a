//! In-flight lane operations.
//!
//! A token is one operation moving through a lane's stage graph. Tokens are owned by the
//! lane that holds them; only the payload of a memory request they emit leaves the lane.

use crate::engine::kernel::Step;
use crate::sim::clock::Cycle;

/// Stage index within a lane; stage 0 is the entry point.
pub type Stage = u32;

/// Identifier of a caller (host thread) issuing commands to the engine.
pub type CallerId = u32;

/// Lane-local token identity, increasing with admission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenId(pub u64);

/// Data carried by a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Payload {
    /// Engine-assigned tag of the call this token works for.
    pub call: u64,
    /// Caller that issued the call.
    pub caller: CallerId,
    /// Command word written by the caller.
    pub command: u64,
    /// Address operand.
    pub addr: u64,
    /// Data operand.
    pub data: u64,
}

/// Whether a token is still walking the graph or waiting out its postrun latency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TokenState {
    /// Walking the stage graph.
    #[default]
    Running,
    /// Reached a terminal stage; retires when the postrun countdown expires.
    Draining,
}

/// A single in-flight pipeline operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub(crate) id: TokenId,
    pub(crate) lane: usize,
    pub(crate) stage: Stage,
    pub(crate) entered_at: Cycle,
    pub(crate) issued_at: Cycle,
    pub(crate) hops: u32,
    pub(crate) payload: Payload,
    pub(crate) state: TokenState,
    pub(crate) remaining: u64,
    pub(crate) plan: Option<Step>,
}

impl Token {
    pub(crate) const fn new(id: TokenId, lane: usize, payload: Payload, cycle: Cycle) -> Self {
        Self {
            id,
            lane,
            stage: 0,
            entered_at: cycle,
            issued_at: cycle,
            hops: 0,
            payload,
            state: TokenState::Running,
            remaining: 0,
            plan: None,
        }
    }

    /// Token identity within its lane.
    #[inline]
    pub const fn id(&self) -> TokenId {
        self.id
    }

    /// Index of the owning lane.
    #[inline]
    pub const fn lane(&self) -> usize {
        self.lane
    }

    /// Stage the token currently occupies.
    #[inline]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Cycle at which the token entered its current stage.
    #[inline]
    pub const fn entered_at(&self) -> Cycle {
        self.entered_at
    }

    /// Cycle at which the token was admitted into stage 0.
    #[inline]
    pub const fn issued_at(&self) -> Cycle {
        self.issued_at
    }

    /// Number of transitions taken since admission.
    #[inline]
    pub const fn hops(&self) -> u32 {
        self.hops
    }

    /// Data carried by the token.
    #[inline]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Running or draining.
    #[inline]
    pub const fn state(&self) -> TokenState {
        self.state
    }

    /// Consumes the token, returning its payload for hand-off to another lane.
    pub fn into_payload(self) -> Payload {
        self.payload
    }
}
