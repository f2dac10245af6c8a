//! The accelerator engine.
//!
//! Calls enter lane 0 as tokens, walk every lane in order, and issue memory requests through a
//! reorder buffer to the downstream ports. Submodules:
//! - `token`: call payloads and in-flight token state.
//! - `kernel`: per-lane branch logic.
//! - `lane`: timed stage graphs with admission control.
//! - `rob`: in-order release of out-of-order responses.
//! - `port`: memory request and response packets.
//! - `regs`: control-register window layout.
//! - `accelerator`: the engine and its per-cycle phases.
//! - `builder`: validated construction.

/// The engine and its per-cycle phases.
pub mod accelerator;

/// Validated engine construction.
pub mod builder;

/// Per-lane branch logic.
pub mod kernel;

/// Timed stage graphs.
pub mod lane;

/// Memory request and response packets.
pub mod port;

/// Control-register window layout.
pub mod regs;

/// Reorder buffer.
pub mod rob;

/// Tokens and call payloads.
pub mod token;

pub use accelerator::{Dispatch, Engine, TaggedRequest};
pub use builder::{EngineBuilder, KernelSet};
pub use kernel::{LinearKernel, Route, StageKernel, Step};
pub use lane::{Lane, LaneKind, NullSink, RequestSink, Stall, TransitionTable};
pub use port::{DownstreamPort, MemOp, MemPacket, MemRequest, MemResponse};
pub use regs::{ControlWindow, Register};
pub use rob::{ReorderBuffer, RobEntry, RobState, SeqNum};
pub use token::{CallerId, Payload, Stage, Token, TokenId, TokenState};
