//! Configuration and simulation errors.
//!
//! The simulator distinguishes two classes of failure. It provides:
//! 1. **`ConfigError`:** Problems detected while validating a configuration or building components.
//! 2. **`SimError`:** Invariant violations found while the simulation runs; these are fatal.
//!
//! Backpressure (a full lane, buffer or queue) is not represented here. It is reported through
//! the return value of the refusing call and the caller retries on a later cycle.

use thiserror::Error;

/// Error raised while validating configuration or constructing components.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The parallel transition lists of a lane do not have equal lengths.
    #[error(
        "lane `{lane}`: transition lists differ in length (from: {from}, to: {to}, latency: {latency})"
    )]
    TransitionLengthMismatch {
        /// Lane name.
        lane: String,
        /// Length of the from-stage list.
        from: usize,
        /// Length of the to-stage list.
        to: usize,
        /// Length of the latency list.
        latency: usize,
    },

    /// The same (from, to) pair is declared twice.
    #[error("lane `{lane}`: duplicate transition {from} -> {to}")]
    DuplicateTransition {
        /// Lane name.
        lane: String,
        /// Source stage.
        from: u32,
        /// Destination stage.
        to: u32,
    },

    /// A transition declares a latency of zero cycles.
    #[error("lane `{lane}`: transition {from} -> {to} has zero latency")]
    ZeroLatency {
        /// Lane name.
        lane: String,
        /// Source stage.
        from: u32,
        /// Destination stage.
        to: u32,
    },

    /// A bounded structure was configured with no room.
    #[error("{what} must have a capacity of at least 1")]
    ZeroCapacity {
        /// Which structure was misconfigured.
        what: String,
    },

    /// A parameter that must be non-zero was zero.
    #[error("{what} must be non-zero")]
    ZeroParameter {
        /// Which parameter was misconfigured.
        what: String,
    },

    /// A parameter is below its minimum.
    #[error("{what} must be at least {min}, got {value}")]
    TooSmall {
        /// Which parameter was misconfigured.
        what: String,
        /// Smallest accepted value.
        min: u64,
        /// Configured value.
        value: u64,
    },

    /// The engine was built without lanes.
    #[error("engine requires at least one lane")]
    NoLanes,

    /// Two address ranges claim the same bytes.
    #[error("address range `{name}` [{base:#x}, +{size:#x}) overlaps `{other}`")]
    OverlappingRange {
        /// Name of the range being registered.
        name: String,
        /// Base of the range being registered.
        base: u64,
        /// Size of the range being registered.
        size: u64,
        /// Name of the range already registered.
        other: String,
    },

    /// An address range does not fit in the 64-bit address space.
    #[error("address range `{name}` at {base:#x} with size {size:#x} overflows the address space")]
    RangeOverflow {
        /// Name of the range.
        name: String,
        /// Base address.
        base: u64,
        /// Requested size.
        size: u64,
    },

    /// The configuration text could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    Parse(String),
}

/// Fatal invariant violation detected while the simulation runs.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SimError {
    /// A release named an entry that is not the oldest in the reorder buffer.
    #[error("release of seq {seq} but the oldest entry is {oldest:?}")]
    NotOldest {
        /// Sequence number passed to `release`.
        seq: u64,
        /// Sequence number of the current oldest entry, if any.
        oldest: Option<u64>,
    },

    /// A release named the oldest entry before it was completed.
    #[error("release of seq {seq} before it completed")]
    NotCompleted {
        /// Sequence number passed to `release`.
        seq: u64,
    },

    /// A completion named a sequence number that is not in flight.
    #[error("completion for unknown seq {seq}")]
    UnknownSequence {
        /// Sequence number passed to `complete`.
        seq: u64,
    },

    /// A completion arrived twice for the same entry.
    #[error("seq {seq} completed twice")]
    AlreadyCompleted {
        /// Sequence number passed to `complete`.
        seq: u64,
    },

    /// A request was marked sent ahead of an older unsent one.
    #[error("seq {seq} sent out of order; next unsent is {expected:?}")]
    SendOutOfOrder {
        /// Sequence number passed to `mark_sent`.
        seq: u64,
        /// Oldest unsent sequence number, if any.
        expected: Option<u64>,
    },

    /// A stage kernel chose a stage with no declared transition.
    #[error("lane `{lane}`: token {token} chose undeclared transition {from} -> {to}")]
    UnknownTransition {
        /// Lane name.
        lane: String,
        /// Token identity.
        token: u64,
        /// Current stage.
        from: u32,
        /// Chosen stage.
        to: u32,
    },

    /// An access inside the control window matched no register.
    #[error("undefined control register at {addr:#x}")]
    UndefinedRegister {
        /// Faulting address.
        addr: u64,
    },

    /// A register access fell outside the engine's control window.
    #[error("address {addr:#x} is outside the control window")]
    OutsideWindow {
        /// Faulting address.
        addr: u64,
    },

    /// A caller id at or above the engine's configured caller count.
    #[error("caller {caller} is out of range (engine has {num_callers} callers)")]
    CallerOutOfRange {
        /// Caller identifier.
        caller: u32,
        /// Configured caller count.
        num_callers: usize,
    },

    /// A caller was used without holding a caller slot.
    #[error("caller {caller} holds no caller slot")]
    UnknownCaller {
        /// Caller identifier.
        caller: u32,
    },

    /// Snoop traffic was sent through a queue built without a snoop channel.
    #[error("snooping is disabled on queue `{queue}`")]
    SnoopingDisabled {
        /// Queue name.
        queue: String,
    },

    /// A memory response arrived for a request with no owner.
    #[error("response for seq {seq} has no pending request")]
    OrphanResponse {
        /// Sequence number carried by the response.
        seq: u64,
    },
}
