//! Stage kernels: the per-lane branch logic injected into the stage graph.
//!
//! A lane only knows its transition table. Which outgoing edge a token takes, and whether it
//! emits a memory request on the way, is decided by a [`StageKernel`] supplied at build time.
//! The lane consults the kernel once each time a token enters a stage and honors the latency
//! of whatever edge the kernel picked.

use crate::engine::port::MemRequest;
use crate::engine::token::{Stage, Token};

/// Where a token goes when its dwell time in the current stage expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Take the transition to the given stage.
    Goto(Stage),
    /// Leave the graph; the postrun latency starts immediately.
    Exit,
}

/// A kernel decision for one token in one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    /// Next stage, or exit.
    pub route: Route,
    /// Request emitted when the token leaves the stage.
    pub request: Option<MemRequest>,
}

impl Step {
    /// Move to `stage` without touching memory.
    pub const fn goto(stage: Stage) -> Self {
        Self {
            route: Route::Goto(stage),
            request: None,
        }
    }

    /// Leave the graph without touching memory.
    pub const fn exit() -> Self {
        Self {
            route: Route::Exit,
            request: None,
        }
    }

    /// Attaches a memory request to this step.
    #[must_use]
    pub const fn with_request(mut self, request: MemRequest) -> Self {
        self.request = Some(request);
        self
    }
}

/// Branch logic for one lane.
///
/// # Arguments
///
/// * `token` - The token that just entered `token.stage()`.
/// * `targets` - Stages reachable from the current stage, in ascending order. Empty for
///   terminal stages, where the only legal route is [`Route::Exit`].
pub trait StageKernel {
    /// Chooses the next step for `token`.
    fn step(&mut self, token: &Token, targets: &[Stage]) -> Step;
}

/// Takes the lowest-numbered outgoing edge and exits at terminal stages.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearKernel;

impl StageKernel for LinearKernel {
    fn step(&mut self, _token: &Token, targets: &[Stage]) -> Step {
        targets.first().map_or_else(Step::exit, |&to| Step::goto(to))
    }
}

impl<F> StageKernel for F
where
    F: FnMut(&Token, &[Stage]) -> Step,
{
    fn step(&mut self, token: &Token, targets: &[Stage]) -> Step {
        self(token, targets)
    }
}
