//! Lanes: timed stage graphs.
//!
//! A lane is a directed graph of stages whose edges carry latencies in the lane's clock. This
//! module provides:
//! 1. **Transition table:** Validated from/to/latency lists with per-stage target lookup.
//! 2. **Admission:** Capacity checks for every lane plus an initiation interval for pipelined lanes.
//! 3. **Advance:** One cycle of progress for every token, oldest first.
//!
//! Each token carries a countdown loaded from the latency of the edge its kernel chose. Every
//! `advance` call decrements it; when it reaches zero the token takes the edge, or starts its
//! postrun latency if the kernel chose to exit. A token admitted during cycle `c` starts counting
//! at `advance(c + 1)`, so a path whose latencies sum to `N` completes at `advance(c + N)`.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, trace};

use crate::common::error::{ConfigError, SimError};
use crate::config::{LaneConfig, LaneKindConfig};
use crate::engine::kernel::{Route, StageKernel};
use crate::engine::port::MemRequest;
use crate::engine::token::{Payload, Stage, Token, TokenId, TokenState};
use crate::sim::clock::Cycle;

/// Reason a lane refused an admission. The caller retries on a later cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stall {
    /// The lane already holds `capacity` tokens.
    Full,
    /// Fewer than `interval` cycles since the last admission into stage 0.
    Interval,
    /// A pipelined lane is frozen behind a token whose request was refused.
    Blocked,
}

/// Destination for memory requests emitted by tokens.
pub trait RequestSink {
    /// Offers `request` on behalf of `token`; hands it back if it cannot be taken this cycle.
    fn issue(&mut self, token: &Token, request: MemRequest) -> Result<(), MemRequest>;

    /// Asks whether `token` may leave the lane now. A refusal holds it at its terminal stage
    /// and counts as a stall, freezing younger tokens of a pipelined lane.
    fn retire(&mut self, _token: &Token) -> bool {
        true
    }
}

/// Sink that accepts and drops every request.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl RequestSink for NullSink {
    fn issue(&mut self, _token: &Token, _request: MemRequest) -> Result<(), MemRequest> {
        Ok(())
    }
}

impl RequestSink for Vec<(TokenId, MemRequest)> {
    fn issue(&mut self, token: &Token, request: MemRequest) -> Result<(), MemRequest> {
        self.push((token.id(), request));
        Ok(())
    }
}

/// Validated transition table of one lane.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransitionTable {
    latency: BTreeMap<(Stage, Stage), u64>,
    targets: BTreeMap<Stage, Vec<Stage>>,
}

impl TransitionTable {
    /// Builds a table from parallel from/to/latency lists.
    ///
    /// # Arguments
    ///
    /// * `lane` - Lane name, used in errors.
    /// * `from` - Source stage of each transition.
    /// * `to` - Destination stage of each transition.
    /// * `latency` - Latency in cycles of each transition.
    ///
    /// # Returns
    ///
    /// The table, or an error for mismatched list lengths, duplicate pairs or zero latencies.
    pub fn from_lists(
        lane: &str,
        from: &[Stage],
        to: &[Stage],
        latency: &[u64],
    ) -> Result<Self, ConfigError> {
        if from.len() != to.len() || from.len() != latency.len() {
            return Err(ConfigError::TransitionLengthMismatch {
                lane: lane.to_owned(),
                from: from.len(),
                to: to.len(),
                latency: latency.len(),
            });
        }

        let mut table = Self::default();
        for ((&src, &dst), &lat) in from.iter().zip(to).zip(latency) {
            if lat == 0 {
                return Err(ConfigError::ZeroLatency {
                    lane: lane.to_owned(),
                    from: src,
                    to: dst,
                });
            }
            if table.latency.insert((src, dst), lat).is_some() {
                return Err(ConfigError::DuplicateTransition {
                    lane: lane.to_owned(),
                    from: src,
                    to: dst,
                });
            }
            table.targets.entry(src).or_default().push(dst);
        }
        for targets in table.targets.values_mut() {
            targets.sort_unstable();
        }
        Ok(table)
    }

    /// Latency of the `from -> to` edge, if declared.
    pub fn latency(&self, from: Stage, to: Stage) -> Option<u64> {
        self.latency.get(&(from, to)).copied()
    }

    /// Stages reachable from `from`, ascending.
    pub fn targets(&self, from: Stage) -> &[Stage] {
        self.targets.get(&from).map_or(&[], Vec::as_slice)
    }

    /// Returns true if `stage` has no outgoing transition.
    pub fn is_terminal(&self, stage: Stage) -> bool {
        self.targets(stage).is_empty()
    }

    /// Number of declared transitions.
    pub fn len(&self) -> usize {
        self.latency.len()
    }

    /// Returns true if no transition is declared.
    pub fn is_empty(&self) -> bool {
        self.latency.is_empty()
    }
}

/// Lane flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaneKind {
    /// Tokens progress independently of each other.
    Simple,
    /// In-order pipeline over a shared resource.
    Pipelined {
        /// Minimum cycles between two admissions into stage 0.
        interval: u64,
    },
}

enum Progress {
    Waiting,
    Stalled,
    Retired,
}

/// A timed stage graph holding in-flight tokens.
#[derive(Debug)]
pub struct Lane {
    index: usize,
    name: String,
    kind: LaneKind,
    capacity: usize,
    postrun_latency: u64,
    table: TransitionTable,
    tokens: VecDeque<Token>,
    next_id: u64,
    last_admit: Option<Cycle>,
    blocked: bool,
}

impl Lane {
    /// Creates an empty lane.
    ///
    /// # Arguments
    ///
    /// * `index` - Position of the lane in its engine.
    /// * `name` - Lane name, used in logs and errors.
    /// * `kind` - Simple or pipelined.
    /// * `capacity` - Maximum in-flight tokens; must be at least 1.
    /// * `postrun_latency` - Cycles a token waits at its terminal stage before retiring.
    /// * `table` - Transition table.
    pub fn new(
        index: usize,
        name: impl Into<String>,
        kind: LaneKind,
        capacity: usize,
        postrun_latency: u64,
        table: TransitionTable,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                what: format!("lane `{name}`"),
            });
        }
        Ok(Self {
            index,
            name,
            kind,
            capacity,
            postrun_latency,
            table,
            tokens: VecDeque::with_capacity(capacity),
            next_id: 0,
            last_admit: None,
            blocked: false,
        })
    }

    /// Builds a lane from its configuration entry.
    pub fn from_config(index: usize, config: &LaneConfig) -> Result<Self, ConfigError> {
        let table = TransitionTable::from_lists(
            &config.name,
            &config.transition_from_stage,
            &config.transition_to_stage,
            &config.transition_latency,
        )?;
        let kind = match config.kind {
            LaneKindConfig::Simple => LaneKind::Simple,
            LaneKindConfig::Pipelined => LaneKind::Pipelined {
                interval: config.interval,
            },
        };
        Self::new(
            index,
            config.name.clone(),
            kind,
            config.capacity,
            config.postrun_latency,
            table,
        )
    }

    /// Position of the lane in its engine.
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Lane name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lane flavor.
    pub const fn kind(&self) -> LaneKind {
        self.kind
    }

    /// Maximum in-flight tokens.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Postrun latency in cycles.
    pub const fn postrun_latency(&self) -> u64 {
        self.postrun_latency
    }

    /// The lane's transition table.
    pub const fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Number of in-flight tokens, including those draining their postrun latency.
    pub fn occupancy(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if no token is in flight.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns true if a pipelined lane froze during the last advance.
    pub const fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// In-flight tokens, oldest first.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// Looks up an in-flight token.
    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.iter().find(|t| t.id == id)
    }

    /// Stage currently occupied by token `id`.
    pub fn stage_of(&self, id: TokenId) -> Option<Stage> {
        self.token(id).map(Token::stage)
    }

    /// Checks whether an admission at `cycle` would succeed.
    pub fn can_admit(&self, cycle: Cycle) -> Result<(), Stall> {
        if self.tokens.len() >= self.capacity {
            return Err(Stall::Full);
        }
        if let LaneKind::Pipelined { interval } = self.kind {
            if self.blocked {
                return Err(Stall::Blocked);
            }
            if let Some(last) = self.last_admit {
                if cycle.saturating_sub(last) < interval {
                    return Err(Stall::Interval);
                }
            }
        }
        Ok(())
    }

    /// Admits a new token into stage 0.
    ///
    /// # Arguments
    ///
    /// * `payload` - Data carried by the token.
    /// * `cycle` - Current cycle of the lane's clock.
    ///
    /// # Returns
    ///
    /// The new token's id, or the reason the lane refused it.
    pub fn admit(&mut self, payload: Payload, cycle: Cycle) -> Result<TokenId, Stall> {
        if let Err(stall) = self.can_admit(cycle) {
            debug!(lane = %self.name, cycle, ?stall, "admission refused");
            return Err(stall);
        }
        let id = TokenId(self.next_id);
        self.next_id += 1;
        self.tokens
            .push_back(Token::new(id, self.index, payload, cycle));
        self.last_admit = Some(cycle);
        debug!(lane = %self.name, cycle, token = id.0, "token admitted");
        Ok(id)
    }

    /// Advances every token by one cycle, oldest first.
    ///
    /// # Arguments
    ///
    /// * `cycle` - The cycle being simulated; call once per cycle.
    /// * `kernel` - Branch logic consulted whenever a token enters a stage.
    /// * `sink` - Receives memory requests emitted by transitions.
    ///
    /// # Returns
    ///
    /// Tokens whose postrun latency expired this cycle, oldest first, or the first invariant
    /// violation raised by the kernel's choices.
    pub fn advance(
        &mut self,
        cycle: Cycle,
        kernel: &mut dyn StageKernel,
        sink: &mut dyn RequestSink,
    ) -> Result<Vec<Token>, SimError> {
        let in_order = matches!(self.kind, LaneKind::Pipelined { .. });
        let mut pending = std::mem::take(&mut self.tokens);
        let mut kept = VecDeque::with_capacity(self.capacity);
        let mut retired = Vec::new();
        let mut frozen = false;

        while let Some(mut token) = pending.pop_front() {
            if frozen {
                kept.push_back(token);
                continue;
            }
            match self.step_token(&mut token, cycle, kernel, sink) {
                Ok(Progress::Waiting) => kept.push_back(token),
                Ok(Progress::Stalled) => {
                    frozen = in_order;
                    kept.push_back(token);
                }
                Ok(Progress::Retired) => {
                    debug!(lane = %self.name, cycle, token = token.id.0, "token retired");
                    retired.push(token);
                }
                Err(err) => {
                    kept.push_back(token);
                    kept.append(&mut pending);
                    self.tokens = kept;
                    return Err(err);
                }
            }
        }

        self.tokens = kept;
        self.blocked = frozen;
        Ok(retired)
    }

    fn step_token(
        &self,
        token: &mut Token,
        cycle: Cycle,
        kernel: &mut dyn StageKernel,
        sink: &mut dyn RequestSink,
    ) -> Result<Progress, SimError> {
        if token.state == TokenState::Running && token.plan.is_none() {
            if token.hops == 0 && token.issued_at >= cycle {
                return Ok(Progress::Waiting);
            }
            self.plan(token, kernel)?;
        }
        token.remaining = token.remaining.saturating_sub(1);

        loop {
            if token.remaining > 0 {
                return Ok(Progress::Waiting);
            }
            if token.state == TokenState::Draining {
                if !sink.retire(token) {
                    trace!(lane = %self.name, cycle, token = token.id.0, "retire refused, holding");
                    return Ok(Progress::Stalled);
                }
                return Ok(Progress::Retired);
            }
            let Some(mut step) = token.plan.take() else {
                self.plan(token, kernel)?;
                continue;
            };

            if let Some(request) = step.request.take() {
                if let Err(request) = sink.issue(token, request) {
                    trace!(lane = %self.name, cycle, token = token.id.0, "request refused, stalling");
                    step.request = Some(request);
                    token.plan = Some(step);
                    return Ok(Progress::Stalled);
                }
            }

            match step.route {
                Route::Goto(to) => {
                    trace!(
                        lane = %self.name,
                        cycle,
                        token = token.id.0,
                        from = token.stage,
                        to,
                        "transition"
                    );
                    token.stage = to;
                    token.entered_at = cycle;
                    token.hops = token.hops.saturating_add(1);
                    self.plan(token, kernel)?;
                }
                Route::Exit => {
                    token.state = TokenState::Draining;
                    token.remaining = self.postrun_latency;
                }
            }
        }
    }

    /// Consults the kernel for the token's current stage and loads the countdown.
    fn plan(&self, token: &mut Token, kernel: &mut dyn StageKernel) -> Result<(), SimError> {
        let step = kernel.step(token, self.table.targets(token.stage));
        token.remaining = match step.route {
            Route::Goto(to) => {
                self.table
                    .latency(token.stage, to)
                    .ok_or_else(|| SimError::UnknownTransition {
                        lane: self.name.clone(),
                        token: token.id.0,
                        from: token.stage,
                        to,
                    })?
            }
            Route::Exit => 0,
        };
        token.plan = Some(step);
        Ok(())
    }
}
