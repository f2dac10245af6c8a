//! The engine: lanes, reorder buffer and memory ports behind a control-register window.
//!
//! Callers dispatch calls through the window (or directly). Each call becomes a token in lane 0,
//! walks every lane in order, and finishes once it has retired from the last lane and every
//! memory request it issued has been released from the reorder buffer. Hand-off latches between
//! lanes and per-caller result queues hold at most `fifo_capacity` entries; a token whose
//! destination is full stays at its terminal stage, so a slow lane backs up into lane 0 and
//! finally into `dispatch`. One `tick` runs these phases in order:
//! 1. **Absorb:** Responses delivered to downstream ports complete their reorder-buffer entries.
//! 2. **Release:** At most one retire-ready entry leaves the reorder buffer, crediting its call.
//! 3. **Issue:** Unsent requests move, in sequence order, into empty downstream port buffers.
//! 4. **Advance:** Every lane advances; tokens retiring from a lane wait in its output latch.
//! 5. **Hand-off:** Latched tokens enter the next lane, oldest first, while it admits them.
//! 6. **Finish:** Calls with nothing left in flight post their result to the caller.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use tracing::{debug, trace, warn};

use crate::common::addr::{AddrRange, PhysAddr};
use crate::common::constants::{RETCODE_DEFAULT, RETCODE_RUNNING};
use crate::common::error::SimError;
use crate::engine::kernel::StageKernel;
use crate::engine::lane::{Lane, RequestSink, Stall};
use crate::engine::port::{DownstreamPort, MemOp, MemPacket, MemRequest, MemResponse};
use crate::engine::regs::{ControlWindow, Register};
use crate::engine::rob::ReorderBuffer;
use crate::engine::token::{CallerId, Payload, Token, TokenId};
use crate::sim::clock::Cycle;
use crate::soc::traits::ControlTarget;
use crate::stats::EngineStats;

/// A memory request together with the call that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaggedRequest {
    /// Call tag of the issuing token.
    pub call: u64,
    /// The request.
    pub request: MemRequest,
}

/// Outcome of a dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// The call was admitted into lane 0.
    Accepted {
        /// Engine-assigned call tag.
        call: u64,
        /// Token created in lane 0.
        token: TokenId,
    },
    /// Lane 0 refused the token; the caller retries on a later cycle.
    Rejected(Stall),
}

#[derive(Debug, Default)]
struct CallerSlot {
    running: usize,
    /// Calls that left the last lane and hold a result-queue entry they have not filled yet.
    reserved: usize,
    results: VecDeque<u64>,
}

#[derive(Debug)]
struct CallRecord {
    caller: CallerId,
    admitted_at: Cycle,
    outstanding: usize,
    retired: bool,
    result: Option<u64>,
}

/// Where tokens retiring from a lane go.
enum ExitGate<'a> {
    /// Into the lane's hand-off latch, which has `room` free entries this cycle.
    Latch { room: usize },
    /// Out of the engine; each call reserves an entry in its caller's result queue.
    Results {
        callers: &'a mut BTreeMap<CallerId, CallerSlot>,
        depth: usize,
    },
}

struct IssueSink<'a> {
    rob: &'a mut ReorderBuffer<TaggedRequest, MemResponse>,
    calls: &'a mut BTreeMap<u64, CallRecord>,
    stats: &'a mut EngineStats,
    exit: ExitGate<'a>,
}

impl RequestSink for IssueSink<'_> {
    fn issue(&mut self, token: &Token, request: MemRequest) -> Result<(), MemRequest> {
        let call = token.payload().call;
        let tagged = TaggedRequest { call, request };
        let enqueued = if request.posted {
            let ack = MemResponse {
                seq: self.rob.next_seq(),
                port: 0,
                data: request.data,
            };
            self.rob.enqueue_posted(tagged, ack)
        } else {
            self.rob.enqueue(tagged)
        };
        let Some(seq) = enqueued else {
            self.stats.rob_full += 1;
            return Err(request);
        };
        if let Some(record) = self.calls.get_mut(&call) {
            record.outstanding += 1;
        }
        trace!(call, seq = seq.0, addr = request.addr, "request enqueued");
        Ok(())
    }

    fn retire(&mut self, token: &Token) -> bool {
        let admitted = match &mut self.exit {
            ExitGate::Latch { room } => {
                let free = *room > 0;
                if free {
                    *room -= 1;
                }
                free
            }
            ExitGate::Results { callers, depth } => match callers.get_mut(&token.payload().caller) {
                Some(slot) if slot.results.len() + slot.reserved >= *depth => false,
                Some(slot) => {
                    slot.reserved += 1;
                    true
                }
                None => true,
            },
        };
        if !admitted {
            self.stats.retire_stalls += 1;
        }
        admitted
    }
}

/// A memory-mapped accelerator.
pub struct Engine {
    name: String,
    window: ControlWindow,
    num_callers: usize,
    fifo_capacity: usize,
    lanes: Vec<Lane>,
    kernels: Vec<Box<dyn StageKernel>>,
    handoff: Vec<VecDeque<Payload>>,
    rob: ReorderBuffer<TaggedRequest, MemResponse>,
    ports: Vec<DownstreamPort>,
    next_port: usize,
    callers: BTreeMap<CallerId, CallerSlot>,
    operands: BTreeMap<CallerId, (u64, u64)>,
    first_refused: BTreeMap<CallerId, Cycle>,
    calls: BTreeMap<u64, CallRecord>,
    next_call: u64,
    cycle: Cycle,
    stats: EngineStats,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("name", &self.name)
            .field("window", &self.window)
            .field("lanes", &self.lanes)
            .field("rob", &self.rob)
            .field("ports", &self.ports)
            .field("cycle", &self.cycle)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub(crate) fn assemble(
        name: String,
        window: ControlWindow,
        num_callers: usize,
        lanes: Vec<(Lane, Box<dyn StageKernel>)>,
        rob: ReorderBuffer<TaggedRequest, MemResponse>,
        mem_ports: usize,
        fifo_capacity: usize,
    ) -> Self {
        let handoff = lanes.iter().map(|_| VecDeque::new()).collect();
        let (lanes, kernels) = lanes.into_iter().unzip();
        Self {
            name,
            window,
            num_callers,
            fifo_capacity,
            lanes,
            kernels,
            handoff,
            rob,
            ports: vec![DownstreamPort::default(); mem_ports],
            next_port: 0,
            callers: BTreeMap::new(),
            operands: BTreeMap::new(),
            first_refused: BTreeMap::new(),
            calls: BTreeMap::new(),
            next_call: 0,
            cycle: 0,
            stats: EngineStats::default(),
        }
    }

    /// Engine name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Control-register layout.
    pub const fn control_window(&self) -> &ControlWindow {
        &self.window
    }

    /// Addresses of the control window, for registration with the address map.
    pub const fn address_range(&self) -> AddrRange {
        self.window.range()
    }

    /// Number of callers; valid ids are `0..num_callers`.
    pub const fn num_callers(&self) -> usize {
        self.num_callers
    }

    /// Callers currently holding a slot.
    pub fn active_callers(&self) -> usize {
        self.callers.len()
    }

    /// Calls admitted but not yet finished.
    pub fn running_calls(&self) -> usize {
        self.calls.len()
    }

    /// Current engine cycle, as set by `begin_cycle` or the last `tick`.
    pub const fn cycle(&self) -> Cycle {
        self.cycle
    }

    /// Lanes in execution order.
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    /// The reorder buffer.
    pub const fn rob(&self) -> &ReorderBuffer<TaggedRequest, MemResponse> {
        &self.rob
    }

    /// Downstream port buffers.
    pub fn ports(&self) -> &[DownstreamPort] {
        &self.ports
    }

    /// Mutable access to one downstream port, for the system to move packets.
    pub fn port_mut(&mut self, port: usize) -> Option<&mut DownstreamPort> {
        self.ports.get_mut(port)
    }

    /// Statistics gathered so far.
    pub const fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Returns true while any call, token, request or port buffer is live.
    pub fn is_busy(&self) -> bool {
        !self.calls.is_empty()
            || !self.rob.is_empty()
            || self.lanes.iter().any(|l| !l.is_empty())
            || self.handoff.iter().any(|h| !h.is_empty())
            || self.ports.iter().any(DownstreamPort::is_busy)
    }

    /// Dispatches a call with no operands.
    pub fn dispatch(&mut self, caller: CallerId, command: u64) -> Result<Dispatch, SimError> {
        self.dispatch_with(caller, command, 0, 0)
    }

    /// Dispatches a call into lane 0.
    ///
    /// # Arguments
    ///
    /// * `caller` - Issuing caller.
    /// * `command` - Command word.
    /// * `addr` - Address operand.
    /// * `data` - Data operand.
    ///
    /// # Returns
    ///
    /// `Dispatch::Accepted` with the call tag, or the lane stall that refused it. Refusal is
    /// backpressure; the caller retries on a later cycle. A caller id outside
    /// `0..num_callers` is `SimError::CallerOutOfRange`.
    pub fn dispatch_with(
        &mut self,
        caller: CallerId,
        command: u64,
        addr: u64,
        data: u64,
    ) -> Result<Dispatch, SimError> {
        let cycle = self.cycle;
        if caller as usize >= self.num_callers {
            return Err(SimError::CallerOutOfRange {
                caller,
                num_callers: self.num_callers,
            });
        }

        let call = self.next_call;
        let payload = Payload {
            call,
            caller,
            command,
            addr,
            data,
        };
        let token = match self.lanes[0].admit(payload, cycle) {
            Ok(token) => token,
            Err(stall) => {
                self.stats.rejected += 1;
                match stall {
                    Stall::Full => self.stats.stalls_full += 1,
                    Stall::Interval => self.stats.stalls_interval += 1,
                    Stall::Blocked => self.stats.stalls_blocked += 1,
                }
                let _ = self.first_refused.entry(caller).or_insert(cycle);
                return Ok(Dispatch::Rejected(stall));
            }
        };

        self.next_call += 1;
        self.callers.entry(caller).or_default().running += 1;
        let waited = self
            .first_refused
            .remove(&caller)
            .map_or(0, |first| cycle - first);
        self.stats.waittime.record(waited);
        self.stats.dispatched += 1;
        let _ = self.calls.insert(
            call,
            CallRecord {
                caller,
                admitted_at: cycle,
                outstanding: 0,
                retired: false,
                result: None,
            },
        );
        debug!(engine = %self.name, caller, call, command, "call dispatched");
        Ok(Dispatch::Accepted { call, token })
    }

    /// Pops the next posted result of `caller`.
    ///
    /// # Returns
    ///
    /// `Some(result)` for a finished call, `None` while calls are still running, or
    /// `SimError::UnknownCaller` if the caller holds no slot.
    pub fn poll(&mut self, caller: CallerId) -> Result<Option<u64>, SimError> {
        let slot = self
            .callers
            .get_mut(&caller)
            .ok_or(SimError::UnknownCaller { caller })?;
        let result = slot.results.pop_front();
        if slot.running == 0 && slot.results.is_empty() {
            let _ = self.callers.remove(&caller);
            debug!(engine = %self.name, caller, "caller slot released");
        }
        Ok(result)
    }

    /// Sets the cycle that dispatches are stamped with until the next `tick`.
    ///
    /// The system calls this before serving register operations of a cycle, so calls
    /// dispatched during cycle `c` start counting at `c + 1` like any other admission.
    pub fn begin_cycle(&mut self, cycle: Cycle) {
        self.cycle = self.cycle.max(cycle);
    }

    /// Runs one engine cycle.
    ///
    /// # Arguments
    ///
    /// * `cycle` - The engine-clock cycle being simulated; call once per cycle.
    pub fn tick(&mut self, cycle: Cycle) -> Result<(), SimError> {
        self.cycle = cycle;
        self.stats.cycles += 1;
        if !self.calls.is_empty() {
            self.stats.busy_cycles += 1;
        }
        if self.ports.iter().any(|p| p.req_buf.is_some()) {
            self.stats.blocked_cycles += 1;
        }

        self.absorb_responses()?;
        self.release_one()?;
        self.issue_requests()?;
        self.advance_lanes(cycle)?;
        self.retry_handoffs(cycle);
        self.finish_calls();
        Ok(())
    }

    fn absorb_responses(&mut self) -> Result<(), SimError> {
        for port in &mut self.ports {
            if let Some(response) = port.resp_buf.take() {
                self.rob.complete(response.seq, response)?;
            }
        }
        Ok(())
    }

    fn release_one(&mut self) -> Result<(), SimError> {
        // Posted entries complete on arrival but must still leave before release.
        let Some(seq) = self.rob.retire_ready().filter(|e| e.sent).map(|e| e.seq) else {
            return Ok(());
        };
        let entry = self.rob.release(seq)?;
        self.stats.mem_released += 1;
        let record = self
            .calls
            .get_mut(&entry.request.call)
            .ok_or(SimError::OrphanResponse { seq: seq.0 })?;
        record.outstanding = record.outstanding.saturating_sub(1);
        if entry.request.request.op == MemOp::Load {
            record.result = entry.response.map(|r| r.data);
        }
        trace!(engine = %self.name, seq = seq.0, call = entry.request.call, "response released");
        Ok(())
    }

    fn issue_requests(&mut self) -> Result<(), SimError> {
        let count = self.ports.len();
        for i in 0..count {
            let port = (self.next_port + i) % count;
            if self.ports[port].req_buf.is_some() {
                continue;
            }
            let Some((seq, request)) = self.rob.next_unsent().map(|e| (e.seq, e.request.request)) else {
                break;
            };
            self.rob.mark_sent(seq)?;
            self.ports[port].req_buf = Some(MemPacket { seq, port, request });
            self.stats.mem_issued += 1;
            self.next_port = (port + 1) % count;
        }
        Ok(())
    }

    fn advance_lanes(&mut self, cycle: Cycle) -> Result<(), SimError> {
        let last = self.lanes.len() - 1;
        for i in 0..self.lanes.len() {
            let exit = if i == last {
                ExitGate::Results {
                    callers: &mut self.callers,
                    depth: self.fifo_capacity,
                }
            } else {
                ExitGate::Latch {
                    room: self.fifo_capacity.saturating_sub(self.handoff[i].len()),
                }
            };
            let mut sink = IssueSink {
                rob: &mut self.rob,
                calls: &mut self.calls,
                stats: &mut self.stats,
                exit,
            };
            let retired = self.lanes[i].advance(cycle, self.kernels[i].as_mut(), &mut sink)?;
            for token in retired {
                if i == last {
                    if let Some(record) = self.calls.get_mut(&token.payload().call) {
                        record.retired = true;
                    }
                } else {
                    self.handoff[i].push_back(token.into_payload());
                }
            }
        }
        Ok(())
    }

    /// Admits latched tokens of lane `i` into lane `i + 1`, oldest first, until one is refused.
    fn retry_handoffs(&mut self, cycle: Cycle) {
        for i in 1..self.lanes.len() {
            while let Some(&payload) = self.handoff[i - 1].front() {
                if let Err(stall) = self.lanes[i].admit(payload, cycle) {
                    trace!(engine = %self.name, lane = i, ?stall, "hand-off latched");
                    break;
                }
                let _ = self.handoff[i - 1].pop_front();
            }
        }
    }

    fn finish_calls(&mut self) {
        let done: Vec<u64> = self
            .calls
            .iter()
            .filter(|(_, r)| r.retired && r.outstanding == 0)
            .map(|(&call, _)| call)
            .collect();
        for call in done {
            let Some(record) = self.calls.remove(&call) else {
                continue;
            };
            let result = record.result.unwrap_or(RETCODE_DEFAULT);
            self.stats.exectime.record(self.cycle - record.admitted_at);
            self.stats.finished += 1;
            match self.callers.get_mut(&record.caller) {
                Some(slot) => {
                    slot.running = slot.running.saturating_sub(1);
                    slot.reserved = slot.reserved.saturating_sub(1);
                    slot.results.push_back(result);
                }
                None => warn!(engine = %self.name, caller = record.caller, "finished call has no caller slot"),
            }
            debug!(engine = %self.name, call, caller = record.caller, result, "call finished");
        }
    }
}

impl ControlTarget for Engine {
    fn name(&self) -> &str {
        &self.name
    }

    fn window(&self) -> AddrRange {
        self.window.range()
    }

    fn read_reg(&mut self, addr: PhysAddr) -> Result<u64, SimError> {
        let value = match self.window.decode(addr)? {
            Register::Status => self.calls.len() as u64,
            Register::Arg(caller) => self.poll(caller)?.unwrap_or(RETCODE_RUNNING),
            Register::Addr(caller) => self.operands.get(&caller).map_or(0, |&(a, _)| a),
            Register::Data(caller) => self.operands.get(&caller).map_or(0, |&(_, d)| d),
        };
        debug!(engine = %self.name, addr = addr.val(), value, "register read");
        Ok(value)
    }

    fn write_reg(&mut self, addr: PhysAddr, value: u64) -> Result<bool, SimError> {
        debug!(engine = %self.name, addr = addr.val(), value, "register write");
        match self.window.decode(addr)? {
            Register::Status => Err(SimError::UndefinedRegister { addr: addr.val() }),
            Register::Arg(caller) => {
                let (a, d) = self.operands.get(&caller).copied().unwrap_or_default();
                let dispatch = self.dispatch_with(caller, value, a, d)?;
                Ok(matches!(dispatch, Dispatch::Accepted { .. }))
            }
            Register::Addr(caller) => {
                self.operands.entry(caller).or_default().0 = value;
                Ok(true)
            }
            Register::Data(caller) => {
                self.operands.entry(caller).or_default().1 = value;
                Ok(true)
            }
        }
    }
}
