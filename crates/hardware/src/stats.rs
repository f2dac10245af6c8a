//! Engine statistics collection and reporting.
//!
//! This module tracks performance counters of one engine. It provides:
//! 1. **Traffic:** Dispatched, rejected and finished calls; memory requests issued and released.
//! 2. **Latency samples:** Wait time (first refused attempt to admission) and exec time (admission to finish).
//! 3. **Occupancy:** Busy cycles with at least one call running, and cycles blocked on a full crossing.
//! 4. **Stalls:** Lane admissions refused by reason, held retirements and reorder-buffer full events.

use std::fmt;

/// Running count, total and maximum of a cycle-valued sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sample {
    /// Number of samples.
    pub count: u64,
    /// Sum of all samples.
    pub total: u64,
    /// Largest sample.
    pub max: u64,
}

impl Sample {
    /// Records one value.
    pub fn record(&mut self, value: u64) {
        self.count += 1;
        self.total += value;
        self.max = self.max.max(value);
    }

    /// Mean of the recorded values, or 0 with no samples.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total as f64 / self.count as f64
        }
    }
}

/// Counters for one engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineStats {
    /// Engine cycles simulated.
    pub cycles: u64,
    /// Calls accepted into lane 0.
    pub dispatched: u64,
    /// Calls finished and posted to their caller.
    pub finished: u64,
    /// Dispatches refused by lane 0, for any stall reason.
    pub rejected: u64,
    /// Admissions refused because a lane was at capacity.
    pub stalls_full: u64,
    /// Admissions refused by a pipelined lane's initiation interval.
    pub stalls_interval: u64,
    /// Admissions refused by a frozen pipelined lane.
    pub stalls_blocked: u64,
    /// Tokens held at their terminal stage by a full hand-off latch or result queue.
    pub retire_stalls: u64,
    /// Requests refused because the reorder buffer was full.
    pub rob_full: u64,
    /// Requests handed to a downstream port.
    pub mem_issued: u64,
    /// Responses released from the reorder buffer in order.
    pub mem_released: u64,
    /// Cycles with at least one call running.
    pub busy_cycles: u64,
    /// Cycles a downstream port held a request the crossing would not take.
    pub blocked_cycles: u64,
    /// Cycles from a caller's first refused dispatch attempt to admission; 0 when admitted at once.
    pub waittime: Sample,
    /// Cycles from admission into lane 0 to the call's result being posted.
    pub exectime: Sample,
}

impl fmt::Display for EngineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==========================================================")?;
        writeln!(f, "ENGINE STATISTICS")?;
        writeln!(f, "==========================================================")?;
        writeln!(f, "sim_cycles               {}", self.cycles)?;
        writeln!(f, "calls.dispatched         {}", self.dispatched)?;
        writeln!(f, "calls.finished           {}", self.finished)?;
        writeln!(f, "calls.rejected           {}", self.rejected)?;
        writeln!(f, "busytime                 {}", self.busy_cycles)?;
        writeln!(f, "blocktime                {}", self.blocked_cycles)?;
        writeln!(
            f,
            "waittime                 mean {:.2} max {} ({} samples)",
            self.waittime.mean(),
            self.waittime.max,
            self.waittime.count
        )?;
        writeln!(
            f,
            "exectime                 mean {:.2} max {} ({} samples)",
            self.exectime.mean(),
            self.exectime.max,
            self.exectime.count
        )?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "STALLS")?;
        writeln!(f, "  lane.full              {}", self.stalls_full)?;
        writeln!(f, "  lane.interval          {}", self.stalls_interval)?;
        writeln!(f, "  lane.blocked           {}", self.stalls_blocked)?;
        writeln!(f, "  lane.retire            {}", self.retire_stalls)?;
        writeln!(f, "  rob.full               {}", self.rob_full)?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "MEMORY")?;
        writeln!(f, "  requests.issued        {}", self.mem_issued)?;
        write!(f, "  responses.released     {}", self.mem_released)
    }
}
