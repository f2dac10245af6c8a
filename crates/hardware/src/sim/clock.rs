//! Clock domains and tick/cycle arithmetic.
//!
//! Global simulated time is measured in ticks. Every clocked component belongs to a
//! `ClockDomain` whose period is a whole number of ticks, so domains running at different
//! frequencies stay related by rational ratios. This module provides:
//! 1. **Conversion:** Tick to cycle and cycle to tick for a given domain.
//! 2. **Edge arithmetic:** The tick of the n-th edge at or after a given tick.
//! 3. **Ratios:** The rounded-up number of cycles one domain needs to cover another's period.

use crate::common::error::ConfigError;

/// Global simulated time.
pub type Tick = u64;

/// Cycle count within one clock domain.
pub type Cycle = u64;

/// A named clock with a fixed period in ticks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClockDomain {
    name: String,
    period: Tick,
}

impl ClockDomain {
    /// Creates a clock domain.
    ///
    /// # Arguments
    ///
    /// * `name` - Name used in logs.
    /// * `period` - Clock period in ticks; must be non-zero.
    ///
    /// # Returns
    ///
    /// The domain, or `ConfigError::ZeroParameter` for a zero period.
    pub fn new(name: impl Into<String>, period: Tick) -> Result<Self, ConfigError> {
        let name = name.into();
        if period == 0 {
            return Err(ConfigError::ZeroParameter {
                what: format!("period of clock `{name}`"),
            });
        }
        Ok(Self { name, period })
    }

    /// Domain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clock period in ticks.
    #[inline]
    pub const fn period(&self) -> Tick {
        self.period
    }

    /// Returns the cycle in progress at `tick`.
    #[inline]
    pub const fn cycle_at(&self, tick: Tick) -> Cycle {
        tick / self.period
    }

    /// Returns the tick at which `cycle` begins.
    #[inline]
    pub const fn ticks(&self, cycle: Cycle) -> Tick {
        cycle * self.period
    }

    /// Returns the first edge at or after `tick`.
    #[inline]
    pub const fn edge_at_or_after(&self, tick: Tick) -> Tick {
        tick.div_ceil(self.period) * self.period
    }

    /// Returns the tick of the `n`-th edge after the first edge at or after `tick`.
    ///
    /// `clock_edge(t, 0)` is the edge that samples a signal raised at `t`.
    #[inline]
    pub const fn clock_edge(&self, tick: Tick, n: Cycle) -> Tick {
        self.edge_at_or_after(tick) + n * self.period
    }

    /// Returns true if `tick` falls exactly on an edge of this clock.
    #[inline]
    pub const fn is_edge(&self, tick: Tick) -> bool {
        tick % self.period == 0
    }

    /// Number of this domain's cycles needed to span one cycle of `other`, rounded up.
    ///
    /// A 333-tick host clock needs 4 of its cycles to cover one 1000-tick engine cycle.
    #[inline]
    pub const fn ratio_ceil(&self, other: &Self) -> Cycle {
        other.period.div_ceil(self.period)
    }
}
