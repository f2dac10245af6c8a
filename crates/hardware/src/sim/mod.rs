//! Simulation time and top-level driver.
//!
//! This module provides:
//! 1. **Clocks:** `ClockDomain` with tick/cycle and edge arithmetic.
//! 2. **Scheduling:** `Scheduler`, which steps several domains in global time order.
//! 3. **Driver:** `Simulator`, which runs a `System` under the scheduler.

/// Clock domains and tick/cycle conversion.
pub mod clock;
/// Edge scheduler across clock domains.
pub mod scheduler;
/// Top-level simulation driver.
pub mod simulator;

pub use clock::{ClockDomain, Cycle, Tick};
pub use scheduler::{DomainId, Edge, Scheduler};
pub use simulator::Simulator;
