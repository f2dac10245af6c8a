//! Trait for components that own a control-register window.
//!
//! The surrounding system routes host register accesses through the address map to the
//! owner of the decoded window. Accesses use absolute physical addresses; the owner is
//! responsible for rejecting addresses it does not define.

use crate::common::addr::{AddrRange, PhysAddr};
use crate::common::error::SimError;

/// A component reachable through memory-mapped control registers.
pub trait ControlTarget {
    /// Returns a short name for this component (e.g., `"engine"`).
    fn name(&self) -> &str;

    /// Returns the window of physical addresses this component owns.
    fn window(&self) -> AddrRange;

    /// Reads the register at `addr`.
    fn read_reg(&mut self, addr: PhysAddr) -> Result<u64, SimError>;

    /// Writes `value` to the register at `addr`.
    ///
    /// Returns `Ok(false)` when the write was refused by backpressure and must be retried.
    fn write_reg(&mut self, addr: PhysAddr, value: u64) -> Result<bool, SimError>;
}
