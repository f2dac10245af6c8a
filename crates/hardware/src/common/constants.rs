//! Engine constants.
//!
//! This module defines values observed through the control-register window. It includes:
//! 1. **Return Codes:** Values read back from a caller's argument register.
//! 2. **Register Layout:** Per-region register indices and the register width.

/// Value read from a caller's `ARG` register while its call is still running.
pub const RETCODE_RUNNING: u64 = 0;

/// Result posted for a call that finished without producing a value.
pub const RETCODE_DEFAULT: u64 = u64::MAX;

/// Width of one control register in bytes.
pub const REG_BYTES: u64 = 8;

/// Number of regions in the control window besides the per-caller regions.
///
/// Region 0 holds the engine-global registers.
pub const GLOBAL_REGIONS: u64 = 1;

/// Global register: number of calls currently running (read-only).
pub const REG_STATUS: u64 = 0;

/// Caller register: write dispatches a call, read pops a result.
pub const REG_ARG: u64 = 0;

/// Caller register: address operand.
pub const REG_ADDR: u64 = 1;

/// Caller register: data operand.
pub const REG_DATA: u64 = 2;

/// Smallest caller region: `ARG`, `ADDR` and `DATA`.
pub const MIN_REGS_PER_CALLER: u64 = 3;
