//! Control-register window layout.
//!
//! The window is split into `num_callers + 1` regions of `regs_per_caller` 8-byte registers.
//! Region 0 holds engine-global registers; region `k + 1` belongs to caller `k`.

use crate::common::addr::{AddrRange, PhysAddr};
use crate::common::constants::{GLOBAL_REGIONS, REG_ADDR, REG_ARG, REG_BYTES, REG_DATA, REG_STATUS};
use crate::common::error::{ConfigError, SimError};
use crate::config::EngineConfig;
use crate::engine::token::CallerId;

/// A decoded control register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Register {
    /// Global: number of running calls.
    Status,
    /// Caller: dispatch on write, result on read.
    Arg(CallerId),
    /// Caller: address operand.
    Addr(CallerId),
    /// Caller: data operand.
    Data(CallerId),
}

/// Address layout of an engine's control registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlWindow {
    range: AddrRange,
    stride: u64,
}

impl ControlWindow {
    /// Computes the window for an engine configuration.
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            range: config.window()?,
            stride: config.stride(),
        })
    }

    /// Addresses covered by the window.
    pub const fn range(&self) -> AddrRange {
        self.range
    }

    /// Bytes per region.
    pub const fn stride(&self) -> u64 {
        self.stride
    }

    /// Maps an address to the register it names.
    ///
    /// Fails with `OutsideWindow` for addresses outside the window and `UndefinedRegister` for
    /// misaligned or unassigned offsets inside it.
    pub fn decode(&self, addr: PhysAddr) -> Result<Register, SimError> {
        let offset = self
            .range
            .offset_of(addr)
            .ok_or(SimError::OutsideWindow { addr: addr.val() })?;
        let undefined = SimError::UndefinedRegister { addr: addr.val() };
        if offset % REG_BYTES != 0 {
            return Err(undefined);
        }
        let region = offset / self.stride;
        let index = (offset % self.stride) / REG_BYTES;
        if region < GLOBAL_REGIONS {
            return match index {
                REG_STATUS => Ok(Register::Status),
                _ => Err(undefined),
            };
        }
        let caller = (region - GLOBAL_REGIONS) as CallerId;
        match index {
            REG_ARG => Ok(Register::Arg(caller)),
            REG_ADDR => Ok(Register::Addr(caller)),
            REG_DATA => Ok(Register::Data(caller)),
            _ => Err(undefined),
        }
    }

    /// Physical address of `reg`.
    pub const fn address_of(&self, reg: Register) -> PhysAddr {
        let (region, index) = match reg {
            Register::Status => (0, REG_STATUS),
            Register::Arg(c) => (c as u64 + GLOBAL_REGIONS, REG_ARG),
            Register::Addr(c) => (c as u64 + GLOBAL_REGIONS, REG_ADDR),
            Register::Data(c) => (c as u64 + GLOBAL_REGIONS, REG_DATA),
        };
        PhysAddr(self.range.base() + region * self.stride + index * REG_BYTES)
    }
}
