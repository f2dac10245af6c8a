//! Common types shared by every simulator component.
//!
//! This module provides the building blocks used across the engine, the
//! clock-domain crossing and the memory side. It includes:
//! 1. **Address Types:** Physical addresses and half-open address ranges.
//! 2. **Constants:** Return codes and control-register indices.
//! 3. **Error Handling:** Build-time configuration errors and fatal runtime invariant violations.

/// Address type definitions (physical addresses and ranges).
pub mod addr;

/// Return codes and register layout constants.
pub mod constants;

/// Configuration and simulation error types.
pub mod error;

pub use addr::{AddrRange, PhysAddr};
pub use error::{ConfigError, SimError};
