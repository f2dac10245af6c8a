//! Physical address and address range types.
//!
//! This module defines strong types for addresses seen by the engine's control
//! window and the memory side. It provides the following:
//! 1. **Type Safety:** Distinguishes addresses from plain counters and data words.
//! 2. **Ranges:** Half-open `[base, base + size)` ranges with containment, offset and overlap checks.

use crate::common::error::ConfigError;

/// A physical address as seen on the host interconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    ///
    /// # Arguments
    ///
    /// * `addr` - The raw 64-bit address value.
    ///
    /// # Returns
    ///
    /// A new `PhysAddr` instance wrapping the provided address.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }
}

/// A half-open physical address range `[base, base + size)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddrRange {
    base: u64,
    size: u64,
}

impl AddrRange {
    /// Creates a range, rejecting empty ranges and ranges that wrap the address space.
    ///
    /// # Arguments
    ///
    /// * `name` - Name used in the error if the range is invalid.
    /// * `base` - First address of the range.
    /// * `size` - Number of bytes covered.
    ///
    /// # Returns
    ///
    /// The range, or a `ConfigError` describing why it cannot exist.
    pub fn new(name: &str, base: u64, size: u64) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::ZeroParameter {
                what: format!("size of address range `{name}`"),
            });
        }
        if base.checked_add(size).is_none() {
            return Err(ConfigError::RangeOverflow {
                name: name.to_owned(),
                base,
                size,
            });
        }
        Ok(Self { base, size })
    }

    /// First address of the range.
    #[inline]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Number of bytes covered.
    #[inline]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// One past the last address of the range.
    #[inline]
    pub const fn end(&self) -> u64 {
        self.base + self.size
    }

    /// Returns true if `addr` lies inside the range.
    #[inline]
    pub const fn contains(&self, addr: PhysAddr) -> bool {
        addr.0 >= self.base && addr.0 < self.end()
    }

    /// Returns the offset of `addr` from the base, or `None` if outside.
    #[inline]
    pub const fn offset_of(&self, addr: PhysAddr) -> Option<u64> {
        if self.contains(addr) {
            Some(addr.0 - self.base)
        } else {
            None
        }
    }

    /// Returns true if the two ranges share at least one address.
    #[inline]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.base < other.end() && other.base < self.end()
    }
}
