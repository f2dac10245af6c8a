//! Address decode for the host interconnect.
//!
//! This module implements the map that routes physical addresses to the component owning
//! them. It provides:
//! 1. **Registration:** Named, non-empty ranges; a range overlapping an existing one is rejected.
//! 2. **Decode:** Address to owning region and offset, by binary search over sorted ranges.
//!
//! The engine's control window is registered here at system build time, which guarantees the
//! window is owned exclusively by the engine.

use tracing::debug;

use crate::common::addr::{AddrRange, PhysAddr};
use crate::common::error::ConfigError;

/// Handle returned when a range is registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegionId(pub usize);

/// A registered address range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    /// Owner name.
    pub name: String,
    /// Covered addresses.
    pub range: AddrRange,
    /// Handle given out at registration.
    pub id: RegionId,
}

/// Map from physical addresses to their owners.
#[derive(Clone, Debug, Default)]
pub struct AddressMap {
    /// Regions sorted by base address.
    regions: Vec<Region>,
    next_id: usize,
}

impl AddressMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a range for exclusive ownership.
    ///
    /// # Arguments
    ///
    /// * `name` - Owner name, used in errors.
    /// * `range` - Addresses to claim.
    ///
    /// # Returns
    ///
    /// The region handle, or `ConfigError::OverlappingRange` naming the existing owner.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        range: AddrRange,
    ) -> Result<RegionId, ConfigError> {
        let name = name.into();
        if let Some(other) = self.regions.iter().find(|r| r.range.overlaps(&range)) {
            return Err(ConfigError::OverlappingRange {
                name,
                base: range.base(),
                size: range.size(),
                other: other.name.clone(),
            });
        }
        let id = RegionId(self.next_id);
        self.next_id += 1;
        debug!(region = %name, base = range.base(), size = range.size(), "address range registered");
        let at = self
            .regions
            .partition_point(|r| r.range.base() < range.base());
        self.regions.insert(at, Region { name, range, id });
        Ok(id)
    }

    /// Finds the region containing `addr` and the offset within it.
    pub fn decode(&self, addr: PhysAddr) -> Option<(&Region, u64)> {
        let idx = self
            .regions
            .partition_point(|r| r.range.base() <= addr.val())
            .checked_sub(1)?;
        let region = &self.regions[idx];
        region.range.offset_of(addr).map(|offset| (region, offset))
    }

    /// Returns the region registered under `id`.
    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Registered regions, sorted by base address.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}
