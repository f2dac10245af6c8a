//! Cycle-level accelerator simulation library.
//!
//! This crate models a memory-mapped accelerator ("engine") attached to a host through
//! independently clocked domains, with the following:
//! 1. **Engine:** Lanes of timed stage graphs, a reorder buffer for memory requests, caller
//!    slots and a control-register window.
//! 2. **Crossings:** Credit-based clock-domain crossing queues with optional snoop channels.
//! 3. **SoC:** Address map, memory side with simple or DRAM timing, and system assembly.
//! 4. **Simulation:** Clock domains, an edge scheduler and the top-level driver.
//! 5. **Support:** Configuration, errors and statistics.

/// Common types and constants (addresses, register layout, errors).
pub mod common;
/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// The accelerator engine (lanes, reorder buffer, ports, control registers).
pub mod engine;
/// Clock domains, scheduler and simulation driver.
pub mod sim;
/// System components (crossings, address map, memory, builder).
pub mod soc;
/// Engine statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or parse JSON with `Config::from_json`.
pub use crate::config::Config;
/// The accelerator; build with `EngineBuilder`.
pub use crate::engine::{Engine, EngineBuilder};
/// Top-level driver owning a `System` and the scheduler.
pub use crate::sim::Simulator;
/// Top-level system (engine, crossings, memory); construct with `System::new`.
pub use crate::soc::System;
