//! # Simulation Time
//!
//! Clock arithmetic, multi-domain scheduling and the top-level driver.

/// Tick/cycle conversion and edge arithmetic.
pub mod clock;
