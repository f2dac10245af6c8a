//! Configuration system for the accelerator simulator.
//!
//! This module defines every structure used to parameterize a simulation. It provides:
//! 1. **Defaults:** Baseline clock periods, engine window, lane, buffer and queue sizes.
//! 2. **Structures:** Hierarchical config for clocks, engine, lanes, reorder buffer, crossing queue and memory.
//! 3. **Enums:** Lane flavor and memory controller types.
//! 4. **Loading and validation:** JSON parsing plus the build-time checks run before any component exists.
//!
//! Configuration is supplied as JSON or built with `Config::default()` and is immutable once a
//! `System` has been built from it.

use std::path::Path;

use serde::Deserialize;

use crate::common::addr::AddrRange;
use crate::common::constants::{GLOBAL_REGIONS, MIN_REGS_PER_CALLER, REG_BYTES};
use crate::common::error::ConfigError;
use crate::engine::lane::TransitionTable;

/// Default configuration constants for the simulator.
///
/// These values define the baseline engine when not explicitly overridden.
mod defaults {
    /// Host clock period in ticks (2 GHz with 1 tick = 1 ps).
    pub const HOST_PERIOD: u64 = 500;

    /// Engine clock period in ticks (1 GHz).
    pub const ENGINE_PERIOD: u64 = 1000;

    /// Memory-side clock period in ticks (2 GHz).
    pub const MEMORY_PERIOD: u64 = 500;

    /// Base address of the engine's control-register window.
    pub const ENGINE_BASE: u64 = 0xE_0000_0000;

    /// Number of callers; caller ids run from 0 to `NUM_CALLERS - 1`.
    pub const NUM_CALLERS: u64 = 64;

    /// Registers in each caller's region of the control window.
    ///
    /// Each register is 8 bytes wide, so a region spans 64 bytes.
    pub const REGS_PER_CALLER: u64 = 8;

    /// Number of downstream memory ports.
    pub const MEM_PORTS: usize = 1;

    /// Depth of each inter-lane hand-off latch and of each caller's result queue.
    pub const ENGINE_FIFO_CAPACITY: usize = 64;

    /// In-flight tokens per lane.
    pub const LANE_CAPACITY: usize = 1;

    /// Initiation interval of pipelined lanes.
    pub const LANE_INTERVAL: u64 = 1;

    /// Reorder buffer entries.
    pub const ROB_CAPACITY: usize = 64;

    /// Synchronizer stages of the clock-domain crossing.
    ///
    /// Measured in cycles of the receiving clock.
    pub const FIFO_STAGE: u64 = 2;

    /// Entries per direction of the clock-domain crossing.
    pub const FIFO_CAPACITY: usize = 64;

    /// Entries per direction of the snoop channel.
    pub const SNOOP_CAPACITY: usize = 8;

    /// Fixed access latency of the simple memory controller, in memory cycles.
    pub const MEMORY_LATENCY: u64 = 10;

    /// CAS (Column Access Strobe) latency in DRAM cycles.
    pub const T_CAS: u64 = 14;

    /// RAS (Row Access Strobe) latency in DRAM cycles.
    pub const T_RAS: u64 = 14;

    /// Precharge latency in DRAM cycles.
    pub const T_PRE: u64 = 14;
}

/// Lane flavor as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneKindConfig {
    /// Tokens progress independently.
    #[default]
    Simple,
    /// In-order pipeline with an initiation interval.
    Pipelined,
}

/// Memory controller implementation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum MemoryController {
    /// Every access takes the same number of cycles.
    #[default]
    Simple,
    /// Row-buffer aware DRAM timing (CAS, RAS, precharge).
    #[serde(alias = "DRAM")]
    Dram,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use accelsim_core::config::Config;
///
/// let json = r#"{ "rob": { "capacity": 4 }, "async_fifo": { "stage": 3 } }"#;
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.rob.capacity, 4);
/// assert_eq!(config.async_fifo.stage, 3);
/// assert_eq!(config.lanes.len(), 1);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Clock periods of the three domains.
    #[serde(default)]
    pub clocks: ClockConfig,
    /// Engine window and caller limits.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Lanes in execution order; lane 0 receives dispatched calls.
    #[serde(default = "Config::default_lanes")]
    pub lanes: Vec<LaneConfig>,
    /// Reorder buffer sizing.
    #[serde(default)]
    pub rob: RobConfig,
    /// Clock-domain crossing parameters, shared by the host and memory crossings.
    #[serde(default)]
    pub async_fifo: AsyncFifoConfig,
    /// Memory-side timing.
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Config {
    fn default_lanes() -> Vec<LaneConfig> {
        vec![LaneConfig::default()]
    }

    /// Parses a configuration from JSON text; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Runs every build-time check without constructing components.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clocks.validate()?;
        self.engine.validate()?;
        if self.lanes.is_empty() {
            return Err(ConfigError::NoLanes);
        }
        for lane in &self.lanes {
            lane.validate()?;
        }
        self.rob.validate()?;
        self.async_fifo.validate()?;
        self.memory.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            clocks: ClockConfig::default(),
            engine: EngineConfig::default(),
            lanes: Self::default_lanes(),
            rob: RobConfig::default(),
            async_fifo: AsyncFifoConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

/// Clock periods in ticks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClockConfig {
    /// Host-side clock period.
    #[serde(default = "ClockConfig::default_host_period")]
    pub host_period: u64,
    /// Engine clock period; lane latencies are counted in this clock.
    #[serde(default = "ClockConfig::default_engine_period")]
    pub engine_period: u64,
    /// Memory-side clock period.
    #[serde(default = "ClockConfig::default_memory_period")]
    pub memory_period: u64,
}

impl ClockConfig {
    const fn default_host_period() -> u64 {
        defaults::HOST_PERIOD
    }

    const fn default_engine_period() -> u64 {
        defaults::ENGINE_PERIOD
    }

    const fn default_memory_period() -> u64 {
        defaults::MEMORY_PERIOD
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (what, period) in [
            ("host clock period", self.host_period),
            ("engine clock period", self.engine_period),
            ("memory clock period", self.memory_period),
        ] {
            if period == 0 {
                return Err(ConfigError::ZeroParameter {
                    what: what.to_owned(),
                });
            }
        }
        Ok(())
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            host_period: defaults::HOST_PERIOD,
            engine_period: defaults::ENGINE_PERIOD,
            memory_period: defaults::MEMORY_PERIOD,
        }
    }
}

/// Engine window and caller limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Base address of the control-register window.
    #[serde(default = "EngineConfig::default_base_addr")]
    pub base_addr: u64,
    /// Number of callers; ids at or above it are fatal.
    #[serde(default = "EngineConfig::default_num_callers")]
    pub num_callers: u64,
    /// Registers per caller region.
    #[serde(default = "EngineConfig::default_regs_per_caller")]
    pub regs_per_caller: u64,
    /// Number of downstream memory ports.
    #[serde(default = "EngineConfig::default_mem_ports")]
    pub mem_ports: usize,
    /// Entries per inter-lane hand-off latch and per caller result queue.
    #[serde(default = "EngineConfig::default_fifo_capacity")]
    pub fifo_capacity: usize,
}

impl EngineConfig {
    const fn default_base_addr() -> u64 {
        defaults::ENGINE_BASE
    }

    const fn default_num_callers() -> u64 {
        defaults::NUM_CALLERS
    }

    const fn default_regs_per_caller() -> u64 {
        defaults::REGS_PER_CALLER
    }

    const fn default_mem_ports() -> usize {
        defaults::MEM_PORTS
    }

    const fn default_fifo_capacity() -> usize {
        defaults::ENGINE_FIFO_CAPACITY
    }

    /// Bytes spanned by one region of the control window.
    pub const fn stride(&self) -> u64 {
        self.regs_per_caller * REG_BYTES
    }

    /// The control-register window `[base, base + (num_callers + 1) * stride)`.
    pub fn window(&self) -> Result<AddrRange, ConfigError> {
        let size = self
            .num_callers
            .checked_add(GLOBAL_REGIONS)
            .and_then(|regions| regions.checked_mul(self.stride()))
            .ok_or_else(|| ConfigError::RangeOverflow {
                name: "engine control window".to_owned(),
                base: self.base_addr,
                size: u64::MAX,
            })?;
        AddrRange::new("engine control window", self.base_addr, size)
    }

    /// Checks caller, register, port and queue sizing, then the window itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_callers == 0 {
            return Err(ConfigError::ZeroParameter {
                what: "engine.num_callers".to_owned(),
            });
        }
        if self.regs_per_caller < MIN_REGS_PER_CALLER {
            return Err(ConfigError::TooSmall {
                what: "engine.regs_per_caller".to_owned(),
                min: MIN_REGS_PER_CALLER,
                value: self.regs_per_caller,
            });
        }
        if self.mem_ports == 0 {
            return Err(ConfigError::ZeroParameter {
                what: "engine.mem_ports".to_owned(),
            });
        }
        if self.fifo_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                what: "engine.fifo_capacity".to_owned(),
            });
        }
        self.window().map(|_| ())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_addr: defaults::ENGINE_BASE,
            num_callers: defaults::NUM_CALLERS,
            regs_per_caller: defaults::REGS_PER_CALLER,
            mem_ports: defaults::MEM_PORTS,
            fifo_capacity: defaults::ENGINE_FIFO_CAPACITY,
        }
    }
}

/// One lane: flavor, sizing and its transition table as parallel lists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LaneConfig {
    /// Lane name, used in logs and errors.
    #[serde(default = "LaneConfig::default_name")]
    pub name: String,
    /// Simple or pipelined.
    #[serde(default)]
    pub kind: LaneKindConfig,
    /// Maximum in-flight tokens.
    #[serde(default = "LaneConfig::default_capacity")]
    pub capacity: usize,
    /// Minimum cycles between admissions; pipelined lanes only.
    #[serde(default = "LaneConfig::default_interval")]
    pub interval: u64,
    /// Cycles a token waits at its terminal stage before retiring.
    #[serde(default)]
    pub postrun_latency: u64,
    /// Source stage of each transition.
    #[serde(default)]
    pub transition_from_stage: Vec<u32>,
    /// Destination stage of each transition.
    #[serde(default)]
    pub transition_to_stage: Vec<u32>,
    /// Latency in cycles of each transition.
    #[serde(default)]
    pub transition_latency: Vec<u64>,
}

impl LaneConfig {
    fn default_name() -> String {
        "lane".to_owned()
    }

    const fn default_capacity() -> usize {
        defaults::LANE_CAPACITY
    }

    const fn default_interval() -> u64 {
        defaults::LANE_INTERVAL
    }

    /// Checks capacity and the transition table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                what: format!("lane `{}`", self.name),
            });
        }
        TransitionTable::from_lists(
            &self.name,
            &self.transition_from_stage,
            &self.transition_to_stage,
            &self.transition_latency,
        )
        .map(|_| ())
    }
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            kind: LaneKindConfig::Simple,
            capacity: defaults::LANE_CAPACITY,
            interval: defaults::LANE_INTERVAL,
            postrun_latency: 0,
            transition_from_stage: vec![0],
            transition_to_stage: vec![1],
            transition_latency: vec![1],
        }
    }
}

/// Reorder buffer sizing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RobConfig {
    /// Number of entries.
    #[serde(default = "RobConfig::default_capacity")]
    pub capacity: usize,
}

impl RobConfig {
    const fn default_capacity() -> usize {
        defaults::ROB_CAPACITY
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                what: "reorder buffer".to_owned(),
            });
        }
        Ok(())
    }
}

impl Default for RobConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::ROB_CAPACITY,
        }
    }
}

/// Clock-domain crossing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AsyncFifoConfig {
    /// Synchronizer depth in cycles of the receiving clock.
    #[serde(default = "AsyncFifoConfig::default_stage")]
    pub stage: u64,
    /// Entries per direction.
    #[serde(default = "AsyncFifoConfig::default_capacity")]
    pub capacity: usize,
    /// Whether a snoop channel pair is present.
    #[serde(default)]
    pub snooping: bool,
    /// Entries per direction of the snoop channel.
    #[serde(default = "AsyncFifoConfig::default_snoop_capacity")]
    pub snoop_capacity: usize,
}

impl AsyncFifoConfig {
    const fn default_stage() -> u64 {
        defaults::FIFO_STAGE
    }

    const fn default_capacity() -> usize {
        defaults::FIFO_CAPACITY
    }

    const fn default_snoop_capacity() -> usize {
        defaults::SNOOP_CAPACITY
    }

    /// Checks stage count and capacities.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stage == 0 {
            return Err(ConfigError::ZeroParameter {
                what: "async_fifo.stage".to_owned(),
            });
        }
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                what: "async_fifo".to_owned(),
            });
        }
        if self.snooping && self.snoop_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                what: "async_fifo snoop channel".to_owned(),
            });
        }
        Ok(())
    }
}

impl Default for AsyncFifoConfig {
    fn default() -> Self {
        Self {
            stage: defaults::FIFO_STAGE,
            capacity: defaults::FIFO_CAPACITY,
            snooping: false,
            snoop_capacity: defaults::SNOOP_CAPACITY,
        }
    }
}

/// Memory-side timing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemoryConfig {
    /// Memory controller type.
    #[serde(default)]
    pub controller: MemoryController,
    /// Fixed latency of the simple controller, in memory cycles.
    #[serde(default = "MemoryConfig::default_latency")]
    pub latency: u64,
    /// CAS latency (column access strobe).
    #[serde(default = "MemoryConfig::default_t_cas")]
    pub t_cas: u64,
    /// RAS latency (row access strobe).
    #[serde(default = "MemoryConfig::default_t_ras")]
    pub t_ras: u64,
    /// Precharge latency.
    #[serde(default = "MemoryConfig::default_t_pre")]
    pub t_pre: u64,
}

impl MemoryConfig {
    const fn default_latency() -> u64 {
        defaults::MEMORY_LATENCY
    }

    const fn default_t_cas() -> u64 {
        defaults::T_CAS
    }

    const fn default_t_ras() -> u64 {
        defaults::T_RAS
    }

    const fn default_t_pre() -> u64 {
        defaults::T_PRE
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let latency = match self.controller {
            MemoryController::Simple => self.latency,
            MemoryController::Dram => self.t_cas,
        };
        if latency == 0 {
            return Err(ConfigError::ZeroParameter {
                what: "memory access latency".to_owned(),
            });
        }
        Ok(())
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            controller: MemoryController::Simple,
            latency: defaults::MEMORY_LATENCY,
            t_cas: defaults::T_CAS,
            t_ras: defaults::T_RAS,
            t_pre: defaults::T_PRE,
        }
    }
}
