//! Engine construction.
//!
//! Every check that can fail is run here, before the engine exists: transition tables, lane
//! capacities, the reorder buffer size, port count and the control window. A built engine never
//! reports a configuration problem at run time.

use std::collections::BTreeMap;

use tracing::debug;

use crate::common::error::ConfigError;
use crate::config::{Config, EngineConfig, LaneConfig};
use crate::engine::accelerator::Engine;
use crate::engine::kernel::{LinearKernel, StageKernel};
use crate::engine::lane::Lane;
use crate::engine::regs::ControlWindow;
use crate::engine::rob::ReorderBuffer;

/// Branch logic keyed by lane name. Lanes without an entry use [`LinearKernel`].
pub type KernelSet = BTreeMap<String, Box<dyn StageKernel>>;

/// Assembles an [`Engine`] from lane descriptions and their kernels.
pub struct EngineBuilder {
    name: String,
    engine: EngineConfig,
    rob_capacity: usize,
    lanes: Vec<(LaneConfig, Box<dyn StageKernel>)>,
}

impl std::fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("name", &self.name)
            .field("engine", &self.engine)
            .field("rob_capacity", &self.rob_capacity)
            .field("lanes", &self.lanes.iter().map(|(c, _)| &c.name).collect::<Vec<_>>())
            .finish()
    }
}

impl EngineBuilder {
    /// Starts a builder with default engine parameters and no lanes.
    pub fn new(name: impl Into<String>) -> Self {
        let defaults = Config::default();
        Self {
            name: name.into(),
            engine: defaults.engine,
            rob_capacity: defaults.rob.capacity,
            lanes: Vec::new(),
        }
    }

    /// Starts a builder from a full configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Engine, lane and reorder buffer sections are used.
    /// * `kernels` - Kernel per lane name; lanes missing from the set take the lowest edge.
    pub fn from_config(config: &Config, mut kernels: KernelSet) -> Self {
        let mut builder = Self::new("engine")
            .engine_config(config.engine.clone())
            .rob_capacity(config.rob.capacity);
        for lane in &config.lanes {
            let kernel = kernels
                .remove(&lane.name)
                .unwrap_or_else(|| Box::new(LinearKernel));
            builder = builder.lane_boxed(lane.clone(), kernel);
        }
        builder
    }

    /// Replaces the window and caller parameters.
    #[must_use]
    pub fn engine_config(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Sets the reorder buffer size.
    #[must_use]
    pub const fn rob_capacity(mut self, capacity: usize) -> Self {
        self.rob_capacity = capacity;
        self
    }

    /// Sets the number of downstream memory ports.
    #[must_use]
    pub const fn mem_ports(mut self, ports: usize) -> Self {
        self.engine.mem_ports = ports;
        self
    }

    /// Appends a lane driven by `kernel`.
    #[must_use]
    pub fn lane(self, config: LaneConfig, kernel: impl StageKernel + 'static) -> Self {
        self.lane_boxed(config, Box::new(kernel))
    }

    /// Appends a lane driven by an already boxed kernel.
    #[must_use]
    pub fn lane_boxed(mut self, config: LaneConfig, kernel: Box<dyn StageKernel>) -> Self {
        self.lanes.push((config, kernel));
        self
    }

    /// Validates everything and builds the engine.
    pub fn build(self) -> Result<Engine, ConfigError> {
        if self.lanes.is_empty() {
            return Err(ConfigError::NoLanes);
        }
        self.engine.validate()?;
        let window = ControlWindow::new(&self.engine)?;
        let rob = ReorderBuffer::new(self.rob_capacity)?;
        let lanes = self
            .lanes
            .into_iter()
            .enumerate()
            .map(|(i, (config, kernel))| Lane::from_config(i, &config).map(|lane| (lane, kernel)))
            .collect::<Result<Vec<_>, _>>()?;
        let num_callers = usize::try_from(self.engine.num_callers).unwrap_or(usize::MAX);

        debug!(
            engine = %self.name,
            lanes = lanes.len(),
            rob = self.rob_capacity,
            ports = self.engine.mem_ports,
            base = window.range().base(),
            "engine built"
        );
        Ok(Engine::assemble(
            self.name,
            window,
            num_callers,
            lanes,
            rob,
            self.engine.mem_ports,
            self.engine.fifo_capacity,
        ))
    }
}
