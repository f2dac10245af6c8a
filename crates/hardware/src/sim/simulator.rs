//! Simulator: owns the system and the scheduler side by side.
//!
//! Every scheduler edge is turned into `tick_domain` calls, in registration order, for the
//! domains clocked at that tick. Runs are single threaded and fully deterministic.

use tracing::{debug, info};

use crate::common::error::{ConfigError, SimError};
use crate::config::Config;
use crate::engine::builder::KernelSet;
use crate::sim::clock::Tick;
use crate::sim::scheduler::{DomainId, Scheduler};
use crate::soc::builder::{Domain, System};

/// Top-level simulator: system state plus global time.
#[derive(Debug)]
pub struct Simulator {
    /// The simulated system.
    pub system: System,
    scheduler: Scheduler,
    domains: Vec<(DomainId, Domain)>,
}

impl Simulator {
    /// Builds a system from configuration and wraps it.
    pub fn new(config: &Config, kernels: KernelSet) -> Result<Self, ConfigError> {
        Ok(Self::from_system(System::new(config, kernels)?))
    }

    /// Wraps an already built system; time starts at tick 0.
    pub fn from_system(system: System) -> Self {
        let mut scheduler = Scheduler::new();
        let domains = Domain::ALL
            .iter()
            .map(|&domain| (scheduler.add_domain(system.clock(domain).clone()), domain))
            .collect();
        Self {
            system,
            scheduler,
            domains,
        }
    }

    /// Current global time.
    pub const fn now(&self) -> Tick {
        self.scheduler.now()
    }

    /// Tick of the next edge that `step` would process.
    pub fn next_edge(&self) -> Option<Tick> {
        self.scheduler.peek()
    }

    /// Processes the next clock edge.
    ///
    /// # Returns
    ///
    /// The tick of the processed edge, or the first fatal error raised by a domain.
    pub fn step(&mut self) -> Result<Tick, SimError> {
        let Some(edge) = self.scheduler.advance() else {
            return Ok(self.scheduler.now());
        };
        for id in &edge.domains {
            let Some(&(_, domain)) = self.domains.iter().find(|(d, _)| d == id) else {
                continue;
            };
            self.system.tick_domain(domain, edge.tick)?;
        }
        Ok(edge.tick)
    }

    /// Processes every edge at or before `limit`.
    pub fn run_until(&mut self, limit: Tick) -> Result<(), SimError> {
        while self.scheduler.peek().is_some_and(|next| next <= limit) {
            let _ = self.step()?;
        }
        debug!(now = self.now(), "run_until reached limit");
        Ok(())
    }

    /// Runs until nothing is in flight or `limit` is passed.
    ///
    /// # Returns
    ///
    /// `true` if the system went idle, `false` if the limit was reached first.
    pub fn run_until_idle(&mut self, limit: Tick) -> Result<bool, SimError> {
        while self.system.is_busy() {
            match self.scheduler.peek() {
                Some(next) if next <= limit => {
                    let _ = self.step()?;
                }
                _ => {
                    info!(now = self.now(), "tick limit reached while busy");
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}
