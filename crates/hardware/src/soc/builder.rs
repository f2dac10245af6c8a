//! System construction and the top-level `System` type.
//!
//! This module builds the complete system from configuration. It performs:
//! 1. **Validation:** Every configuration check runs before any component exists.
//! 2. **Engine:** Built through `EngineBuilder` with the supplied lane kernels.
//! 3. **Address map:** The engine's control window is registered for exclusive ownership.
//! 4. **Crossings:** A host-to-engine queue (register operations down, replies up) and an
//!    engine-to-memory queue (packets down, responses up).
//! 5. **Memory side:** Simple or DRAM controller selected by configuration.
//!
//! Each clock domain does its work in `tick_domain`; the `Simulator` decides which domains
//! tick at every edge.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::common::addr::PhysAddr;
use crate::common::error::{ConfigError, SimError};
use crate::config::Config;
use crate::engine::accelerator::Engine;
use crate::engine::builder::{EngineBuilder, KernelSet};
use crate::engine::port::{MemPacket, MemResponse};
use crate::sim::clock::{ClockDomain, Tick};
use crate::soc::async_fifo::AsyncFifo;
use crate::soc::interconnect::{AddressMap, RegionId};
use crate::soc::memory::MemorySide;
use crate::soc::traits::ControlTarget;

/// The three clock domains of a system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    /// The host issuing register operations.
    Host,
    /// The engine and its lanes.
    Engine,
    /// The memory side.
    Memory,
}

impl Domain {
    /// All domains, in the order they are registered with the scheduler.
    pub const ALL: [Self; 3] = [Self::Host, Self::Engine, Self::Memory];
}

/// A register operation issued by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostRequest {
    /// Register write.
    Write {
        /// Register address.
        addr: u64,
        /// Written value.
        data: u64,
    },
    /// Register read.
    Read {
        /// Register address.
        addr: u64,
    },
}

impl HostRequest {
    const fn addr(&self) -> u64 {
        match *self {
            Self::Write { addr, .. } | Self::Read { addr } => addr,
        }
    }
}

/// The engine's answer to a host register operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostReply {
    /// A write completed; `accepted` is false when backpressure refused it.
    Ack {
        /// Register address.
        addr: u64,
        /// Whether the engine took the write.
        accepted: bool,
    },
    /// A read completed.
    Data {
        /// Register address.
        addr: u64,
        /// Register value.
        value: u64,
    },
}

/// Top-level system: engine, memory side and the crossings between the clock domains.
#[derive(Debug)]
pub struct System {
    host_clock: ClockDomain,
    engine_clock: ClockDomain,
    memory_clock: ClockDomain,
    map: AddressMap,
    engine_region: RegionId,
    engine: Engine,
    host_queue: AsyncFifo<HostRequest, HostReply>,
    mem_queue: AsyncFifo<MemPacket, MemResponse>,
    memory: MemorySide,
    host_outbox: VecDeque<HostRequest>,
    host_inbox: VecDeque<HostReply>,
    pending_reply: Option<HostReply>,
    pending_mem_response: Option<MemResponse>,
    next_mem_port: usize,
}

impl System {
    /// Builds a system from configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Simulator configuration; validated before anything is built.
    /// * `kernels` - Branch logic per lane name; missing lanes use the linear kernel.
    ///
    /// # Returns
    ///
    /// A system at tick 0 with empty queues, or the first configuration problem found.
    pub fn new(config: &Config, kernels: KernelSet) -> Result<Self, ConfigError> {
        config.validate()?;
        let host_clock = ClockDomain::new("host", config.clocks.host_period)?;
        let engine_clock = ClockDomain::new("engine", config.clocks.engine_period)?;
        let memory_clock = ClockDomain::new("memory", config.clocks.memory_period)?;

        let engine = EngineBuilder::from_config(config, kernels).build()?;
        let mut map = AddressMap::new();
        let engine_region = map.register(engine.name().to_owned(), engine.address_range())?;

        let host_queue = AsyncFifo::new("host_queue", &host_clock, &engine_clock, &config.async_fifo)?;
        let mem_queue = AsyncFifo::new("mem_queue", &engine_clock, &memory_clock, &config.async_fifo)?;
        let memory = MemorySide::new(&config.memory);

        info!(
            host_period = host_clock.period(),
            engine_period = engine_clock.period(),
            memory_period = memory_clock.period(),
            lanes = config.lanes.len(),
            "system built"
        );
        Ok(Self {
            host_clock,
            engine_clock,
            memory_clock,
            map,
            engine_region,
            engine,
            host_queue,
            mem_queue,
            memory,
            host_outbox: VecDeque::new(),
            host_inbox: VecDeque::new(),
            pending_reply: None,
            pending_mem_response: None,
            next_mem_port: 0,
        })
    }

    /// Clock of `domain`.
    pub const fn clock(&self, domain: Domain) -> &ClockDomain {
        match domain {
            Domain::Host => &self.host_clock,
            Domain::Engine => &self.engine_clock,
            Domain::Memory => &self.memory_clock,
        }
    }

    /// The engine.
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Mutable access to the engine, for direct dispatch in tests and drivers.
    pub const fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// The memory side.
    pub const fn memory(&self) -> &MemorySide {
        &self.memory
    }

    /// Mutable access to the memory side, for preloading data.
    pub const fn memory_mut(&mut self) -> &mut MemorySide {
        &mut self.memory
    }

    /// The host address map.
    pub const fn address_map(&self) -> &AddressMap {
        &self.map
    }

    /// Queues a host register write; it crosses to the engine on later host cycles.
    pub fn host_write(&mut self, addr: PhysAddr, data: u64) {
        self.host_outbox.push_back(HostRequest::Write {
            addr: addr.val(),
            data,
        });
    }

    /// Queues a host register read; the value arrives as a `HostReply::Data`.
    pub fn host_read(&mut self, addr: PhysAddr) {
        self.host_outbox
            .push_back(HostRequest::Read { addr: addr.val() });
    }

    /// Pops the oldest reply delivered to the host.
    pub fn take_reply(&mut self) -> Option<HostReply> {
        self.host_inbox.pop_front()
    }

    /// Returns true while any operation, packet or call is still in flight.
    pub fn is_busy(&self) -> bool {
        !self.host_outbox.is_empty()
            || self.pending_reply.is_some()
            || self.pending_mem_response.is_some()
            || self.host_queue.is_busy()
            || self.mem_queue.is_busy()
            || self.memory.in_flight() > 0
            || self.engine.is_busy()
    }

    /// Performs one cycle of `domain` at global time `now`, which must be one of its edges.
    pub fn tick_domain(&mut self, domain: Domain, now: Tick) -> Result<(), SimError> {
        match domain {
            Domain::Host => {
                self.tick_host(now);
                Ok(())
            }
            Domain::Engine => self.tick_engine(now),
            Domain::Memory => {
                self.tick_memory(now);
                Ok(())
            }
        }
    }

    fn tick_host(&mut self, now: Tick) {
        if let Some(reply) = self.host_queue.pop_response(now) {
            self.host_inbox.push_back(reply);
        }
        if let Some(request) = self.host_outbox.pop_front() {
            if let Err(request) = self.host_queue.push_request(now, request) {
                self.host_outbox.push_front(request);
            }
        }
    }

    fn tick_engine(&mut self, now: Tick) -> Result<(), SimError> {
        let cycle = self.engine_clock.cycle_at(now);
        self.engine.begin_cycle(cycle);

        if let Some(reply) = self.pending_reply.take() {
            if let Err(reply) = self.host_queue.push_response(now, reply) {
                self.pending_reply = Some(reply);
            }
        } else if let Some(request) = self.host_queue.pop_request(now) {
            let reply = self.serve_register(request)?;
            if let Err(reply) = self.host_queue.push_response(now, reply) {
                self.pending_reply = Some(reply);
            }
        }

        let free = self
            .mem_queue
            .upward()
            .peek(now)
            .and_then(|resp| self.engine.ports().get(resp.port))
            .is_some_and(|port| port.resp_buf.is_none());
        if free {
            if let Some(response) = self.mem_queue.pop_response(now) {
                if let Some(port) = self.engine.port_mut(response.port) {
                    port.resp_buf = Some(response);
                }
            }
        }

        self.engine.tick(cycle)?;
        self.forward_request(now);
        Ok(())
    }

    fn serve_register(&mut self, request: HostRequest) -> Result<HostReply, SimError> {
        let addr = request.addr();
        let region = self
            .map
            .decode(PhysAddr(addr))
            .map(|(region, _)| region.id)
            .ok_or(SimError::OutsideWindow { addr })?;
        if region != self.engine_region {
            return Err(SimError::OutsideWindow { addr });
        }
        let reply = match request {
            HostRequest::Write { addr, data } => HostReply::Ack {
                addr,
                accepted: self.engine.write_reg(PhysAddr(addr), data)?,
            },
            HostRequest::Read { addr } => HostReply::Data {
                addr,
                value: self.engine.read_reg(PhysAddr(addr))?,
            },
        };
        debug!(?request, ?reply, "register operation served");
        Ok(reply)
    }

    /// Moves at most one port's request into the memory queue, rotating between ports.
    fn forward_request(&mut self, now: Tick) {
        let count = self.engine.ports().len();
        for i in 0..count {
            let index = (self.next_mem_port + i) % count;
            let Some(port) = self.engine.port_mut(index) else {
                continue;
            };
            let Some(packet) = port.req_buf.take() else {
                continue;
            };
            match self.mem_queue.push_request(now, packet) {
                Ok(()) => self.next_mem_port = (index + 1) % count,
                Err(packet) => port.req_buf = Some(packet),
            }
            return;
        }
    }

    fn tick_memory(&mut self, now: Tick) {
        let cycle = self.memory_clock.cycle_at(now);
        if let Some(packet) = self.mem_queue.pop_request(now) {
            self.memory.accept(cycle, packet);
        }
        let response = self
            .pending_mem_response
            .take()
            .or_else(|| self.memory.complete(cycle));
        if let Some(response) = response {
            if let Err(response) = self.mem_queue.push_response(now, response) {
                self.pending_mem_response = Some(response);
            }
        }
    }
}
