//! Memory side of the engine's downstream crossing.
//!
//! This module provides:
//! 1. **Controller:** Latency modeling (simple or DRAM row-buffer).
//! 2. **`MemorySide`:** Accepts engine packets, applies them to a sparse backing store and
//!    returns responses once the controller's latency has elapsed.
//!
//! Responses become ready in latency order, not arrival order, so a row-buffer hit can
//! overtake an earlier miss. The engine's reorder buffer restores program order.

/// Memory controller implementations for access latency modeling.
pub mod controller;

use std::collections::BTreeMap;

use tracing::trace;

use self::controller::MemoryController;
use crate::config::MemoryConfig;
use crate::engine::port::{MemOp, MemPacket, MemResponse};
use crate::sim::clock::Cycle;

/// Word-addressed memory with per-access latency.
#[derive(Debug)]
pub struct MemorySide {
    controller: Box<dyn MemoryController>,
    store: BTreeMap<u64, u64>,
    /// In-flight accesses keyed by (ready cycle, arrival order).
    in_flight: BTreeMap<(Cycle, u64), MemPacket>,
    arrivals: u64,
    served: u64,
}

impl MemorySide {
    /// Creates an empty memory using the configured controller.
    pub fn new(config: &MemoryConfig) -> Self {
        Self::with_controller(controller::from_config(config))
    }

    /// Creates an empty memory around an explicit controller.
    pub fn with_controller(controller: Box<dyn MemoryController>) -> Self {
        Self {
            controller,
            store: BTreeMap::new(),
            in_flight: BTreeMap::new(),
            arrivals: 0,
            served: 0,
        }
    }

    /// Reads a word without timing; unwritten words read as zero.
    pub fn peek(&self, addr: u64) -> u64 {
        self.store.get(&addr).copied().unwrap_or(0)
    }

    /// Writes a word without timing, for preloading test data.
    pub fn poke(&mut self, addr: u64, value: u64) {
        let _ = self.store.insert(addr, value);
    }

    /// Accepts a packet at memory cycle `cycle`.
    pub fn accept(&mut self, cycle: Cycle, packet: MemPacket) {
        let latency = self.controller.access_latency(packet.request.addr);
        let ready = cycle + latency;
        trace!(seq = packet.seq.0, addr = packet.request.addr, cycle, ready, "memory access");
        let _ = self.in_flight.insert((ready, self.arrivals), packet);
        self.arrivals += 1;
    }

    /// Returns the earliest access finished by `cycle` without removing it.
    pub fn peek_ready(&self, cycle: Cycle) -> Option<&MemPacket> {
        self.in_flight
            .first_key_value()
            .filter(|((ready, _), _)| *ready <= cycle)
            .map(|(_, packet)| packet)
    }

    /// Serves accesses finished by `cycle`, oldest ready first, until one needs a response.
    ///
    /// Posted stores are applied without producing a response.
    pub fn complete(&mut self, cycle: Cycle) -> Option<MemResponse> {
        while self.peek_ready(cycle).is_some() {
            let (_, packet) = self.in_flight.pop_first()?;
            let request = packet.request;
            let data = match request.op {
                MemOp::Load => self.peek(request.addr),
                MemOp::Store => {
                    self.poke(request.addr, request.data);
                    request.data
                }
            };
            self.served += 1;
            if request.posted {
                continue;
            }
            return Some(MemResponse {
                seq: packet.seq,
                port: packet.port,
                data,
            });
        }
        None
    }

    /// Accesses accepted but not yet served.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Accesses served so far.
    pub const fn served(&self) -> u64 {
        self.served
    }
}
