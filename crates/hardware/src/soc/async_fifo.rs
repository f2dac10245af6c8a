//! Clock-domain crossing queue.
//!
//! Two independently clocked sides exchange entries through bounded synchronizing channels.
//! This module provides:
//! 1. **`SyncChannel`:** One direction of the crossing with credit-based flow control.
//! 2. **`AsyncFifo`:** A request channel (upstream to downstream) and a response channel
//!    (downstream to upstream), plus an optional snoop channel pair.
//!
//! An entry pushed at producer tick `t` is sampled by the consumer at its first edge at or
//! after `t` and becomes poppable `stage` consumer cycles later. A pop returns the producer's
//! credit after the same synchronizer depth, counted in the producer's clock. Each side moves
//! at most one entry per channel per own-clock cycle. Channels never share credits, so a full
//! snoop channel cannot hold up requests or responses.

use std::collections::VecDeque;

use tracing::trace;

use crate::common::error::{ConfigError, SimError};
use crate::config::AsyncFifoConfig;
use crate::sim::clock::{ClockDomain, Cycle, Tick};

#[derive(Debug)]
struct Flight<T> {
    item: T,
    visible_at: Tick,
}

/// One direction of a clock-domain crossing.
#[derive(Debug)]
pub struct SyncChannel<T> {
    name: String,
    producer: ClockDomain,
    consumer: ClockDomain,
    stage: u64,
    capacity: usize,
    entries: VecDeque<Flight<T>>,
    credits_returning: VecDeque<Tick>,
    last_push: Option<Cycle>,
    last_pop: Option<Cycle>,
    waiting: bool,
}

impl<T> SyncChannel<T> {
    /// Creates an empty channel.
    ///
    /// # Arguments
    ///
    /// * `name` - Channel name, used in logs.
    /// * `producer` - Clock of the pushing side.
    /// * `consumer` - Clock of the popping side.
    /// * `stage` - Synchronizer depth in cycles; must be non-zero.
    /// * `capacity` - Credits available to the producer; must be non-zero.
    pub fn new(
        name: impl Into<String>,
        producer: ClockDomain,
        consumer: ClockDomain,
        stage: u64,
        capacity: usize,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if stage == 0 {
            return Err(ConfigError::ZeroParameter {
                what: format!("synchronizer stages of `{name}`"),
            });
        }
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                what: format!("channel `{name}`"),
            });
        }
        Ok(Self {
            name,
            producer,
            consumer,
            stage,
            capacity,
            entries: VecDeque::with_capacity(capacity),
            credits_returning: VecDeque::new(),
            last_push: None,
            last_pop: None,
            waiting: false,
        })
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Credits available to the producer when idle.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Synchronizer depth in cycles.
    pub const fn stage(&self) -> u64 {
        self.stage
    }

    /// Entries pushed but not yet popped.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entry is waiting to be popped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if a refused push is still waiting for a retry notification.
    pub const fn is_waiting(&self) -> bool {
        self.waiting
    }

    fn reclaim(&mut self, now: Tick) {
        while self.credits_returning.front().is_some_and(|&at| at <= now) {
            let _ = self.credits_returning.pop_front();
        }
    }

    /// Credits the producer holds at `now`.
    pub fn credits(&mut self, now: Tick) -> usize {
        self.reclaim(now);
        self.capacity
            .saturating_sub(self.entries.len() + self.credits_returning.len())
    }

    /// Returns true if a push at `now` would be accepted.
    pub fn can_push(&mut self, now: Tick) -> bool {
        let cycle = self.producer.cycle_at(now);
        self.last_push != Some(cycle) && self.credits(now) > 0
    }

    /// Pushes from the producer side; hands the item back if no credit is available.
    pub fn push(&mut self, now: Tick, item: T) -> Result<(), T> {
        if !self.can_push(now) {
            trace!(channel = %self.name, now, "push refused");
            self.waiting = true;
            return Err(item);
        }
        let visible_at = self.consumer.clock_edge(now, self.stage);
        self.entries.push_back(Flight { item, visible_at });
        self.last_push = Some(self.producer.cycle_at(now));
        trace!(channel = %self.name, now, visible_at, "push");
        Ok(())
    }

    /// Returns the entry a pop at `now` would return, without removing it.
    pub fn peek(&self, now: Tick) -> Option<&T> {
        self.entries
            .front()
            .filter(|f| f.visible_at <= now)
            .map(|f| &f.item)
    }

    /// Pops from the consumer side if the oldest entry has crossed the synchronizer.
    pub fn pop(&mut self, now: Tick) -> Option<T> {
        let cycle = self.consumer.cycle_at(now);
        if self.last_pop == Some(cycle) || self.peek(now).is_none() {
            return None;
        }
        let flight = self.entries.pop_front()?;
        self.last_pop = Some(cycle);
        let credit_at = self.producer.clock_edge(now, self.stage);
        self.credits_returning.push_back(credit_at);
        trace!(channel = %self.name, now, credit_at, "pop");
        Some(flight.item)
    }

    /// Reports once, after a refused push, that the producer may push again.
    pub fn take_retry(&mut self, now: Tick) -> bool {
        if self.waiting && self.can_push(now) {
            self.waiting = false;
            return true;
        }
        false
    }
}

/// Snoop traffic: invalidations travel downstream to upstream, responses travel back.
#[derive(Debug)]
pub struct SnoopChannel<D, U> {
    requests: SyncChannel<U>,
    responses: SyncChannel<D>,
}

impl<D, U> SnoopChannel<D, U> {
    /// Downstream side: sends a snoop toward the upstream side.
    pub fn push_snoop(&mut self, now: Tick, item: U) -> Result<(), U> {
        self.requests.push(now, item)
    }

    /// Upstream side: receives a snoop.
    pub fn pop_snoop(&mut self, now: Tick) -> Option<U> {
        self.requests.pop(now)
    }

    /// Upstream side: answers a snoop.
    pub fn push_snoop_response(&mut self, now: Tick, item: D) -> Result<(), D> {
        self.responses.push(now, item)
    }

    /// Downstream side: receives a snoop response.
    pub fn pop_snoop_response(&mut self, now: Tick) -> Option<D> {
        self.responses.pop(now)
    }

    /// The snoop request channel.
    pub const fn requests(&self) -> &SyncChannel<U> {
        &self.requests
    }

    /// The snoop response channel.
    pub const fn responses(&self) -> &SyncChannel<D> {
        &self.responses
    }
}

fn channel<T>(
    queue: &str,
    suffix: &str,
    producer: &ClockDomain,
    consumer: &ClockDomain,
    stage: u64,
    capacity: usize,
) -> Result<SyncChannel<T>, ConfigError> {
    SyncChannel::new(
        format!("{queue}.{suffix}"),
        producer.clone(),
        consumer.clone(),
        stage,
        capacity,
    )
}

/// Bidirectional clock-domain crossing between an upstream and a downstream side.
///
/// `D` flows upstream to downstream (requests); `U` flows back (responses).
#[derive(Debug)]
pub struct AsyncFifo<D, U = D> {
    name: String,
    downward: SyncChannel<D>,
    upward: SyncChannel<U>,
    snoop: Option<SnoopChannel<D, U>>,
}

impl<D, U> AsyncFifo<D, U> {
    /// Builds a crossing from its configuration.
    ///
    /// # Arguments
    ///
    /// * `name` - Queue name, used in logs and errors.
    /// * `upstream` - Clock of the requesting side.
    /// * `downstream` - Clock of the responding side.
    /// * `config` - Stage count, capacities and snooping flag.
    pub fn new(
        name: impl Into<String>,
        upstream: &ClockDomain,
        downstream: &ClockDomain,
        config: &AsyncFifoConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let name = name.into();
        let stage = config.stage;
        let downward = channel(&name, "req", upstream, downstream, stage, config.capacity)?;
        let upward = channel(&name, "resp", downstream, upstream, stage, config.capacity)?;
        let snoop = if config.snooping {
            let cap = config.snoop_capacity;
            Some(SnoopChannel {
                requests: channel(&name, "snoop", downstream, upstream, stage, cap)?,
                responses: channel(&name, "snoop_resp", upstream, downstream, stage, cap)?,
            })
        } else {
            None
        };
        Ok(Self {
            name,
            downward,
            upward,
            snoop,
        })
    }

    /// Queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upstream side: sends a request.
    pub fn push_request(&mut self, now: Tick, item: D) -> Result<(), D> {
        self.downward.push(now, item)
    }

    /// Downstream side: receives a request.
    pub fn pop_request(&mut self, now: Tick) -> Option<D> {
        self.downward.pop(now)
    }

    /// Downstream side: sends a response.
    pub fn push_response(&mut self, now: Tick, item: U) -> Result<(), U> {
        self.upward.push(now, item)
    }

    /// Upstream side: receives a response.
    pub fn pop_response(&mut self, now: Tick) -> Option<U> {
        self.upward.pop(now)
    }

    /// The request channel.
    pub const fn downward(&self) -> &SyncChannel<D> {
        &self.downward
    }

    /// Mutable access to the request channel.
    pub const fn downward_mut(&mut self) -> &mut SyncChannel<D> {
        &mut self.downward
    }

    /// The response channel.
    pub const fn upward(&self) -> &SyncChannel<U> {
        &self.upward
    }

    /// Mutable access to the response channel.
    pub const fn upward_mut(&mut self) -> &mut SyncChannel<U> {
        &mut self.upward
    }

    /// Returns true if the queue was built with a snoop channel.
    pub const fn has_snooping(&self) -> bool {
        self.snoop.is_some()
    }

    /// The snoop channel pair.
    ///
    /// Fails with `SimError::SnoopingDisabled` if the queue was built without one.
    pub fn snoop(&mut self) -> Result<&mut SnoopChannel<D, U>, SimError> {
        let name = &self.name;
        self.snoop.as_mut().ok_or_else(|| SimError::SnoopingDisabled {
            queue: name.clone(),
        })
    }

    /// Returns true while any channel holds an entry.
    pub fn is_busy(&self) -> bool {
        !self.downward.is_empty()
            || !self.upward.is_empty()
            || self
                .snoop
                .as_ref()
                .is_some_and(|s| !s.requests.is_empty() || !s.responses.is_empty())
    }
}
