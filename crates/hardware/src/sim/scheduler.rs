//! Multi-domain edge scheduler.
//!
//! The scheduler owns global time. Each registered clock domain has a pending next edge;
//! `advance` jumps to the earliest one and reports every domain that ticks there. Domains
//! sharing an edge are reported in registration order, which keeps runs reproducible.

use crate::sim::clock::{ClockDomain, Cycle, Tick};

/// Handle to a domain registered with a [`Scheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomainId(pub usize);

/// One scheduler step: the tick reached and the domains with an edge there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    /// Global time of the edge.
    pub tick: Tick,
    /// Domains clocked at `tick`, in registration order.
    pub domains: Vec<DomainId>,
}

/// Discrete-event scheduler over a set of clock domains.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: Tick,
    domains: Vec<ClockDomain>,
    next_edge: Vec<Tick>,
}

impl Scheduler {
    /// Creates a scheduler at tick 0 with no domains.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a domain; its first edge is the first one at or after the current tick.
    pub fn add_domain(&mut self, domain: ClockDomain) -> DomainId {
        let id = DomainId(self.domains.len());
        self.next_edge.push(domain.edge_at_or_after(self.now));
        self.domains.push(domain);
        id
    }

    /// Current global time.
    #[inline]
    pub const fn now(&self) -> Tick {
        self.now
    }

    /// Returns the domain registered under `id`.
    pub fn domain(&self, id: DomainId) -> Option<&ClockDomain> {
        self.domains.get(id.0)
    }

    /// Cycle of domain `id` at the current tick.
    pub fn cycle(&self, id: DomainId) -> Option<Cycle> {
        self.domain(id).map(|d| d.cycle_at(self.now))
    }

    /// Tick of the next pending edge, if any domain is registered.
    pub fn peek(&self) -> Option<Tick> {
        self.next_edge.iter().copied().min()
    }

    /// Moves time to the next edge and returns the domains clocked there.
    ///
    /// Returns `None` when no domain is registered.
    pub fn advance(&mut self) -> Option<Edge> {
        let tick = self.peek()?;
        let mut fired = Vec::new();
        for (idx, next) in self.next_edge.iter_mut().enumerate() {
            if *next == tick {
                fired.push(DomainId(idx));
                *next += self.domains[idx].period();
            }
        }
        self.now = tick;
        Some(Edge {
            tick,
            domains: fired,
        })
    }
}
