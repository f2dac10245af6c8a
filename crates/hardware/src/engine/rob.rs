//! Reorder buffer for memory requests issued by lanes.
//!
//! The buffer is a circular array that tracks requests from the moment a lane emits them
//! until their responses become visible to the engine. It provides:
//! 1. **Allocation:** Assigns consecutive sequence numbers, starting at 0, in issue order.
//! 2. **Issue:** Hands unsent requests to the memory side strictly in sequence order.
//!    Posted requests need no response and enter already Completed, but still leave in order.
//! 3. **Completion:** Accepts responses in any order, exactly once per entry.
//! 4. **In-order Release:** Only the oldest entry, and only once completed, may leave.

use tracing::{trace, warn};

use crate::common::error::{ConfigError, SimError};

/// Sequence number of a reorder-buffer entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SeqNum(pub u64);

/// Lifecycle state of an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RobState {
    /// Waiting for its response, sent or not.
    #[default]
    Pending,
    /// Response received; may be released once it is the oldest entry.
    Completed,
}

/// A single entry in the reorder buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RobEntry<Req, Resp> {
    /// Sequence number assigned at enqueue.
    pub seq: SeqNum,
    /// The request as issued.
    pub request: Req,
    /// Response, once completed.
    pub response: Option<Resp>,
    /// Completion state.
    pub state: RobState,
    /// Whether the request has been handed to the memory side.
    pub sent: bool,
}

/// Bounded in-order buffer of in-flight requests.
#[derive(Debug)]
pub struct ReorderBuffer<Req, Resp> {
    /// Fixed-size slot array.
    entries: Vec<Option<RobEntry<Req, Resp>>>,
    /// Slot of the oldest entry.
    head: usize,
    /// Number of occupied slots.
    count: usize,
    /// Sequence number the next enqueue receives.
    next_seq: u64,
    /// Oldest sequence number not yet handed to memory.
    send_cursor: u64,
}

impl<Req, Resp> ReorderBuffer<Req, Resp> {
    /// Creates an empty buffer.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of entries; must be at least 1.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                what: "reorder buffer".to_owned(),
            });
        }
        let mut entries = Vec::with_capacity(capacity);
        entries.resize_with(capacity, || None);
        Ok(Self {
            entries,
            head: 0,
            count: 0,
            next_seq: 0,
            send_cursor: 0,
        })
    }

    /// Returns the buffer capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of occupied entries.
    #[inline]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the buffer is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if the buffer is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.entries.len()
    }

    /// Returns the number of free slots.
    #[inline]
    pub fn free_slots(&self) -> usize {
        self.entries.len() - self.count
    }

    /// Sequence number of the oldest entry, if any.
    pub fn oldest(&self) -> Option<SeqNum> {
        (self.count > 0).then(|| SeqNum(self.oldest_seq()))
    }

    const fn oldest_seq(&self) -> u64 {
        self.next_seq - self.count as u64
    }

    fn slot_of(&self, seq: SeqNum) -> Option<usize> {
        let oldest = self.oldest_seq();
        if seq.0 < oldest || seq.0 >= self.next_seq {
            return None;
        }
        Some((self.head + (seq.0 - oldest) as usize) % self.entries.len())
    }

    /// Sequence number the next enqueue will receive.
    pub const fn next_seq(&self) -> SeqNum {
        SeqNum(self.next_seq)
    }

    fn push(&mut self, request: Req, response: Option<Resp>) -> Option<SeqNum> {
        if self.is_full() {
            return None;
        }
        let seq = SeqNum(self.next_seq);
        let tail = (self.head + self.count) % self.entries.len();
        let state = if response.is_some() {
            RobState::Completed
        } else {
            RobState::Pending
        };
        self.entries[tail] = Some(RobEntry {
            seq,
            request,
            response,
            state,
            sent: false,
        });
        self.next_seq += 1;
        self.count += 1;
        trace!(seq = seq.0, occupancy = self.count, ?state, "rob enqueue");
        Some(seq)
    }

    /// Appends a request awaiting its response. Returns `None` if the buffer is full.
    pub fn enqueue(&mut self, request: Req) -> Option<SeqNum> {
        self.push(request, None)
    }

    /// Appends a request that needs no response; it is Completed on arrival.
    pub fn enqueue_posted(&mut self, request: Req, response: Resp) -> Option<SeqNum> {
        self.push(request, Some(response))
    }

    /// Marks an entry Completed with its response.
    ///
    /// Fails if `seq` is not in flight or was already completed.
    pub fn complete(&mut self, seq: SeqNum, response: Resp) -> Result<(), SimError> {
        let entry = self
            .slot_of(seq)
            .and_then(|slot| self.entries[slot].as_mut())
            .ok_or(SimError::UnknownSequence { seq: seq.0 })?;
        if entry.state == RobState::Completed {
            warn!(seq = seq.0, "duplicate completion");
            return Err(SimError::AlreadyCompleted { seq: seq.0 });
        }
        entry.state = RobState::Completed;
        entry.response = Some(response);
        trace!(seq = seq.0, "rob complete");
        Ok(())
    }

    /// Returns the oldest entry if and only if it is Completed.
    ///
    /// Repeated calls without an intervening `release` return the same entry.
    pub fn retire_ready(&self) -> Option<&RobEntry<Req, Resp>> {
        if self.count == 0 {
            return None;
        }
        self.entries[self.head]
            .as_ref()
            .filter(|e| e.state == RobState::Completed)
    }

    /// Removes the oldest entry.
    ///
    /// Fails if `seq` is not the oldest entry or the oldest entry is not Completed.
    pub fn release(&mut self, seq: SeqNum) -> Result<RobEntry<Req, Resp>, SimError> {
        let oldest = self.oldest();
        if oldest != Some(seq) {
            warn!(seq = seq.0, ?oldest, "release out of order");
            return Err(SimError::NotOldest {
                seq: seq.0,
                oldest: oldest.map(|s| s.0),
            });
        }
        let completed = self.entries[self.head]
            .as_ref()
            .is_some_and(|e| e.state == RobState::Completed);
        if !completed {
            warn!(seq = seq.0, "release before completion");
            return Err(SimError::NotCompleted { seq: seq.0 });
        }
        let entry = self.entries[self.head]
            .take()
            .ok_or(SimError::UnknownSequence { seq: seq.0 })?;
        self.head = (self.head + 1) % self.entries.len();
        self.count -= 1;
        self.send_cursor = self.send_cursor.max(self.oldest_seq());
        trace!(seq = seq.0, occupancy = self.count, "rob release");
        Ok(entry)
    }

    /// Returns the oldest entry not yet handed to memory.
    pub fn next_unsent(&self) -> Option<&RobEntry<Req, Resp>> {
        self.get(SeqNum(self.send_cursor))
    }

    /// Records that `seq` left toward memory.
    ///
    /// Requests leave in sequence order, independent of completion order, so `seq` must be
    /// the entry returned by `next_unsent`.
    pub fn mark_sent(&mut self, seq: SeqNum) -> Result<(), SimError> {
        let expected = self.next_unsent().map(|e| e.seq);
        if expected != Some(seq) {
            return Err(SimError::SendOutOfOrder {
                seq: seq.0,
                expected: expected.map(|s| s.0),
            });
        }
        let slot = self
            .slot_of(seq)
            .ok_or(SimError::UnknownSequence { seq: seq.0 })?;
        if let Some(entry) = self.entries[slot].as_mut() {
            entry.sent = true;
        }
        self.send_cursor += 1;
        trace!(seq = seq.0, "rob sent");
        Ok(())
    }

    /// Returns true if some request has not been handed to memory yet.
    pub fn has_unsent(&self) -> bool {
        self.send_cursor < self.next_seq
    }

    /// Finds the entry with the given sequence number.
    pub fn get(&self, seq: SeqNum) -> Option<&RobEntry<Req, Resp>> {
        self.slot_of(seq).and_then(|slot| self.entries[slot].as_ref())
    }

    /// Iterates over occupied entries from oldest to youngest.
    pub fn iter(&self) -> impl Iterator<Item = &RobEntry<Req, Resp>> {
        (0..self.count).filter_map(move |i| {
            self.entries[(self.head + i) % self.entries.len()].as_ref()
        })
    }
}
