// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Out-bound event ring.
//!
//! Fixed capacity. On overflow the ring is cleared and replaced with a
//! single `Overflow` sentinel carrying the generation at the time of the
//! overflow; the queue then refuses further events until the consumer has
//! resynced from a full snapshot and acknowledged with `ack_resync`.

use std::collections::VecDeque;

use vellum_wire::EventRecord;

/// Ring capacity in records.
pub const EVENT_CAPACITY: usize = 2048;

/// Event type tags carried in [`EventRecord::ty`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u16)]
pub enum EventType {
    /// The document changed; `a` carries the new generation.
    DocChanged = 1,
    /// An interaction session started or ended; `a` carries the generation,
    /// flags bit 0 is set while a session is active.
    InteractionChanged = 2,
    /// The history log or cursor moved; flags bit 0 = can_undo, bit 1 =
    /// can_redo; `a` carries the generation.
    HistoryChanged = 3,
    /// The ring overflowed and was cleared; `a` carries the generation the
    /// consumer must resync to.
    Overflow = 4,
}

/// The engine's event queue.
#[derive(Debug)]
pub struct EventQueue {
    ring: VecDeque<EventRecord>,
    capacity: usize,
    needs_resync: bool,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::with_capacity(EVENT_CAPACITY)
    }
}

impl EventQueue {
    /// Creates a queue with an explicit capacity (tests shrink it).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ring: VecDeque::with_capacity(capacity.min(EVENT_CAPACITY)),
            capacity: capacity.max(1),
            needs_resync: false,
        }
    }

    /// Whether the ring has undelivered records.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.ring.is_empty()
    }

    /// Whether an overflow is awaiting acknowledgement.
    #[must_use]
    pub fn needs_resync(&self) -> bool {
        self.needs_resync
    }

    /// Pushes an event. While a resync is pending, everything except the
    /// sentinel already in the ring is dropped; the consumer is required to
    /// re-read the world anyway.
    pub fn push(&mut self, ty: EventType, flags: u16, a: u32, b: u32, c: u32, d: u32) {
        if self.needs_resync {
            return;
        }
        if self.ring.len() >= self.capacity {
            self.overflow(a);
            return;
        }
        self.ring.push_back(EventRecord {
            ty: ty as u16,
            flags,
            a,
            b,
            c,
            d,
        });
    }

    fn overflow(&mut self, generation: u32) {
        self.ring.clear();
        self.ring.push_back(EventRecord {
            ty: EventType::Overflow as u16,
            flags: 0,
            a: generation,
            b: 0,
            c: 0,
            d: 0,
        });
        self.needs_resync = true;
    }

    /// Polls up to `max` records off the ring.
    pub fn poll(&mut self, max: usize) -> Vec<EventRecord> {
        let n = max.min(self.ring.len());
        self.ring.drain(..n).collect()
    }

    /// Rearms the queue after a full resync. The generation is the one the
    /// consumer rebuilt its state from; stale acknowledgements (from before
    /// the overflow) are ignored so a late ack cannot rearm spuriously.
    pub fn ack_resync(&mut self, generation: u32, current_generation: u32) {
        if generation == current_generation {
            self.needs_resync = false;
        }
    }

    /// Drops everything, including a pending resync.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.needs_resync = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_poll_in_order() {
        let mut q = EventQueue::default();
        q.push(EventType::DocChanged, 0, 1, 0, 0, 0);
        q.push(EventType::HistoryChanged, 0b11, 1, 0, 0, 0);
        let polled = q.poll(10);
        assert_eq!(polled.len(), 2);
        assert_eq!(polled[0].ty, EventType::DocChanged as u16);
        assert_eq!(polled[1].flags, 0b11);
        assert!(!q.has_pending());
    }

    #[test]
    fn poll_respects_max() {
        let mut q = EventQueue::default();
        for i in 0..5 {
            q.push(EventType::DocChanged, 0, i, 0, 0, 0);
        }
        assert_eq!(q.poll(2).len(), 2);
        assert_eq!(q.poll(99).len(), 3);
    }

    #[test]
    fn overflow_collapses_to_single_sentinel() {
        let mut q = EventQueue::with_capacity(4);
        for i in 0..10 {
            q.push(EventType::DocChanged, 0, i, 0, 0, 0);
        }
        let polled = q.poll(100);
        assert_eq!(polled.len(), 1);
        assert_eq!(polled[0].ty, EventType::Overflow as u16);
        assert!(q.needs_resync());
    }

    #[test]
    fn events_dropped_until_ack() {
        let mut q = EventQueue::with_capacity(2);
        q.push(EventType::DocChanged, 0, 1, 0, 0, 0);
        q.push(EventType::DocChanged, 0, 2, 0, 0, 0);
        q.push(EventType::DocChanged, 0, 3, 0, 0, 0); // overflow
        q.poll(10);
        q.push(EventType::DocChanged, 0, 4, 0, 0, 0); // dropped
        assert!(!q.has_pending());
        q.ack_resync(7, 7);
        assert!(!q.needs_resync());
        q.push(EventType::DocChanged, 0, 5, 0, 0, 0);
        assert!(q.has_pending());
    }

    #[test]
    fn stale_ack_is_ignored() {
        let mut q = EventQueue::with_capacity(1);
        q.push(EventType::DocChanged, 0, 1, 0, 0, 0);
        q.push(EventType::DocChanged, 0, 2, 0, 0, 0); // overflow at gen 2
        q.ack_resync(1, 2);
        assert!(q.needs_resync());
        q.ack_resync(2, 2);
        assert!(!q.needs_resync());
    }
}
