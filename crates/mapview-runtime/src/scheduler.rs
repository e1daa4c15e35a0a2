// SPDX-License-Identifier: MIT
//! Host-driven timer scheduling.
//!
//! The engine never sleeps. When it needs to try something later it asks a
//! [`Scheduler`] for a [`TimerId`]; the host arms a real timer (for example
//! `setTimeout`) and calls back into the engine with the same id when it
//! fires. Cancelling an id guarantees the engine ignores it if it still fires.
//!
//! [`ManualScheduler`] is the deterministic implementation: time only moves
//! when [`ManualScheduler::advance`] is called, and due timers are returned
//! in deadline order.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use web_time::Duration;

/// Opaque identifier of one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Raw id, for passing across the host boundary.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Rebuild an id received back from the host.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// Timer seam between the engine and its host.
pub trait Scheduler {
    /// Request a callback after `delay`.
    fn schedule(&mut self, delay: Duration) -> TimerId;

    /// Cancel a pending timer. Returns `false` if it already fired or was
    /// never scheduled.
    fn cancel(&mut self, id: TimerId) -> bool;

    /// Mark a timer as fired. Returns `false` if it was cancelled, in which
    /// case the caller must ignore it.
    fn acknowledge(&mut self, id: TimerId) -> bool;
}

/// Deterministic scheduler driven by explicit time advancement.
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<TimerId, Duration>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scheduler time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Advance time by `dt` and return the timers that became due, earliest
    /// deadline first. Returned timers stay pending until acknowledged.
    pub fn advance(&mut self, dt: Duration) -> Vec<TimerId> {
        self.now = self.now.saturating_add(dt);
        let mut due: Vec<(Duration, TimerId)> = self
            .pending
            .iter()
            .filter(|&(_, deadline)| *deadline <= self.now)
            .map(|(id, deadline)| (*deadline, *id))
            .collect();
        due.sort();
        due.into_iter().map(|(_, id)| id).collect()
    }

    /// Number of timers still pending.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Deadline of a pending timer.
    #[must_use]
    pub fn deadline(&self, id: TimerId) -> Option<Duration> {
        self.pending.get(&id).copied()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next_id = self.next_id.saturating_add(1);
        let id = TimerId(self.next_id);
        self.pending.insert(id, self.now.saturating_add(delay));
        tracing::trace!(timer = id.0, delay_ms = delay.as_millis() as u64, "timer scheduled");
        id
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        self.pending.remove(&id).is_some()
    }

    fn acknowledge(&mut self, id: TimerId) -> bool {
        self.pending.remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let mut s = ManualScheduler::new();
        let late = s.schedule(ms(300));
        let early = s.schedule(ms(100));
        assert!(s.advance(ms(50)).is_empty());
        assert_eq!(s.advance(ms(300)), vec![early, late]);
    }

    #[test]
    fn cancelled_timer_is_not_due_and_not_acknowledged() {
        let mut s = ManualScheduler::new();
        let id = s.schedule(ms(100));
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(s.advance(ms(200)).is_empty());
        assert!(!s.acknowledge(id));
    }

    #[test]
    fn acknowledge_consumes_timer() {
        let mut s = ManualScheduler::new();
        let id = s.schedule(ms(10));
        assert_eq!(s.advance(ms(10)), vec![id]);
        assert!(s.acknowledge(id));
        assert!(!s.acknowledge(id));
        assert_eq!(s.pending_count(), 0);
    }

    #[test]
    fn deadlines_are_relative_to_current_time() {
        let mut s = ManualScheduler::new();
        s.advance(ms(1000));
        let id = s.schedule(ms(250));
        assert_eq!(s.deadline(id), Some(ms(1250)));
        assert_eq!(TimerId::from_raw(id.get()), id);
    }
}
