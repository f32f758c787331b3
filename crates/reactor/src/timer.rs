// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time events: repeating or one-shot callbacks scheduled on the wall clock.
//!
//! Deletion is by tombstone; tombstoned events are reaped (and their
//! finalizers run) during the next time-event pass. Deadlines live on the
//! wall clock, so a pass that observes the clock moving backwards forces
//! every event due rather than letting them drift arbitrarily far out.

use crate::error::ReactorError;
use crate::event_loop::EventLoop;
use ember_core::{Clock, SystemClock};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub(crate) const TOMBSTONE: i64 = -1;

/// Identifier of a scheduled time event. Ids are assigned monotonically
/// and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeEventId(pub(crate) i64);

impl fmt::Display for TimeEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time-event callback. Returns the delay in milliseconds until the next
/// firing, or `None` to stop repeating.
pub type TimeProc<C, K = SystemClock> =
    Rc<RefCell<dyn FnMut(&mut EventLoop<C, K>, &mut C, TimeEventId) -> Option<u64>>>;

/// Cleanup run on the reactor thread when a time event is reaped.
pub type FinalizerProc<C, K = SystemClock> = Box<dyn FnOnce(&mut EventLoop<C, K>, &mut C)>;

/// Wrap a closure as a [`TimeProc`].
pub fn time_proc<C, K, F>(f: F) -> TimeProc<C, K>
where
    K: Clock,
    F: FnMut(&mut EventLoop<C, K>, &mut C, TimeEventId) -> Option<u64> + 'static,
{
    Rc::new(RefCell::new(f))
}

pub(crate) struct TimeEvent<C, K: Clock> {
    pub(crate) id: i64,
    pub(crate) when_ms: u64,
    pub(crate) proc_: TimeProc<C, K>,
    pub(crate) finalizer: Option<FinalizerProc<C, K>>,
}

impl<C, K: Clock> EventLoop<C, K> {
    /// Schedule a callback `delay_ms` from now. The callback's return value
    /// reschedules it after that many milliseconds, or retires it (`None`).
    pub fn create_time(
        &mut self,
        delay_ms: u64,
        proc_: TimeProc<C, K>,
        finalizer: Option<FinalizerProc<C, K>>,
    ) -> TimeEventId {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let when_ms = self.clock.epoch_ms() + delay_ms;
        self.timers.push(TimeEvent { id, when_ms, proc_, finalizer });
        TimeEventId(id)
    }

    /// Mark a time event deleted. It stops firing immediately; storage and
    /// finalizer run are deferred to the next time-event pass.
    pub fn delete_time(&mut self, id: TimeEventId) -> Result<(), ReactorError> {
        match self.timers.iter_mut().find(|event| event.id == id.0) {
            Some(event) => {
                event.id = TOMBSTONE;
                Ok(())
            }
            None => Err(ReactorError::NoSuchTimeEvent(id)),
        }
    }

    pub fn time_event_count(&self) -> usize {
        self.timers.iter().filter(|event| event.id != TOMBSTONE).count()
    }

    /// Earliest live deadline, for bounding the blocking wait.
    pub(crate) fn nearest_deadline(&self) -> Option<u64> {
        self.timers
            .iter()
            .filter(|event| event.id != TOMBSTONE)
            .map(|event| event.when_ms)
            .min()
    }

    pub(crate) fn process_time_events(&mut self, ctx: &mut C) -> usize {
        let now = self.clock.epoch_ms();
        if now < self.last_tick_ms {
            // Recovering progress beats indefinite delay: fire everything
            // early once instead of pushing deadlines out by the skew.
            tracing::warn!(
                now,
                last_tick = self.last_tick_ms,
                "wall clock moved backwards, forcing all timers due"
            );
            for event in &mut self.timers {
                event.when_ms = 0;
            }
        }
        self.last_tick_ms = now;

        // Events created by callbacks during this pass get ids above this
        // snapshot and wait for the next pass.
        let max_id = self.next_timer_id - 1;
        let mut processed = 0;
        let mut i = 0;
        while i < self.timers.len() {
            let id = self.timers[i].id;
            if id == TOMBSTONE {
                let event = self.timers.swap_remove(i);
                if let Some(finalizer) = event.finalizer {
                    finalizer(self, ctx);
                }
                continue;
            }
            if id > max_id {
                i += 1;
                continue;
            }
            if self.timers[i].when_ms <= self.clock.epoch_ms() {
                let proc_ = Rc::clone(&self.timers[i].proc_);
                let again = (proc_.borrow_mut())(self, ctx, TimeEventId(id));
                processed += 1;
                // The callback may have moved events around; relocate ours
                // by id before touching it.
                let now = self.clock.epoch_ms();
                if let Some(event) = self.timers.iter_mut().find(|event| event.id == id) {
                    match again {
                        Some(delay_ms) => event.when_ms = now + delay_ms,
                        None => event.id = TOMBSTONE,
                    }
                }
            }
            i += 1;
        }
        processed
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
