// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event loop: file event registration and the processing tick.

use crate::backend::{self, Poller};
use crate::error::ReactorError;
use crate::mask::Mask;
use crate::timer::TimeEvent;
use ember_core::{Clock, SystemClock};
use std::cell::RefCell;
use std::ops::BitOr;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::time::Duration;

/// Callback for file readiness. Receives the loop, the embedder's context,
/// the fd, and the fired direction bits. Must not block and must not
/// re-enter [`EventLoop::process`].
pub type FileProc<C, K = SystemClock> =
    Rc<RefCell<dyn FnMut(&mut EventLoop<C, K>, &mut C, RawFd, Mask)>>;

/// Hook invoked around the blocking wait.
pub type SleepProc<C, K = SystemClock> = Rc<RefCell<dyn FnMut(&mut EventLoop<C, K>, &mut C)>>;

/// Wrap a closure as a [`FileProc`]. Registering one handle for both
/// directions makes the loop fire it once per tick even when both fire.
pub fn file_proc<C, K, F>(f: F) -> FileProc<C, K>
where
    K: Clock,
    F: FnMut(&mut EventLoop<C, K>, &mut C, RawFd, Mask) + 'static,
{
    Rc::new(RefCell::new(f))
}

/// Wrap a closure as a [`SleepProc`].
pub fn sleep_proc<C, K, F>(f: F) -> SleepProc<C, K>
where
    K: Clock,
    F: FnMut(&mut EventLoop<C, K>, &mut C) + 'static,
{
    Rc::new(RefCell::new(f))
}

/// One readiness report from the backend.
#[derive(Debug, Clone, Copy)]
pub struct Fired {
    pub fd: RawFd,
    pub mask: Mask,
}

/// What a [`EventLoop::process`] call should handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessFlags(u8);

impl ProcessFlags {
    pub const FILE_EVENTS: ProcessFlags = ProcessFlags(1);
    pub const TIME_EVENTS: ProcessFlags = ProcessFlags(2);
    pub const ALL: ProcessFlags = ProcessFlags(1 | 2);
    /// Poll without blocking even when no timer is due soon.
    pub const DONT_WAIT: ProcessFlags = ProcessFlags(4);
    pub const CALL_AFTER_SLEEP: ProcessFlags = ProcessFlags(8);

    pub fn contains(self, other: ProcessFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: ProcessFlags) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for ProcessFlags {
    type Output = ProcessFlags;

    fn bitor(self, rhs: ProcessFlags) -> ProcessFlags {
        ProcessFlags(self.0 | rhs.0)
    }
}

pub(crate) struct FileSlot<C, K: Clock> {
    pub(crate) mask: Mask,
    pub(crate) rproc: Option<FileProc<C, K>>,
    pub(crate) wproc: Option<FileProc<C, K>>,
}

impl<C, K: Clock> FileSlot<C, K> {
    fn vacant() -> Self {
        FileSlot { mask: Mask::NONE, rproc: None, wproc: None }
    }
}

/// Single-threaded reactor multiplexing file readiness and timers.
///
/// `C` is the embedder's state, threaded into every callback; the loop
/// itself is also handed back so callbacks can register and deregister
/// events while running.
pub struct EventLoop<C, K: Clock = SystemClock> {
    pub(crate) events: Vec<FileSlot<C, K>>,
    fired: Vec<Fired>,
    pub(crate) timers: Vec<TimeEvent<C, K>>,
    pub(crate) next_timer_id: i64,
    pub(crate) last_tick_ms: u64,
    maxfd: RawFd,
    stop: bool,
    backend: Box<dyn Poller>,
    before_sleep: Option<SleepProc<C, K>>,
    after_sleep: Option<SleepProc<C, K>>,
    pub(crate) clock: K,
}

impl<C> EventLoop<C, SystemClock> {
    pub fn new(capacity: usize) -> Result<Self, ReactorError> {
        Self::with_clock(capacity, SystemClock)
    }
}

impl<C, K: Clock> EventLoop<C, K> {
    pub fn with_clock(capacity: usize, clock: K) -> Result<Self, ReactorError> {
        let backend = backend::create(capacity)?;
        tracing::debug!(capacity, backend = backend.name(), "event loop created");
        let mut events = Vec::with_capacity(capacity);
        events.resize_with(capacity, FileSlot::vacant);
        let last_tick_ms = clock.epoch_ms();
        Ok(EventLoop {
            events,
            fired: Vec::with_capacity(capacity),
            timers: Vec::new(),
            next_timer_id: 0,
            last_tick_ms,
            maxfd: -1,
            stop: false,
            backend,
            before_sleep: None,
            after_sleep: None,
            clock,
        })
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    /// Name of the kernel readiness API in use.
    pub fn api_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn max_fd(&self) -> RawFd {
        self.maxfd
    }

    /// Currently registered mask for `fd`, `NONE` when unregistered.
    pub fn file_mask(&self, fd: RawFd) -> Mask {
        self.slot_index(fd).map(|i| self.events[i].mask).unwrap_or(Mask::NONE)
    }

    /// Adjust capacity. Shrinking refuses to drop a registered fd.
    pub fn resize(&mut self, capacity: usize) -> Result<(), ReactorError> {
        if capacity == self.events.len() {
            return Ok(());
        }
        if i64::from(self.maxfd) >= capacity as i64 {
            return Err(ReactorError::ShrinkBelowActive { requested: capacity, maxfd: self.maxfd });
        }
        self.backend.resize(capacity)?;
        self.events.resize_with(capacity, FileSlot::vacant);
        Ok(())
    }

    /// Register `proc_` for the directions in `mask` on `fd`, merging with
    /// any existing registration. The fd must stay open until removed.
    pub fn add_file(&mut self, fd: RawFd, mask: Mask, proc_: FileProc<C, K>) -> Result<(), ReactorError> {
        let index = self.slot_index(fd)?;
        let old = self.events[index].mask;
        self.backend.add(fd, old, mask)?;
        let slot = &mut self.events[index];
        slot.mask |= mask;
        if mask.contains(Mask::READABLE) {
            slot.rproc = Some(Rc::clone(&proc_));
        }
        if mask.contains(Mask::WRITABLE) {
            slot.wproc = Some(Rc::clone(&proc_));
        }
        if fd > self.maxfd {
            self.maxfd = fd;
        }
        Ok(())
    }

    /// Drop the directions in `mask` from `fd`'s registration. Removing
    /// the write side clears the barrier modifier with it.
    pub fn remove_file(&mut self, fd: RawFd, mask: Mask) -> Result<(), ReactorError> {
        let index = self.slot_index(fd)?;
        if self.events[index].mask.is_empty() {
            return Ok(());
        }
        let mut mask = mask;
        if mask.contains(Mask::WRITABLE) {
            mask |= Mask::BARRIER;
        }
        let old = self.events[index].mask;
        let remaining = old.without(mask);
        let slot = &mut self.events[index];
        slot.mask = remaining;
        if !remaining.contains(Mask::READABLE) {
            slot.rproc = None;
        }
        if !remaining.contains(Mask::WRITABLE) {
            slot.wproc = None;
        }
        if fd == self.maxfd && remaining.is_empty() {
            self.maxfd = self.events[..index]
                .iter()
                .rposition(|slot| !slot.mask.is_empty())
                .map_or(-1, |i| i as RawFd);
        }
        self.backend.del(fd, old, mask).map_err(ReactorError::from)
    }

    pub fn set_before_sleep(&mut self, hook: Option<SleepProc<C, K>>) {
        self.before_sleep = hook;
    }

    pub fn set_after_sleep(&mut self, hook: Option<SleepProc<C, K>>) {
        self.after_sleep = hook;
    }

    /// One tick: wait for readiness (bounded by the nearest timer), fire
    /// file callbacks in direction order, then run due timers. Returns how
    /// many events fired.
    pub fn process(&mut self, ctx: &mut C, flags: ProcessFlags) -> usize {
        if !flags.intersects(ProcessFlags::FILE_EVENTS | ProcessFlags::TIME_EVENTS) {
            return 0;
        }
        let mut processed = 0;
        let want_timer_wait =
            flags.contains(ProcessFlags::TIME_EVENTS) && !flags.contains(ProcessFlags::DONT_WAIT);
        if self.maxfd != -1 || want_timer_wait {
            let timeout = if want_timer_wait {
                match self.nearest_deadline() {
                    Some(when) => {
                        Some(Duration::from_millis(when.saturating_sub(self.clock.epoch_ms())))
                    }
                    None => None,
                }
            } else if flags.contains(ProcessFlags::DONT_WAIT) {
                Some(Duration::ZERO)
            } else {
                None
            };
            let fired_count = match self.backend.poll(timeout, &mut self.fired) {
                Ok(count) => count,
                Err(err) => {
                    tracing::warn!(error = %err, "readiness poll failed");
                    0
                }
            };
            if flags.contains(ProcessFlags::CALL_AFTER_SLEEP) {
                if let Some(hook) = self.after_sleep.clone() {
                    (hook.borrow_mut())(self, ctx);
                }
            }
            for i in 0..fired_count {
                let Some(&Fired { fd, mask }) = self.fired.get(i) else {
                    break;
                };
                processed += self.dispatch_file_event(ctx, fd, mask);
            }
        }
        if flags.contains(ProcessFlags::TIME_EVENTS) {
            processed += self.process_time_events(ctx);
        }
        processed
    }

    /// Loop until [`EventLoop::stop`], running the before-sleep hook ahead
    /// of every tick.
    pub fn run(&mut self, ctx: &mut C) {
        self.stop = false;
        while !self.stop {
            if let Some(hook) = self.before_sleep.clone() {
                (hook.borrow_mut())(self, ctx);
            }
            self.process(ctx, ProcessFlags::ALL | ProcessFlags::CALL_AFTER_SLEEP);
        }
    }

    pub fn stop(&mut self) {
        self.stop = true;
    }

    fn slot_index(&self, fd: RawFd) -> Result<usize, ReactorError> {
        usize::try_from(fd)
            .ok()
            .filter(|index| *index < self.events.len())
            .ok_or(ReactorError::OutOfRange { fd, capacity: self.events.len() })
    }

    /// Fire the callbacks for one fd. Readable runs before writable unless
    /// the registration carries the barrier modifier, which inverts the
    /// order so queued output is flushed before new input is consumed. A
    /// single handle registered for both directions fires only once.
    fn dispatch_file_event(&mut self, ctx: &mut C, fd: RawFd, mask: Mask) -> usize {
        let Ok(index) = self.slot_index(fd) else {
            return 0;
        };
        let registered = self.events[index].mask;
        if registered.is_empty() {
            return 0;
        }
        let invert = registered.contains(Mask::BARRIER);
        let mut fired = 0u32;

        if !invert && registered.contains(Mask::READABLE) && mask.contains(Mask::READABLE) {
            if let Some(proc_) = self.events[index].rproc.clone() {
                (proc_.borrow_mut())(self, ctx, fd, mask);
                fired += 1;
            }
        }

        // Each callback may have rewritten this fd's registration, so the
        // slot is re-read before every dispatch.
        let registered = self.events.get(index).map_or(Mask::NONE, |slot| slot.mask);
        if registered.contains(Mask::WRITABLE) && mask.contains(Mask::WRITABLE) {
            let (proc_, same) = self.writable_proc(index);
            if fired == 0 || !same {
                if let Some(proc_) = proc_ {
                    (proc_.borrow_mut())(self, ctx, fd, mask);
                    fired += 1;
                }
            }
        }

        if invert {
            let registered = self.events.get(index).map_or(Mask::NONE, |slot| slot.mask);
            if registered.contains(Mask::READABLE) && mask.contains(Mask::READABLE) {
                let (_, same) = self.writable_proc(index);
                if fired == 0 || !same {
                    if let Some(proc_) = self.events[index].rproc.clone() {
                        (proc_.borrow_mut())(self, ctx, fd, mask);
                        fired += 1;
                    }
                }
            }
        }
        usize::from(fired > 0)
    }

    /// The writable callback plus whether it is the same handle as the
    /// readable one.
    fn writable_proc(&self, index: usize) -> (Option<FileProc<C, K>>, bool) {
        let slot = &self.events[index];
        let same = matches!(
            (&slot.rproc, &slot.wproc),
            (Some(r), Some(w)) if Rc::ptr_eq(r, w)
        );
        (slot.wproc.clone(), same)
    }
}

#[cfg(test)]
#[path = "event_loop_tests.rs"]
mod tests;
