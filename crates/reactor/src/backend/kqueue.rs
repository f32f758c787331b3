// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kqueue backend (macOS and the BSDs).

use super::Poller;
use crate::event_loop::Fired;
use crate::mask::Mask;
use nix::sys::event::{EventFilter, EventFlag, FilterFlag, KEvent, Kqueue};
use nix::sys::time::TimeSpec;
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

pub(crate) struct KqueuePoller {
    kq: Kqueue,
    events: Vec<KEvent>,
}

fn change(fd: RawFd, filter: EventFilter, flags: EventFlag) -> KEvent {
    KEvent::new(fd as usize, filter, flags, FilterFlag::empty(), 0, 0)
}

impl KqueuePoller {
    pub(crate) fn new(capacity: usize) -> io::Result<Self> {
        let kq = Kqueue::new().map_err(io::Error::from)?;
        let placeholder = change(0, EventFilter::EVFILT_READ, EventFlag::empty());
        Ok(KqueuePoller { kq, events: vec![placeholder; capacity.max(1)] })
    }

    fn apply(&self, changes: &[KEvent]) -> io::Result<()> {
        let mut none: [KEvent; 0] = [];
        self.kq
            .kevent(changes, &mut none, Some(TimeSpec::from_duration(Duration::ZERO)).map(Into::into))
            .map(|_| ())
            .map_err(io::Error::from)
    }
}

impl Poller for KqueuePoller {
    fn name(&self) -> &'static str {
        "kqueue"
    }

    fn add(&mut self, fd: RawFd, old: Mask, added: Mask) -> io::Result<()> {
        let fresh = added.directions().without(old);
        let mut changes = Vec::with_capacity(2);
        if fresh.contains(Mask::READABLE) {
            changes.push(change(fd, EventFilter::EVFILT_READ, EventFlag::EV_ADD));
        }
        if fresh.contains(Mask::WRITABLE) {
            changes.push(change(fd, EventFilter::EVFILT_WRITE, EventFlag::EV_ADD));
        }
        if changes.is_empty() {
            return Ok(());
        }
        self.apply(&changes)
    }

    fn del(&mut self, fd: RawFd, old: Mask, removed: Mask) -> io::Result<()> {
        let dropped = removed.directions();
        let mut changes = Vec::with_capacity(2);
        if dropped.contains(Mask::READABLE) && old.contains(Mask::READABLE) {
            changes.push(change(fd, EventFilter::EVFILT_READ, EventFlag::EV_DELETE));
        }
        if dropped.contains(Mask::WRITABLE) && old.contains(Mask::WRITABLE) {
            changes.push(change(fd, EventFilter::EVFILT_WRITE, EventFlag::EV_DELETE));
        }
        if changes.is_empty() {
            return Ok(());
        }
        self.apply(&changes)
    }

    fn poll(&mut self, timeout: Option<Duration>, fired: &mut Vec<Fired>) -> io::Result<usize> {
        let timeout = timeout.map(|duration| TimeSpec::from_duration(duration).into());
        let count = match self.kq.kevent(&[], &mut self.events, timeout) {
            Ok(count) => count,
            Err(nix::errno::Errno::EINTR) => 0,
            Err(err) => return Err(io::Error::from(err)),
        };
        fired.clear();
        for event in &self.events[..count] {
            let mask = match event.filter() {
                Ok(EventFilter::EVFILT_READ) => Mask::READABLE,
                Ok(EventFilter::EVFILT_WRITE) => Mask::WRITABLE,
                _ => continue,
            };
            fired.push(Fired { fd: event.ident() as RawFd, mask });
        }
        Ok(count)
    }

    fn resize(&mut self, capacity: usize) -> io::Result<()> {
        let placeholder = change(0, EventFilter::EVFILT_READ, EventFlag::empty());
        self.events.resize(capacity.max(1), placeholder);
        Ok(())
    }
}
