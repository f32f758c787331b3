// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! epoll backend (Linux).

use super::{borrowed, Poller};
use crate::event_loop::Fired;
use crate::mask::Mask;
use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags, EpollTimeout};
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

pub(crate) struct EpollPoller {
    epoll: Epoll,
    events: Vec<EpollEvent>,
}

impl EpollPoller {
    pub(crate) fn new(capacity: usize) -> io::Result<Self> {
        let epoll = Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC).map_err(io::Error::from)?;
        Ok(EpollPoller { epoll, events: vec![EpollEvent::empty(); capacity.max(1)] })
    }
}

fn kernel_flags(mask: Mask) -> EpollFlags {
    let mut flags = EpollFlags::empty();
    if mask.contains(Mask::READABLE) {
        flags |= EpollFlags::EPOLLIN;
    }
    if mask.contains(Mask::WRITABLE) {
        flags |= EpollFlags::EPOLLOUT;
    }
    flags
}

impl Poller for EpollPoller {
    fn name(&self) -> &'static str {
        "epoll"
    }

    fn add(&mut self, fd: RawFd, old: Mask, added: Mask) -> io::Result<()> {
        let merged = (old | added).directions();
        let mut event = EpollEvent::new(kernel_flags(merged), fd as u64);
        eprintln!("DEBUG add fd={} old={:?} added={:?} epollfd={:?}", fd, old, added, self.epoll);
        let r = if old.directions().is_empty() {
            self.epoll.add(borrowed(fd), event).map_err(io::Error::from)
        } else {
            self.epoll.modify(borrowed(fd), &mut event).map_err(io::Error::from)
        };
        eprintln!("DEBUG add result={:?}", r);
        r
    }

    fn del(&mut self, fd: RawFd, old: Mask, removed: Mask) -> io::Result<()> {
        let remaining = old.without(removed).directions();
        eprintln!("DEBUG del fd={} old={:?} removed={:?} remaining={:?} epollfd={:?}", fd, old, removed, remaining, self.epoll);
        if remaining.is_empty() {
            self.epoll.delete(borrowed(fd)).map_err(io::Error::from)
        } else {
            let mut event = EpollEvent::new(kernel_flags(remaining), fd as u64);
            self.epoll.modify(borrowed(fd), &mut event).map_err(io::Error::from)
        }
    }

    fn poll(&mut self, timeout: Option<Duration>, fired: &mut Vec<Fired>) -> io::Result<usize> {
        let timeout = match timeout {
            None => EpollTimeout::NONE,
            Some(duration) => EpollTimeout::from(duration.as_millis().min(65_534) as u16),
        };
        eprintln!("DEBUG poll timeout={:?} epollfd={:?}", timeout, self.epoll);
        let count = match self.epoll.wait(&mut self.events, timeout) {
            Ok(count) => count,
            Err(nix::errno::Errno::EINTR) => 0,
            Err(err) => return Err(io::Error::from(err)),
        };
        eprintln!("DEBUG poll count={}", count);
        fired.clear();
        for event in &self.events[..count] {
            let flags = event.events();
            let mut mask = Mask::NONE;
            if flags.contains(EpollFlags::EPOLLIN) {
                mask |= Mask::READABLE;
            }
            if flags.contains(EpollFlags::EPOLLOUT) {
                mask |= Mask::WRITABLE;
            }
            if flags.intersects(EpollFlags::EPOLLERR | EpollFlags::EPOLLHUP) {
                mask |= Mask::WRITABLE;
            }
            fired.push(Fired { fd: event.data() as RawFd, mask });
        }
        Ok(count)
    }

    fn resize(&mut self, capacity: usize) -> io::Result<()> {
        self.events.resize(capacity.max(1), EpollEvent::empty());
        Ok(())
    }
}
