// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! poll(2) backend, the portable fallback.
//!
//! Rebuilds the pollfd array from the registered interest on every wait;
//! adequate for the descriptor counts this fallback ever serves.

use super::{borrowed, Poller};
use crate::event_loop::Fired;
use crate::mask::Mask;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

pub(crate) struct PollPoller {
    interest: Vec<(RawFd, Mask)>,
}

impl PollPoller {
    pub(crate) fn new(_capacity: usize) -> Self {
        PollPoller { interest: Vec::new() }
    }
}

impl Poller for PollPoller {
    fn name(&self) -> &'static str {
        "poll"
    }

    fn add(&mut self, fd: RawFd, _old: Mask, added: Mask) -> io::Result<()> {
        let added = added.directions();
        match self.interest.iter_mut().find(|(candidate, _)| *candidate == fd) {
            Some((_, mask)) => *mask |= added,
            None => self.interest.push((fd, added)),
        }
        Ok(())
    }

    fn del(&mut self, fd: RawFd, _old: Mask, removed: Mask) -> io::Result<()> {
        if let Some(position) = self.interest.iter().position(|(candidate, _)| *candidate == fd) {
            let remaining = self.interest[position].1.without(removed);
            if remaining.is_empty() {
                self.interest.swap_remove(position);
            } else {
                self.interest[position].1 = remaining;
            }
        }
        Ok(())
    }

    fn poll(&mut self, timeout: Option<Duration>, fired: &mut Vec<Fired>) -> io::Result<usize> {
        let mut fds: Vec<PollFd> = self
            .interest
            .iter()
            .map(|(fd, mask)| {
                let mut flags = PollFlags::empty();
                if mask.contains(Mask::READABLE) {
                    flags |= PollFlags::POLLIN;
                }
                if mask.contains(Mask::WRITABLE) {
                    flags |= PollFlags::POLLOUT;
                }
                PollFd::new(borrowed(*fd), flags)
            })
            .collect();
        let timeout = match timeout {
            None => PollTimeout::NONE,
            Some(duration) => PollTimeout::from(duration.as_millis().min(65_534) as u16),
        };
        match poll(&mut fds, timeout) {
            Ok(_) => {}
            Err(nix::errno::Errno::EINTR) => return Ok(0),
            Err(err) => return Err(io::Error::from(err)),
        }
        fired.clear();
        for (pollfd, (fd, _)) in fds.iter().zip(&self.interest) {
            let Some(revents) = pollfd.revents() else {
                continue;
            };
            let mut mask = Mask::NONE;
            if revents.contains(PollFlags::POLLIN) {
                mask |= Mask::READABLE;
            }
            if revents.contains(PollFlags::POLLOUT) {
                mask |= Mask::WRITABLE;
            }
            if revents.intersects(PollFlags::POLLERR | PollFlags::POLLHUP) {
                mask |= Mask::WRITABLE;
            }
            if !mask.is_empty() {
                fired.push(Fired { fd: *fd, mask });
            }
        }
        Ok(fired.len())
    }

    fn resize(&mut self, _capacity: usize) -> io::Result<()> {
        Ok(())
    }
}
