// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the event loop.

use crate::timer::TimeEventId;
use std::os::fd::RawFd;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("fd {fd} outside event loop capacity {capacity}")]
    OutOfRange { fd: RawFd, capacity: usize },

    #[error("capacity {requested} would drop registered fd {maxfd}")]
    ShrinkBelowActive { requested: usize, maxfd: RawFd },

    #[error("no time event {0}")]
    NoSuchTimeEvent(TimeEventId),

    #[error("readiness backend: {0}")]
    Backend(#[from] std::io::Error),
}
