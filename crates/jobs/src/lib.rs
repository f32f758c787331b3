// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ember-jobs: background execution of blocking or slow system work
//!
//! Three FIFO queues, each owned by one long-lived worker thread: closing
//! files whose last reference may be a pending unlink, syncing files to
//! disk, and destroying large heap aggregates handed off by the lazy-free
//! layer. Submitters never get a completion callback; observers that need
//! one wait for queue steps instead.

pub mod job;
pub mod pool;

pub use job::{Job, JobKind, JobPayload};
pub use pool::BackgroundPool;
