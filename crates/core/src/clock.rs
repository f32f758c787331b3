// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock abstraction for testable time handling
//!
//! Every deadline in this workspace lives on wall-clock epoch
//! milliseconds, so that single reading is all a clock provides. The real
//! clock can be stepped backwards underneath the process; the fake one can
//! be driven backwards on purpose, which is what exercises skew recovery.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of wall-clock time.
pub trait Clock: Clone + Send + Sync {
    /// Milliseconds since the Unix epoch. Not monotonic: consumers that
    /// schedule deadlines against it must detect and recover from skew.
    fn epoch_ms(&self) -> u64;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |since_epoch| since_epoch.as_millis() as u64)
    }
}

/// Starting point far enough from zero that tests can rewind freely.
const FAKE_START_MS: u64 = 1_000_000_000;

/// Clock for tests: time stands still until a test moves it, in either
/// direction. Clones share one time source.
#[derive(Clone)]
pub struct FakeClock {
    now_ms: Arc<AtomicU64>,
}

impl FakeClock {
    pub fn new() -> Self {
        FakeClock { now_ms: Arc::new(AtomicU64::new(FAKE_START_MS)) }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Move time backwards, saturating at the epoch.
    pub fn rewind(&self, by: Duration) {
        let ms = by.as_millis() as u64;
        let _ = self.now_ms.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
            Some(now.saturating_sub(ms))
        });
    }

    /// Pin the clock to an absolute instant.
    pub fn set_epoch_ms(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn epoch_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
