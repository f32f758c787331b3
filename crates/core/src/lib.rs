// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ember-core: incrementally-resized hash table and shared time primitives

pub mod clock;
pub mod dict;
pub mod hash;

pub use clock::{Clock, FakeClock, SystemClock};
pub use dict::{
    AsciiCaseless, Dict, DictEntry, DictError, Discipline, FastIter, OccupiedEntry, SafeIter,
    SipDiscipline, VacantEntry,
};
pub use hash::{hash_seed, seed_keys, set_hash_seed, wang_mix64};
