// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Safe and fast iteration.
//!
//! Both iterators are cursor handles: `next` borrows the dictionary per
//! call instead of holding it, so the caller can interleave other access.
//! What each variant permits between `next` calls differs:
//!
//! - [`SafeIter`] registers itself with the dictionary from its first
//!   `next` until `finish`. While any safe iterator is live no rehash step
//!   runs, which keeps bucket positions meaningful across interleaved
//!   inserts, deletes, and lookups.
//! - [`FastIter`] registers nothing and tolerates nothing: it snapshots a
//!   fingerprint on first `next` and `finish` aborts the process if the
//!   dictionary changed underneath it. Use it only where no mutation can
//!   happen.
//!
//! Iteration order is bucket order in the old table, chain order within a
//! bucket, then the new table if a rebuild is in flight.

use super::{invariant_violation, Dict};

/// Iterator that permits interleaved mutation. Call [`SafeIter::finish`]
/// when done; dropping the handle without it leaves migration paused.
#[must_use]
#[derive(Debug, Default)]
pub struct SafeIter {
    table: usize,
    bucket: usize,
    pos: usize,
    started: bool,
}

impl SafeIter {
    pub fn next<'d, K, V, D>(&mut self, dict: &'d Dict<K, V, D>) -> Option<(&'d K, &'d V)> {
        if !self.started {
            self.started = true;
            dict.safe_iterators.set(dict.safe_iterators.get() + 1);
        }
        walk(&mut self.table, &mut self.bucket, &mut self.pos, dict)
    }

    /// Deregister, letting migration resume.
    pub fn finish<K, V, D>(self, dict: &Dict<K, V, D>) {
        if self.started {
            dict.safe_iterators.set(dict.safe_iterators.get().saturating_sub(1));
        }
    }
}

/// Iterator for read-only walks on hot paths. Any mutation between the
/// first `next` and `finish` is a programming error and aborts.
#[must_use]
#[derive(Debug, Default)]
pub struct FastIter {
    table: usize,
    bucket: usize,
    pos: usize,
    started: bool,
    fingerprint: u64,
}

impl FastIter {
    pub fn next<'d, K, V, D>(&mut self, dict: &'d Dict<K, V, D>) -> Option<(&'d K, &'d V)> {
        if !self.started {
            self.started = true;
            self.fingerprint = dict.fingerprint();
        }
        walk(&mut self.table, &mut self.bucket, &mut self.pos, dict)
    }

    pub fn finish<K, V, D>(self, dict: &Dict<K, V, D>) {
        if self.started && dict.fingerprint() != self.fingerprint {
            invariant_violation("dictionary mutated under a fast iterator");
        }
    }
}

impl<K, V, D> Dict<K, V, D> {
    pub fn safe_iter(&self) -> SafeIter {
        SafeIter::default()
    }

    pub fn fast_iter(&self) -> FastIter {
        FastIter::default()
    }

    #[cfg(test)]
    pub(crate) fn live_safe_iterators(&self) -> u32 {
        self.safe_iterators.get()
    }
}

fn walk<'d, K, V, D>(
    table: &mut usize,
    bucket: &mut usize,
    pos: &mut usize,
    dict: &'d Dict<K, V, D>,
) -> Option<(&'d K, &'d V)> {
    loop {
        let t = if *table == 0 { &dict.t0 } else { &dict.t1 };
        if *bucket >= t.size() {
            if *table == 0 && dict.is_rehashing() {
                *table = 1;
                *bucket = 0;
                *pos = 0;
                continue;
            }
            return None;
        }
        let mut cur = t.buckets[*bucket].as_deref();
        let mut offset = 0;
        while let Some(entry) = cur {
            if offset == *pos {
                *pos += 1;
                return Some((&entry.key, &entry.val));
            }
            cur = entry.next.as_deref();
            offset += 1;
        }
        *bucket += 1;
        *pos = 0;
    }
}

#[cfg(test)]
#[path = "iter_tests.rs"]
mod tests;
