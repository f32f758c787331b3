// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stateless cursor scan.
//!
//! Walks the whole table across a sequence of calls with no server-side
//! state beyond the returned cursor, and keeps its guarantee while the
//! table grows or shrinks between calls: every element present for the
//! whole scan is reported at least once. Elements may be reported more
//! than once, and elements added or removed mid-scan may or may not be.
//!
//! The cursor iterates bucket indices in reverse-binary order: the
//! increment is applied to the reversed cursor and masked from the high
//! bits down. A bucket visited at some table size expands, after a grow,
//! into a block of buckets that the reversed ordering visits before it
//! moves on, so already-covered buckets are never re-split into uncovered
//! ones. During a rebuild both tables exist; each call visits one bucket
//! of the smaller table and every bucket of the larger table that its
//! index expands into.

use super::{Bucket, Dict, Table};

impl<K, V, D> Dict<K, V, D> {
    /// One scan step from `cursor`. Returns the next cursor; a return of 0
    /// means the scan is complete. Start with a cursor of 0.
    pub fn scan<F>(&self, cursor: u64, entry_fn: F) -> u64
    where
        F: FnMut(&K, &V),
    {
        self.scan_buckets(cursor, entry_fn, |_| {})
    }

    /// Like [`Dict::scan`], additionally reporting each visited bucket
    /// index once before its entries.
    pub fn scan_buckets<F, B>(&self, mut v: u64, mut entry_fn: F, mut bucket_fn: B) -> u64
    where
        F: FnMut(&K, &V),
        B: FnMut(u64),
    {
        if self.is_empty() {
            return 0;
        }
        if !self.is_rehashing() {
            let mask = self.t0.mask();
            bucket_fn(v & mask);
            scan_bucket(&self.t0.buckets[(v & mask) as usize], &mut entry_fn);
            v |= !mask;
            v = next_cursor(v);
        } else {
            let (small, large) = if self.t0.size() <= self.t1.size() {
                (&self.t0, &self.t1)
            } else {
                (&self.t1, &self.t0)
            };
            let small_mask = small.mask();
            let large_mask = large.mask();
            bucket_fn(v & small_mask);
            scan_table(small, v & small_mask, &mut entry_fn);
            // Visit every larger-table bucket this smaller-table index
            // expands into, stepping the bits above the smaller mask.
            loop {
                bucket_fn(v & large_mask);
                scan_table(large, v & large_mask, &mut entry_fn);
                v |= !large_mask;
                v = next_cursor(v);
                if v & (small_mask ^ large_mask) == 0 {
                    break;
                }
            }
        }
        v
    }
}

/// Increment the cursor on its reversed bit pattern.
fn next_cursor(v: u64) -> u64 {
    v.reverse_bits().wrapping_add(1).reverse_bits()
}

fn scan_table<K, V, F>(table: &Table<K, V>, index: u64, entry_fn: &mut F)
where
    F: FnMut(&K, &V),
{
    scan_bucket(&table.buckets[index as usize], entry_fn);
}

fn scan_bucket<K, V, F>(bucket: &Bucket<K, V>, entry_fn: &mut F)
where
    F: FnMut(&K, &V),
{
    let mut cur = bucket.as_deref();
    while let Some(entry) = cur {
        entry_fn(&entry.key, &entry.val);
        cur = entry.next.as_deref();
    }
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
