// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Random access: uniform single pick and bounded bucket sampling.

use super::{Bucket, Dict};
use rand::Rng;

impl<K, V, D> Dict<K, V, D> {
    /// Uniformly-ish random entry across both tables.
    ///
    /// Picks a random non-empty bucket, then a random entry in its chain.
    /// During a rebuild the already-drained prefix of the old table is
    /// excluded from the pick so probing terminates quickly.
    pub fn random(&self) -> Option<(&K, &V)> {
        if self.is_empty() {
            return None;
        }
        let mut rng = rand::thread_rng();
        let bucket = if self.is_rehashing() {
            let drained = self.rehash_idx.unwrap_or(0);
            loop {
                let span = self.t0.size() + self.t1.size() - drained;
                let slot = drained + rng.gen_range(0..span);
                let bucket = if slot >= self.t0.size() {
                    &self.t1.buckets[slot - self.t0.size()]
                } else {
                    &self.t0.buckets[slot]
                };
                if bucket.is_some() {
                    break bucket;
                }
            }
        } else {
            loop {
                let slot = rng.gen_range(0..self.t0.size());
                let bucket = &self.t0.buckets[slot];
                if bucket.is_some() {
                    break bucket;
                }
            }
        };
        let len = chain_len(bucket);
        chain_nth(bucket, rng.gen_range(0..len))
    }

    /// Up to `count` entries from consecutive buckets starting at a random
    /// index, probing both tables during a rebuild. Not uniform; suited to
    /// probabilistic maintenance passes. Gives up after `10 * count` probe
    /// steps on a pathologically sparse table.
    pub fn sample(&self, count: usize) -> Vec<(&K, &V)> {
        let count = count.min(self.len());
        let mut out = Vec::with_capacity(count);
        if count == 0 {
            return out;
        }
        let mut rng = rand::thread_rng();
        let mut max_steps = count * 10;
        let tables = if self.is_rehashing() { 2 } else { 1 };
        let max_mask = if tables == 2 {
            self.t0.mask().max(self.t1.mask())
        } else {
            self.t0.mask()
        } as usize;
        let mut i = rng.gen_range(0..=max_mask);
        let mut empty_run = 0;
        while out.len() < count && max_steps > 0 {
            max_steps -= 1;
            for table_index in 0..tables {
                // The drained prefix of the old table holds nothing; jump
                // past it unless the index is only valid there.
                if tables == 2 && table_index == 0 {
                    let drained = self.rehash_idx.unwrap_or(0);
                    if i < drained {
                        if i >= self.t1.size() {
                            i = drained;
                        } else {
                            continue;
                        }
                    }
                }
                let t = if table_index == 0 { &self.t0 } else { &self.t1 };
                if i >= t.size() {
                    continue;
                }
                match t.buckets[i].as_deref() {
                    None => {
                        empty_run += 1;
                        if empty_run >= 5 && empty_run > count {
                            i = rng.gen_range(0..=max_mask);
                            empty_run = 0;
                        }
                    }
                    Some(mut entry) => {
                        empty_run = 0;
                        loop {
                            out.push((&entry.key, &entry.val));
                            if out.len() == count {
                                return out;
                            }
                            match entry.next.as_deref() {
                                Some(next) => entry = next,
                                None => break,
                            }
                        }
                    }
                }
            }
            i = (i + 1) & max_mask;
        }
        out
    }
}

fn chain_len<K, V>(bucket: &Bucket<K, V>) -> usize {
    let mut len = 0;
    let mut cur = bucket.as_deref();
    while let Some(entry) = cur {
        len += 1;
        cur = entry.next.as_deref();
    }
    len
}

fn chain_nth<K, V>(bucket: &Bucket<K, V>, n: usize) -> Option<(&K, &V)> {
    let mut cur = bucket.as_deref();
    let mut i = 0;
    while let Some(entry) = cur {
        if i == n {
            return Some((&entry.key, &entry.val));
        }
        cur = entry.next.as_deref();
        i += 1;
    }
    None
}

#[cfg(test)]
#[path = "sample_tests.rs"]
mod tests;
