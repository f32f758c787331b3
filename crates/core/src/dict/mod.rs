// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incrementally-resized hash table.
//!
//! The keyspace container: a separate-chaining hash table that rebuilds
//! itself into a larger or smaller table one bucket at a time, so no single
//! operation ever pays the full O(N) migration cost. While a rebuild is in
//! flight the dictionary owns two tables; lookups probe the old table first
//! and then the new one, and every mutating operation moves one more bucket
//! across.

mod discipline;
mod entry;
mod iter;
mod sample;
mod scan;

pub use discipline::{AsciiCaseless, Discipline, SipDiscipline};
pub use entry::{DictEntry, OccupiedEntry, VacantEntry};
pub use iter::{FastIter, SafeIter};

use std::borrow::Borrow;
use std::cell::Cell;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Size of a freshly allocated table.
const INITIAL_SIZE: usize = 4;

/// Load factor above which growth happens even when resizing is disabled.
const FORCE_RESIZE_RATIO: usize = 5;

/// Empty buckets a single rehash step may probe, per requested step.
const EMPTY_VISITS_PER_STEP: usize = 10;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DictError {
    #[error("resize target conflicts with current table state")]
    InvalidResize,

    #[error("resize disabled by policy")]
    ResizeForbidden,
}

pub(crate) type Bucket<K, V> = Option<Box<Entry<K, V>>>;

pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) val: V,
    pub(crate) next: Bucket<K, V>,
}

pub(crate) struct Table<K, V> {
    pub(crate) buckets: Vec<Bucket<K, V>>,
    pub(crate) used: usize,
}

impl<K, V> Table<K, V> {
    fn empty() -> Self {
        Table { buckets: Vec::new(), used: 0 }
    }

    fn with_size(size: usize) -> Self {
        let mut buckets = Vec::with_capacity(size);
        buckets.resize_with(size, || None);
        Table { buckets, used: 0 }
    }

    pub(crate) fn size(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket index mask. Callers must check `size() != 0` first.
    pub(crate) fn mask(&self) -> u64 {
        (self.buckets.len() as u64).wrapping_sub(1)
    }
}

/// Hash table with two bucket tables and a migration cursor.
///
/// `D` supplies hashing and key equality (see [`Discipline`]); duplication
/// and destruction of keys and values are `Clone` and `Drop`.
pub struct Dict<K, V, D = SipDiscipline> {
    t0: Table<K, V>,
    t1: Table<K, V>,
    /// Next bucket of `t0` to migrate; `None` when no rebuild is in flight.
    rehash_idx: Option<usize>,
    /// Live safe iterators. While nonzero, no rehash step may run.
    safe_iterators: Cell<u32>,
    resize_allowed: bool,
    disc: D,
}

impl<K, V> Dict<K, V, SipDiscipline> {
    pub fn new() -> Self {
        Self::with_discipline(SipDiscipline)
    }
}

impl<K, V, D: Default> Default for Dict<K, V, D> {
    fn default() -> Self {
        Self::with_discipline(D::default())
    }
}

impl<K, V, D> Dict<K, V, D> {
    pub fn with_discipline(disc: D) -> Self {
        Dict {
            t0: Table::empty(),
            t1: Table::empty(),
            rehash_idx: None,
            safe_iterators: Cell::new(0),
            resize_allowed: true,
            disc,
        }
    }

    pub fn len(&self) -> usize {
        self.t0.used + self.t1.used
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total allocated buckets across both tables.
    pub fn slots(&self) -> usize {
        self.t0.size() + self.t1.size()
    }

    /// Size of the primary table.
    pub fn table_size(&self) -> usize {
        self.t0.size()
    }

    pub fn is_rehashing(&self) -> bool {
        self.rehash_idx.is_some()
    }

    /// Migration cursor position, when a rebuild is in flight.
    pub fn rehash_cursor(&self) -> Option<usize> {
        self.rehash_idx
    }

    /// Permit or suppress resizing. With resizing suppressed, growth still
    /// happens once the load factor exceeds the force ratio.
    pub fn set_resize(&mut self, allowed: bool) {
        self.resize_allowed = allowed;
    }

    pub fn resize_allowed(&self) -> bool {
        self.resize_allowed
    }

    /// Scrambled snapshot of the dictionary's gross state. Two fingerprints
    /// taken around a window with no mutation must be equal.
    pub(crate) fn fingerprint(&self) -> u64 {
        let snapshot = [
            self.t0.buckets.as_ptr() as usize as u64,
            self.t0.size() as u64,
            self.t0.used as u64,
            self.t1.buckets.as_ptr() as usize as u64,
            self.t1.size() as u64,
            self.t1.used as u64,
        ];
        let mut hash = 0u64;
        for word in snapshot {
            hash = crate::hash::wang_mix64(hash.wrapping_add(word));
        }
        hash
    }
}

impl<K, V, D: Discipline<K>> Dict<K, V, D> {
    /// Insert `key` if absent. On a duplicate the rejected pair is handed
    /// back untouched.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), (K, V)> {
        match self.entry(key) {
            DictEntry::Occupied(occupied) => Err((occupied.into_key(), value)),
            DictEntry::Vacant(vacant) => {
                vacant.insert(value);
                Ok(())
            }
        }
    }

    /// Insert or overwrite. Returns true when the key was new.
    pub fn replace(&mut self, key: K, value: V) -> bool {
        match self.entry(key) {
            DictEntry::Occupied(mut occupied) => {
                occupied.replace(value);
                false
            }
            DictEntry::Vacant(vacant) => {
                vacant.insert(value);
                true
            }
        }
    }

    /// Locate `key` for in-place manipulation, inserting lazily if absent.
    pub fn entry(&mut self, key: K) -> DictEntry<'_, K, V, D> {
        self.rehash_step_if_allowed();
        self.expand_if_needed();
        let hash = self.disc.hash(&key);
        match self.locate(hash, &key) {
            Some(loc) => DictEntry::Occupied(OccupiedEntry { entry: self.entry_at_mut(loc), key }),
            None => DictEntry::Vacant(VacantEntry { dict: self, key, hash }),
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        D: Discipline<Q>,
    {
        self.get_entry(key).map(|(_, v)| v)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        D: Discipline<Q>,
    {
        self.get_entry(key).is_some()
    }

    pub fn get_entry<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        D: Discipline<Q>,
    {
        if self.is_empty() {
            return None;
        }
        let hash = self.disc.hash(key);
        let rehashing = self.is_rehashing();
        for table in [&self.t0, &self.t1] {
            if table.size() == 0 {
                continue;
            }
            let index = (hash & table.mask()) as usize;
            let mut cur = table.buckets[index].as_deref();
            while let Some(entry) = cur {
                if self.disc.eq(entry.key.borrow(), key) {
                    return Some((&entry.key, &entry.val));
                }
                cur = entry.next.as_deref();
            }
            if !rehashing {
                break;
            }
        }
        None
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        D: Discipline<Q>,
    {
        if self.is_empty() {
            return None;
        }
        let hash = self.disc.hash(key);
        let loc = self.locate(hash, key)?;
        Some(&mut self.entry_at_mut(loc).val)
    }

    /// Remove `key` and drop its entry. Returns whether the key existed.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        D: Discipline<Q>,
    {
        self.take(key).is_some()
    }

    /// Detach `key` from its bucket without dropping, handing the pair to
    /// the caller. Dropping the pair completes the removal.
    pub fn take<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        D: Discipline<Q>,
    {
        if self.is_empty() {
            return None;
        }
        self.rehash_step_if_allowed();
        let hash = self.disc.hash(key);
        let rehashing = self.is_rehashing();
        let detached = Self::table_take(&self.disc, &mut self.t0, hash, key).or_else(|| {
            if rehashing {
                Self::table_take(&self.disc, &mut self.t1, hash, key)
            } else {
                None
            }
        })?;
        let Entry { key, val, .. } = *detached;
        Some((key, val))
    }

    /// Splice the matching entry out of one table's chain.
    fn table_take<Q>(disc: &D, table: &mut Table<K, V>, hash: u64, key: &Q) -> Option<Box<Entry<K, V>>>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        D: Discipline<Q>,
    {
        if table.size() == 0 {
            return None;
        }
        let index = (hash & table.mask()) as usize;
        let mut cur = &mut table.buckets[index];
        loop {
            let hit = match cur.as_deref() {
                None => return None,
                Some(entry) => disc.eq(entry.key.borrow(), key),
            };
            if hit {
                let mut entry = cur.take()?;
                *cur = entry.next.take();
                table.used -= 1;
                return Some(entry);
            }
            cur = match cur {
                Some(entry) => &mut entry.next,
                None => return None,
            };
        }
    }

    /// Find `key`, returning its position as (table, bucket, chain offset).
    fn locate<Q>(&self, hash: u64, key: &Q) -> Option<(usize, usize, usize)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        D: Discipline<Q>,
    {
        if self.t0.size() == 0 {
            return None;
        }
        let rehashing = self.is_rehashing();
        for (table_index, table) in [(0, &self.t0), (1, &self.t1)] {
            if table.size() == 0 {
                continue;
            }
            let bucket = (hash & table.mask()) as usize;
            let mut pos = 0;
            let mut cur = table.buckets[bucket].as_deref();
            while let Some(entry) = cur {
                if self.disc.eq(entry.key.borrow(), key) {
                    return Some((table_index, bucket, pos));
                }
                cur = entry.next.as_deref();
                pos += 1;
            }
            if !rehashing {
                break;
            }
        }
        None
    }

    /// Re-borrow the entry at a position previously returned by `locate`.
    fn entry_at_mut(&mut self, (table_index, bucket, pos): (usize, usize, usize)) -> &mut Entry<K, V> {
        let table = if table_index == 0 { &mut self.t0 } else { &mut self.t1 };
        let mut cur = table.buckets[bucket].as_deref_mut();
        for _ in 0..pos {
            cur = cur.and_then(|entry| entry.next.as_deref_mut());
        }
        match cur {
            Some(entry) => entry,
            None => invariant_violation("bucket chain shorter than located entry"),
        }
    }

    /// One rehash step on behalf of a mutating operation, unless a safe
    /// iterator holds migration paused.
    fn rehash_step_if_allowed(&mut self) {
        if self.safe_iterators.get() == 0 {
            self.rehash_steps(1);
        }
    }

    /// Migrate up to `n` non-empty buckets from the old table to the new
    /// one, probing at most `10 * n` empty buckets along the way. Returns
    /// true while migration work remains.
    pub fn rehash_steps(&mut self, n: usize) -> bool {
        let Some(mut idx) = self.rehash_idx else {
            return false;
        };
        let mut empty_visits = n.saturating_mul(EMPTY_VISITS_PER_STEP);
        let mut steps = n;
        while steps > 0 && self.t0.used > 0 {
            while idx < self.t0.buckets.len() && self.t0.buckets[idx].is_none() {
                idx += 1;
                empty_visits -= 1;
                if empty_visits == 0 {
                    self.rehash_idx = Some(idx);
                    return true;
                }
            }
            if idx >= self.t0.buckets.len() {
                break;
            }
            let mut chain = self.t0.buckets[idx].take();
            while let Some(mut entry) = chain {
                chain = entry.next.take();
                let dest = (self.disc.hash(&entry.key) & self.t1.mask()) as usize;
                entry.next = self.t1.buckets[dest].take();
                self.t1.buckets[dest] = Some(entry);
                self.t0.used -= 1;
                self.t1.used += 1;
            }
            idx += 1;
            steps -= 1;
        }
        if self.t0.used == 0 {
            self.t0 = std::mem::replace(&mut self.t1, Table::empty());
            self.rehash_idx = None;
            tracing::debug!(size = self.t0.size(), used = self.t0.used, "incremental rehash finished");
            return false;
        }
        self.rehash_idx = Some(idx);
        true
    }

    /// Run rehash steps in batches of 100 until `budget` elapses. Does
    /// nothing while a safe iterator is live.
    pub fn rehash_for(&mut self, budget: Duration) -> usize {
        if self.safe_iterators.get() > 0 {
            return 0;
        }
        let start = Instant::now();
        let mut steps = 0;
        while self.rehash_steps(100) {
            steps += 100;
            if start.elapsed() >= budget {
                break;
            }
        }
        steps
    }

    /// Grow into a table of at least `size` buckets (rounded up to a power
    /// of two, never below the initial size).
    pub fn expand(&mut self, size: usize) -> Result<(), DictError> {
        if self.is_rehashing() || self.t0.used > size {
            return Err(DictError::InvalidResize);
        }
        let target = size
            .max(INITIAL_SIZE)
            .checked_next_power_of_two()
            .ok_or(DictError::InvalidResize)?;
        if target == self.t0.size() {
            return Err(DictError::InvalidResize);
        }
        let table = Table::with_size(target);
        if self.t0.size() == 0 {
            self.t0 = table;
            return Ok(());
        }
        self.t1 = table;
        self.rehash_idx = Some(0);
        tracing::debug!(
            from = self.t0.size(),
            to = target,
            used = self.t0.used,
            "incremental rehash started"
        );
        Ok(())
    }

    /// Shrink to the smallest table that still fits the current elements.
    pub fn shrink_to_fit(&mut self) -> Result<(), DictError> {
        if !self.resize_allowed {
            return Err(DictError::ResizeForbidden);
        }
        if self.is_rehashing() {
            return Err(DictError::InvalidResize);
        }
        self.expand(self.t0.used.max(INITIAL_SIZE))
    }

    fn expand_if_needed(&mut self) {
        if self.is_rehashing() {
            return;
        }
        if self.t0.size() == 0 {
            let _ = self.expand(INITIAL_SIZE);
            return;
        }
        let used = self.t0.used;
        let size = self.t0.size();
        if used >= size && (self.resize_allowed || used > size.saturating_mul(FORCE_RESIZE_RATIO)) {
            let _ = self.expand(used * 2);
        }
    }
}

/// A broken structural invariant is a programming error; the table contents
/// can no longer be trusted, so tear the process down.
#[cold]
pub(crate) fn invariant_violation(what: &'static str) -> ! {
    tracing::error!(what, "dictionary invariant violated, aborting");
    std::process::abort()
}

#[cfg(test)]
#[path = "dict_tests.rs"]
mod tests;
