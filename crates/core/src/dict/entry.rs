// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entry API: locate a key once, then read, overwrite, or insert in place.

use super::{invariant_violation, Dict, Discipline, Entry, SipDiscipline};

/// Result of [`Dict::entry`]: the slot for a key, occupied or not.
pub enum DictEntry<'a, K, V, D = SipDiscipline> {
    Occupied(OccupiedEntry<'a, K, V>),
    Vacant(VacantEntry<'a, K, V, D>),
}

impl<'a, K, V, D: Discipline<K>> DictEntry<'a, K, V, D> {
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            DictEntry::Occupied(occupied) => occupied.into_mut(),
            DictEntry::Vacant(vacant) => vacant.insert(default),
        }
    }

    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            DictEntry::Occupied(occupied) => occupied.into_mut(),
            DictEntry::Vacant(vacant) => vacant.insert(default()),
        }
    }
}

/// A key that was found. Holds the probe key so a failed insert can hand it
/// back to the caller without cloning.
pub struct OccupiedEntry<'a, K, V> {
    pub(crate) entry: &'a mut Entry<K, V>,
    pub(crate) key: K,
}

impl<'a, K, V> OccupiedEntry<'a, K, V> {
    pub fn key(&self) -> &K {
        &self.entry.key
    }

    pub fn get(&self) -> &V {
        &self.entry.val
    }

    pub fn get_mut(&mut self) -> &mut V {
        &mut self.entry.val
    }

    pub fn into_mut(self) -> &'a mut V {
        &mut self.entry.val
    }

    /// Overwrite the value. The new value is installed before the old one
    /// is dropped; with refcounted values the two may share state.
    pub fn replace(&mut self, value: V) {
        let old = std::mem::replace(&mut self.entry.val, value);
        drop(old);
    }

    pub fn into_key(self) -> K {
        self.key
    }
}

/// A key that was not found; inserting links a fresh entry at the head of
/// its bucket. While a rebuild is in flight, inserts go to the new table so
/// the old one only ever drains.
pub struct VacantEntry<'a, K, V, D = SipDiscipline> {
    pub(crate) dict: &'a mut Dict<K, V, D>,
    pub(crate) key: K,
    pub(crate) hash: u64,
}

impl<'a, K, V, D: Discipline<K>> VacantEntry<'a, K, V, D> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn insert(self, value: V) -> &'a mut V {
        let dict = self.dict;
        let table = if dict.rehash_idx.is_some() { &mut dict.t1 } else { &mut dict.t0 };
        let index = (self.hash & table.mask()) as usize;
        let entry = Box::new(Entry {
            key: self.key,
            val: value,
            next: table.buckets[index].take(),
        });
        table.buckets[index] = Some(entry);
        table.used += 1;
        match table.buckets[index].as_deref_mut() {
            Some(entry) => &mut entry.val,
            None => invariant_violation("freshly linked bucket head missing"),
        }
    }
}
