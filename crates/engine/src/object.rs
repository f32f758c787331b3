// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Value model for the keyspace.
//!
//! Values are shared through `Arc` so small common objects can back many
//! keys at once; the lazy-free layer asks [`is_unique`] before taking
//! ownership of one for background destruction.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Keys are opaque byte strings.
pub type Key = Vec<u8>;

/// A keyspace value: scalar or aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Str(Vec<u8>),
    Int(i64),
    Uint(u64),
    Float(f64),
    List(VecDeque<Vec<u8>>),
    Set(HashSet<Vec<u8>>),
    Map(HashMap<Vec<u8>, Vec<u8>>),
    SortedSet(BTreeMap<Vec<u8>, f64>),
}

impl Object {
    pub fn str(bytes: impl Into<Vec<u8>>) -> Object {
        Object::Str(bytes.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Str(_) => "string",
            Object::Int(_) => "int",
            Object::Uint(_) => "uint",
            Object::Float(_) => "float",
            Object::List(_) => "list",
            Object::Set(_) => "set",
            Object::Map(_) => "map",
            Object::SortedSet(_) => "sorted-set",
        }
    }

    /// Cheap estimate of how much work destroying this value costs: the
    /// element count for aggregates, 1 for everything else.
    pub fn free_effort(&self) -> usize {
        match self {
            Object::List(items) => items.len(),
            Object::Set(members) => members.len(),
            Object::Map(fields) => fields.len(),
            Object::SortedSet(members) => members.len(),
            _ => 1,
        }
    }
}

pub type SharedObject = Arc<Object>;

/// Whether this handle is the only live reference to the value. Shared
/// values must never be handed to a background free.
pub fn is_unique(value: &SharedObject) -> bool {
    Arc::strong_count(value) == 1
}

#[cfg(test)]
#[path = "object_tests.rs"]
mod tests;
