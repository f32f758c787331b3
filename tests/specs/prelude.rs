// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the workspace specs.

use ember_core::Dict;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Value that counts its own drops.
#[derive(Debug)]
pub struct DropCounter(pub Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn counter() -> (Arc<AtomicUsize>, DropCounter) {
    let drops = Arc::new(AtomicUsize::new(0));
    (Arc::clone(&drops), DropCounter(Arc::clone(&drops)))
}

pub fn drops(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Dictionary keyed by decimal-encoded integers.
pub fn decimal_dict(range: std::ops::Range<u64>) -> Dict<String, u64> {
    let mut d = Dict::new();
    for i in range {
        d.insert(i.to_string(), i).unwrap();
    }
    d
}

/// Finish any in-flight migration.
pub fn settle(d: &mut Dict<String, u64>) {
    while d.rehash_steps(100) {}
}
