// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cursor-scan guarantees under concurrent mutation.

use crate::prelude::*;
use ember_core::Dict;
use std::collections::HashSet;

#[test]
fn scan_of_empty_table_finishes_immediately() {
    let d: Dict<String, u64> = Dict::new();
    assert_eq!(d.scan(0, |_, _| {}), 0);
}

#[test]
fn scan_reports_keys_that_survive_heavy_churn() {
    // Start with keys 0..999, then delete 0..499 and insert 1000..1499
    // between scan calls. Keys 500..999 are present for the whole scan and
    // must all be reported.
    let mut d = decimal_dict(0..1000);
    let mut seen: HashSet<String> = HashSet::new();
    let mut cursor = d.scan(0, |k, _| {
        seen.insert(k.clone());
    });

    let mut deletions = 0..500u64;
    let mut insertions = 1000..1500u64;
    while cursor != 0 {
        for _ in 0..8 {
            if let Some(dead) = deletions.next() {
                d.remove(dead.to_string().as_str());
            }
            if let Some(fresh) = insertions.next() {
                let _ = d.insert(fresh.to_string(), fresh);
            }
        }
        cursor = d.scan(cursor, |k, _| {
            seen.insert(k.clone());
        });
    }
    // Drain whatever churn remains so every planned mutation really ran.
    for dead in deletions {
        d.remove(dead.to_string().as_str());
    }

    for stable in 500..1000u64 {
        assert!(seen.contains(&stable.to_string()), "missing stable key {stable}");
    }
}

#[test]
fn scan_reports_stable_keys_across_a_grow_and_shrink() {
    let mut d = decimal_dict(0..24);
    settle(&mut d);

    let mut seen: HashSet<String> = HashSet::new();
    let mut cursor = d.scan(0, |k, _| {
        seen.insert(k.clone());
    });

    // Balloon the table...
    for i in 10_000..10_512u64 {
        d.insert(i.to_string(), i).unwrap();
    }
    settle(&mut d);
    cursor = d.scan(cursor, |k, _| {
        seen.insert(k.clone());
    });

    // ...then deflate it while the same scan is still running.
    for i in 10_000..10_512u64 {
        d.remove(i.to_string().as_str());
    }
    d.shrink_to_fit().unwrap();
    settle(&mut d);

    while cursor != 0 {
        cursor = d.scan(cursor, |k, _| {
            seen.insert(k.clone());
        });
    }
    for stable in 0..24u64 {
        assert!(seen.contains(&stable.to_string()), "missing stable key {stable}");
    }
}

#[test]
fn scan_visits_both_tables_of_a_paused_migration() {
    let mut d = decimal_dict(0..300);
    settle(&mut d);
    let doubled = d.table_size() * 2;
    d.expand(doubled).unwrap();
    d.rehash_steps(7);
    assert!(d.is_rehashing());

    let mut seen = HashSet::new();
    let mut cursor = 0;
    loop {
        cursor = d.scan(cursor, |k, _| {
            seen.insert(k.clone());
        });
        if cursor == 0 {
            break;
        }
    }
    assert_eq!(seen.len(), 300);
}
