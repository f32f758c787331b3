// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental-rehash behavior as an embedder observes it.

use crate::prelude::*;
use ember_core::Dict;

#[test]
fn first_insert_builds_the_minimal_table() {
    let mut d: Dict<String, u64> = Dict::new();
    assert_eq!(d.table_size(), 0);
    d.insert("k".to_string(), 0).unwrap();
    assert_eq!(d.table_size(), 4);
}

#[test]
fn crossing_load_factor_one_starts_a_doubled_table() {
    let mut d = decimal_dict(0..4);
    assert!(!d.is_rehashing());
    d.insert("4".to_string(), 4).unwrap();
    assert!(d.is_rehashing());
    assert_eq!(d.slots(), 4 + 8);
}

#[test]
fn lookups_stay_exact_at_every_migration_stage() {
    let mut d = decimal_dict(0..512);
    settle(&mut d);
    let doubled = d.table_size() * 2;
    d.expand(doubled).unwrap();

    // Walk the migration one step at a time; the keyspace must answer
    // identically at each stage.
    let mut guard = 0;
    loop {
        for i in (0..512u64).step_by(61) {
            assert_eq!(d.get(i.to_string().as_str()), Some(&i));
        }
        assert!(!d.contains("512"));
        if !d.rehash_steps(1) {
            break;
        }
        guard += 1;
        assert!(guard < 100_000);
    }
    assert_eq!(d.len(), 512);
    assert_eq!(d.table_size(), doubled);
}

#[test]
fn one_insert_pays_bounded_migration_work() {
    let mut d = decimal_dict(0..4096);
    settle(&mut d);
    let doubled = d.table_size() * 2;
    d.expand(doubled).unwrap();

    // Every mutating call may migrate one bucket and probe at most ten
    // empty ones; the cursor can therefore move by eleven at most.
    let mut previous = d.rehash_cursor().unwrap();
    for i in 0..200u64 {
        d.insert(format!("extra-{i}"), i).unwrap();
        let Some(cursor) = d.rehash_cursor() else {
            break;
        };
        assert!(cursor - previous <= 11, "cursor jumped {previous} -> {cursor}");
        previous = cursor;
    }
}

#[test]
fn suppressed_resize_still_grows_past_the_force_ratio() {
    let mut d: Dict<u64, u64> = Dict::new();
    d.set_resize(false);
    for i in 0..21u64 {
        d.insert(i, i).unwrap();
    }
    assert_eq!(d.table_size(), 4);
    d.insert(21, 21).unwrap();
    assert!(d.is_rehashing());
}

#[test]
fn safe_iteration_pauses_migration_but_permits_writes() {
    let mut d = decimal_dict(0..100);
    settle(&mut d);
    let doubled = d.table_size() * 2;
    d.expand(doubled).unwrap();
    d.rehash_steps(2);

    let mut it = d.safe_iter();
    let mut visited = 0;
    assert!(it.next(&d).is_some());
    visited += 1;
    let paused_at = d.rehash_cursor().unwrap();

    for i in 0..10u64 {
        d.insert(format!("during-{i}"), i).unwrap();
    }
    assert_eq!(d.rehash_cursor(), Some(paused_at), "mutation migrated under a safe iterator");

    while it.next(&d).is_some() {
        visited += 1;
    }
    it.finish(&d);
    assert!(visited >= 100);

    d.insert("after".to_string(), 0).unwrap();
    assert_ne!(d.rehash_cursor(), Some(paused_at));
}
