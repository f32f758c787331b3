// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Round-trip and idempotence laws of the keyspace operations.

use crate::prelude::*;
use ember_core::Dict;

#[test]
fn insert_then_get_holds_until_the_next_write() {
    let mut d: Dict<String, String> = Dict::new();
    d.insert("k".to_string(), "v1".to_string()).unwrap();
    assert_eq!(d.get("k").map(String::as_str), Some("v1"));
    assert_eq!(d.get("k").map(String::as_str), Some("v1"));
    d.replace("k".to_string(), "v2".to_string());
    assert_eq!(d.get("k").map(String::as_str), Some("v2"));
}

#[test]
fn take_then_drop_is_observably_remove() {
    let (removed_drops, removed_value) = counter();
    let (taken_drops, taken_value) = counter();
    let mut d: Dict<String, DropCounter> = Dict::new();

    d.insert("removed".to_string(), removed_value).unwrap();
    d.insert("taken".to_string(), taken_value).unwrap();

    assert!(d.remove("removed"));
    let detached = d.take("taken").unwrap();
    assert_eq!(drops(&taken_drops), 0, "take must not destroy the entry");
    drop(detached);

    assert_eq!(drops(&removed_drops), 1);
    assert_eq!(drops(&taken_drops), 1);
    assert!(!d.contains("removed"));
    assert!(!d.contains("taken"));
    assert_eq!(d.len(), 0);
}

#[test]
fn replace_chain_destroys_each_value_exactly_once() {
    let (original_drops, original) = counter();
    let (v1_drops, v1) = counter();
    let (v2_drops, v2) = counter();
    let mut d: Dict<String, DropCounter> = Dict::new();

    d.replace("k".to_string(), original);
    d.replace("k".to_string(), v1);
    d.replace("k".to_string(), v2);

    assert_eq!(drops(&original_drops), 1);
    assert_eq!(drops(&v1_drops), 1);
    assert_eq!(drops(&v2_drops), 0);
}

#[test]
fn failed_insert_leaves_both_values_alive() {
    let mut d: Dict<String, u64> = Dict::new();
    d.insert("k".to_string(), 1).unwrap();
    let (key, value) = d.insert("k".to_string(), 2).unwrap_err();
    assert_eq!((key.as_str(), value), ("k", 2));
    assert_eq!(d.get("k"), Some(&1));
}
