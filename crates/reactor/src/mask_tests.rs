// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn none_is_empty() {
    assert!(Mask::NONE.is_empty());
    assert!(!Mask::READABLE.is_empty());
}

#[test]
fn or_accumulates_bits() {
    let m = Mask::READABLE | Mask::WRITABLE | Mask::BARRIER;
    assert!(m.contains(Mask::READABLE));
    assert!(m.contains(Mask::WRITABLE));
    assert!(m.contains(Mask::BARRIER));
    assert!(m.contains(Mask::READABLE | Mask::WRITABLE));
}

#[test]
fn without_clears_only_named_bits() {
    let m = (Mask::READABLE | Mask::WRITABLE).without(Mask::WRITABLE);
    assert_eq!(m, Mask::READABLE);
}

#[test]
fn directions_strips_the_barrier_modifier() {
    let m = Mask::READABLE | Mask::WRITABLE | Mask::BARRIER;
    assert_eq!(m.directions(), Mask::READABLE | Mask::WRITABLE);
}

#[yare::parameterized(
    disjoint  = { Mask::READABLE, Mask::WRITABLE, false },
    overlap   = { Mask::READABLE | Mask::BARRIER, Mask::READABLE, true },
    with_none = { Mask::READABLE, Mask::NONE, false },
)]
fn intersects_matches_bit_overlap(a: Mask, b: Mask, expected: bool) {
    assert_eq!(a.intersects(b), expected);
}
