// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lazy-free thresholds observed end to end through the worker pool.

use ember_engine::{Db, EngineConfig, LazyFree, Object, Server};
use ember_jobs::{BackgroundPool, JobKind, JobPayload};
use std::collections::HashSet;
use std::sync::Arc;

fn set_of(n: usize) -> Object {
    let members: HashSet<Vec<u8>> = (0..n).map(|i| i.to_string().into_bytes()).collect();
    Object::Set(members)
}

/// Payload whose drop blocks on a mutex the test holds, parking the
/// lazy-free worker so pending counts can be asserted without races.
struct Gate(Arc<parking_lot::Mutex<()>>);

impl Drop for Gate {
    fn drop(&mut self) {
        drop(self.0.lock());
    }
}

fn drain(pool: &BackgroundPool) {
    while pool.pending(JobKind::LazyFree) > 0 {
        pool.wait_step(JobKind::LazyFree);
    }
}

#[test]
fn threshold_splits_inline_from_background() {
    let pool = Arc::new(BackgroundPool::new().unwrap());
    let lazy = LazyFree::new(Arc::clone(&pool));
    let mut db = Db::new();
    db.set(b"small".to_vec(), set_of(63));
    db.set(b"large".to_vec(), set_of(65));

    let gate = Arc::new(parking_lot::Mutex::new(()));
    let held = gate.lock();
    pool.submit(JobPayload::LazyFree(Box::new(Gate(Arc::clone(&gate)))));

    assert!(lazy.delete_async(&mut db, b"small"));
    assert_eq!(lazy.pending(), 0, "63 elements stay inline");

    assert!(lazy.delete_async(&mut db, b"large"));
    assert_eq!(lazy.pending(), 1, "65 elements go to the background");
    assert!(!db.contains(b"large"));

    drop(held);
    while pool.pending(JobKind::LazyFree) > 0 {
        pool.wait_step(JobKind::LazyFree);
    }
    assert_eq!(lazy.pending(), 0);
}

#[test]
fn flushed_tables_are_destroyed_as_one_job() {
    let pool = Arc::new(BackgroundPool::new().unwrap());
    let lazy = LazyFree::new(Arc::clone(&pool));
    let mut db = Db::new();
    for i in 0..500u32 {
        db.set(i.to_string().into_bytes(), Object::Uint(u64::from(i)));
    }

    let gate = Arc::new(parking_lot::Mutex::new(()));
    let held = gate.lock();
    pool.submit(JobPayload::LazyFree(Box::new(Gate(Arc::clone(&gate)))));

    assert_eq!(lazy.flush_async(&mut db), 500);
    assert!(db.is_empty());
    assert_eq!(lazy.pending(), 500);
    assert_eq!(pool.pending(JobKind::LazyFree), 2, "old tables travel as a single job");

    drop(held);
    drain(&pool);
    assert_eq!(lazy.pending(), 0);
}

#[test]
fn server_delete_path_applies_the_policy() {
    let mut server = Server::new(EngineConfig::default()).unwrap();
    server.set(b"big".to_vec(), set_of(500));
    assert!(server.delete(b"big"));
    assert!(server.lookup(b"big").is_none());
    while server.jobs().pending(JobKind::LazyFree) > 0 {
        server.jobs().wait_step(JobKind::LazyFree);
    }
    assert_eq!(server.lazy().pending(), 0);
}
