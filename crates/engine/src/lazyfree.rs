// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lazy-free policy: decide at deletion time whether a value dies inline
//! or on the background worker.
//!
//! The decision is a cheap effort estimate against a threshold, gated on
//! the value being unshared. Everything offloaded is unlinked from the
//! keyspace first, so the worker only ever destroys heap graphs no longer
//! reachable from any table.

use crate::db::Db;
use crate::object::{is_unique, SharedObject};
use ember_jobs::{BackgroundPool, JobPayload};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Effort above which an unshared value is freed in the background.
pub const DEFAULT_FREE_THRESHOLD: usize = 64;

/// Async deletion front-end over the background pool's lazy-free queue.
pub struct LazyFree {
    pool: Arc<BackgroundPool>,
    /// Objects enqueued for destruction and not yet freed.
    pending: Arc<AtomicUsize>,
    threshold: usize,
}

/// Rides the job queue wrapping the doomed payload; dropping it on the
/// worker destroys the payload and then settles the pending counter.
struct FreeTicket {
    payload: Option<Box<dyn Any + Send>>,
    objects: usize,
    pending: Arc<AtomicUsize>,
}

impl Drop for FreeTicket {
    fn drop(&mut self) {
        if let Some(payload) = self.payload.take() {
            drop(payload);
        }
        self.pending.fetch_sub(self.objects, Ordering::Relaxed);
    }
}

impl LazyFree {
    pub fn new(pool: Arc<BackgroundPool>) -> Self {
        Self::with_threshold(pool, DEFAULT_FREE_THRESHOLD)
    }

    pub fn with_threshold(pool: Arc<BackgroundPool>, threshold: usize) -> Self {
        LazyFree { pool, pending: Arc::new(AtomicUsize::new(0)), threshold }
    }

    /// Objects currently awaiting background destruction.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Remove `key` from the database. The key and TTL mappings go inline;
    /// the value is destroyed wherever the policy says. Returns whether
    /// the key existed. The caller must not re-enter the value afterwards.
    pub fn delete_async(&self, db: &mut Db, key: &[u8]) -> bool {
        // TTL entry goes first so a half-removed key can never look live.
        db.expires.remove(key);
        let Some((_key, value)) = db.dict.take(key) else {
            return false;
        };
        self.dispose(value);
        true
    }

    /// Apply the policy to a value already unlinked from every table.
    pub fn free_object_async(&self, value: SharedObject) {
        self.dispose(value);
    }

    /// Swap in fresh keyspace and TTL tables and enqueue the old pair as a
    /// single background job. Returns how many objects were handed off.
    pub fn flush_async(&self, db: &mut Db) -> usize {
        let dict = std::mem::take(&mut db.dict);
        let expires = std::mem::take(&mut db.expires);
        let objects = dict.len() + expires.len();
        if objects == 0 {
            return 0;
        }
        tracing::debug!(objects, "database flush handed to background free");
        self.offload(Box::new((dict, expires)), objects);
        objects
    }

    fn dispose(&self, value: SharedObject) {
        let effort = value.free_effort();
        if effort > self.threshold && is_unique(&value) {
            tracing::debug!(effort, kind = value.type_name(), "value handed to background free");
            self.offload(Box::new(value), 1);
        } else {
            drop(value);
        }
    }

    fn offload(&self, payload: Box<dyn Any + Send>, objects: usize) {
        self.pending.fetch_add(objects, Ordering::Relaxed);
        self.pool.submit(JobPayload::LazyFree(Box::new(FreeTicket {
            payload: Some(payload),
            objects,
            pending: Arc::clone(&self.pending),
        })));
    }
}

#[cfg(test)]
#[path = "lazyfree_tests.rs"]
mod tests;
