// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server state and the periodic maintenance tick.
//!
//! The tick does what the keyspace cannot afford to do on the hot path:
//! spend a bounded millisecond pushing table migration along, shrink
//! tables that have gone sparse, and sample the TTL table for dead keys
//! so expiry does not rely on every key being read again.

use crate::config::{ConfigError, EngineConfig};
use crate::db::Db;
use crate::lazyfree::LazyFree;
use crate::object::{Key, Object, SharedObject};
use ember_core::{Clock, Dict, Discipline, SystemClock};
use ember_jobs::BackgroundPool;
use ember_reactor::{time_proc, EventLoop, TimeEventId};
use std::sync::Arc;
use std::time::Duration;

/// TTL entries inspected per active-expiry pass.
const ACTIVE_EXPIRE_SAMPLE: usize = 20;

/// Tables below this fill percentage are shrunk by the maintenance tick.
const MIN_FILL_PERCENT: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("background workers: {0}")]
    Spawn(#[from] std::io::Error),
}

/// The engine's single-threaded state: one database, the lazy-free layer,
/// and the background pool. Lives inside the reactor's context type.
pub struct Server<K: Clock = SystemClock> {
    db: Db,
    lazy: LazyFree,
    jobs: Arc<BackgroundPool>,
    config: EngineConfig,
    clock: K,
}

impl Server<SystemClock> {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<K: Clock> Server<K> {
    pub fn with_clock(config: EngineConfig, clock: K) -> Result<Self, EngineError> {
        config.validate()?;
        let jobs = Arc::new(BackgroundPool::new()?);
        let lazy = LazyFree::with_threshold(Arc::clone(&jobs), config.lazyfree_threshold);
        let mut db = Db::new();
        db.dict.set_resize(config.resize_allowed);
        db.expires.set_resize(config.resize_allowed);
        Ok(Server { db, lazy, jobs, config, clock })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut Db {
        &mut self.db
    }

    pub fn lazy(&self) -> &LazyFree {
        &self.lazy
    }

    pub fn jobs(&self) -> &Arc<BackgroundPool> {
        &self.jobs
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Permit or suppress table resizing at runtime, e.g. around a
    /// fork-based collaborator.
    pub fn set_resize(&mut self, allowed: bool) {
        self.config.resize_allowed = allowed;
        self.db.dict.set_resize(allowed);
        self.db.expires.set_resize(allowed);
    }

    pub fn set(&mut self, key: impl Into<Key>, value: Object) -> bool {
        self.db.set(key, value)
    }

    /// Read a key, treating an elapsed TTL as absence and reclaiming the
    /// dead entry on the spot.
    pub fn lookup(&mut self, key: &[u8]) -> Option<SharedObject> {
        let now = self.clock.epoch_ms();
        if self.db.is_expired(now, key) {
            self.lazy.delete_async(&mut self.db, key);
            return None;
        }
        self.db.get(key).cloned()
    }

    /// Delete through the lazy-free policy.
    pub fn delete(&mut self, key: &[u8]) -> bool {
        self.lazy.delete_async(&mut self.db, key)
    }

    /// Empty the database, handing the old tables to the background pool.
    pub fn flush(&mut self) -> usize {
        self.lazy.flush_async(&mut self.db)
    }

    /// Expire `key` a relative `ttl_ms` from now.
    pub fn expire_in(&mut self, key: &[u8], ttl_ms: u64) -> bool {
        let at = self.clock.epoch_ms() + ttl_ms;
        self.db.set_expire(key, at)
    }

    /// One maintenance tick. Returns the delay until the next one.
    pub fn cron(&mut self) -> u64 {
        self.expire_cycle();
        self.maintain_tables();
        self.config.cron_period_ms()
    }

    /// Sample the TTL table and reclaim keys whose deadline has passed.
    /// Returns how many were removed.
    pub fn expire_cycle(&mut self) -> usize {
        let now = self.clock.epoch_ms();
        let due: Vec<Key> = self
            .db
            .expires
            .sample(ACTIVE_EXPIRE_SAMPLE)
            .into_iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        let mut removed = 0;
        for key in due {
            if self.lazy.delete_async(&mut self.db, &key) {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(removed, "active expiry reclaimed keys");
        }
        removed
    }

    fn maintain_tables(&mut self) {
        if !self.config.resize_allowed {
            return;
        }
        // One table's migration budget per tick, keyspace first.
        if maintain_table(&mut self.db.dict) {
            return;
        }
        maintain_table(&mut self.db.expires);
    }
}

/// Spend up to a millisecond migrating, or start a shrink when the table
/// has gone sparse. Returns whether migration budget was spent.
fn maintain_table<K2, V, D: Discipline<K2>>(table: &mut Dict<K2, V, D>) -> bool {
    if table.is_rehashing() {
        table.rehash_for(Duration::from_millis(1));
        return true;
    }
    let slots = table.slots();
    if table.table_size() > 4 && slots > 0 && table.len() * 100 / slots < MIN_FILL_PERCENT {
        let _ = table.shrink_to_fit();
    }
    false
}

/// Register the maintenance tick on the reactor. The first run is
/// immediate; afterwards it reschedules itself at the configured rate.
pub fn install_cron<K: Clock + 'static>(el: &mut EventLoop<Server<K>, K>) -> TimeEventId {
    el.create_time(
        0,
        time_proc(|_el, server: &mut Server<K>, _id| Some(server.cron())),
        None,
    )
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
