// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide hash seed and the integer mixers used by the dictionary.
//!
//! The keyspace hashes with SipHash-1-3 under a 16-byte seed picked from OS
//! randomness the first time it is needed. Seeding once per process keeps
//! bucket distribution unpredictable to clients that control key bytes.

use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::OnceLock;

static HASH_SEED: OnceLock<[u8; 16]> = OnceLock::new();

/// The process-wide SipHash seed. Initialized on first use, immutable after.
pub fn hash_seed() -> [u8; 16] {
    *HASH_SEED.get_or_init(|| {
        let mut seed = [0u8; 16];
        OsRng.fill_bytes(&mut seed);
        seed
    })
}

/// The seed split into the two SipHash key words.
pub fn seed_keys() -> (u64, u64) {
    let seed = hash_seed();
    let mut k0 = [0u8; 8];
    let mut k1 = [0u8; 8];
    k0.copy_from_slice(&seed[..8]);
    k1.copy_from_slice(&seed[8..]);
    (u64::from_le_bytes(k0), u64::from_le_bytes(k1))
}

/// Pin the seed to a fixed value before any hashing has happened.
///
/// Returns false if the seed was already initialized, in which case the
/// existing seed stays in effect. Intended for tests that need stable bucket
/// placement.
pub fn set_hash_seed(seed: [u8; 16]) -> bool {
    HASH_SEED.set(seed).is_ok()
}

/// Thomas Wang's 64-bit integer mix.
///
/// Used to scramble dictionary state snapshots into iteration fingerprints.
pub fn wang_mix64(mut key: u64) -> u64 {
    key = (!key).wrapping_add(key << 21);
    key ^= key >> 24;
    key = key.wrapping_add(key << 3).wrapping_add(key << 8);
    key ^= key >> 14;
    key = key.wrapping_add(key << 2).wrapping_add(key << 4);
    key ^= key >> 28;
    key = key.wrapping_add(key << 31);
    key
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;
