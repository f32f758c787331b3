// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration, loadable from TOML.

use crate::lazyfree::DEFAULT_FREE_THRESHOLD;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid engine config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("hz must be at least 1")]
    ZeroHz,

    #[error("events capacity must be at least 1")]
    ZeroCapacity,
}

/// Tunables for one engine instance. Every field has a default, so a TOML
/// fragment only needs the knobs it changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Event-loop capacity in file-descriptor slots.
    pub events_capacity: usize,
    /// Maintenance ticks per second.
    pub hz: u32,
    /// Free-effort above which unshared values die in the background.
    pub lazyfree_threshold: usize,
    /// Whether tables may resize; off reduces copy-on-write pressure while
    /// a fork-based collaborator is running.
    pub resize_allowed: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            events_capacity: 10_240,
            hz: 10,
            lazyfree_threshold: DEFAULT_FREE_THRESHOLD,
            resize_allowed: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hz == 0 {
            return Err(ConfigError::ZeroHz);
        }
        if self.events_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }

    /// Delay between maintenance ticks.
    pub fn cron_period_ms(&self) -> u64 {
        1_000 / u64::from(self.hz.max(1))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
