// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Environment variable configuration.
//!
//! - `GDBRIDGE_LOG_LEVEL`: `off`, `error`, `warn`, `info`, `debug` or `trace`
//!   (default: `warn`)
//! - `GDBRIDGE_SIGNAL_QUEUE`: capacity of each instance's signal queue
//!   (default: 64)
//! - `GDBRIDGE_RECONCILE`: `0` disables the per-frame reconciliation pass
//! - `GDBRIDGE_ENGINE_WARNINGS`: `1` forwards bridge warnings to the engine
//!   console
//!
//! ```bash
//! export GDBRIDGE_LOG_LEVEL=debug
//! export GDBRIDGE_SIGNAL_QUEUE=256
//! ```

use std::env;
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;

pub const ENV_LOG_LEVEL: &str = "GDBRIDGE_LOG_LEVEL";
pub const ENV_SIGNAL_QUEUE: &str = "GDBRIDGE_SIGNAL_QUEUE";
pub const ENV_RECONCILE: &str = "GDBRIDGE_RECONCILE";
pub const ENV_ENGINE_WARNINGS: &str = "GDBRIDGE_ENGINE_WARNINGS";

pub const DEFAULT_SIGNAL_QUEUE: usize = 64;

/// Runtime configuration of the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Log filter handed to `env_logger`.
    pub log_level: log::LevelFilter,

    /// Bounded queue size for signal workers (at least 1).
    pub signal_queue: usize,

    /// Run the reconciliation pass on frame increments.
    pub reconcile: bool,

    /// Mirror bridge warnings into the engine's warning console.
    pub engine_warnings: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_level: log::LevelFilter::Warn,
            signal_queue: DEFAULT_SIGNAL_QUEUE,
            reconcile: true,
            engine_warnings: false,
        }
    }
}

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

impl BridgeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let log_level = lookup(ENV_LOG_LEVEL)
            .and_then(|s| s.trim().parse::<log::LevelFilter>().ok())
            .unwrap_or(defaults.log_level);

        let signal_queue = lookup(ENV_SIGNAL_QUEUE)
            .and_then(|s| s.trim().parse::<usize>().ok())
            .map(|n| n.max(1))
            .unwrap_or(defaults.signal_queue);

        let reconcile = lookup(ENV_RECONCILE)
            .map(|s| s.trim() != "0" && !s.trim().eq_ignore_ascii_case("false"))
            .unwrap_or(defaults.reconcile);

        let engine_warnings = lookup(ENV_ENGINE_WARNINGS)
            .map(|s| flag(s.trim()))
            .unwrap_or(defaults.engine_warnings);

        Self {
            log_level,
            signal_queue,
            reconcile,
            engine_warnings,
        }
    }
}

static CONFIG: LazyLock<ArcSwap<BridgeConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(BridgeConfig::from_env()));

/// Current configuration.
pub fn config() -> Arc<BridgeConfig> {
    CONFIG.load_full()
}

/// Replace the active configuration.
pub fn set_config(config: BridgeConfig) {
    CONFIG.store(Arc::new(config));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = BridgeConfig::from_lookup(lookup(&[]));
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn parses_every_variable() {
        let config = BridgeConfig::from_lookup(lookup(&[
            (ENV_LOG_LEVEL, "debug"),
            (ENV_SIGNAL_QUEUE, "256"),
            (ENV_RECONCILE, "0"),
            (ENV_ENGINE_WARNINGS, "true"),
        ]));
        assert_eq!(config.log_level, log::LevelFilter::Debug);
        assert_eq!(config.signal_queue, 256);
        assert!(!config.reconcile);
        assert!(config.engine_warnings);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = BridgeConfig::from_lookup(lookup(&[
            (ENV_LOG_LEVEL, "loud"),
            (ENV_SIGNAL_QUEUE, "0"),
        ]));
        assert_eq!(config.log_level, log::LevelFilter::Warn);
        assert_eq!(config.signal_queue, 1);
    }
}
