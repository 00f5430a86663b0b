// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Router and bridge configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid:
//!
//! ```toml
//! [router]
//! default_priority = 100
//! unhandled = "log"
//!
//! [bridge]
//! queue_capacity = 1024
//! thread_name = "relay-bridge"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PRIORITY: i32 = 100;
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_THREAD_NAME: &str = "relay-bridge";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What happens when a background handler fails before anyone joins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnhandledPolicy {
    /// Log a warning as soon as the failure happens; `join` still reports it
    #[default]
    Log,
    /// Keep the failure for `join` only
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Priority given to handlers registered without one
    pub default_priority: i32,
    pub unhandled: UnhandledPolicy,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_priority: DEFAULT_PRIORITY,
            unhandled: UnhandledPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Bound on work queued for the bridge worker
    pub queue_capacity: usize,
    /// Name of the worker thread
    pub thread_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub router: RouterConfig,
    pub bridge: BridgeConfig,
}

impl RelayConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bridge.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "bridge.queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.bridge.thread_name.is_empty() {
            return Err(ConfigError::Invalid(
                "bridge.thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
