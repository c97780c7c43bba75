//! # Configuration
//!
//! Engine configuration is managed by [`confique`], which handles layered
//! loading from TOML files, environment variables, and programmatic
//! overrides. The embedding shell decides where the file lives; the engine
//! only consumes the resolved values.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `version_cap` | `20` | Retained version snapshots per note (oldest evicted) |
//! | `passcode_len` | `4` | Required passcode length in digits |
//! | `data_dir` | platform data dir | Override for the filesystem adapter root |

use std::path::PathBuf;

use confique::Config;
use serde::{Deserialize, Serialize};

/// Configuration for the persistence engine.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of version snapshots retained per note. When a
    /// content update pushes the history past this cap, the oldest
    /// snapshot is evicted.
    #[config(default = 20)]
    pub version_cap: usize,

    /// Required passcode length, in digits.
    #[config(default = 4)]
    pub passcode_len: usize,

    /// Override for the data directory used by the filesystem adapter.
    /// When absent, the platform-appropriate data directory is used.
    pub data_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version_cap: 20,
            passcode_len: 4,
            data_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.version_cap, 20);
        assert_eq!(config.passcode_len, 4);
        assert!(config.data_dir.is_none());
    }
}
