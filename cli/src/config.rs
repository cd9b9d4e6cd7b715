//! `chainlogs.yaml`: node endpoints, engine policies and logging.
//!
//! ```yaml
//! node:
//!   http_url: https://eth-sepolia.g.alchemy.com/v2/KEY
//!   ws_url: wss://eth-sepolia.g.alchemy.com/v2/KEY
//!   request_timeout_ms: 10000
//! query:
//!   decode_policy: skip
//! subscription:
//!   channel_capacity: 256
//!   decode_failure: isolate
//! log:
//!   level: info
//!   components:
//!     chainlogs-stream: debug
//! ```
//!
//! Command-line flags (and their `CHAINLOGS_*` environment variables) are
//! applied on top of the file.

use anyhow::{Context, Result};
use chainlogs_observability::LogConfig;
use chainlogs_stream::{NodeConfig, QueryConfig, SubscriptionConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "chainlogs.yaml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl CliConfig {
    /// Load `path`, or `chainlogs.yaml` if it exists, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG)).filter(|p| p.exists()),
        };
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("read config '{}'", path.display()))?;
                Self::from_yaml(&raw).with_context(|| format!("parse config '{}'", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Endpoint flags win over the file.
    pub fn with_endpoints(mut self, http_url: Option<String>, ws_url: Option<String>) -> Self {
        if http_url.is_some() {
            self.node.http_url = http_url;
        }
        if ws_url.is_some() {
            self.node.ws_url = ws_url;
        }
        self
    }
}
