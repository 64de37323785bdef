//! `firehose` configuration file.
//!
//! ```yaml
//! endpoint: https://stream.example.com/1.1/statuses/filter.json
//! track: [rust, tokio]
//! keyword_file: ./keywords.txt
//! refresh_interval_ms: 30000
//! reconnect_interval_ms: 10000
//! max_lock_ms: 60000
//! log:
//!   level: info
//!   components:
//!     firehose-stream: debug
//! ```
//!
//! The bearer token is normally supplied through `FIREHOSE_BEARER_TOKEN`
//! rather than the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use firehose_http::HttpStreamConfig;
use firehose_stream::SupervisorConfig;

use crate::logging::LogConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirehoseConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing)]
    pub bearer_token: Option<String>,
    /// Keywords tracked in addition to the keyword file.
    #[serde(default)]
    pub track: Vec<String>,
    /// One keyword per line, `#` starts a comment. Re-read periodically.
    #[serde(default)]
    pub keyword_file: Option<PathBuf>,
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    #[serde(default = "default_max_lock_ms")]
    pub max_lock_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_stall_timeout_ms")]
    pub stall_timeout_ms: u64,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_refresh_interval_ms() -> u64 { 30_000 }
fn default_reconnect_interval_ms() -> u64 { 10_000 }
fn default_max_lock_ms() -> u64 { 60_000 }
fn default_connect_timeout_ms() -> u64 { 10_000 }
fn default_stall_timeout_ms() -> u64 { 90_000 }

impl Default for FirehoseConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            bearer_token: None,
            track: Vec::new(),
            keyword_file: None,
            refresh_interval_ms: default_refresh_interval_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            max_lock_ms: default_max_lock_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            stall_timeout_ms: default_stall_timeout_ms(),
            log: LogConfig::default(),
        }
    }
}

impl FirehoseConfig {
    /// Load from `path`, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_ms == 0 {
            bail!("refresh_interval_ms must be greater than zero");
        }
        self.supervisor_config()
            .validate()
            .context("invalid reconnect_interval_ms / max_lock_ms")?;
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            reconnect_interval: Duration::from_millis(self.reconnect_interval_ms),
            max_lock_duration: Duration::from_millis(self.max_lock_ms),
        }
    }

    pub fn stream_config(&self) -> Result<HttpStreamConfig> {
        let endpoint = self
            .endpoint
            .clone()
            .context("no stream endpoint: set `endpoint`, --endpoint or FIREHOSE_ENDPOINT")?;
        let mut config = HttpStreamConfig::new(endpoint);
        config.bearer_token = self.bearer_token.clone();
        config.connect_timeout_ms = self.connect_timeout_ms;
        config.stall_timeout_ms = self.stall_timeout_ms;
        Ok(config)
    }
}
