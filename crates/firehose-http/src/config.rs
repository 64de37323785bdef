//! HTTP stream transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::framing::DEFAULT_MAX_LINE_BYTES;

/// Configuration for [`HttpStreamTransport`](crate::HttpStreamTransport).
#[derive(Clone, Serialize, Deserialize)]
pub struct HttpStreamConfig {
    /// Filter endpoint, e.g. `"https://stream.example.com/1.1/statuses/filter.json"`.
    pub endpoint: String,
    /// Sent as `Authorization: Bearer <token>` when set.
    #[serde(default, skip_serializing)]
    pub bearer_token: Option<String>,
    /// TCP/TLS connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Longest silence (keep-alives included) before the stream counts as stalled.
    #[serde(default = "default_stall_timeout_ms")]
    pub stall_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

fn default_connect_timeout_ms() -> u64 { 10_000 }
fn default_stall_timeout_ms() -> u64 { 90_000 }
fn default_user_agent() -> String { concat!("firehose/", env!("CARGO_PKG_VERSION")).into() }
fn default_max_line_bytes() -> usize { DEFAULT_MAX_LINE_BYTES }

impl HttpStreamConfig {
    /// Config for `endpoint` with default timeouts and no credentials.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            bearer_token: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            stall_timeout_ms: default_stall_timeout_ms(),
            user_agent: default_user_agent(),
            max_line_bytes: default_max_line_bytes(),
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }
}

impl std::fmt::Debug for HttpStreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStreamConfig")
            .field("endpoint", &self.endpoint)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("stall_timeout_ms", &self.stall_timeout_ms)
            .field("user_agent", &self.user_agent)
            .field("max_line_bytes", &self.max_line_bytes)
            .finish()
    }
}
