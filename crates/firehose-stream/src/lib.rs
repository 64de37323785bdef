//! firehose-stream: supervised, keyword-filtered stream connections.
//!
//! # Features
//! - One live connection at a time, replaced only once its successor connects
//! - Retry-forever connections with a cooperative stop
//! - Lock-guarded hand-off that expires on its own if a candidate hangs
//! - Minimum spacing between subscription attempts
//!
//! ## Architecture
//! ```text
//! ConnectionSupervisor ── desired keywords ──▶ candidate StreamConnection
//!       ▲                                              │ (own Tokio task)
//!       │ first response (once)                        ▼
//!       └──────────────────────────────────── EventListener ◀── StreamTransport
//!                                                      │
//!                                                      ▼
//!                                              on_event(text)
//! ```

pub mod config;
pub mod connection;
mod handoff;
pub mod listener;
pub mod supervisor;

pub use config::{ConfigError, SupervisorConfig};
pub use connection::{ConnectionId, ConnectionState, StreamConnection};
pub use listener::{EventListener, FirstResponse, ListenerStats};
pub use supervisor::{ConnectionSupervisor, SupervisorStats};
