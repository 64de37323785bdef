//! `EventListener`: bridges raw transport signals to typed callbacks.
//!
//! One listener exists per [`StreamConnection`](crate::StreamConnection).
//! It reports the connection's *first response* (connected or failed)
//! exactly once, forwards deliverable messages to the consumer, and honours
//! a cooperative stop request on its next callback.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use firehose_core::message::{filter_message, Filtered};
use firehose_core::{ListenerAction, SubscriptionListener, TransportError};

use crate::connection::ConnectionId;

/// Consumer callback, invoked with the text of each deliverable message.
pub type EventCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Invoked at most once per listener with its first lifecycle signal.
pub type FirstResponseCallback = Arc<dyn Fn(FirstResponse) + Send + Sync>;

/// The first lifecycle signal a connection reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirstResponse {
    Connected,
    Failed(TransportError),
}

impl FirstResponse {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Per-listener message counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Messages passed to the consumer callback.
    pub delivered: u64,
    /// Messages that decoded but failed the delivery filter.
    pub filtered: u64,
    /// Messages dropped because they could not be decoded.
    pub undecodable: u64,
}

pub struct EventListener {
    connection: ConnectionId,
    on_event: EventCallback,
    on_first_response: FirstResponseCallback,
    stopped: AtomicBool,
    first_response_reported: AtomicBool,
    connected: AtomicBool,
    last_error: Mutex<Option<TransportError>>,
    delivered: AtomicU64,
    filtered: AtomicU64,
    undecodable: AtomicU64,
}

impl EventListener {
    pub fn new(
        connection: ConnectionId,
        on_event: EventCallback,
        on_first_response: FirstResponseCallback,
    ) -> Self {
        Self {
            connection,
            on_event,
            on_first_response,
            stopped: AtomicBool::new(false),
            first_response_reported: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            last_error: Mutex::new(None),
            delivered: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            undecodable: AtomicU64::new(0),
        }
    }

    /// Request a stop. Idempotent; takes effect on the next callback.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// `true` between a successful connect and the next error.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn has_reported_first_response(&self) -> bool {
        self.first_response_reported.load(Ordering::Acquire)
    }

    pub fn last_error(&self) -> Option<TransportError> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn stats(&self) -> ListenerStats {
        ListenerStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            undecodable: self.undecodable.load(Ordering::Relaxed),
        }
    }

    /// Report `response` unless a first response was already reported.
    /// Returns `true` if this call reported it.
    pub(crate) fn report_first_response(&self, response: FirstResponse) -> bool {
        if self.first_response_reported.swap(true, Ordering::AcqRel) {
            return false;
        }
        (self.on_first_response)(response);
        true
    }

    fn action(&self) -> ListenerAction {
        if self.is_stopped() {
            ListenerAction::Halt
        } else {
            ListenerAction::Continue
        }
    }
}

impl SubscriptionListener for EventListener {
    fn on_connected(&self) -> ListenerAction {
        if self.is_stopped() {
            debug!(connection = %self.connection, "connected after stop was requested, halting");
            return ListenerAction::Halt;
        }
        self.connected.store(true, Ordering::Release);
        info!(connection = %self.connection, "stream connected");
        self.report_first_response(FirstResponse::Connected);
        self.action()
    }

    fn on_data(&self, data: &str) -> ListenerAction {
        if self.is_stopped() {
            return ListenerAction::Halt;
        }
        if data.trim().is_empty() {
            return ListenerAction::Continue;
        }

        match filter_message(data) {
            Ok(Filtered::Deliver(text)) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                (self.on_event)(text);
            }
            Ok(Filtered::Skip) => {
                self.filtered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.undecodable.fetch_add(1, Ordering::Relaxed);
                debug!(connection = %self.connection, error = %e, "dropping undecodable message");
            }
        }
        self.action()
    }

    fn on_error(&self, error: &TransportError) -> ListenerAction {
        warn!(connection = %self.connection, error = %error, "stream error");
        self.connected.store(false, Ordering::Release);
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(error.clone());
        self.report_first_response(FirstResponse::Failed(error.clone()));
        self.action()
    }
}

impl std::fmt::Debug for EventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListener")
            .field("connection", &self.connection)
            .field("stopped", &self.is_stopped())
            .field("connected", &self.is_connected())
            .field("stats", &self.stats())
            .finish()
    }
}
