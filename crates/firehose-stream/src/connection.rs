//! `StreamConnection`: one subscription lifetime for a fixed keyword set.
//!
//! State transitions:
//! - `Idle` → `Opening`:       `start()` spawned the retry loop
//! - `Opening` → `Active`:     the transport reported a connect
//! - `Active`/`Opening` → `Errored` → `Opening`: a non-fatal failure, retried at once
//! - any → `Stopping` → `Terminated`: `stop()`, then the loop exits
//!
//! There is no backoff between attempts here; spacing attempts out is the
//! supervisor's job.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use firehose_core::{KeywordSet, StreamTransport, SubscriptionListener};

use crate::listener::{EventCallback, EventListener, FirstResponseCallback};

/// Identifies a connection within one supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, not started.
    Idle,
    /// A subscription attempt is in progress.
    Opening,
    /// The subscription is established.
    Active,
    /// The last attempt failed; about to re-open.
    Errored,
    /// Stop requested; the loop exits on its next turn.
    Stopping,
    /// The retry loop has exited.
    Terminated,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Opening => write!(f, "opening"),
            Self::Active => write!(f, "active"),
            Self::Errored => write!(f, "errored"),
            Self::Stopping => write!(f, "stopping"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Errored,
    Terminated,
}

pub struct StreamConnection {
    id: ConnectionId,
    keywords: KeywordSet,
    listener: Arc<EventListener>,
    stop_requested: AtomicBool,
    phase: Mutex<Phase>,
    attempts: AtomicU64,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamConnection {
    /// Create a connection for `keywords`. Nothing is opened until
    /// [`start`](Self::start).
    pub fn new(
        id: ConnectionId,
        keywords: KeywordSet,
        on_event: EventCallback,
        on_first_response: FirstResponseCallback,
    ) -> Self {
        Self {
            id,
            keywords,
            listener: Arc::new(EventListener::new(id, on_event, on_first_response)),
            stop_requested: AtomicBool::new(false),
            phase: Mutex::new(Phase::Idle),
            attempts: AtomicU64::new(0),
            task: Mutex::new(None),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The keyword set this connection was opened with.
    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    pub fn listener(&self) -> &Arc<EventListener> {
        &self.listener
    }

    /// Number of subscription attempts made so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    pub fn state(&self) -> ConnectionState {
        let phase = *self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        match phase {
            Phase::Terminated => ConnectionState::Terminated,
            _ if self.is_stop_requested() => ConnectionState::Stopping,
            Phase::Idle => ConnectionState::Idle,
            Phase::Errored => ConnectionState::Errored,
            Phase::Running if self.listener.is_connected() => ConnectionState::Active,
            Phase::Running => ConnectionState::Opening,
        }
    }

    /// Spawn the retry loop on its own task. A second call is a no-op.
    pub fn start(self: &Arc<Self>, transport: Arc<dyn StreamTransport>) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            debug!(connection = %self.id, "connection already started");
            return;
        }
        let conn = Arc::clone(self);
        *task = Some(tokio::spawn(async move { conn.run(transport).await }));
    }

    /// Request a stop. The listener halts on its next callback and the loop
    /// does not re-open the subscription.
    pub fn stop(&self) {
        if !self.stop_requested.swap(true, Ordering::AcqRel) {
            info!(connection = %self.id, keywords = %self.keywords, "stopping stream connection");
        }
        self.listener.stop();
    }

    /// Wait for the retry loop to exit. Returns immediately if the
    /// connection was never started or has already been joined.
    pub async fn join(&self) {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(connection = %self.id, error = %e, "connection task ended abnormally");
            }
        }
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    async fn run(self: Arc<Self>, transport: Arc<dyn StreamTransport>) {
        info!(
            connection = %self.id,
            keywords = %self.keywords,
            endpoint = transport.endpoint(),
            "starting stream connection"
        );
        let listener: Arc<dyn SubscriptionListener> = self.listener.clone();

        loop {
            if self.is_stop_requested() {
                break;
            }
            self.set_phase(Phase::Running);
            let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;

            match transport
                .open_subscription(&self.keywords, Arc::clone(&listener))
                .await
            {
                Ok(()) => {
                    debug!(connection = %self.id, attempt, "subscription halted");
                    break;
                }
                Err(e) => {
                    self.set_phase(Phase::Errored);
                    // Reports the failure first response if nothing was reported yet.
                    self.listener.on_error(&e);
                    if !self.is_stop_requested() {
                        debug!(connection = %self.id, attempt, "re-opening subscription");
                    }
                    tokio::task::yield_now().await;
                }
            }
        }

        self.set_phase(Phase::Terminated);
        info!(connection = %self.id, attempts = self.attempts(), "stream connection terminated");
    }
}

impl std::fmt::Debug for StreamConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConnection")
            .field("id", &self.id)
            .field("keywords", &self.keywords)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    use async_trait::async_trait;
    use firehose_core::{ListenerAction, TransportError};

    use crate::listener::FirstResponse;

    /// Fails `failures` times, then connects and idles until halted.
    struct FlakyTransport {
        failures: AtomicU32,
    }

    #[async_trait]
    impl StreamTransport for FlakyTransport {
        async fn open_subscription(
            &self,
            _keywords: &KeywordSet,
            listener: Arc<dyn SubscriptionListener>,
        ) -> Result<(), TransportError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(TransportError::Http("connection refused".into()));
            }
            if listener.on_connected().is_halt() {
                return Ok(());
            }
            loop {
                tokio::time::sleep(Duration::from_millis(20)).await;
                if listener.on_data("") == ListenerAction::Halt {
                    return Ok(());
                }
            }
        }

        fn endpoint(&self) -> &str {
            "mock://flaky"
        }
    }

    fn connection(responses: Arc<Mutex<Vec<FirstResponse>>>) -> Arc<StreamConnection> {
        Arc::new(StreamConnection::new(
            ConnectionId(7),
            KeywordSet::new(["rust"]),
            Arc::new(|_| {}),
            Arc::new(move |r| responses.lock().unwrap().push(r)),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_connected_and_reports_once() {
        let responses = Arc::new(Mutex::new(Vec::new()));
        let conn = connection(Arc::clone(&responses));
        conn.start(Arc::new(FlakyTransport { failures: AtomicU32::new(3) }));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(conn.attempts(), 4);
        assert_eq!(conn.state(), ConnectionState::Active);
        assert_eq!(
            *responses.lock().unwrap(),
            vec![FirstResponse::Failed(TransportError::Http("connection refused".into()))]
        );

        conn.stop();
        assert_eq!(conn.state(), ConnectionState::Stopping);
        conn.join().await;
        assert_eq!(conn.state(), ConnectionState::Terminated);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_start_never_opens() {
        let responses = Arc::new(Mutex::new(Vec::new()));
        let conn = connection(Arc::clone(&responses));
        assert_eq!(conn.state(), ConnectionState::Idle);
        conn.stop();
        conn.start(Arc::new(FlakyTransport { failures: AtomicU32::new(0) }));
        conn.join().await;
        assert_eq!(conn.attempts(), 0);
        assert_eq!(conn.state(), ConnectionState::Terminated);
        assert!(responses.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_first_response_can_stop_the_loop() {
        let conn_slot: Arc<Mutex<Option<Arc<StreamConnection>>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&conn_slot);
        let conn = Arc::new(StreamConnection::new(
            ConnectionId(8),
            KeywordSet::new(["go"]),
            Arc::new(|_| {}),
            Arc::new(move |_| {
                if let Some(c) = slot.lock().unwrap().as_ref() {
                    c.stop();
                }
            }),
        ));
        *conn_slot.lock().unwrap() = Some(Arc::clone(&conn));

        conn.start(Arc::new(FlakyTransport { failures: AtomicU32::new(5) }));
        conn.join().await;
        assert_eq!(conn.attempts(), 1, "stopped connections must not retry");
        assert_eq!(conn.state(), ConnectionState::Terminated);
    }
}
