//! `ConnectionSupervisor`: owns the live stream and hands it off when the
//! tracked keyword set changes.
//!
//! # Hand-off protocol
//! ```text
//! update_tracked_keywords(set)
//!       │  desired = set
//!       ▼
//! lock held? ── yes, within limit ──▶ return (the in-flight hand-off reconciles later)
//!       │ no (or expired → abandon candidate)
//!       ▼
//! acquire lock → pace → start candidate(desired)
//!       │
//!       ▼  first response (candidate's task)
//! Connected: retire active, promote candidate, release, report added keywords,
//!            reconcile again if desired moved on
//! Failed:    discard candidate, release, reconcile again
//! ```
//!
//! Every field the protocol touches lives in one [`SupervisorState`] behind
//! one mutex. The mutex is never held across an `.await` or while a user
//! callback runs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::time::Instant;
use tracing::{debug, info, warn};

use firehose_core::{KeywordSet, LockTimeoutError, Pacer, StreamTransport};

use crate::config::{ConfigError, SupervisorConfig};
use crate::connection::{ConnectionId, StreamConnection};
use crate::handoff::{HandoffLock, HandoffToken};
use crate::listener::{EventCallback, FirstResponse, FirstResponseCallback};

/// Invoked after each successful hand-off with the keywords that are new
/// relative to the previously active set (possibly none).
pub type KeywordsAcceptedCallback = Arc<dyn Fn(Vec<String>) + Send + Sync>;

/// Hand-off counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    pub handoffs_started: u64,
    pub handoffs_succeeded: u64,
    pub handoffs_failed: u64,
    pub locks_expired: u64,
    /// First responses from connections that were no longer the candidate.
    pub stale_responses: u64,
}

struct SupervisorState {
    /// Latest requested set; may not be live yet.
    desired: Option<KeywordSet>,
    /// The set the active connection was opened with.
    current: KeywordSet,
    active: Option<Arc<StreamConnection>>,
    candidate: Option<Arc<StreamConnection>>,
    lock: HandoffLock,
    pacer: Pacer,
    next_connection_id: u64,
    shut_down: bool,
    stats: SupervisorStats,
}

struct Shared {
    transport: Arc<dyn StreamTransport>,
    config: SupervisorConfig,
    on_event: EventCallback,
    on_keywords_accepted: KeywordsAcceptedCallback,
    state: Mutex<SupervisorState>,
}

/// Keeps a keyword-filtered stream alive across failures and keyword changes.
///
/// Cloning is cheap; all clones drive the same supervisor. Dropping the last
/// clone stops the active and candidate connections.
#[derive(Clone)]
pub struct ConnectionSupervisor {
    shared: Arc<Shared>,
}

impl ConnectionSupervisor {
    /// Create a supervisor. No connection is opened until the first
    /// [`update_tracked_keywords`](Self::update_tracked_keywords).
    ///
    /// `on_event` receives the text of every deliverable message, from
    /// whichever connection carries it. `on_keywords_accepted` receives the
    /// newly added keywords after each successful hand-off.
    pub fn new<E, K>(
        transport: Arc<dyn StreamTransport>,
        config: SupervisorConfig,
        on_event: E,
        on_keywords_accepted: K,
    ) -> Result<Self, ConfigError>
    where
        E: Fn(String) + Send + Sync + 'static,
        K: Fn(Vec<String>) + Send + Sync + 'static,
    {
        config.validate()?;
        let state = SupervisorState {
            desired: None,
            current: KeywordSet::default(),
            active: None,
            candidate: None,
            lock: HandoffLock::new(),
            pacer: Pacer::new(config.reconnect_interval),
            next_connection_id: 0,
            shut_down: false,
            stats: SupervisorStats::default(),
        };
        Ok(Self {
            shared: Arc::new(Shared {
                transport,
                config,
                on_event: Arc::new(on_event),
                on_keywords_accepted: Arc::new(on_keywords_accepted),
                state: Mutex::new(state),
            }),
        })
    }

    /// Make `keywords` the tracked set.
    ///
    /// Starts a hand-off to a connection for the new set unless one is
    /// already in flight, in which case that hand-off picks up the new set
    /// when it resolves. May wait up to the reconnect interval to pace
    /// attempts; returns once the candidate has been started, not once it
    /// is live. Never fails: failures are retried internally.
    pub async fn update_tracked_keywords<I, S>(&self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords = KeywordSet::new(keywords);
        info!(keywords = %keywords, "updating tracked keywords");
        {
            let mut state = self.shared.lock_state();
            if state.shut_down {
                warn!("supervisor is shut down, ignoring keyword update");
                return;
            }
            state.desired = Some(keywords);
        }
        self.shared.reconcile().await;
    }

    /// Keywords of the active connection, if any hand-off has succeeded.
    pub fn active_keywords(&self) -> Option<KeywordSet> {
        self.shared
            .lock_state()
            .active
            .as_ref()
            .map(|c| c.keywords().clone())
    }

    /// The most recently requested keyword set.
    pub fn desired_keywords(&self) -> Option<KeywordSet> {
        self.shared.lock_state().desired.clone()
    }

    pub fn active_connection(&self) -> Option<Arc<StreamConnection>> {
        self.shared.lock_state().active.clone()
    }

    pub fn is_handoff_in_flight(&self) -> bool {
        self.shared.lock_state().lock.is_held()
    }

    pub fn stats(&self) -> SupervisorStats {
        self.shared.lock_state().stats
    }

    /// Stop every connection and ignore further keyword updates.
    pub fn shutdown(&self) {
        let (active, candidate) = {
            let mut state = self.shared.lock_state();
            state.shut_down = true;
            state.lock.release();
            (state.active.take(), state.candidate.take())
        };
        for conn in active.into_iter().chain(candidate) {
            conn.stop();
        }
        info!("connection supervisor shut down");
    }
}

impl std::fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock_state();
        f.debug_struct("ConnectionSupervisor")
            .field("desired", &state.desired)
            .field("current", &state.current)
            .field("handoff_in_flight", &state.lock.is_held())
            .field("stats", &state.stats)
            .finish()
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, SupervisorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a hand-off toward the desired set unless one is in flight.
    async fn reconcile(self: &Arc<Self>) {
        let (token, wait) = {
            let mut state = self.lock_state();
            if state.shut_down || state.desired.is_none() {
                return;
            }
            let now = Instant::now();
            match state.lock.check(now, self.config.max_lock_duration) {
                Ok(None) => {}
                Ok(Some(held)) => {
                    debug!(held_ms = held.as_millis() as u64, "hand-off in flight, deferring");
                    return;
                }
                Err(timeout) => Self::expire_lock(&mut state, timeout),
            }

            let token = state.lock.acquire(now);
            state.stats.handoffs_started += 1;
            tokio::spawn(lock_watchdog(
                Arc::downgrade(self),
                token,
                now + self.config.max_lock_duration,
            ));
            (token, state.pacer.wait_time(now))
        };

        if !wait.is_zero() {
            info!(wait_ms = wait.as_millis() as u64, "pacing connection attempt");
            tokio::time::sleep(wait).await;
        }

        let candidate = {
            let mut state = self.lock_state();
            if state.shut_down || !state.lock.holds(token) {
                debug!("hand-off superseded while pacing");
                return;
            }
            let Some(keywords) = state.desired.clone() else {
                return;
            };
            state.next_connection_id += 1;
            let id = ConnectionId(state.next_connection_id);
            let candidate = Arc::new(StreamConnection::new(
                id,
                keywords,
                Arc::clone(&self.on_event),
                self.first_response_handler(id),
            ));
            state.candidate = Some(Arc::clone(&candidate));
            state.pacer.record_attempt(Instant::now());
            candidate
        };

        info!(
            connection = %candidate.id(),
            keywords = %candidate.keywords(),
            "opening candidate connection"
        );
        candidate.start(Arc::clone(&self.transport));
    }

    fn spawn_reconcile(self: &Arc<Self>) {
        let shared = Arc::clone(self);
        tokio::spawn(async move { shared.reconcile().await });
    }

    fn expire_lock(state: &mut SupervisorState, timeout: LockTimeoutError) {
        warn!(error = %timeout, "hand-off lock expired");
        state.lock.release();
        state.stats.locks_expired += 1;
        if let Some(candidate) = state.candidate.take() {
            warn!(connection = %candidate.id(), "abandoning candidate connection");
            candidate.stop();
        }
    }

    fn first_response_handler(self: &Arc<Self>, id: ConnectionId) -> FirstResponseCallback {
        let shared: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |response| {
            if let Some(shared) = shared.upgrade() {
                shared.on_first_response(id, response);
            }
        })
    }

    fn on_first_response(self: &Arc<Self>, id: ConnectionId, response: FirstResponse) {
        let mut state = self.lock_state();
        let is_candidate = state.candidate.as_ref().is_some_and(|c| c.id() == id);
        if !is_candidate {
            state.stats.stale_responses += 1;
            debug!(connection = %id, "ignoring first response from a superseded connection");
            return;
        }
        let Some(candidate) = state.candidate.take() else {
            return;
        };

        match response {
            FirstResponse::Connected => {
                if let Some(retired) = state.active.take() {
                    info!(connection = %retired.id(), "retiring previous connection");
                    retired.stop();
                }
                state.active = Some(Arc::clone(&candidate));
                state.lock.release();
                state.stats.handoffs_succeeded += 1;

                let added = candidate.keywords().difference(&state.current);
                state.current = candidate.keywords().clone();
                let converged = state
                    .desired
                    .as_ref()
                    .map_or(true, |desired| desired.same_members(candidate.keywords()));
                drop(state);

                info!(
                    connection = %candidate.id(),
                    keywords = %candidate.keywords(),
                    added = ?added,
                    "candidate promoted to active"
                );
                (self.on_keywords_accepted)(added);

                if !converged {
                    info!("tracked keywords changed during hand-off, reconciling");
                    self.spawn_reconcile();
                }
            }
            FirstResponse::Failed(error) => {
                candidate.stop();
                state.lock.release();
                state.stats.handoffs_failed += 1;
                drop(state);

                warn!(
                    connection = %candidate.id(),
                    error = %error,
                    "candidate failed to connect, retrying"
                );
                self.spawn_reconcile();
            }
        }
    }

    fn on_lock_deadline(self: &Arc<Self>, token: HandoffToken) {
        {
            let mut state = self.lock_state();
            if !state.lock.holds(token) {
                return;
            }
            match state.lock.check(Instant::now(), self.config.max_lock_duration) {
                Err(timeout) => Self::expire_lock(&mut state, timeout),
                Ok(_) => return,
            }
        }
        self.spawn_reconcile();
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for conn in state.active.take().into_iter().chain(state.candidate.take()) {
            conn.stop();
        }
    }
}

/// Force-expires the lock if the hand-off holding `token` has not resolved
/// by `deadline`.
async fn lock_watchdog(shared: Weak<Shared>, token: HandoffToken, deadline: Instant) {
    tokio::time::sleep_until(deadline).await;
    if let Some(shared) = shared.upgrade() {
        shared.on_lock_deadline(token);
    }
}
