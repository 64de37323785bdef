//! Scripted in-memory transport for supervisor tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use firehose_core::{KeywordSet, ListenerAction, StreamTransport, SubscriptionListener, TransportError};
use firehose_stream::SupervisorConfig;

/// What the next `open_subscription` call does.
#[derive(Debug, Clone)]
pub enum Script {
    /// Report a connect, then send keep-alives until the listener halts.
    Connect,
    /// Fail the attempt with this error.
    Fail(TransportError),
    /// Never report anything.
    Hang,
}

/// One recorded `open_subscription` call.
#[derive(Clone)]
pub struct Opened {
    pub keywords: KeywordSet,
    pub at: Instant,
    pub listener: Arc<dyn SubscriptionListener>,
    pub closed: Arc<AtomicBool>,
}

impl Opened {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Pops one [`Script`] per attempt; an empty script means `Connect`.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Script>>,
    opened: Mutex<Vec<Opened>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn scripted(steps: impl IntoIterator<Item = Script>) -> Arc<Self> {
        let mock = Self::default();
        mock.script.lock().unwrap().extend(steps);
        Arc::new(mock)
    }

    pub fn opened(&self) -> Vec<Opened> {
        self.opened.lock().unwrap().clone()
    }

    pub fn opened_keywords(&self) -> Vec<Vec<String>> {
        self.opened()
            .into_iter()
            .map(|o| o.keywords.as_slice().to_vec())
            .collect()
    }
}

#[async_trait]
impl StreamTransport for MockTransport {
    async fn open_subscription(
        &self,
        keywords: &KeywordSet,
        listener: Arc<dyn SubscriptionListener>,
    ) -> Result<(), TransportError> {
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Connect);
        let closed = Arc::new(AtomicBool::new(false));
        self.opened.lock().unwrap().push(Opened {
            keywords: keywords.clone(),
            at: Instant::now(),
            listener: Arc::clone(&listener),
            closed: Arc::clone(&closed),
        });

        match step {
            Script::Connect => {
                if listener.on_connected() == ListenerAction::Halt {
                    closed.store(true, Ordering::SeqCst);
                    return Ok(());
                }
                loop {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    if listener.on_data("") == ListenerAction::Halt {
                        closed.store(true, Ordering::SeqCst);
                        return Ok(());
                    }
                }
            }
            Script::Fail(error) => {
                closed.store(true, Ordering::SeqCst);
                Err(error)
            }
            Script::Hang => std::future::pending().await,
        }
    }

    fn endpoint(&self) -> &str {
        "mock://stream"
    }
}

/// Collects everything the supervisor hands to its callbacks.
#[derive(Clone, Default)]
pub struct Sink {
    pub events: Arc<Mutex<Vec<String>>>,
    pub accepted: Arc<Mutex<Vec<Vec<String>>>>,
}

impl Sink {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn accepted(&self) -> Vec<Vec<String>> {
        self.accepted.lock().unwrap().clone()
    }
}

pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(1);
pub const MAX_LOCK: Duration = Duration::from_secs(5);

pub fn test_config() -> SupervisorConfig {
    SupervisorConfig {
        reconnect_interval: RECONNECT_INTERVAL,
        max_lock_duration: MAX_LOCK,
    }
}

/// Let spawned tasks run. Under a paused clock this returns once every
/// task is idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
