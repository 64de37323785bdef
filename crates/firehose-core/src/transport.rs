//! The `StreamTransport` trait: the seam between connection supervision
//! and whatever actually carries the stream.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::keywords::KeywordSet;

/// What a listener callback tells the transport to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerAction {
    /// Keep reading.
    Continue,
    /// Stop reading and return from `open_subscription`.
    Halt,
}

impl ListenerAction {
    pub fn is_halt(self) -> bool {
        self == Self::Halt
    }
}

/// Receives lifecycle signals from an open subscription.
///
/// Callbacks are synchronous and run on the transport's task.
pub trait SubscriptionListener: Send + Sync {
    /// The subscription is established and data will follow.
    fn on_connected(&self) -> ListenerAction;

    /// One raw message (a single line for line-delimited transports).
    /// Blank payloads are keep-alives.
    fn on_data(&self, data: &str) -> ListenerAction;

    /// A transport error was observed.
    fn on_error(&self, error: &TransportError) -> ListenerAction;
}

/// Opens filtered subscriptions against the event source.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; one transport is shared by every
/// connection a supervisor creates.
#[async_trait]
pub trait StreamTransport: Send + Sync + 'static {
    /// Open a subscription for `keywords` and drive `listener` until it
    /// halts.
    ///
    /// Resolves to `Ok(())` once the listener returns
    /// [`ListenerAction::Halt`], and to `Err` when the attempt fails or the
    /// stream drops.
    async fn open_subscription(
        &self,
        keywords: &KeywordSet,
        listener: Arc<dyn SubscriptionListener>,
    ) -> Result<(), TransportError>;

    /// Return the transport's identifier (endpoint URL or name).
    fn endpoint(&self) -> &str;
}
