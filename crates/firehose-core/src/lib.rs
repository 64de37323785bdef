//! firehose-core: foundation traits and types for firehose.
//!
//! # Overview
//!
//! firehose follows a keyword-filtered, server-pushed event stream and keeps
//! it alive across failures and keyword changes. The core crate defines:
//!
//! - [`KeywordSet`]: ordered, duplicate-free filter terms
//! - [`StreamTransport`] / [`SubscriptionListener`]: the transport seam
//! - [`filter_message`]: decoding plus the delivery filter
//! - [`TransportError`] / [`DecodeError`] / [`LockTimeoutError`]: error types
//! - [`policy`] module: connection pacing

pub mod error;
pub mod keywords;
pub mod message;
pub mod policy;
pub mod transport;

pub use error::{DecodeError, LockTimeoutError, TransportError};
pub use keywords::KeywordSet;
pub use message::{filter_message, Filtered, REPLY_REFERENCE_FIELD, TEXT_FIELD};
pub use policy::Pacer;
pub use transport::{ListenerAction, StreamTransport, SubscriptionListener};
