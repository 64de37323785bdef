//! firehose-http: streaming HTTP transport for firehose.
//!
//! Implements [`firehose_core::StreamTransport`] over a long-lived HTTP
//! POST whose response body is a sequence of line-delimited JSON messages,
//! with blank lines as keep-alives.

pub mod client;
pub mod config;
pub mod framing;

pub use client::HttpStreamTransport;
pub use config::HttpStreamConfig;
pub use framing::LineFramer;
