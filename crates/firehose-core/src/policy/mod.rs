//! Connection policies.
//!
//! Pacing is the only policy the supervisor needs: subscription attempts are
//! spaced at least `min_interval` apart, whatever triggered them.

pub mod pacing;

pub use pacing::Pacer;
