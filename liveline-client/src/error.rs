//! Error types for the realtime client.
//!
//! The client's public surface never throws: construction failures degrade
//! the facade to a no-op, connect failures drive backoff and rotation, and
//! failed sends are reported as [`SendOutcome::Dropped`]. [`ClientError`]
//! exists for the configuration checks performed before the manager starts.

use liveline_core::EndpointListError;
use thiserror::Error;

/// Errors that prevent the connection manager from starting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The configured endpoint list is invalid.
    #[error("invalid endpoint list: {0}")]
    Endpoints(#[from] EndpointListError),

    /// The rotation threshold must allow at least one attempt per endpoint.
    #[error("rotation threshold must be at least 1")]
    ZeroThreshold,
}

/// Outcome of a [`send`](crate::RealtimeClient::send) call.
///
/// Delivery is at-most-once: a `Dropped` operation is logged and lost,
/// never retried, since a retried send could duplicate side effects on
/// the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The operation was handed to the active session for immediate delivery.
    Sent,
    /// No session was connected; the operation was queued for replay.
    Queued,
    /// The operation could not be delivered or queued and was discarded.
    Dropped,
}
