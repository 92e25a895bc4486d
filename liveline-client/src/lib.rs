//! # liveline-client
//!
//! Resilient realtime connection management.
//!
//! This crate keeps a client continuously attached to a messaging backend
//! despite endpoint failures, transient network loss, and
//! connect-before-ready races:
//!
//! - **Multi-endpoint failover**: candidate addresses are tried in
//!   priority order; after a configurable number of consecutive failures
//!   on one endpoint the manager rotates to the next, and after the whole
//!   list is exhausted it cools down and starts over. It never gives up.
//! - **Reconnection backoff**: retries against one endpoint back off
//!   exponentially; a successful connection resets the failure count.
//! - **Deferred-operation queueing**: operations sent while disconnected
//!   are queued and replayed in order once a session is ready, with join
//!   operations deduplicated per subject.
//! - **Session rehydration**: every (re)connection re-issues the
//!   identity-bound setup (join room, register presence, register for
//!   notifications) so server-side membership is never stale.
//! - **Liveness monitoring**: an independent periodic check forces a
//!   reconnect if the session is found dead.
//!
//! The public surface is [`RealtimeClient`]: an ordinary-looking
//! connection object (`send`, `on`, `off`, `connect`, `disconnect`,
//! `manual_reconnect`) that applies queueing and rehydration
//! transparently and never lets an internal failure escape as a panic.
//!
//! # Example
//!
//! ```ignore
//! use liveline_client::{ClientConfig, Identity, IdentityStore, Operation, RealtimeClient};
//! use liveline_core::TokioProviders;
//!
//! let identity = IdentityStore::with_identity(
//!     Identity::new("u1").with_contact("u1@example.com").with_token("bearer-token"),
//! );
//! let config = ClientConfig::new(vec![
//!     "127.0.0.1:5000".into(),
//!     "127.0.0.1:3000".into(),
//! ]);
//!
//! // Inside a LocalSet:
//! let client = RealtimeClient::new(TokioProviders::new(), config, identity);
//! client.send(Operation::new("sendMessage", vec!["hello".into()]));
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod client;
mod config;
mod error;
mod events;
mod identity;
mod metrics;
mod monitor;
mod queue;
mod reconnect;
mod rehydrate;
mod session;
mod wire;

pub use client::{OperationReceiver, RealtimeClient};
pub use config::{
    ClientConfig, DEFAULT_BASE_DELAY, DEFAULT_CONNECTION_TIMEOUT, DEFAULT_LIVENESS_INTERVAL,
    DEFAULT_MAX_DELAY, DEFAULT_MAX_QUEUE_SIZE, DEFAULT_REDIAL_DELAY, DEFAULT_RESTART_COOLDOWN,
    DEFAULT_ROTATION_THRESHOLD,
};
pub use error::{ClientError, SendOutcome};
pub use events::{DisconnectReason, EventKind, LifecycleEvent, ListenerId};
pub use identity::{Identity, IdentityStore};
pub use metrics::ClientMetrics;
pub use reconnect::SessionState;
pub use wire::{encode_frame, try_decode_frame, Operation, WireError, HEADER_SIZE, MAX_FRAME_SIZE};
