//! # liveline-core
//!
//! Foundations for the liveline realtime connection manager.
//!
//! This crate holds the runtime-agnostic pieces the client builds on:
//!
//! - **Provider traits**: abstractions over networking, time, and task
//!   spawning, so the connection manager can run against the real Tokio
//!   runtime in production and against scripted in-memory implementations
//!   in tests:
//!   - [`NetworkProvider`]: connection and listener creation
//!   - [`TimeProvider`]: sleep, timeout, and current-time queries
//!   - [`TaskProvider`]: spawning local (single-threaded) tasks
//!   - [`Providers`]: bundle of the three, one type parameter downstream
//! - **Codec**: pluggable payload serialization ([`MessageCodec`]) with a
//!   JSON default ([`JsonCodec`])
//! - **Core types**: [`EndpointList`], the ordered set of candidate server
//!   addresses tried in priority order
//!
//! Everything here is single-threaded by design: provider traits use
//! `#[async_trait(?Send)]` and implementations are expected to be driven
//! from one cooperative event loop.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod codec;
mod network;
mod providers;
mod task;
mod time;
mod types;

// Codec exports
pub use codec::{CodecError, JsonCodec, MessageCodec};

// Provider trait exports
pub use network::{NetworkProvider, TcpListenerTrait, TokioNetworkProvider, TokioTcpListener};
pub use providers::{Providers, TokioProviders};
pub use task::{TaskProvider, TokioTaskProvider};
pub use time::{TimeError, TimeProvider, TokioTimeProvider};

// Core type exports
pub use types::{EndpointList, EndpointListError};
