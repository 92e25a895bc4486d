//! Public facade over the connection manager.
//!
//! [`RealtimeClient`] behaves like an ordinary connection object: callers
//! `send` operations, subscribe to lifecycle events with `on`/`off`, and
//! `connect`/`disconnect` explicitly. Queueing, rehydration, failover, and
//! backoff happen behind the handle; no failure in any of them propagates
//! to the caller as a panic.

use std::rc::Rc;

use liveline_core::{EndpointList, JsonCodec, Providers, TaskProvider};
use tokio::sync::mpsc;

use crate::config::ClientConfig;
use crate::error::{ClientError, SendOutcome};
use crate::events::{EventKind, LifecycleEvent, ListenerId};
use crate::identity::IdentityStore;
use crate::metrics::ClientMetrics;
use crate::monitor;
use crate::reconnect::{Command, Driver, SessionState, Shared, SharedHandle};
use crate::wire::{self, Operation};

/// Channel of inbound operations, obtained via
/// [`RealtimeClient::take_receiver`].
pub type OperationReceiver = mpsc::UnboundedReceiver<Operation>;

/// The resilient realtime connection handle.
///
/// Construction never fails: if the configuration cannot produce a working
/// manager the handle degrades to a no-op implementation whose methods all
/// safely do nothing, so a total transport failure never surfaces as an
/// exception in caller code.
///
/// Must be created inside a `tokio::task::LocalSet` (or another local
/// context), since the driver, sessions, and monitor run as local tasks.
pub struct RealtimeClient {
    shared: SharedHandle,
    identity: IdentityStore,
    /// `None` on a degraded no-op client.
    cmd_tx: Option<mpsc::UnboundedSender<Command>>,
    inbound_rx: Option<OperationReceiver>,
    monitor_shutdown_tx: Option<mpsc::UnboundedSender<()>>,
    driver_handle: Option<tokio::task::JoinHandle<()>>,
}

impl RealtimeClient {
    /// Start the connection manager and begin connecting immediately.
    ///
    /// The first endpoint is dialed eagerly; callers that want to defer can
    /// still observe state via [`state`](Self::state) and events via
    /// [`on`](Self::on).
    pub fn new<P: Providers>(providers: P, config: ClientConfig, identity: IdentityStore) -> Self {
        match Self::try_start(providers, config, identity.clone()) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!("realtime client disabled, all operations are no-ops: {}", e);
                Self::disabled(identity)
            }
        }
    }

    fn try_start<P: Providers>(
        providers: P,
        config: ClientConfig,
        identity: IdentityStore,
    ) -> Result<Self, ClientError> {
        let endpoints = EndpointList::new(config.endpoints.clone())?;
        if config.rotation_threshold == 0 {
            return Err(ClientError::ZeroThreshold);
        }

        let shared = Shared::new(&config);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let driver = Driver::new(
            Rc::clone(&shared),
            providers.clone(),
            config.clone(),
            endpoints,
            identity.clone(),
            session_tx,
            inbound_tx,
        );
        let driver_handle = providers
            .task()
            .spawn_task("connection_driver", driver.run(cmd_rx, session_rx));

        let (monitor_shutdown_tx, monitor_shutdown_rx) = mpsc::unbounded_channel();
        providers.task().spawn_task(
            "liveness_monitor",
            monitor::run_liveness_monitor(
                providers.time().clone(),
                config.liveness_interval,
                Rc::clone(&shared),
                cmd_tx.clone(),
                monitor_shutdown_rx,
            ),
        );

        // Dial eagerly; the facade stays usable either way.
        let _ = cmd_tx.send(Command::Connect);

        Ok(Self {
            shared,
            identity,
            cmd_tx: Some(cmd_tx),
            inbound_rx: Some(inbound_rx),
            monitor_shutdown_tx: Some(monitor_shutdown_tx),
            driver_handle: Some(driver_handle),
        })
    }

    /// A handle whose every method safely does nothing.
    fn disabled(identity: IdentityStore) -> Self {
        let config = ClientConfig::new(vec![]);
        Self {
            shared: Shared::new(&config),
            identity,
            cmd_tx: None,
            inbound_rx: None,
            monitor_shutdown_tx: None,
            driver_handle: None,
        }
    }

    /// Send an operation, or queue it when no session is connected.
    ///
    /// Never fails: the outcome reports whether the operation was delivered
    /// to the active session, deferred for replay, or dropped.
    pub fn send(&self, op: Operation) -> SendOutcome {
        if self.cmd_tx.is_none() {
            tracing::debug!(op = %op.name, "send on disabled client dropped");
            return SendOutcome::Dropped;
        }

        let mut shared = self.shared.borrow_mut();
        if shared.state == SessionState::Connected {
            let frame = match wire::encode_frame(&JsonCodec, &op) {
                Ok(frame) => frame,
                Err(e) => {
                    shared.metrics.record_message_dropped();
                    drop(shared);
                    tracing::warn!(op = %op.name, "send dropped, encode failed: {}", e);
                    return SendOutcome::Dropped;
                }
            };
            let delivered = shared
                .active
                .as_ref()
                .is_some_and(|handle| handle.try_send(frame));
            if delivered {
                shared.metrics.record_message_sent();
                SendOutcome::Sent
            } else {
                shared.metrics.record_message_dropped();
                drop(shared);
                tracing::warn!(op = %op.name, "send dropped, session already closed");
                SendOutcome::Dropped
            }
        } else {
            let evicted = shared.queue.enqueue(op);
            shared.metrics.record_message_queued();
            if evicted {
                shared.metrics.record_message_dropped();
                shared.metrics.record_message_dequeued();
                tracing::warn!("operation queue full, oldest entry dropped");
            }
            SendOutcome::Queued
        }
    }

    /// Register a listener for one lifecycle event kind.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&LifecycleEvent) + 'static,
    {
        self.shared
            .borrow_mut()
            .listeners
            .subscribe(kind, Rc::new(handler))
    }

    /// Remove a listener. Returns `false` if the id is unknown.
    pub fn off(&self, id: ListenerId) -> bool {
        self.shared.borrow_mut().listeners.unsubscribe(id)
    }

    /// Request a connection, starting from the first endpoint.
    ///
    /// Idempotent: a no-op while already connecting or connected.
    pub fn connect(&self) {
        self.shared.borrow_mut().user_disconnected = false;
        if let Some(tx) = &self.cmd_tx {
            let _ = tx.send(Command::Connect);
        }
    }

    /// Tear down the current session and stay disconnected.
    ///
    /// Queued operations survive and replay on the next connection.
    pub fn disconnect(&self) {
        if let Some(tx) = &self.cmd_tx {
            let _ = tx.send(Command::Disconnect);
        }
    }

    /// Tear down the current session and dial from the first endpoint
    /// immediately, bypassing any backoff delay.
    pub fn manual_reconnect(&self) {
        self.shared.borrow_mut().user_disconnected = false;
        if let Some(tx) = &self.cmd_tx {
            let _ = tx.send(Command::ManualReconnect);
        }
    }

    /// Current connection state.
    pub fn state(&self) -> SessionState {
        self.shared.borrow().state
    }

    /// Whether a session is currently connected.
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Number of operations waiting for a connection.
    pub fn queue_size(&self) -> usize {
        self.shared.borrow().queue.len()
    }

    /// Snapshot of connection counters.
    pub fn metrics(&self) -> ClientMetrics {
        self.shared.borrow().metrics.clone()
    }

    /// The identity store this client reads at connect time.
    pub fn identity(&self) -> IdentityStore {
        self.identity.clone()
    }

    /// Take ownership of the inbound operation channel.
    ///
    /// Returns `None` on a degraded client or if already taken.
    pub fn take_receiver(&mut self) -> Option<OperationReceiver> {
        self.inbound_rx.take()
    }

    /// Stop the driver and monitor tasks and wait for the driver to exit.
    pub async fn close(&mut self) {
        if let Some(tx) = &self.cmd_tx {
            let _ = tx.send(Command::Shutdown);
        }
        if let Some(tx) = self.monitor_shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.driver_handle.take() {
            let _ = handle.await;
        }
    }
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("state", &self.state())
            .field("queue_size", &self.queue_size())
            .field("disabled", &self.cmd_tx.is_none())
            .finish()
    }
}
