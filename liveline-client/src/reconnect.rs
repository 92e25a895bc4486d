//! Reconnection controller.
//!
//! A single background driver task owns every state transition: it dials
//! endpoints in priority order, counts consecutive failures per endpoint,
//! rotates after the configured threshold, restarts from the top after a
//! cooldown when the whole list is exhausted, and re-dials the same
//! endpoint after a recoverable mid-session drop. Rotation is evaluated on
//! connect errors only; a connection that succeeded and later dropped
//! always retries its own endpoint first.
//!
//! The driver is the only writer of the active-session slot. Sessions are
//! tagged with a monotonically increasing generation number; events from a
//! superseded generation are ignored. Backoff sleeps race against the
//! command channel so an explicit disconnect or manual reconnect cancels
//! any in-flight timer.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use liveline_core::{EndpointList, JsonCodec, NetworkProvider, Providers, TimeProvider};
use tokio::sync::mpsc;

use crate::config::ClientConfig;
use crate::events::{DisconnectReason, LifecycleEvent, Listeners};
use crate::identity::IdentityStore;
use crate::metrics::ClientMetrics;
use crate::queue::OperationQueue;
use crate::rehydrate;
use crate::session::{self, SessionEvent, SessionEventKind, SessionHandle};
use crate::wire::{self, Operation};

/// Connection state of the managed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session and no attempt in progress.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// A session is established and usable.
    Connected,
    /// The last attempt failed; waiting to retry or rotate.
    Failing,
}

/// State shared between the facade, the driver, and the liveness monitor.
///
/// Mutated only from the single-threaded event loop; the driver is the
/// sole writer of `state`, `generation`, and `active`.
pub(crate) struct Shared {
    /// Current connection state.
    pub state: SessionState,
    /// Generation of the newest session ever created.
    pub generation: u64,
    /// The active session, if any.
    pub active: Option<SessionHandle>,
    /// Operations awaiting a connected session.
    pub queue: OperationQueue,
    /// Registered lifecycle listeners.
    pub listeners: Listeners,
    /// Counters and state snapshots.
    pub metrics: ClientMetrics,
    /// Whether any connection has ever succeeded (drives
    /// `Connected` vs `Reconnected`).
    pub ever_connected: bool,
    /// Set by an explicit disconnect; suppresses the liveness monitor
    /// until the next connect request.
    pub user_disconnected: bool,
}

pub(crate) type SharedHandle = Rc<RefCell<Shared>>;

impl Shared {
    /// Create the initial shared state.
    pub(crate) fn new(config: &ClientConfig) -> SharedHandle {
        Rc::new(RefCell::new(Shared {
            state: SessionState::Disconnected,
            generation: 0,
            active: None,
            queue: OperationQueue::new(config.max_queue_size),
            listeners: Listeners::new(),
            metrics: ClientMetrics::new(config.base_delay),
            ever_connected: false,
            user_disconnected: false,
        }))
    }
}

/// Commands accepted by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// Start connecting from the first endpoint. Idempotent: a no-op while
    /// already connecting or connected.
    Connect,
    /// Tear down the current session and dial from the first endpoint
    /// immediately, bypassing any backoff delay.
    ManualReconnect,
    /// Tear down the current session and stay disconnected.
    Disconnect,
    /// Stop the driver entirely.
    Shutdown,
}

/// How a connect cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleEnd {
    /// A session was established.
    Connected,
    /// The cycle was cancelled by an explicit disconnect.
    Aborted,
    /// The driver is shutting down.
    Shutdown,
}

/// Result of an interruptible sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pause {
    /// The full delay elapsed.
    Elapsed,
    /// A manual reconnect arrived; restart dialing from the top at once.
    RestartTop,
    /// An explicit disconnect arrived; abandon the cycle.
    Abort,
    /// The driver is shutting down.
    Shutdown,
}

/// Follow-up action after handling a session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FollowUp {
    /// Nothing further to do.
    None,
    /// Re-dial the current endpoint after the redial delay.
    Redial,
}

/// The reconnection driver.
pub(crate) struct Driver<P: Providers> {
    shared: SharedHandle,
    providers: P,
    config: ClientConfig,
    endpoints: EndpointList,
    identity: IdentityStore,
    session_tx: mpsc::UnboundedSender<SessionEvent>,
    inbound_tx: mpsc::UnboundedSender<Operation>,
    /// Endpoint cursor into `endpoints`.
    cursor: usize,
    /// Consecutive connect failures on the current endpoint.
    attempts: u32,
}

impl<P: Providers> Driver<P> {
    /// Create a driver over the shared state.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        shared: SharedHandle,
        providers: P,
        config: ClientConfig,
        endpoints: EndpointList,
        identity: IdentityStore,
        session_tx: mpsc::UnboundedSender<SessionEvent>,
        inbound_tx: mpsc::UnboundedSender<Operation>,
    ) -> Self {
        Self {
            shared,
            providers,
            config,
            endpoints,
            identity,
            session_tx,
            inbound_tx,
            cursor: 0,
            attempts: 0,
        }
    }

    /// Main driver loop: processes commands and session events until
    /// shutdown.
    pub(crate) async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut session_rx: mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        loop {
            tokio::select! {
                maybe_cmd = cmd_rx.recv() => {
                    let Some(cmd) = maybe_cmd else { break };
                    match cmd {
                        Command::Connect => {
                            let state = {
                                let mut shared = self.shared.borrow_mut();
                                shared.user_disconnected = false;
                                shared.state
                            };
                            if state != SessionState::Connected {
                                self.cursor = 0;
                                if self.connect_cycle(&mut cmd_rx, None).await == CycleEnd::Shutdown {
                                    break;
                                }
                            }
                        }
                        Command::ManualReconnect => {
                            self.teardown(false);
                            self.cursor = 0;
                            if self.connect_cycle(&mut cmd_rx, None).await == CycleEnd::Shutdown {
                                break;
                            }
                        }
                        Command::Disconnect => self.teardown(true),
                        Command::Shutdown => break,
                    }
                }

                maybe_ev = session_rx.recv() => {
                    let Some(ev) = maybe_ev else { break };
                    if self.on_session_event(ev) == FollowUp::Redial
                        && self.connect_cycle(&mut cmd_rx, Some(self.config.redial_delay)).await
                            == CycleEnd::Shutdown
                    {
                        break;
                    }
                }
            }
        }

        // Final teardown, no events.
        let mut shared = self.shared.borrow_mut();
        shared.active = None;
        shared.state = SessionState::Disconnected;
        shared.metrics.is_connected = false;
    }

    /// Dial endpoints until a session is established or the cycle is
    /// cancelled. `initial_delay` is the redial delay after a recoverable
    /// drop; manual reconnects pass `None` and dial immediately.
    async fn connect_cycle(
        &mut self,
        cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
        initial_delay: Option<Duration>,
    ) -> CycleEnd {
        self.attempts = 0;
        let mut delay = self.config.base_delay;

        if let Some(d) = initial_delay {
            match self.pause(cmd_rx, d).await {
                Pause::Elapsed => {}
                Pause::RestartTop => self.restart_from_top(&mut delay),
                Pause::Abort => return CycleEnd::Aborted,
                Pause::Shutdown => return CycleEnd::Shutdown,
            }
        }

        loop {
            let endpoint = match self.endpoints.get(self.cursor) {
                Some(endpoint) => endpoint.to_string(),
                None => {
                    // Cursor is kept below len elsewhere; recover to the top.
                    self.cursor = 0;
                    self.endpoints.first().to_string()
                }
            };

            self.set_state(SessionState::Connecting);
            {
                let mut shared = self.shared.borrow_mut();
                shared.metrics.record_connection_attempt();
            }
            tracing::debug!(endpoint = %endpoint, attempt = self.attempts + 1, "connecting");

            let network = self.providers.network().clone();
            let time = self.providers.time().clone();
            let connect_result = time
                .timeout(self.config.connection_timeout, network.connect(&endpoint))
                .await;

            match connect_result {
                Ok(Ok(stream)) => {
                    self.establish(stream);
                    return CycleEnd::Connected;
                }
                Ok(Err(e)) => {
                    tracing::warn!(endpoint = %endpoint, "connect failed: {}", e);
                }
                Err(_) => {
                    tracing::warn!(endpoint = %endpoint, "connect timed out");
                }
            }

            self.attempts += 1;
            self.set_state(SessionState::Failing);
            {
                let mut shared = self.shared.borrow_mut();
                let now = time.now();
                shared.metrics.record_connection_failure_at(now, delay);
            }
            self.emit(LifecycleEvent::ConnectFailed {
                endpoint: endpoint.clone(),
                attempt: self.attempts,
            });

            if self.attempts >= self.config.rotation_threshold {
                // Rotate to the next endpoint immediately; backoff starts
                // fresh there.
                self.cursor += 1;
                self.attempts = 0;
                delay = self.config.base_delay;

                if self.cursor >= self.endpoints.len() {
                    self.cursor = 0;
                    tracing::debug!(
                        cooldown_ms = self.config.restart_cooldown.as_millis() as u64,
                        "endpoint list exhausted, restarting from the top after cooldown"
                    );
                    match self.pause(cmd_rx, self.config.restart_cooldown).await {
                        Pause::Elapsed => {}
                        Pause::RestartTop => self.restart_from_top(&mut delay),
                        Pause::Abort => return CycleEnd::Aborted,
                        Pause::Shutdown => return CycleEnd::Shutdown,
                    }
                }
            } else {
                match self.pause(cmd_rx, delay).await {
                    Pause::Elapsed => {
                        delay = std::cmp::min(delay * 2, self.config.max_delay);
                    }
                    Pause::RestartTop => self.restart_from_top(&mut delay),
                    Pause::Abort => return CycleEnd::Aborted,
                    Pause::Shutdown => return CycleEnd::Shutdown,
                }
            }
        }
    }

    fn restart_from_top(&mut self, delay: &mut Duration) {
        self.cursor = 0;
        self.attempts = 0;
        *delay = self.config.base_delay;
    }

    /// Sleep that stays responsive to commands. A `Connect` command while
    /// already connecting is a no-op and does not shorten the delay.
    async fn pause(
        &mut self,
        cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
        duration: Duration,
    ) -> Pause {
        let time = self.providers.time().clone();
        let deadline = time.now() + duration;
        loop {
            let remaining = deadline.saturating_sub(time.now());
            if remaining.is_zero() {
                return Pause::Elapsed;
            }
            tokio::select! {
                _ = time.sleep(remaining) => return Pause::Elapsed,
                maybe_cmd = cmd_rx.recv() => match maybe_cmd {
                    Some(Command::Connect) => continue,
                    Some(Command::ManualReconnect) => return Pause::RestartTop,
                    Some(Command::Disconnect) => {
                        self.teardown(true);
                        return Pause::Abort;
                    }
                    Some(Command::Shutdown) | None => return Pause::Shutdown,
                },
            }
        }
    }

    /// Install a fresh session for a connected stream, rehydrate the
    /// identity-bound setup, and replay the deferred queue.
    fn establish(
        &mut self,
        stream: <P::Network as NetworkProvider>::TcpStream,
    ) {
        let now = self.providers.time().now();
        let (generation, first_connect, queued) = {
            let mut shared = self.shared.borrow_mut();
            shared.generation += 1;
            let generation = shared.generation;
            shared.state = SessionState::Connected;
            shared.metrics.record_connection_success_at(now);
            let first_connect = !shared.ever_connected;
            shared.ever_connected = true;
            let queued = shared.queue.drain_all();
            shared.metrics.record_queue_drained();
            (generation, first_connect, queued)
        };

        let handle = session::spawn_session(
            self.providers.task(),
            generation,
            stream,
            self.session_tx.clone(),
        );
        self.shared.borrow_mut().active = Some(handle);
        self.attempts = 0;

        tracing::debug!(generation, replaying = queued.len(), "session established");

        // Setup runs before any queued operation so server-side room
        // membership is never stale after a reconnect.
        if let Some(identity) = self.identity.get() {
            for op in rehydrate::connect_preamble(&identity) {
                self.replay(op);
            }
            for op in rehydrate::session_setup(&identity) {
                self.replay(op);
            }
        }
        for op in queued {
            self.replay(op);
        }

        self.emit(if first_connect {
            LifecycleEvent::Connected
        } else {
            LifecycleEvent::Reconnected
        });
    }

    /// Replay one operation against the active session. Failures are
    /// logged and the operation is lost; the remaining operations still
    /// replay.
    fn replay(&self, op: Operation) {
        let frame = match wire::encode_frame(&JsonCodec, &op) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(op = %op.name, "replay skipped, encode failed: {}", e);
                return;
            }
        };
        let mut shared = self.shared.borrow_mut();
        let delivered = shared
            .active
            .as_ref()
            .is_some_and(|handle| handle.try_send(frame));
        if delivered {
            shared.metrics.record_message_sent();
        } else {
            shared.metrics.record_message_dropped();
            drop(shared);
            tracing::warn!(op = %op.name, "replay dropped, session already closed");
        }
    }

    /// Handle an event from a session task.
    pub(crate) fn on_session_event(&mut self, ev: SessionEvent) -> FollowUp {
        match ev.kind {
            SessionEventKind::Inbound(op) => {
                let current = self.shared.borrow().generation;
                if ev.generation != current {
                    tracing::trace!(
                        generation = ev.generation,
                        "ignoring inbound frame from superseded session"
                    );
                    return FollowUp::None;
                }
                // Receiver may have been dropped by the caller; that only
                // means nobody is listening for inbound operations.
                let _ = self.inbound_tx.send(op);
                FollowUp::None
            }
            SessionEventKind::Closed(reason) => self.on_session_closed(ev.generation, reason),
        }
    }

    /// Handle a session close, discriminating stale generations.
    pub(crate) fn on_session_closed(
        &mut self,
        generation: u64,
        reason: DisconnectReason,
    ) -> FollowUp {
        {
            let mut shared = self.shared.borrow_mut();
            if generation != shared.generation {
                tracing::trace!(generation, "ignoring close from superseded session");
                return FollowUp::None;
            }
            if shared.state != SessionState::Connected {
                // Already torn down locally; the close is an echo.
                return FollowUp::None;
            }
            shared.state = SessionState::Disconnected;
            shared.active = None;
            shared.metrics.is_connected = false;
        }
        tracing::debug!(generation, ?reason, "session closed");
        self.emit(LifecycleEvent::Disconnected(reason));

        if reason.is_recoverable() {
            FollowUp::Redial
        } else {
            FollowUp::None
        }
    }

    /// Tear down the active session. `user_requested` marks an explicit
    /// disconnect, which suppresses auto-reconnection until the next
    /// connect request. The deferred queue is left untouched either way.
    fn teardown(&mut self, user_requested: bool) {
        let had_session = {
            let mut shared = self.shared.borrow_mut();
            shared.user_disconnected = user_requested;
            let had_session = match shared.active.take() {
                Some(handle) => {
                    tracing::debug!(
                        generation = handle.generation(),
                        user_requested,
                        "tearing down active session"
                    );
                    true
                }
                None => false,
            };
            shared.state = SessionState::Disconnected;
            shared.metrics.is_connected = false;
            had_session
        };
        if had_session {
            self.emit(LifecycleEvent::Disconnected(DisconnectReason::LocalClose));
        }
    }

    fn set_state(&self, state: SessionState) {
        self.shared.borrow_mut().state = state;
    }

    /// Broadcast a lifecycle event. Handlers run with no borrow held so
    /// they may re-enter the client.
    fn emit(&self, event: LifecycleEvent) {
        let handlers = self.shared.borrow().listeners.matching(event.kind());
        tracing::debug!(?event, listeners = handlers.len(), "lifecycle event");
        for handler in handlers {
            handler(&event);
        }
    }
}
