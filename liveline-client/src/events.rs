//! Lifecycle events and the listener registry.
//!
//! External code observes the connection through a small set of derived
//! events; none of them are persisted. Handlers are registered per event
//! kind with [`on`](crate::RealtimeClient::on) and removed with
//! [`off`](crate::RealtimeClient::off).

use std::rc::Rc;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server closed the connection (clean end of stream).
    ServerClose,
    /// The transport failed (read or write error).
    TransportClose,
    /// The local side disconnected deliberately.
    LocalClose,
}

impl DisconnectReason {
    /// Recoverable reasons trigger an automatic re-dial; a deliberate
    /// local close does not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DisconnectReason::LocalClose)
    }
}

/// Lifecycle events broadcast to external listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// First successful connection of this client.
    Connected,
    /// A successful connection after at least one earlier success.
    Reconnected,
    /// The active session ended.
    Disconnected(DisconnectReason),
    /// A connection attempt against an endpoint failed.
    ConnectFailed {
        /// The endpoint that was tried.
        endpoint: String,
        /// Consecutive failed attempts against that endpoint, 1-based.
        attempt: u32,
    },
}

impl LifecycleEvent {
    /// The kind used for listener matching.
    pub fn kind(&self) -> EventKind {
        match self {
            LifecycleEvent::Connected => EventKind::Connected,
            LifecycleEvent::Reconnected => EventKind::Reconnected,
            LifecycleEvent::Disconnected(_) => EventKind::Disconnected,
            LifecycleEvent::ConnectFailed { .. } => EventKind::ConnectFailed,
        }
    }
}

/// Kinds of lifecycle events, for listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Matches [`LifecycleEvent::Connected`].
    Connected,
    /// Matches [`LifecycleEvent::Reconnected`].
    Reconnected,
    /// Matches [`LifecycleEvent::Disconnected`].
    Disconnected,
    /// Matches [`LifecycleEvent::ConnectFailed`].
    ConnectFailed,
}

/// Handle for removing a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Shared type for registered handlers.
pub(crate) type Handler = Rc<dyn Fn(&LifecycleEvent)>;

/// Registry of event listeners.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, EventKind, Handler)>,
}

impl Listeners {
    /// Create an empty registry.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    pub(crate) fn subscribe(&mut self, kind: EventKind, handler: Handler) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, kind, handler));
        id
    }

    /// Remove a handler. Returns `false` if the id is unknown.
    pub(crate) fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Clone out the handlers registered for a kind.
    ///
    /// Handlers are invoked with no registry borrow held, so a handler may
    /// re-enter the client (send, subscribe, unsubscribe) freely.
    pub(crate) fn matching(&self, kind: EventKind) -> Vec<Handler> {
        self.entries
            .iter()
            .filter(|(_, entry_kind, _)| *entry_kind == kind)
            .map(|(_, _, handler)| Rc::clone(handler))
            .collect()
    }
}
