//! Connection state and counter tracking.

use std::time::Duration;

/// Metrics and state information for the managed connection.
#[derive(Debug, Clone)]
pub struct ClientMetrics {
    /// Total number of connection attempts made
    pub connection_attempts: u64,

    /// Total number of successful connections established
    pub connections_established: u64,

    /// Total number of connection failures
    pub connection_failures: u64,

    /// Total number of operations sent successfully
    pub messages_sent: u64,

    /// Total number of operations queued while disconnected
    pub messages_queued: u64,

    /// Total number of operations dropped (failed sends, queue overflow)
    pub messages_dropped: u64,

    /// Current size of the deferred-operation queue
    pub current_queue_size: usize,

    /// Time of last successful connection (None if never connected)
    pub last_connected: Option<Duration>,

    /// Time of last connection failure (None if no failures)
    pub last_failure: Option<Duration>,

    /// Current consecutive failure count
    pub consecutive_failures: u32,

    /// Backoff delay that will precede the next retry
    pub current_backoff_delay: Duration,

    /// Whether a session is currently connected
    pub is_connected: bool,
}

impl ClientMetrics {
    /// Create a zeroed metrics instance.
    pub fn new(initial_backoff: Duration) -> Self {
        Self {
            connection_attempts: 0,
            connections_established: 0,
            connection_failures: 0,
            messages_sent: 0,
            messages_queued: 0,
            messages_dropped: 0,
            current_queue_size: 0,
            last_connected: None,
            last_failure: None,
            consecutive_failures: 0,
            current_backoff_delay: initial_backoff,
            is_connected: false,
        }
    }

    /// Record a connection attempt.
    pub(crate) fn record_connection_attempt(&mut self) {
        self.connection_attempts += 1;
    }

    /// Record a successful connection at a specific time.
    pub(crate) fn record_connection_success_at(&mut self, now: Duration) {
        self.connections_established += 1;
        self.last_connected = Some(now);
        self.consecutive_failures = 0;
        self.is_connected = true;
    }

    /// Record a connection failure at a specific time.
    pub(crate) fn record_connection_failure_at(&mut self, now: Duration, next_delay: Duration) {
        self.connection_failures += 1;
        self.last_failure = Some(now);
        self.consecutive_failures += 1;
        self.current_backoff_delay = next_delay;
        self.is_connected = false;
    }

    /// Record an operation delivered to the active session.
    pub(crate) fn record_message_sent(&mut self) {
        self.messages_sent += 1;
    }

    /// Record an operation queued while disconnected.
    pub(crate) fn record_message_queued(&mut self) {
        self.messages_queued += 1;
        self.current_queue_size += 1;
    }

    /// Record an operation dropped.
    pub(crate) fn record_message_dropped(&mut self) {
        self.messages_dropped += 1;
    }

    /// Record an operation leaving the queue.
    pub(crate) fn record_message_dequeued(&mut self) {
        if self.current_queue_size > 0 {
            self.current_queue_size -= 1;
        }
    }

    /// Record the whole queue being drained into a fresh session.
    pub(crate) fn record_queue_drained(&mut self) {
        self.current_queue_size = 0;
    }
}
