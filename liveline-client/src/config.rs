//! Configuration for the realtime client.

use std::time::Duration;

/// Failures tolerated on one endpoint before rotating to the next.
pub const DEFAULT_ROTATION_THRESHOLD: u32 = 2;

/// Initial delay between retries against the same endpoint.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Cap on the exponential retry delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Timeout for a single connection attempt.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay before re-dialing after a recoverable disconnect.
pub const DEFAULT_REDIAL_DELAY: Duration = Duration::from_millis(500);

/// Cooldown before restarting from the first endpoint after every endpoint
/// has been tried.
pub const DEFAULT_RESTART_COOLDOWN: Duration = Duration::from_secs(2);

/// Interval of the liveness monitor.
pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_secs(5);

/// Maximum number of operations queued while disconnected.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;

/// Configuration for connection behavior and failover parameters.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Candidate server addresses, in priority order.
    pub endpoints: Vec<String>,

    /// Consecutive connect failures on one endpoint before rotating.
    pub rotation_threshold: u32,

    /// Initial retry delay; doubles per failure on the same endpoint.
    pub base_delay: Duration,

    /// Cap on the retry delay.
    pub max_delay: Duration,

    /// Timeout for a single connection attempt.
    pub connection_timeout: Duration,

    /// Delay before re-dialing after a recoverable disconnect.
    pub redial_delay: Duration,

    /// Cooldown before restarting from `endpoints[0]` after exhausting the
    /// list.
    pub restart_cooldown: Duration,

    /// Interval of the liveness monitor.
    pub liveness_interval: Duration,

    /// Maximum number of operations queued while disconnected.
    pub max_queue_size: usize,
}

impl ClientConfig {
    /// Create a configuration for the given endpoints with default tuning.
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            rotation_threshold: DEFAULT_ROTATION_THRESHOLD,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            redial_delay: DEFAULT_REDIAL_DELAY,
            restart_cooldown: DEFAULT_RESTART_COOLDOWN,
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
        }
    }

    /// Set the rotation threshold.
    pub fn with_rotation_threshold(mut self, threshold: u32) -> Self {
        self.rotation_threshold = threshold;
        self
    }

    /// Set the base retry delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the liveness monitor interval.
    pub fn with_liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval = interval;
        self
    }
}
