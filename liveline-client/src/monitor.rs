//! Liveness monitor.
//!
//! A periodic timer independent of the driver's own backoff timers. If the
//! session is not connected when the timer fires, the monitor nudges the
//! driver with an idempotent connect command. This is the backstop against
//! any backoff logic silently stalling; it never creates sessions itself.
//!
//! The monitor stays quiet after an explicit disconnect so a deliberate
//! teardown is not resurrected behind the caller's back.

use std::time::Duration;

use liveline_core::TimeProvider;
use tokio::sync::mpsc;

use crate::reconnect::{Command, SessionState, SharedHandle};

/// Run the liveness monitor until shut down.
pub(crate) async fn run_liveness_monitor<T: TimeProvider>(
    time: T,
    interval: Duration,
    shared: SharedHandle,
    cmd_tx: mpsc::UnboundedSender<Command>,
    mut shutdown_rx: mpsc::UnboundedReceiver<()>,
) {
    loop {
        // Wake on the interval unless a shutdown arrives first. A closed
        // channel means the client handle is gone; stop either way.
        if time.timeout(interval, shutdown_rx.recv()).await.is_ok() {
            tracing::debug!("liveness monitor stopping");
            return;
        }

        let (state, halted) = {
            let shared = shared.borrow();
            (shared.state, shared.user_disconnected)
        };
        if state != SessionState::Connected && !halted {
            tracing::debug!(?state, "liveness monitor: session not connected, nudging driver");
            if cmd_tx.send(Command::Connect).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::reconnect::Shared;
    use liveline_core::TokioTimeProvider;

    fn test_shared() -> SharedHandle {
        Shared::new(&ClientConfig::new(vec!["a:1".to_string()]))
    }

    async fn run_monitor_briefly(shared: SharedHandle) -> usize {
        let time = TokioTimeProvider::new();
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();

        let monitor = run_liveness_monitor(
            time.clone(),
            Duration::from_millis(5),
            shared,
            cmd_tx,
            shutdown_rx,
        );
        let observe = async {
            time.sleep(Duration::from_millis(30))
                .await
                .expect("sleep should succeed");
            let _ = shutdown_tx.send(());
        };
        tokio::join!(monitor, observe);

        let mut nudges = 0;
        while cmd_rx.try_recv().is_ok() {
            nudges += 1;
        }
        nudges
    }

    #[tokio::test]
    async fn nudges_while_disconnected() {
        let shared = test_shared();
        let nudges = run_monitor_briefly(shared).await;
        assert!(nudges >= 1, "expected at least one nudge, got {nudges}");
    }

    #[tokio::test]
    async fn stays_quiet_while_connected() {
        let shared = test_shared();
        shared.borrow_mut().state = SessionState::Connected;
        let nudges = run_monitor_briefly(shared).await;
        assert_eq!(nudges, 0);
    }

    #[tokio::test]
    async fn respects_explicit_disconnect() {
        let shared = test_shared();
        shared.borrow_mut().user_disconnected = true;
        let nudges = run_monitor_briefly(shared).await;
        assert_eq!(nudges, 0);
    }
}
