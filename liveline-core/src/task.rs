//! Task spawning abstraction for single-threaded environments.

use std::future::Future;

/// Provider for spawning local tasks in a single-threaded context.
///
/// The connection manager runs its driver, sessions, and liveness monitor
/// as background tasks on the current thread. Abstracting the spawn keeps
/// the shared `Rc<RefCell<..>>` state sound (no parallel execution) and
/// lets tests control scheduling.
pub trait TaskProvider: Clone {
    /// Spawn a named task on the current thread.
    ///
    /// The name is attached to trace output only. Callers must be running
    /// inside a `tokio::task::LocalSet` (or equivalent local context).
    fn spawn_task<F>(&self, name: &str, future: F) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = ()> + 'static;
}

/// Tokio-based task provider using `spawn_local`.
#[derive(Clone, Debug, Default)]
pub struct TokioTaskProvider;

impl TaskProvider for TokioTaskProvider {
    fn spawn_task<F>(&self, name: &str, future: F) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = ()> + 'static,
    {
        let task_name = name.to_string();
        tokio::task::spawn_local(async move {
            tracing::trace!("task {} starting", task_name);
            future.await;
            tracing::trace!("task {} completed", task_name);
        })
    }
}
