//! Detached work that must finish after the response has been sent.
//!
//! Cache population runs on its own task. The request path hands the
//! [`BackgroundTask`] back to the caller instead of awaiting it; the server
//! registers it with [`BackgroundTasks`] so shutdown can wait for it, and tests
//! can await it directly.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Handle to one spawned background task.
#[derive(Debug)]
pub struct BackgroundTask {
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    /// Spawn `future` on the runtime; it runs whether or not the handle is kept.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to complete.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Background task did not complete");
        }
    }
}

/// Registry of in-flight background tasks, shared by all request handlers.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    pending: Arc<Mutex<Vec<BackgroundTask>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep track of `task` until it finishes or the registry is drained.
    pub fn track(&self, task: BackgroundTask) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|t| !t.is_finished());
        pending.push(task);
    }

    /// Number of tracked tasks that have not finished yet.
    pub fn in_flight(&self) -> usize {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.iter().filter(|t| !t.is_finished()).count()
    }

    /// Wait for every tracked task, giving up after `deadline`.
    pub async fn drain(&self, deadline: Duration) {
        let tasks: Vec<BackgroundTask> = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.drain(..).collect()
        };
        if tasks.is_empty() {
            return;
        }

        let count = tasks.len();
        tracing::info!(count, "Waiting for background tasks");
        let all = async {
            for task in tasks {
                task.wait().await;
            }
        };
        if tokio::time::timeout(deadline, all).await.is_err() {
            tracing::warn!(count, deadline = ?deadline, "Background tasks still running at shutdown");
        }
    }
}
