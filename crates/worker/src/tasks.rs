//! Detached background work.
//!
//! Cache writes that must not delay the response (fire-and-forget puts,
//! stale-while-revalidate refreshes) are spawned onto this queue instead
//! of relying on incidental future scheduling. `drain` lets tests and the
//! deploy binary wait for everything spawned so far, which closes the
//! process-termination race a plain `tokio::spawn` would leave open.

use std::sync::Mutex;
use tokio::task::JoinHandle;

/// Queue of detached tasks spawned by the worker.
#[derive(Debug, Default)]
pub struct TaskQueue {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a detached task. The caller never awaits it.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        if let Ok(mut handles) = self.handles.lock() {
            handles.retain(|h| !h.is_finished());
            handles.push(handle);
        }
    }

    /// Number of tasks not yet known to have finished.
    pub fn pending(&self) -> usize {
        self.handles
            .lock()
            .map(|h| h.iter().filter(|t| !t.is_finished()).count())
            .unwrap_or(0)
    }

    /// Wait for every task spawned so far, including tasks spawned by
    /// tasks while draining.
    pub async fn drain(&self) {
        loop {
            let batch: Vec<JoinHandle<()>> = match self.handles.lock() {
                Ok(mut handles) => handles.drain(..).collect(),
                Err(_) => return,
            };
            if batch.is_empty() {
                return;
            }
            for handle in batch {
                // A panicked task is already logged by the runtime; draining
                // must not propagate it into the event loop.
                let _ = handle.await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_spawn_and_drain() {
        let queue = TaskQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let counter = Arc::clone(&counter);
            queue.spawn(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        queue.drain().await;
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_drain_empty_queue() {
        let queue = TaskQueue::new();
        queue.drain().await;
    }

    #[tokio::test]
    async fn test_drain_survives_task_panic() {
        let queue = TaskQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));

        queue.spawn(async {
            panic!("background task failed");
        });
        let c = Arc::clone(&counter);
        queue.spawn(async move {
            c.fetch_add(1, Ordering::SeqCst);
        });

        queue.drain().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
