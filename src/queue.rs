//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Serialized execution of stream callbacks.
//!
//! A [`DispatchQueue`] executes submitted jobs strictly one at a time, in
//! submission order, on a dedicated worker task. Every completion handler of
//! a stream runs as a job on its queue, which is what lets the stream keep
//! its state machine free of fine-grained synchronization: no two callbacks
//! for the same stream ever run concurrently.
//!
//! Jobs are futures. A job that awaits (for example the teardown drain) holds
//! the queue for the duration of the await; later jobs wait their turn. That
//! is deliberate: blocking the queue briefly is the mechanism by which
//! teardown keeps cancellation from racing a completion callback.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Global counter for generating unique queue identities.
static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    /// Identity of the queue whose worker is driving the current task.
    static CURRENT_QUEUE: u64;
}

/// A serialized executor for stream callbacks.
///
/// Cloning a `DispatchQueue` yields another handle to the same worker; all
/// handles feed one ordered job stream. The worker stops once every handle
/// has been dropped and the remaining jobs have run.
///
/// # Example
///
/// ```rust
/// use bistream::DispatchQueue;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = DispatchQueue::new();
/// let doubled = queue.run(async { 21 * 2 }).await;
/// assert_eq!(doubled, 42);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct DispatchQueue {
    id: u64,
    jobs: mpsc::UnboundedSender<Job>,
}

impl DispatchQueue {
    /// Creates a queue and spawns its worker task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, since the worker is spawned
    /// onto the ambient runtime.
    #[must_use]
    pub fn new() -> Self {
        let id = NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed);
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(CURRENT_QUEUE.scope(id, async move {
            while let Some(job) = rx.recv().await {
                job.await;
            }
        }));
        Self { id, jobs }
    }

    /// Schedules a job for execution after all previously scheduled jobs.
    ///
    /// Scheduling never blocks. If the worker has already stopped the job is
    /// silently discarded; a stopped queue means the owning runtime is
    /// shutting down and there is nobody left to observe the effect.
    pub fn enqueue<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let _ = self.jobs.send(Box::pin(job));
    }

    /// Schedules a job and waits for its result.
    ///
    /// Must not be called from within one of this queue's own jobs: the
    /// scheduled job cannot start until the current one yields the queue, so
    /// the wait would never end.
    ///
    /// # Panics
    ///
    /// Panics if the worker stops before the job runs.
    pub async fn run<F, T>(&self, job: F) -> T
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        debug_assert!(
            !self.is_current_context(),
            "run() called from within a dispatch queue job"
        );
        let (tx, rx) = oneshot::channel();
        self.enqueue(async move {
            let _ = tx.send(job.await);
        });
        rx.await.expect("dispatch queue worker stopped")
    }

    /// Returns `true` when the caller is executing inside one of this
    /// queue's jobs.
    ///
    /// Used for defensive assertions in code that is only correct on the
    /// serialized context.
    #[must_use]
    pub fn is_current_context(&self) -> bool {
        CURRENT_QUEUE.try_with(|id| *id == self.id).unwrap_or(false)
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DispatchQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DispatchQueue({})", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_jobs_run_in_submission_order() {
        let queue = DispatchQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..10 {
            let order = Arc::clone(&order);
            queue.enqueue(async move {
                order.lock().unwrap().push(i);
            });
        }
        queue.run(async {}).await;

        assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_run_returns_job_result() {
        let queue = DispatchQueue::new();
        let value = queue.run(async { "done" }).await;
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn test_awaiting_job_holds_the_queue() {
        let queue = DispatchQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let first = Arc::clone(&order);
        queue.enqueue(async move {
            let _ = release_rx.await;
            first.lock().unwrap().push("first");
        });
        let second = Arc::clone(&order);
        queue.enqueue(async move {
            second.lock().unwrap().push("second");
        });

        release_tx.send(()).unwrap();
        queue.run(async {}).await;

        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_is_current_context() {
        let queue = DispatchQueue::new();
        assert!(!queue.is_current_context());

        let inside = queue.clone();
        let seen = queue.run(async move { inside.is_current_context() }).await;
        assert!(seen);
    }

    #[tokio::test]
    async fn test_contexts_are_distinct() {
        let queue = DispatchQueue::new();
        let other = DispatchQueue::new();

        let inside = other.clone();
        let seen = queue.run(async move { inside.is_current_context() }).await;
        assert!(!seen);
    }
}
