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

//! The bidirectional stream state machine.

use crate::queue::DispatchQueue;
use crate::status::Status;
use crate::stream::{BufferedWriter, OperationKind, StreamObserver, StreamOperation, StreamState};
use crate::transport::BidiCall;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

/// A bidirectional streaming RPC that notifies an observer about stream
/// events.
///
/// The stream has to be explicitly opened via [`start`](Self::start) before
/// it can be used. Once open it is always listening for new messages from the
/// server. Messages sent via [`write`](Self::write) are queued and go out one
/// by one, in order. Both sent and received messages are raw bytes;
/// serialization is the caller's concern.
///
/// The observer is notified when the stream starts, when a message arrives,
/// and when the stream breaks. All errors are terminal. The observer is *not*
/// notified about a finish the caller initiated, nor about the final write
/// produced by [`write_and_finish`](Self::write_and_finish).
///
/// The stream captures the observer's generation number at construction; once
/// the observer advances its generation, the stream stops notifying it and
/// stops listening for new messages. Writes already handed to the transport
/// are still sent as normal.
///
/// The stream is disposable: once it finishes it cannot be restarted, and a
/// fresh instance must be created for any further communication. Before a
/// stream with in-flight operations is dropped it must be drained via
/// [`finish`](Self::finish) (or have finalized through
/// [`write_and_finish`](Self::write_and_finish) or a reported error); this is
/// what guarantees that the transport call is released only after its last
/// use.
pub struct BidiStream {
    core: Arc<StreamCore>,
}

/// Shared heart of a stream: operation tasks hold it weakly, the public
/// handle owns it.
pub(crate) struct StreamCore {
    pub(crate) call: Arc<dyn BidiCall>,
    pub(crate) queue: DispatchQueue,
    pub(crate) generation: u64,
    observer: Weak<dyn StreamObserver>,
    inner: Mutex<Inner>,
}

struct Inner {
    state: StreamState,
    writer: BufferedWriter,
    operations: HashMap<u64, StreamOperation>,
    next_operation_id: u64,
    // Sanity check: at most one read outstanding between Open and Finishing.
    has_pending_read: bool,
    finish_after_write: bool,
    finish_called: bool,
}

impl BidiStream {
    /// Creates a stream over an established-but-unopened call.
    ///
    /// The observer is held non-owningly, and its generation number is
    /// snapshotted here; see the type docs for how generations gate
    /// notifications. All completion handling runs as jobs on `queue`.
    #[must_use]
    pub fn new(
        call: Arc<dyn BidiCall>,
        observer: &Arc<dyn StreamObserver>,
        queue: DispatchQueue,
    ) -> Self {
        let generation = observer.generation();
        Self {
            core: Arc::new(StreamCore {
                call,
                queue,
                generation,
                observer: Arc::downgrade(observer),
                inner: Mutex::new(Inner {
                    state: StreamState::NotStarted,
                    writer: BufferedWriter::new(),
                    operations: HashMap::new(),
                    next_operation_id: 1,
                    has_pending_read: false,
                    finish_after_write: false,
                    finish_called: false,
                }),
            }),
        }
    }

    /// Opens the stream.
    ///
    /// Returns immediately; success is reported through
    /// [`StreamObserver::on_stream_start`] and failure through
    /// [`StreamObserver::on_stream_error`].
    ///
    /// # Panics
    ///
    /// Panics if the stream has already been started.
    pub fn start(&self) {
        let mut inner = self.core.inner.lock();
        assert_eq!(
            inner.state,
            StreamState::NotStarted,
            "stream already started"
        );
        inner.state = StreamState::Starting;
        StreamCore::execute(&self.core, &mut inner, OperationKind::Start);
    }

    /// Sends a message, or queues it behind the write currently in flight.
    ///
    /// Messages written before the stream opens are buffered and flushed on
    /// open. Once the stream is finishing or finished the message is silently
    /// dropped.
    pub fn write(&self, message: Bytes) {
        let mut inner = self.core.inner.lock();
        if inner.state >= StreamState::Finishing {
            debug!("dropping write on a stream that is finishing");
            return;
        }
        if let Some(message) = inner.writer.enqueue(message) {
            StreamCore::execute(&self.core, &mut inner, OperationKind::Write(message));
        }
    }

    /// Finishes the stream.
    ///
    /// Discards queued-but-unissued writes, cancels and drains every
    /// outstanding operation, performs the transport finish, and leaves the
    /// stream [`Finished`](StreamState::Finished). Produces no observer
    /// notification. Safe to call before the stream has ever opened; if the
    /// stream already finalized because of an error, this is a no-op.
    ///
    /// # Panics
    ///
    /// Panics when called more than once; finishing is a one-shot teardown.
    pub async fn finish(&self) {
        {
            let mut inner = self.core.inner.lock();
            assert!(!inner.finish_called, "stream may only be finished once");
            inner.finish_called = true;
            if inner.state == StreamState::NotStarted {
                // Nothing was ever issued; nothing to drain.
                inner.state = StreamState::Finished;
                return;
            }
        }
        let core = Arc::clone(&self.core);
        self.core
            .queue
            .run(async move { StreamCore::finish_locally(&core).await })
            .await;
    }

    /// Writes `message` and finishes the stream as soon as that write
    /// succeeds.
    ///
    /// Queued-but-unissued writes are discarded so the final message goes out
    /// as early as possible (behind the write already in flight, if any).
    /// Neither the write nor the finish notifies the observer.
    ///
    /// If the stream has not opened yet this is equivalent to
    /// [`finish`](Self::finish) and the message is discarded. Returns whether
    /// the write was actually attempted.
    ///
    /// # Panics
    ///
    /// Panics when the stream was already finished by the caller.
    pub async fn write_and_finish(&self, message: Bytes) -> bool {
        {
            let mut inner = self.core.inner.lock();
            assert!(!inner.finish_called, "stream may only be finished once");
            if inner.state == StreamState::Open {
                inner.finish_called = true;
                inner.state = StreamState::Finishing;
                inner.writer.discard_unissued();
                inner.finish_after_write = true;
                if let Some(message) = inner.writer.enqueue(message) {
                    StreamCore::execute(&self.core, &mut inner, OperationKind::Write(message));
                }
                return true;
            }
        }
        debug!("write-and-finish on a stream that is not open; discarding the message");
        self.finish().await;
        false
    }

    /// Returns `true` iff the stream has reached its terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.core.inner.lock().state == StreamState::Finished
    }

    /// The response metadata received from the server so far.
    ///
    /// Meaningful once the stream has opened; empty before that.
    #[must_use]
    pub fn response_headers(&self) -> HashMap<String, String> {
        self.core.call.response_headers()
    }
}

impl fmt::Debug for BidiStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.core.inner.lock();
        f.debug_struct("BidiStream")
            .field("state", &inner.state)
            .field("outstanding_operations", &inner.operations.len())
            .field("generation", &self.core.generation)
            .finish()
    }
}

impl Drop for BidiStream {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            let inner = self.core.inner.lock();
            assert!(
                inner.operations.is_empty(),
                "stream dropped with operations in flight; finish it first"
            );
        }
    }
}

impl StreamCore {
    /// Creates an operation, submits it, and records it in the owning table.
    fn execute(core: &Arc<Self>, inner: &mut Inner, kind: OperationKind) {
        let id = inner.next_operation_id;
        inner.next_operation_id += 1;
        trace!(operation = kind.name(), id, "issuing operation");
        let operation = StreamOperation::execute(id, kind, core);
        inner.operations.insert(id, operation);
    }

    fn issue_read(core: &Arc<Self>, inner: &mut Inner) {
        assert!(
            !inner.has_pending_read,
            "at most one read may be outstanding"
        );
        inner.has_pending_read = true;
        Self::execute(core, inner, OperationKind::Read);
    }

    /// Whether this stream still belongs to the same generation as its
    /// observer. A dropped observer counts as a different generation.
    fn same_generation(&self) -> bool {
        self.observer
            .upgrade()
            .is_some_and(|observer| observer.generation() == self.generation)
    }

    /// Takes an operation out of the owning table; `None` means the teardown
    /// drain already claimed it and its outcome must be discarded.
    pub(crate) fn remove_operation(&self, id: u64) -> Option<StreamOperation> {
        self.inner.lock().operations.remove(&id)
    }

    pub(crate) fn on_start(core: &Arc<Self>) {
        debug_assert!(core.queue.is_current_context());
        let notify = {
            let mut inner = core.inner.lock();
            debug_assert_eq!(inner.state, StreamState::Starting);
            inner.state = StreamState::Open;
            if core.same_generation() {
                Self::issue_read(core, &mut inner);
                if let Some(message) = inner.writer.start() {
                    Self::execute(core, &mut inner, OperationKind::Write(message));
                }
                true
            } else {
                debug!("stream opened for a stale generation; not listening");
                false
            }
        };
        if notify {
            if let Some(observer) = core.observer.upgrade() {
                observer.on_stream_start();
            }
        }
    }

    pub(crate) fn on_read(core: &Arc<Self>, message: Bytes) {
        debug_assert!(core.queue.is_current_context());
        let notify = {
            let mut inner = core.inner.lock();
            inner.has_pending_read = false;
            if core.same_generation() {
                // Stay listening for as long as the stream is usable.
                if inner.state == StreamState::Open {
                    Self::issue_read(core, &mut inner);
                }
                true
            } else {
                debug!("suppressing read for a stale generation; listening stops");
                false
            }
        };
        if notify {
            if let Some(observer) = core.observer.upgrade() {
                observer.on_stream_read(message);
            }
        }
    }

    pub(crate) async fn on_write(core: &Arc<Self>) {
        debug_assert!(core.queue.is_current_context());
        let finalize = {
            let mut inner = core.inner.lock();
            if let Some(message) = inner.writer.on_write_settled() {
                Self::execute(core, &mut inner, OperationKind::Write(message));
                false
            } else {
                // Queue is dry; if the settled write was the final one of
                // write_and_finish, tear the stream down now.
                inner.finish_after_write
            }
        };
        if finalize {
            Self::finish_locally(core).await;
        }
    }

    pub(crate) async fn on_operation_failed(core: &Arc<Self>, status: Status) {
        debug_assert!(core.queue.is_current_context());
        warn!(%status, "stream operation failed");
        Self::finalize_with_error(core, status.into_failure()).await;
    }

    pub(crate) async fn on_finished_by_server(core: &Arc<Self>, status: Status) {
        debug_assert!(core.queue.is_current_context());
        debug!(%status, "stream finished by server");
        Self::finalize_with_error(core, status).await;
    }

    /// Client-initiated teardown: drain, perform the transport finish, go
    /// quiet. No observer notification: the caller already knows.
    pub(crate) async fn finish_locally(core: &Arc<Self>) {
        debug_assert!(core.queue.is_current_context());
        {
            let mut inner = core.inner.lock();
            if inner.state == StreamState::Finished {
                return;
            }
            inner.state = StreamState::Finishing;
            inner.writer.discard_unissued();
        }
        core.fast_finish_operations().await;
        let status = core.call.finish().await;
        trace!(%status, "call finished locally");
        core.on_finished_by_client();
    }

    fn on_finished_by_client(&self) {
        self.inner.lock().state = StreamState::Finished;
    }

    /// Error teardown: drain, then surface `status` unless the observer has
    /// moved to a newer generation.
    async fn finalize_with_error(core: &Arc<Self>, status: Status) {
        {
            let mut inner = core.inner.lock();
            if inner.state == StreamState::Finished {
                return;
            }
            inner.state = StreamState::Finishing;
            inner.writer.discard_unissued();
        }
        core.fast_finish_operations().await;
        let notify = core.same_generation();
        core.inner.lock().state = StreamState::Finished;
        if notify {
            if let Some(observer) = core.observer.upgrade() {
                observer.on_stream_error(status);
            }
        }
    }

    /// Cancels the call and waits until every outstanding operation has
    /// released it.
    ///
    /// Runs on the serialized context so that no completion callback can race
    /// the drain; blocking that context until the transport acknowledges
    /// every cancellation is the price of releasing the call safely.
    async fn fast_finish_operations(&self) {
        debug_assert!(self.queue.is_current_context());
        self.call.cancel();
        let drained: Vec<StreamOperation> = {
            let mut inner = self.inner.lock();
            inner.has_pending_read = false;
            inner.operations.drain().map(|(_, op)| op).collect()
        };
        for operation in drained {
            operation.wait_until_complete().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryCall;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct NullObserver {
        generation: AtomicU64,
    }

    impl NullObserver {
        fn shared() -> Arc<dyn StreamObserver> {
            Arc::new(Self {
                generation: AtomicU64::new(0),
            })
        }
    }

    impl StreamObserver for NullObserver {
        fn on_stream_start(&self) {}
        fn on_stream_read(&self, _message: Bytes) {}
        fn on_stream_error(&self, _status: Status) {}
        fn generation(&self) -> u64 {
            self.generation.load(Ordering::Acquire)
        }
    }

    #[tokio::test]
    async fn test_new_stream_is_not_finished() {
        let (call, _controller) = MemoryCall::pair();
        let observer = NullObserver::shared();
        let stream = BidiStream::new(Arc::new(call), &observer, DispatchQueue::new());
        assert!(!stream.is_finished());
        stream.finish().await;
    }

    #[tokio::test]
    async fn test_finish_before_start_is_immediate() {
        let (call, _controller) = MemoryCall::pair();
        let observer = NullObserver::shared();
        let stream = BidiStream::new(Arc::new(call), &observer, DispatchQueue::new());
        stream.finish().await;
        assert!(stream.is_finished());
    }

    #[tokio::test]
    async fn test_response_headers_come_from_the_call() {
        let (call, controller) = MemoryCall::pair();
        let mut headers = HashMap::new();
        headers.insert("grpc-encoding".to_string(), "identity".to_string());
        controller.set_response_headers(headers.clone());

        let observer = NullObserver::shared();
        let stream = BidiStream::new(Arc::new(call), &observer, DispatchQueue::new());
        assert_eq!(stream.response_headers(), headers);
        stream.finish().await;
    }
}
