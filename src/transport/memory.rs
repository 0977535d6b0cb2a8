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

//! In-memory call implementation for testing.
//!
//! [`MemoryCall`] implements [`BidiCall`] without any network I/O; its paired
//! [`MemoryCallController`] plays the role of the server and of the
//! transport's pacing. Completion of the start handshake, delivery of
//! server messages, and acknowledgment of each write are all explicit
//! controller actions, which makes stream behavior deterministic in tests:
//! a write stays "in flight" exactly until the test completes it.

use crate::status::Status;
use crate::transport::{BidiCall, ConnectionContext};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// One message handed to the transport, awaiting acknowledgment.
///
/// Obtained from [`MemoryCallController::next_write`]. Dropping it without
/// calling [`complete`](Self::complete) or [`fail`](Self::fail) abandons the
/// write; the call side then reports cancellation.
#[derive(Debug)]
pub struct PendingWrite {
    message: Bytes,
    done: oneshot::Sender<Result<(), Status>>,
}

impl PendingWrite {
    /// The message being written.
    #[must_use]
    pub fn message(&self) -> &Bytes {
        &self.message
    }

    /// Acknowledges the write as accepted for transmission.
    pub fn complete(self) {
        let _ = self.done.send(Ok(()));
    }

    /// Rejects the write with the given status.
    pub fn fail(self, status: Status) {
        let _ = self.done.send(Err(status));
    }
}

/// An in-process [`BidiCall`] with fully scripted behavior.
///
/// Created in a pair with its controller:
///
/// ```rust
/// use bistream::MemoryCall;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (call, mut controller) = MemoryCall::pair();
/// controller.complete_start(Ok(()));
/// # drop(call);
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryCall {
    context: Arc<ConnectionContext>,
    start: tokio::sync::Mutex<Option<oneshot::Receiver<Result<(), Status>>>>,
    incoming: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<Bytes, Status>>>,
    writes: mpsc::UnboundedSender<PendingWrite>,
    final_status: Arc<Mutex<Status>>,
}

/// The server/transport side of a [`MemoryCall`].
#[derive(Debug)]
pub struct MemoryCallController {
    context: Arc<ConnectionContext>,
    start: Option<oneshot::Sender<Result<(), Status>>>,
    incoming: mpsc::UnboundedSender<Result<Bytes, Status>>,
    writes: mpsc::UnboundedReceiver<PendingWrite>,
    final_status: Arc<Mutex<Status>>,
}

impl MemoryCall {
    /// Creates a connected call/controller pair.
    #[must_use]
    pub fn pair() -> (Self, MemoryCallController) {
        let context = Arc::new(ConnectionContext::new());
        let (start_tx, start_rx) = oneshot::channel();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (writes_tx, writes_rx) = mpsc::unbounded_channel();
        let final_status = Arc::new(Mutex::new(Status::ok()));

        let call = Self {
            context: Arc::clone(&context),
            start: tokio::sync::Mutex::new(Some(start_rx)),
            incoming: tokio::sync::Mutex::new(incoming_rx),
            writes: writes_tx,
            final_status: Arc::clone(&final_status),
        };
        let controller = MemoryCallController {
            context,
            start: Some(start_tx),
            incoming: incoming_tx,
            writes: writes_rx,
            final_status,
        };
        (call, controller)
    }
}

#[async_trait::async_trait]
impl BidiCall for MemoryCall {
    async fn start(&self) -> Result<(), Status> {
        let Some(pending) = self.start.lock().await.take() else {
            return Err(Status::failed_precondition("call already started"));
        };
        tokio::select! {
            () = self.context.cancelled() => Err(Status::cancelled("call cancelled")),
            result = pending => {
                result.unwrap_or_else(|_| Err(Status::cancelled("call dropped")))
            }
        }
    }

    async fn read(&self) -> Result<Bytes, Status> {
        let mut incoming = self.incoming.lock().await;
        tokio::select! {
            () = self.context.cancelled() => Err(Status::cancelled("call cancelled")),
            next = incoming.recv() => match next {
                Some(Ok(message)) => Ok(message),
                Some(Err(status)) => Err(status),
                None => Err(Status::unavailable("connection closed")),
            }
        }
    }

    async fn write(&self, message: Bytes) -> Result<(), Status> {
        let (done, acknowledged) = oneshot::channel();
        if self.writes.send(PendingWrite { message, done }).is_err() {
            return Err(Status::unavailable("connection closed"));
        }
        tokio::select! {
            () = self.context.cancelled() => Err(Status::cancelled("call cancelled")),
            result = acknowledged => {
                result.unwrap_or_else(|_| Err(Status::cancelled("write abandoned")))
            }
        }
    }

    async fn finish(&self) -> Status {
        self.final_status.lock().clone()
    }

    fn cancel(&self) {
        self.context.cancel();
    }

    fn response_headers(&self) -> HashMap<String, String> {
        self.context.response_headers()
    }
}

impl MemoryCallController {
    /// Completes the start handshake.
    ///
    /// Has no effect if the handshake was already completed.
    pub fn complete_start(&mut self, result: Result<(), Status>) {
        if let Some(start) = self.start.take() {
            let _ = start.send(result);
        }
    }

    /// Delivers one message to the call's read side.
    pub fn send_message(&self, message: Bytes) {
        let _ = self.incoming.send(Ok(message));
    }

    /// Ends the stream from the server side with the given terminal status.
    ///
    /// The pending read (if any) resolves with `status`, and the same status
    /// becomes the call's final status.
    pub fn finish_from_server(&self, status: Status) {
        *self.final_status.lock() = status.clone();
        let _ = self.incoming.send(Err(status));
    }

    /// Waits for the next write issued by the call.
    ///
    /// Returns `None` once the call has been dropped and no writes remain.
    pub async fn next_write(&mut self) -> Option<PendingWrite> {
        self.writes.recv().await
    }

    /// Returns the next write if one has already been issued.
    pub fn try_next_write(&mut self) -> Option<PendingWrite> {
        self.writes.try_recv().ok()
    }

    /// Records response metadata visible through the call.
    pub fn set_response_headers(&self, headers: HashMap<String, String>) {
        self.context.set_response_headers(headers);
    }

    /// Returns `true` once the call side has been preemptively cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.context.is_cancelled()
    }
}
