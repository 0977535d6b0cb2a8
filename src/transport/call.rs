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

use crate::status::Status;
use bytes::Bytes;
use std::collections::HashMap;

/// Capability set of an underlying bidirectional RPC call.
///
/// A `BidiCall` is the handle a [`BidiStream`](crate::BidiStream) drives: one
/// established (or establishing) call on which raw byte-buffer messages can
/// be exchanged in both directions. Implementations wrap a concrete
/// transport; this crate ships [`MemoryCall`](crate::MemoryCall) for
/// in-process use.
///
/// All methods that return futures complete asynchronously; the stream layer
/// runs each of them inside a dedicated operation task and serializes the
/// resulting completion handling on its [`DispatchQueue`](crate::DispatchQueue).
///
/// # Cancellation
///
/// [`cancel`](Self::cancel) is the only preemptive primitive: it must cause
/// every pending and future method call to resolve promptly, typically with a
/// [`Code::Cancelled`](crate::Code::Cancelled) status. The stream invokes it
/// exactly once, while draining operations during teardown. Everything else
/// about cancellation in this crate is cooperative and happens above this
/// trait.
#[async_trait::async_trait]
pub trait BidiCall: Send + Sync + 'static {
    /// Establishes the call.
    ///
    /// Resolves once the call is ready for reads and writes, or with the
    /// status of the failure.
    async fn start(&self) -> Result<(), Status>;

    /// Receives the next message from the server.
    ///
    /// An `Err` carries the terminal status the call ended with: the server
    /// closed the stream, or the read failed and no further messages will
    /// arrive. At most one `read` is pending at any time.
    async fn read(&self) -> Result<Bytes, Status>;

    /// Sends one message to the server.
    ///
    /// Resolves once the message is accepted for transmission (not once it is
    /// delivered). At most one `write` is pending at any time.
    async fn write(&self, message: Bytes) -> Result<(), Status>;

    /// Performs the client-initiated finish handshake.
    ///
    /// Called after all pending operations have been drained; yields the
    /// final status of the call.
    async fn finish(&self) -> Status;

    /// Preemptively cancels the call.
    ///
    /// Pending `start`/`read`/`write`/`finish` futures must resolve promptly
    /// after this returns.
    fn cancel(&self);

    /// The response metadata received from the server so far.
    ///
    /// Empty until the call has been established.
    fn response_headers(&self) -> HashMap<String, String>;
}
