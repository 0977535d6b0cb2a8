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
use crate::stream::StreamCore;
use bytes::Bytes;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::trace;

/// The transport action an operation performs.
#[derive(Debug)]
pub(crate) enum OperationKind {
    Start,
    Read,
    Write(Bytes),
}

impl OperationKind {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Read => "read",
            Self::Write(_) => "write",
        }
    }
}

/// What an operation's transport future resolved to.
enum Outcome {
    Started,
    Read(Bytes),
    Wrote,
    Failed(Status),
    FinishedByServer(Status),
}

/// One in-flight unit of asynchronous transport work.
///
/// An operation is created and immediately submitted: its task performs a
/// single transport future and then reports the outcome to the owning stream
/// as a job on the stream's dispatch queue. The job removes the operation
/// from the owning table before dispatching to a handler; if the teardown
/// drain already removed it, the outcome is discarded; bookkeeping was the
/// operation's only remaining obligation.
///
/// The task holds its own clone of the call handle for exactly as long as it
/// runs, so the call cannot be released while any operation still uses it.
#[derive(Debug)]
pub(crate) struct StreamOperation {
    kind: &'static str,
    generation: u64,
    handle: JoinHandle<()>,
}

impl StreamOperation {
    /// Spawns the operation's task and returns the owning handle for the
    /// stream's operation table.
    pub(crate) fn execute(id: u64, kind: OperationKind, core: &Arc<StreamCore>) -> Self {
        let name = kind.name();
        let generation = core.generation;
        let call = Arc::clone(&core.call);
        let queue = core.queue.clone();
        let owner = Arc::downgrade(core);

        let handle = tokio::spawn(async move {
            let outcome = match kind {
                OperationKind::Start => match call.start().await {
                    Ok(()) => Outcome::Started,
                    Err(status) => Outcome::Failed(status),
                },
                OperationKind::Read => match call.read().await {
                    Ok(message) => Outcome::Read(message),
                    Err(status) => Outcome::FinishedByServer(status),
                },
                OperationKind::Write(message) => match call.write(message).await {
                    Ok(()) => Outcome::Wrote,
                    Err(status) => Outcome::Failed(status),
                },
            };
            queue.enqueue(async move {
                let Some(core) = owner.upgrade() else { return };
                if core.remove_operation(id).is_none() {
                    // Already drained by the teardown path.
                    return;
                }
                match outcome {
                    Outcome::Started => StreamCore::on_start(&core),
                    Outcome::Read(message) => StreamCore::on_read(&core, message),
                    Outcome::Wrote => StreamCore::on_write(&core).await,
                    Outcome::Failed(status) => {
                        StreamCore::on_operation_failed(&core, status).await;
                    }
                    Outcome::FinishedByServer(status) => {
                        StreamCore::on_finished_by_server(&core, status).await;
                    }
                }
            });
        });

        Self {
            kind: name,
            generation,
            handle,
        }
    }

    /// Waits for the operation's task to release the call handle.
    ///
    /// Called only from the teardown drain, after the transport has been
    /// asked to cancel.
    pub(crate) async fn wait_until_complete(self) {
        trace!(
            operation = self.kind,
            generation = self.generation,
            "draining operation"
        );
        let _ = self.handle.await;
    }
}
