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

//! The bidirectional stream state machine and its collaborators.
//!
//! [`BidiStream`] is the central type: it owns the transport call, drives
//! reads and writes through per-operation tasks, and forwards validated
//! events to a [`StreamObserver`]. The supporting pieces live alongside it:
//!
//! - [`StreamState`]: the linear, forward-only lifecycle.
//! - `BufferedWriter`: FIFO buffering with at most one write in flight.
//! - `StreamOperation`: one in-flight unit of asynchronous transport work.
//!
//! # Generations
//!
//! Observers own a generation counter. The stream snapshots it once, at
//! construction, and compares before every notification and before issuing
//! each new read. Bumping the generation is how an observer walks away from a
//! stream without tearing it down: in-flight writes still complete, but the
//! stream goes quiet and stops listening.

#[allow(clippy::module_inception)]
mod stream;

mod observer;
mod operation;
mod state;
mod writer;

pub use observer::StreamObserver;
pub use state::StreamState;
pub use stream::BidiStream;

pub(crate) use operation::{OperationKind, StreamOperation};
pub(crate) use stream::StreamCore;
pub(crate) use writer::BufferedWriter;
