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

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! ## Architecture
//!
//! The crate is organized into three layers:
//!
//! - **[`transport`]**: the [`BidiCall`] capability set a concrete RPC stack
//!   implements, plus [`MemoryCall`] for in-process use.
//! - **[`queue`]**: the [`DispatchQueue`] that serializes all completion
//!   handling for a stream.
//! - **[`stream`]**: the [`BidiStream`] state machine, its
//!   [`StreamObserver`] capability set, and the buffering and operation
//!   bookkeeping behind them.
//!
//! Failures surface as [`Status`] values through
//! [`StreamObserver::on_stream_error`]; nothing in this layer retries.

pub mod queue;
pub mod status;
pub mod stream;
pub mod transport;

pub use queue::DispatchQueue;
pub use status::{Code, Status};
pub use stream::{BidiStream, StreamObserver, StreamState};
pub use transport::{BidiCall, ConnectionContext, MemoryCall, MemoryCallController, PendingWrite};
