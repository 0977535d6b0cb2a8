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

//! Transport abstraction for bidirectional streaming calls.
//!
//! The stream layer never talks to a network itself; it drives a
//! [`BidiCall`], the capability set every concrete transport must provide.
//! This module also carries [`ConnectionContext`], the owner of call-scoped
//! resources, and [`MemoryCall`], a deterministic in-process call used for
//! testing and examples.

mod call;
mod context;
mod memory;

pub use call::BidiCall;
pub use context::ConnectionContext;
pub use memory::{MemoryCall, MemoryCallController, PendingWrite};
