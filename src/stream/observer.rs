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

/// Recipient of high-level stream events.
///
/// A [`BidiStream`](crate::BidiStream) holds its observer non-owningly and
/// notifies it about three things: the stream opened, a message arrived, the
/// stream broke. There is no notification for a finish the caller initiated
/// itself, and none for completed writes.
///
/// # Generations
///
/// The observer owns a monotonically non-decreasing generation counter. The
/// stream captures its value once, at construction; once the observer
/// advances the counter past that snapshot, the stream suppresses all further
/// notifications and stops issuing reads. Writes already handed to the
/// transport still complete. Advancing the generation is the cooperative way
/// to abandon a stream whose teardown will happen elsewhere: nothing is
/// interrupted, the stream just goes quiet.
///
/// Callbacks are invoked on the stream's dispatch queue, never concurrently
/// with one another. Implementations must not block.
pub trait StreamObserver: Send + Sync {
    /// The stream has been successfully established.
    fn on_stream_start(&self);

    /// A message has been received from the server.
    fn on_stream_read(&self, message: Bytes);

    /// The stream has been broken, by the server or by a failed operation.
    /// All errors are terminal for the stream instance.
    fn on_stream_error(&self, status: Status);

    /// Current value of this observer's generation counter.
    fn generation(&self) -> u64;
}
