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

use bytes::Bytes;
use std::collections::VecDeque;

/// FIFO buffering of outgoing messages with at most one write in flight.
///
/// The writer never talks to the transport. Each method returns the message
/// the caller should issue now, if any; the caller reports completion back
/// via [`on_write_settled`](Self::on_write_settled). Messages enqueued before
/// [`start`](Self::start) are held until the stream opens.
///
/// The queue is unbounded; depth is bounded in practice by the caller's
/// produce rate against the transport's acknowledgment rate.
#[derive(Debug, Default)]
pub(crate) struct BufferedWriter {
    queue: VecDeque<Bytes>,
    started: bool,
    active: bool,
}

impl BufferedWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a message; returns it back if it should be issued immediately.
    pub(crate) fn enqueue(&mut self, message: Bytes) -> Option<Bytes> {
        self.queue.push_back(message);
        self.issue_next()
    }

    /// Marks the writer started (the stream has opened) and flushes the
    /// first buffered message, if any.
    pub(crate) fn start(&mut self) -> Option<Bytes> {
        self.started = true;
        self.issue_next()
    }

    /// The in-flight write completed; returns the next message to issue, or
    /// `None` if the writer is now idle.
    pub(crate) fn on_write_settled(&mut self) -> Option<Bytes> {
        self.active = false;
        self.issue_next()
    }

    /// Drops every queued-but-unissued message. The write already in flight,
    /// if any, is left to complete normally.
    pub(crate) fn discard_unissued(&mut self) {
        self.queue.clear();
    }

    fn issue_next(&mut self) -> Option<Bytes> {
        if !self.started || self.active {
            return None;
        }
        let message = self.queue.pop_front()?;
        self.active = true;
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(text: &'static str) -> Bytes {
        Bytes::from_static(text.as_bytes())
    }

    #[test]
    fn test_holds_messages_until_started() {
        let mut writer = BufferedWriter::new();
        assert_eq!(writer.enqueue(bytes("a")), None);
        assert_eq!(writer.enqueue(bytes("b")), None);
        assert_eq!(writer.start(), Some(bytes("a")));
    }

    #[test]
    fn test_start_with_empty_queue_is_a_noop() {
        let mut writer = BufferedWriter::new();
        assert_eq!(writer.start(), None);
        // First enqueue after an idle start goes out immediately.
        assert_eq!(writer.enqueue(bytes("a")), Some(bytes("a")));
    }

    #[test]
    fn test_single_write_in_flight() {
        let mut writer = BufferedWriter::new();
        writer.start();
        assert_eq!(writer.enqueue(bytes("a")), Some(bytes("a")));
        // "a" has not settled yet; "b" and "c" must wait.
        assert_eq!(writer.enqueue(bytes("b")), None);
        assert_eq!(writer.enqueue(bytes("c")), None);

        assert_eq!(writer.on_write_settled(), Some(bytes("b")));
        assert_eq!(writer.on_write_settled(), Some(bytes("c")));
        assert_eq!(writer.on_write_settled(), None);
    }

    #[test]
    fn test_fifo_order_preserved() {
        let mut writer = BufferedWriter::new();
        for name in ["a", "b", "c", "d"] {
            writer.enqueue(bytes(name));
        }
        let mut issued = Vec::new();
        let mut next = writer.start();
        while let Some(message) = next {
            issued.push(message);
            next = writer.on_write_settled();
        }
        assert_eq!(issued, vec![bytes("a"), bytes("b"), bytes("c"), bytes("d")]);
    }

    #[test]
    fn test_discard_keeps_in_flight_write() {
        let mut writer = BufferedWriter::new();
        writer.start();
        assert_eq!(writer.enqueue(bytes("a")), Some(bytes("a")));
        writer.enqueue(bytes("b"));
        writer.enqueue(bytes("c"));

        writer.discard_unissued();
        // "a" is still in flight; settling it finds nothing left to send.
        assert_eq!(writer.on_write_settled(), None);
    }

    #[test]
    fn test_enqueue_after_discard_still_works() {
        let mut writer = BufferedWriter::new();
        writer.start();
        writer.discard_unissued();
        assert_eq!(writer.enqueue(bytes("z")), Some(bytes("z")));
    }
}
