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

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Call-scoped state shared between a transport call and its operations.
///
/// A `ConnectionContext` owns the resources every method of a call may touch:
/// the cancellation flag and the response metadata. Call implementations hold
/// it behind an `Arc`, so the context is released only after the last
/// operation referencing the call has completed; the stream's teardown drain
/// makes that release prompt rather than merely eventual.
#[derive(Debug, Default)]
pub struct ConnectionContext {
    cancelled: AtomicBool,
    cancel_notify: Notify,
    response_headers: Mutex<HashMap<String, String>>,
}

impl ConnectionContext {
    /// Creates a fresh, uncancelled context with no response metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the call cancelled and wakes everything waiting on
    /// [`cancelled`](Self::cancelled).
    ///
    /// Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.cancel_notify.notify_waiters();
    }

    /// Returns `true` once the call has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once the call is cancelled; immediately if it already was.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            let notified = self.cancel_notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Records the response metadata received from the server.
    pub fn set_response_headers(&self, headers: HashMap<String, String>) {
        *self.response_headers.lock() = headers;
    }

    /// Returns a copy of the response metadata received so far.
    #[must_use]
    pub fn response_headers(&self) -> HashMap<String, String> {
        self.response_headers.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_is_observable() {
        let context = ConnectionContext::new();
        assert!(!context.is_cancelled());
        context.cancel();
        assert!(context.is_cancelled());
        // Resolves immediately once cancelled.
        context.cancelled().await;
    }

    #[tokio::test]
    async fn test_cancel_wakes_waiters() {
        let context = Arc::new(ConnectionContext::new());
        let waiter = {
            let context = Arc::clone(&context);
            tokio::spawn(async move { context.cancelled().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        context.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake after cancel")
            .unwrap();
    }

    #[test]
    fn test_response_headers_round_trip() {
        let context = ConnectionContext::new();
        assert!(context.response_headers().is_empty());

        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/grpc".to_string());
        context.set_response_headers(headers.clone());
        assert_eq!(context.response_headers(), headers);
    }
}
