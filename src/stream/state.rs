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

use std::fmt;

/// Lifecycle state of a bidirectional stream.
///
/// States are linearly ordered and transitions are forward-only: a stream can
/// skip intermediate states (for example `Starting` directly to `Finishing`),
/// but it never moves backward. The derived ordering makes that checkable by
/// plain comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StreamState {
    /// Created but [`start`](crate::BidiStream::start) has not been called.
    NotStarted,
    /// Start has been issued; the call is being established.
    Starting,
    /// The call is established; reads and writes flow.
    Open,
    /// Teardown has begun; operations are being drained.
    Finishing,
    /// Terminal. The stream is disposable and cannot be restarted.
    Finished,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not-started",
            Self::Starting => "starting",
            Self::Open => "open",
            Self::Finishing => "finishing",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_are_linearly_ordered() {
        assert!(StreamState::NotStarted < StreamState::Starting);
        assert!(StreamState::Starting < StreamState::Open);
        assert!(StreamState::Open < StreamState::Finishing);
        assert!(StreamState::Finishing < StreamState::Finished);
    }

    #[test]
    fn test_display() {
        assert_eq!(StreamState::Open.to_string(), "open");
        assert_eq!(StreamState::Finished.to_string(), "finished");
    }
}
