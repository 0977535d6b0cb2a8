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

//! RPC status codes and the terminal status type surfaced to observers.
//!
//! Every failure this crate reports is a [`Status`]: a canonical RPC status
//! code plus a human-readable message. Statuses flow from the transport call
//! into [`StreamObserver::on_stream_error`](crate::StreamObserver::on_stream_error);
//! this layer never retries or reinterprets them.

use std::fmt;
use thiserror::Error;

/// Canonical RPC status codes.
///
/// These mirror the standard status code set used by gRPC-style transports.
/// Values received off the wire that fall outside the known set are
/// normalized to [`Code::Unknown`] by [`Code::from_i32`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Code {
    /// Not an error.
    Ok = 0,
    /// The operation was cancelled, typically by the caller.
    Cancelled = 1,
    /// Unknown error, or an error from an unrecognized error space.
    Unknown = 2,
    /// The client specified an invalid argument.
    InvalidArgument = 3,
    /// The deadline expired before the operation could complete.
    DeadlineExceeded = 4,
    /// A requested entity was not found.
    NotFound = 5,
    /// The entity the client attempted to create already exists.
    AlreadyExists = 6,
    /// The caller does not have permission to execute the operation.
    PermissionDenied = 7,
    /// A resource (quota, disk space) has been exhausted.
    ResourceExhausted = 8,
    /// The system is not in a state required for the operation.
    FailedPrecondition = 9,
    /// The operation was aborted, typically due to a concurrency conflict.
    Aborted = 10,
    /// The operation was attempted past the valid range.
    OutOfRange = 11,
    /// The operation is not implemented or supported.
    Unimplemented = 12,
    /// An internal invariant expected by the underlying system was broken.
    Internal = 13,
    /// The service is currently unavailable; usually transient.
    Unavailable = 14,
    /// Unrecoverable data loss or corruption.
    DataLoss = 15,
    /// The request does not have valid authentication credentials.
    Unauthenticated = 16,
}

impl Code {
    /// Converts a wire-level integer into a status code.
    ///
    /// Values outside the canonical range map to [`Code::Unknown`] rather
    /// than being rejected; a terminal status must always be representable.
    #[must_use]
    pub const fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Ok,
            1 => Self::Cancelled,
            2 => Self::Unknown,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            16 => Self::Unauthenticated,
            _ => Self::Unknown,
        }
    }

    /// Returns the wire-level integer value of this code.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Aborted => "ABORTED",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::DataLoss => "DATA_LOSS",
            Self::Unauthenticated => "UNAUTHENTICATED",
        };
        f.write_str(name)
    }
}

/// The terminal status of a call or operation.
///
/// A status pairs a [`Code`] with a descriptive message. A status with
/// [`Code::Ok`] means success; anything else is terminal for the stream that
/// reports it.
///
/// # Example
///
/// ```rust
/// use bistream::{Code, Status};
///
/// let status = Status::new(Code::Unavailable, "connection reset");
/// assert!(!status.is_ok());
/// assert_eq!(status.code(), Code::Unavailable);
/// assert_eq!(status.to_string(), "UNAVAILABLE: connection reset");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct Status {
    code: Code,
    message: String,
}

impl Status {
    /// Creates a status from a code and message.
    #[must_use]
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The success status.
    #[must_use]
    pub fn ok() -> Self {
        Self::new(Code::Ok, "")
    }

    /// A [`Code::Cancelled`] status with the given message.
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(Code::Cancelled, message)
    }

    /// A [`Code::Unknown`] status with the given message.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(Code::Unknown, message)
    }

    /// A [`Code::Unavailable`] status with the given message.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }

    /// A [`Code::FailedPrecondition`] status with the given message.
    #[must_use]
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(Code::FailedPrecondition, message)
    }

    /// Returns the status code.
    #[must_use]
    pub const fn code(&self) -> Code {
        self.code
    }

    /// Returns the status message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if the code is [`Code::Ok`].
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.code, Code::Ok)
    }

    /// Returns this status if it already carries an error code, or an
    /// [`Code::Unknown`] failure otherwise.
    ///
    /// Used when an operation reports failure: the notification surfaced to
    /// the observer must never claim success.
    #[must_use]
    pub fn into_failure(self) -> Self {
        if self.is_ok() {
            Self::unknown("operation failed without a status")
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for value in 0..=16 {
            let code = Code::from_i32(value);
            assert_eq!(code.as_i32(), value);
        }
    }

    #[test]
    fn test_code_out_of_range_is_unknown() {
        assert_eq!(Code::from_i32(-1), Code::Unknown);
        assert_eq!(Code::from_i32(17), Code::Unknown);
        assert_eq!(Code::from_i32(i32::MAX), Code::Unknown);
    }

    #[test]
    fn test_status_display() {
        let status = Status::new(Code::Unavailable, "connection reset");
        assert_eq!(status.to_string(), "UNAVAILABLE: connection reset");
    }

    #[test]
    fn test_status_is_ok() {
        assert!(Status::ok().is_ok());
        assert!(!Status::cancelled("stop").is_ok());
    }

    #[test]
    fn test_into_failure_preserves_errors() {
        let status = Status::unavailable("gone");
        assert_eq!(status.clone().into_failure(), status);
    }

    #[test]
    fn test_into_failure_rejects_ok() {
        let failure = Status::ok().into_failure();
        assert_eq!(failure.code(), Code::Unknown);
    }

    #[test]
    fn test_status_is_error() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&Status::unknown("boom"));
    }
}
