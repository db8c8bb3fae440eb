// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Any error that may arise from buffer allocation or from violating the usage
/// contract of the buffer capability traits.
///
/// # Thread safety
///
/// This type is thread-safe.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An API contract was violated, e.g. a single-use accessor was called a second
    /// time on the same buffer.
    ///
    /// This is fatal to the operation - the buffer never silently returns stale or
    /// duplicate data in response to a contract violation.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// The memory pool could not satisfy an allocation or growth request.
    ///
    /// The request is not retried internally - retry policy belongs to the caller,
    /// as this layer has no notion of backpressure or delay.
    #[error("allocation of at least {min_len} bytes failed: {reason}")]
    AllocationFailed {
        /// The minimum number of bytes that was requested.
        min_len: usize,

        /// Pool-specific description of why the request could not be satisfied.
        reason: String,
    },
}

/// A specialized `Result` for use with buffer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a buffer layer error as a standard I/O error.
/// This is used by the stream adapters, which speak `std::io` to their callers.
impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        Self::other(value)
    }
}
