// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::io::Read;

use crate::Result;

/// Capability contract for reading serialized bytes out of a finished buffer.
///
/// This is the entire surface a deserializer is allowed to depend on - implementations
/// may be pooled, network-backed or file-backed, and the deserializer must not reach
/// into their internals.
///
/// # Single-use accessors
///
/// [`as_stream()`] and [`as_flat_view()`] each expose the readable bytes exactly once.
/// A second call on the same buffer is a contract violation and returns
/// [`Error::ContractViolation`][crate::Error::ContractViolation] - never stale or
/// duplicate data. [`size()`] is pure and may be called any number of times.
///
/// # Ownership
///
/// Ownership of a buffer transfers to the reader when the writer completes it. The
/// reader is responsible for eventually calling [`release()`] exactly once to return
/// the underlying storage to its pool; a second call is a safe no-op.
///
/// [`as_stream()`]: Self::as_stream
/// [`as_flat_view()`]: Self::as_flat_view
/// [`size()`]: Self::size
/// [`release()`]: Self::release
pub trait InputBuf: Debug {
    /// Returns a byte-stream view over the readable bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`][crate::Error::ContractViolation] when
    /// called more than once on the same buffer.
    fn as_stream(&mut self) -> Result<impl Read + '_>;

    /// Returns a flat, directly addressable view over the readable bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`][crate::Error::ContractViolation] when
    /// called more than once on the same buffer.
    fn as_flat_view(&mut self) -> Result<&[u8]>;

    /// Returns the number of readable bytes.
    ///
    /// Pure and idempotent; unaffected by the single-use accessors.
    fn size(&self) -> usize;

    /// Returns the underlying storage to its pool.
    ///
    /// Returns whether this call actually freed the resource; pools with
    /// reference-counted backings may return `false` while other references remain.
    /// Calling `release()` again after the resource is freed is a safe no-op that
    /// returns `false`.
    fn release(&mut self) -> bool;
}
