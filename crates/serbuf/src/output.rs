// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::io::Write;

use crate::{FlatView, Result};

/// Capability contract for writing serialized bytes into a buffer.
///
/// This is the entire surface a serializer is allowed to depend on. The buffer decides
/// how storage is pooled and grown; the serializer only ever sees a write stream or a
/// [`FlatView`].
///
/// # Two cursors, one storage
///
/// A buffer tracks its backing write cursor and, once a flat view has been
/// materialized, the view's cursor. Both observe the same underlying storage, so
/// [`size()`] merges them via `max()` - bytes pending in the view are counted, never
/// double-counted. [`complete()`] is the only operation that commits the view's cursor
/// back into the backing storage.
///
/// # Growth
///
/// Requesting a flat view with more capacity than remains triggers growth of the
/// backing buffer. Growth never loses previously written bytes and the returned view
/// resumes at the same logical write cursor. A buffer never silently truncates a
/// write: growth is the only remedy for exhausted capacity, and growth failure
/// surfaces as [`Error::AllocationFailed`][crate::Error::AllocationFailed].
///
/// # Ownership
///
/// The writer owns the buffer exclusively until [`complete()`] consumes it, at which
/// point ownership of the finished storage transfers to the downstream consumer.
/// Completion is exactly-once by construction.
///
/// [`size()`]: Self::size
/// [`complete()`]: Self::complete
pub trait OutputBuf: Debug {
    /// The finished storage produced by [`complete()`][Self::complete], for downstream
    /// consumption (e.g. a network send).
    type Finished;

    /// Returns a write stream over the buffer's capacity, growing it on demand.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`][crate::Error::ContractViolation] when
    /// called more than once on the same buffer.
    fn as_stream(&mut self) -> Result<impl Write + '_>;

    /// Returns a flat view with at least `min_writable` bytes of remaining capacity,
    /// or with whatever capacity is currently available when `min_writable` is `None`.
    ///
    /// If the current capacity is insufficient, the backing buffer grows first; the
    /// already-written prefix is preserved and the returned view is positioned at the
    /// same logical write cursor. This method may be called repeatedly - requesting a
    /// larger view mid-write is the growth path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`][crate::Error::AllocationFailed] if the pool
    /// cannot provide the requested capacity.
    fn as_flat_view(&mut self, min_writable: Option<usize>) -> Result<FlatView<'_>>;

    /// Returns the logical number of bytes written so far.
    ///
    /// Computed as the max of the backing cursor and the flat view's cursor, so it is
    /// accurate (if provisional) even mid-write, before [`complete()`][Self::complete]
    /// commits the view.
    fn size(&self) -> usize;

    /// Finalizes the buffer: commits the view's cursor into the backing storage,
    /// reports the total bytes written to the originating allocation handle, and
    /// returns the finished storage.
    ///
    /// Consumes the buffer, so completion happens exactly once.
    ///
    /// # Errors
    ///
    /// Implementations that must flush to an external resource may fail; the pooled
    /// implementation in this crate does not.
    fn complete(self) -> Result<Self::Finished>;
}
