// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug};

use crate::Result;

/// Provides pooled memory capacity for output buffers.
///
/// This is the entire interface the buffer layer consumes from the underlying memory
/// pool: allocate a segment of at least some size, grow a segment in place while
/// preserving its contents, and take a segment back when the consumer is done with it.
///
/// Pool handles are expected to be cheap to clone (shared handles over common
/// capacity), so buffer adapters can carry their own reference to the pool.
///
/// # Thread safety
///
/// Implementations must be safe to share across threads - a segment allocated on one
/// thread may be released on another.
pub trait Pool: Debug {
    /// Allocates a segment with at least `min_len` bytes of capacity.
    ///
    /// The pool may provide more capacity than requested.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`][crate::Error::AllocationFailed] if the pool
    /// cannot satisfy the request. The request is never partially satisfied.
    fn allocate(&self, min_len: usize) -> Result<Segment>;

    /// Grows `segment` to at least `min_capacity` bytes of capacity.
    ///
    /// All bytes stored in the segment before the call remain at their offsets
    /// afterwards, including bytes beyond the committed write cursor - a flat view may
    /// have written past it. The write cursor itself is unchanged.
    ///
    /// A segment that already satisfies `min_capacity` is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`][crate::Error::AllocationFailed] if the pool
    /// cannot provide the capacity. The segment is left unchanged in that case.
    fn grow(&self, segment: &mut Segment, min_capacity: usize) -> Result<()>;

    /// Takes a segment back into the pool.
    ///
    /// Returns whether this call actually freed the underlying resource. Pools backed
    /// by reference-counted storage may return `false` while other references remain.
    fn release(&self, segment: Segment) -> bool;
}

impl<P: Pool + ?Sized> Pool for &P {
    #[inline]
    fn allocate(&self, min_len: usize) -> Result<Segment> {
        (*self).allocate(min_len)
    }

    #[inline]
    fn grow(&self, segment: &mut Segment, min_capacity: usize) -> Result<()> {
        (*self).grow(segment, min_capacity)
    }

    #[inline]
    fn release(&self, segment: Segment) -> bool {
        (*self).release(segment)
    }
}

/// One contiguous backing buffer handed out by a [`Pool`].
///
/// A segment owns its storage exclusively and tracks a single write cursor: bytes
/// before the cursor are filled, bytes at and beyond it are spare capacity. The
/// fundamental write primitives are [`unfilled_slice()`] + [`advance()`]; buffer
/// adapters layer their own bookkeeping (such as a flat view cursor) on top.
///
/// Segments are constructed by pool implementations via [`from_storage()`] and
/// reclaimed via [`into_storage()`]. Unless you are implementing a pool, you will not
/// need either - segments reach you through [`Pool::allocate()`].
///
/// [`unfilled_slice()`]: Self::unfilled_slice
/// [`advance()`]: Self::advance
/// [`from_storage()`]: Self::from_storage
/// [`into_storage()`]: Self::into_storage
pub struct Segment {
    storage: Box<[u8]>,
    filled: usize,
}

impl Segment {
    /// Creates a segment over the provided storage, with an empty write cursor.
    ///
    /// This is the API used by pool implementations to issue capacity to callers.
    #[must_use]
    pub fn from_storage(storage: Box<[u8]>) -> Self {
        Self { storage, filled: 0 }
    }

    /// Consumes the segment, returning its storage for the pool to reclaim.
    #[must_use]
    pub fn into_storage(self) -> Box<[u8]> {
        self.storage
    }

    /// Returns the total capacity of the segment in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Returns the number of filled bytes (the write cursor position).
    #[must_use]
    pub fn len(&self) -> usize {
        self.filled
    }

    /// Returns whether no bytes have been filled yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Returns the unfilled capacity remaining after the write cursor.
    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.storage.len() - self.filled
    }

    /// Returns the filled bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[..self.filled]
    }

    /// Returns the spare capacity after the write cursor, for direct filling.
    ///
    /// Pair with [`advance()`][Self::advance] to declare how many bytes were written.
    #[must_use]
    pub fn unfilled_slice(&mut self) -> &mut [u8] {
        &mut self.storage[self.filled..]
    }

    /// Declares that `count` bytes at the start of [`unfilled_slice()`][Self::unfilled_slice]
    /// have been written, moving the write cursor forward.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the remaining capacity.
    pub fn advance(&mut self, count: usize) {
        assert!(
            count <= self.remaining_capacity(),
            "advanced past the end of the segment"
        );

        self.filled += count;
    }

    /// Moves the write cursor to an absolute position.
    ///
    /// This is how a buffer adapter commits bytes that were produced through a side
    /// channel (a flat view) directly into the storage beyond the current cursor.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the capacity.
    pub fn commit(&mut self, len: usize) {
        assert!(len <= self.capacity(), "committed past the end of the segment");

        self.filled = len;
    }

    /// Replaces the segment's storage with larger storage, preserving all existing
    /// bytes at their offsets, and returns the old storage for the pool to reclaim.
    ///
    /// The write cursor is unchanged. This is the content-preservation half of
    /// [`Pool::grow()`]; pool implementations supply the replacement storage.
    ///
    /// # Panics
    ///
    /// Panics if the new storage is smaller than the current storage.
    #[must_use]
    pub fn grow_into(&mut self, mut new_storage: Box<[u8]>) -> Box<[u8]> {
        assert!(
            new_storage.len() >= self.storage.len(),
            "replacement storage must not shrink the segment"
        );

        new_storage[..self.storage.len()].copy_from_slice(&self.storage);

        std::mem::replace(&mut self.storage, new_storage)
    }

    pub(crate) fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.storage
    }
}

impl Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("filled", &self.filled)
            .field("capacity", &self.storage.len())
            .finish()
    }
}
