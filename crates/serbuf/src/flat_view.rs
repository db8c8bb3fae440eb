// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Borrow;
use std::fmt::{self, Debug};

use num_traits::ToBytes;

/// A fixed-capacity, directly addressable write window over an output buffer.
///
/// A flat view exposes part of a buffer's spare capacity as one contiguous mutable
/// region. The view tracks its own write cursor, which lives inside the buffer that
/// produced the view - dropping the view and requesting a new one (for example, to
/// grow the buffer) resumes at the same logical position.
///
/// The fundamental write primitives are [`unfilled()`] + [`advance()`]; the `put_*`
/// convenience methods are layered on top of them.
///
/// Bytes written through a flat view are provisional until the owning buffer's
/// `complete()` call commits them into the backing storage. They are, however, always
/// reflected in the owning buffer's `size()`.
///
/// [`unfilled()`]: Self::unfilled
/// [`advance()`]: Self::advance
pub struct FlatView<'a> {
    bytes: &'a mut [u8],
    written: &'a mut usize,
}

impl<'a> FlatView<'a> {
    /// Creates a view over `bytes` with its write cursor stored in `written`.
    ///
    /// This is the API used by buffer implementations to materialize a view over
    /// their spare capacity. Unless you are implementing
    /// [`OutputBuf`][crate::OutputBuf], you will not need to call this.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is already past the end of `bytes`.
    #[must_use]
    pub fn new(bytes: &'a mut [u8], written: &'a mut usize) -> Self {
        assert!(*written <= bytes.len(), "write cursor is past the end of the view");

        Self { bytes, written }
    }

    /// Returns the total capacity of the view in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Returns the number of bytes written through this view so far.
    #[must_use]
    pub fn written(&self) -> usize {
        *self.written
    }

    /// Returns the capacity remaining after the write cursor.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - *self.written
    }

    /// Returns the unwritten region, for direct filling.
    ///
    /// Pair with [`advance()`][Self::advance] to declare how many bytes were written.
    #[must_use]
    pub fn unfilled(&mut self) -> &mut [u8] {
        &mut self.bytes[*self.written..]
    }

    /// Declares that `count` bytes at the start of [`unfilled()`][Self::unfilled] have
    /// been written, moving the write cursor forward.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the remaining capacity.
    pub fn advance(&mut self, count: usize) {
        assert!(count <= self.remaining(), "advanced past the end of the view");

        *self.written += count;
    }

    /// Writes a slice of bytes at the cursor.
    ///
    /// # Panics
    ///
    /// Panics if there is insufficient remaining capacity. Request a large enough view
    /// via `as_flat_view(min_writable)` before writing.
    pub fn put_slice(&mut self, src: impl Borrow<[u8]>) {
        let src = src.borrow();

        assert!(self.remaining() >= src.len(), "write exceeds the view's capacity");

        self.bytes[*self.written..*self.written + src.len()].copy_from_slice(src);
        *self.written += src.len();
    }

    /// Writes a single byte at the cursor.
    ///
    /// # Panics
    ///
    /// Panics if the view is full.
    pub fn put_byte(&mut self, value: u8) {
        self.put_num_ne(value);
    }

    /// Writes a number of type `T` in little-endian representation.
    ///
    /// # Panics
    ///
    /// Panics if there is insufficient remaining capacity.
    pub fn put_num_le<T: ToBytes>(&mut self, value: T) {
        let bytes = value.to_le_bytes();
        self.put_slice(bytes);
    }

    /// Writes a number of type `T` in big-endian representation.
    ///
    /// # Panics
    ///
    /// Panics if there is insufficient remaining capacity.
    pub fn put_num_be<T: ToBytes>(&mut self, value: T) {
        let bytes = value.to_be_bytes();
        self.put_slice(bytes);
    }

    /// Writes a number of type `T` in native-endian representation.
    ///
    /// # Panics
    ///
    /// Panics if there is insufficient remaining capacity.
    pub fn put_num_ne<T: ToBytes>(&mut self, value: T) {
        let bytes = value.to_ne_bytes();
        self.put_slice(bytes);
    }
}

impl Debug for FlatView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatView")
            .field("written", &self.written)
            .field("capacity", &self.bytes.len())
            .finish()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_persists_outside_the_view() {
        let mut storage = [0_u8; 16];
        let mut written = 0;

        {
            let mut view = FlatView::new(&mut storage, &mut written);
            view.put_slice(*b"abcd");
        }

        assert_eq!(written, 4);

        // A fresh view over the same storage resumes at the same logical position.
        let mut view = FlatView::new(&mut storage, &mut written);
        assert_eq!(view.written(), 4);
        view.put_slice(*b"ef");

        assert_eq!(written, 6);
        assert_eq!(&storage[..6], b"abcdef");
    }

    #[test]
    fn numeric_writes_use_requested_endianness() {
        let mut storage = [0_u8; 16];
        let mut written = 0;

        let mut view = FlatView::new(&mut storage, &mut written);
        view.put_num_le(0x1234_u16);
        view.put_num_be(0xCAFE_u16);
        view.put_byte(0xFF);

        assert_eq!(view.written(), 5);
        assert_eq!(&storage[..5], &[0x34, 0x12, 0xCA, 0xFE, 0xFF]);
    }

    #[test]
    fn unfilled_and_advance_are_equivalent_to_put() {
        let mut storage = [0_u8; 8];
        let mut written = 0;

        let mut view = FlatView::new(&mut storage, &mut written);
        view.unfilled()[..3].copy_from_slice(b"xyz");
        view.advance(3);

        assert_eq!(view.remaining(), 5);
        assert_eq!(&storage[..3], b"xyz");
    }

    #[test]
    #[should_panic]
    fn overfull_write_panics() {
        let mut storage = [0_u8; 2];
        let mut written = 0;

        let mut view = FlatView::new(&mut storage, &mut written);
        view.put_num_le(0x1234_5678_u32);
    }

    #[test]
    #[should_panic]
    fn stale_cursor_is_rejected() {
        let mut storage = [0_u8; 2];
        let mut written = 3;

        drop(FlatView::new(&mut storage, &mut written));
    }
}
