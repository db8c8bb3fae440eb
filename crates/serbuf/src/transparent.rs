// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{Pool, Result, Segment};

/// A memory pool that performs no pooling whatsoever.
///
/// Every allocation goes straight to the Rust global allocator for exactly the
/// requested size, and released segments are simply dropped. This gives tests fully
/// deterministic capacities (a segment is never larger than asked for, so capacity
/// assertions are exact) at the cost of pooling efficiency.
///
/// Only available in test code or with the `test-util` feature enabled.
#[derive(Clone, Debug, Default)]
pub struct TransparentPool {
    _placeholder: (),
}

impl TransparentPool {
    /// Creates a new instance of the pool.
    #[must_use]
    pub const fn new() -> Self {
        Self { _placeholder: () }
    }
}

impl Pool for TransparentPool {
    fn allocate(&self, min_len: usize) -> Result<Segment> {
        Ok(Segment::from_storage(vec![0; min_len].into_boxed_slice()))
    }

    fn grow(&self, segment: &mut Segment, min_capacity: usize) -> Result<()> {
        if segment.capacity() >= min_capacity {
            return Ok(());
        }

        // Exact sizing here too; the old storage has nowhere to go but the allocator.
        _ = segment.grow_into(vec![0; min_capacity].into_boxed_slice());

        Ok(())
    }

    fn release(&self, segment: Segment) -> bool {
        drop(segment);

        true
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(TransparentPool: Send, Sync);

    #[test]
    fn allocates_exactly_the_requested_capacity() {
        let pool = TransparentPool::new();

        let segment = pool.allocate(123).expect("transparent pool never fails");

        assert_eq!(segment.capacity(), 123);
        assert!(segment.is_empty());
    }

    #[test]
    fn growth_is_exact_and_preserves_contents() {
        let pool = TransparentPool::new();

        let mut segment = pool.allocate(8).expect("transparent pool never fails");
        segment.unfilled_slice().copy_from_slice(b"exemplar");
        segment.advance(8);

        pool.grow(&mut segment, 24).expect("transparent pool never fails");

        assert_eq!(segment.capacity(), 24);
        assert_eq!(segment.as_slice(), b"exemplar");

        // Already large enough: untouched.
        pool.grow(&mut segment, 10).expect("transparent pool never fails");
        assert_eq!(segment.capacity(), 24);
    }

    #[test]
    fn release_always_frees() {
        let pool = TransparentPool::new();

        let segment = pool.allocate(16).expect("transparent pool never fails");

        assert!(pool.release(segment));
    }
}
