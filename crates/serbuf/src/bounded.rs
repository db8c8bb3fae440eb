// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::{Arc, Mutex};

use crate::{Error, Pool, Result, Segment};

const ERR_POISONED_LOCK: &str = "encountered poisoned lock";

/// A memory pool with a hard byte budget, for exercising allocation failure paths.
///
/// The pool tracks how many bytes are outstanding and refuses any allocation or
/// growth that would exceed the budget, returning
/// [`Error::AllocationFailed`]. Released segments refund their
/// capacity to the budget, so pool-return-on-drop behavior becomes observable in
/// tests: if a buffer leaks its segment, the budget stays debited.
///
/// Only available in test code or with the `test-util` feature enabled.
#[derive(Clone, Debug)]
pub struct BoundedPool {
    remaining: Arc<Mutex<usize>>,
}

impl BoundedPool {
    /// Creates a pool that will hand out at most `budget` bytes at a time.
    #[must_use]
    pub fn new(budget: usize) -> Self {
        Self {
            remaining: Arc::new(Mutex::new(budget)),
        }
    }

    /// Returns how many bytes of the budget are currently available.
    #[must_use]
    pub fn remaining(&self) -> usize {
        *self.remaining.lock().expect(ERR_POISONED_LOCK)
    }

    fn debit(&self, amount: usize, min_len: usize) -> Result<()> {
        let mut remaining = self.remaining.lock().expect(ERR_POISONED_LOCK);

        if *remaining < amount {
            return Err(Error::AllocationFailed {
                min_len,
                reason: format!("budget exhausted, {remaining} bytes remain"),
            });
        }

        *remaining -= amount;

        Ok(())
    }
}

impl Pool for BoundedPool {
    fn allocate(&self, min_len: usize) -> Result<Segment> {
        self.debit(min_len, min_len)?;

        Ok(Segment::from_storage(vec![0; min_len].into_boxed_slice()))
    }

    fn grow(&self, segment: &mut Segment, min_capacity: usize) -> Result<()> {
        if segment.capacity() >= min_capacity {
            return Ok(());
        }

        // Only the additional bytes count against the budget. On failure the segment
        // is left exactly as it was.
        self.debit(min_capacity - segment.capacity(), min_capacity)?;

        _ = segment.grow_into(vec![0; min_capacity].into_boxed_slice());

        Ok(())
    }

    fn release(&self, segment: Segment) -> bool {
        let storage = segment.into_storage();

        *self.remaining.lock().expect(ERR_POISONED_LOCK) += storage.len();

        true
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::{AllocSite, OutputBuf};

    assert_impl_all!(BoundedPool: Send, Sync);

    #[test]
    fn exhausted_budget_fails_allocation() {
        let pool = BoundedPool::new(100);

        let segment = pool.allocate(60).expect("within budget");

        let error = pool.allocate(60).expect_err("only 40 bytes remain");
        assert!(matches!(error, Error::AllocationFailed { min_len: 60, .. }));

        assert!(pool.release(segment));
        assert_eq!(pool.remaining(), 100);

        drop(pool.allocate(60).expect("refunded budget covers this"));
    }

    #[test]
    fn failed_growth_leaves_the_segment_unchanged() {
        let pool = BoundedPool::new(100);

        let mut segment = pool.allocate(50).expect("within budget");
        segment.unfilled_slice()[..3].copy_from_slice(b"abc");
        segment.advance(3);

        let error = pool.grow(&mut segment, 200).expect_err("150 more bytes needed");
        assert!(matches!(error, Error::AllocationFailed { min_len: 200, .. }));

        assert_eq!(segment.capacity(), 50);
        assert_eq!(segment.as_slice(), b"abc");

        pool.grow(&mut segment, 90).expect("40 more bytes fit the budget");
        assert_eq!(segment.capacity(), 90);
        assert_eq!(pool.remaining(), 10);
    }

    #[test]
    fn mid_write_growth_failure_surfaces_through_the_buffer() {
        let pool = BoundedPool::new(600);
        let mut site = AllocSite::new(pool.clone());

        let mut buf = site.output_buf().expect("initial prediction fits the budget");

        let error = buf
            .as_flat_view(Some(4096))
            .map(|_| ())
            .expect_err("growth exceeds the budget");
        assert!(matches!(error, Error::AllocationFailed { .. }));

        // The buffer is still usable within its existing capacity.
        let mut view = buf.as_flat_view(Some(16)).expect("existing capacity suffices");
        view.put_num_le(7_u64);
        drop(view);

        drop(buf.complete().expect("pooled completion cannot fail"));
    }

    #[test]
    fn dropped_output_buf_refunds_the_budget() {
        let pool = BoundedPool::new(600);
        let mut site = AllocSite::new(pool.clone());

        let buf = site.output_buf().expect("initial prediction fits the budget");
        assert!(pool.remaining() < 600);

        drop(buf);
        assert_eq!(pool.remaining(), 600);
    }
}
