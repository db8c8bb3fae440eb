// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::{Arc, Mutex};

use nm::{Event, Magnitude};

use crate::{Pool, Result, Segment};

const ERR_POISONED_LOCK: &str = "encountered poisoned lock";

/// A memory pool that obtains its capacity from the Rust global allocator.
///
/// For clarity, the pool itself is not in any way global - the word "global" in the
/// name refers to the fact that all the capacity is obtained from the Rust global
/// memory allocator. Released segments are kept for reuse, so a warmed-up pool serves
/// most allocations without touching the allocator at all.
///
/// # Efficiency
///
/// Each call to [`new()`][Self::new] allocates a separate pool with its own capacity,
/// so avoid creating multiple instances if you can reuse an existing one. Clones act
/// as shared handles over the same capacity - feel free to clone as needed for
/// convenient referencing purposes (an [`AllocSite`][crate::AllocSite] keeps one).
///
/// # Block sizes
///
/// Capacity is kept in four size-differentiated sub-pools (1 KB through 64 KB); a
/// request is served from the smallest sub-pool that fits. Requests exceeding the
/// largest block size are served directly from the allocator and are not retained on
/// release - such segments exist precisely because a write outgrew the pooled sizes,
/// which the adaptive sizing layer already works to make rare.
#[derive(Clone, Debug)]
pub struct GlobalPool {
    inner: Arc<GlobalPoolInner>,
}

impl GlobalPool {
    /// Creates a new instance of the pool.
    #[must_use]
    #[expect(
        clippy::new_without_default,
        reason = "to avoid accidental confusion with some 'default' global pool, which does not exist"
    )]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GlobalPoolInner::new()),
        }
    }
}

impl Pool for GlobalPool {
    fn allocate(&self, min_len: usize) -> Result<Segment> {
        ALLOCATION_REQUESTED_SIZE.with(|e| e.observe(min_len));

        Ok(Segment::from_storage(self.inner.rent(min_len)))
    }

    fn grow(&self, segment: &mut Segment, min_capacity: usize) -> Result<()> {
        if segment.capacity() >= min_capacity {
            return Ok(());
        }

        let old_storage = segment.grow_into(self.inner.rent(min_capacity));
        self.inner.recycle(old_storage);

        Ok(())
    }

    fn release(&self, segment: Segment) -> bool {
        self.inner.recycle(segment.into_storage());

        true
    }
}

// Sub-pool block sizes. Matching the adaptive size table's spread: predictions below
// 1 KB dominate in practice, and 64 KB covers everything but pathological writes.
const BLOCK_1K: usize = 1024;
const BLOCK_4K: usize = 4096;
const BLOCK_16K: usize = 16_384;
const BLOCK_64K: usize = 65_536;

type SubPool = Mutex<Vec<Box<[u8]>>>;

#[derive(Debug)]
#[expect(
    clippy::struct_field_names,
    reason = "pool_ prefix provides clarity for the size-differentiated sub-pools"
)]
struct GlobalPoolInner {
    // Each sub-pool is guarded by its own mutex because pools need to be thread-safe:
    // even if a segment is rented on one thread, it may be released on another.
    pool_1k: SubPool,
    pool_4k: SubPool,
    pool_16k: SubPool,
    pool_64k: SubPool,
}

impl GlobalPoolInner {
    fn new() -> Self {
        Self {
            pool_1k: Mutex::new(Vec::new()),
            pool_4k: Mutex::new(Vec::new()),
            pool_16k: Mutex::new(Vec::new()),
            pool_64k: Mutex::new(Vec::new()),
        }
    }

    // Picks the smallest sub-pool that fits and rents one of its blocks, reusing a
    // recycled block when one is available. Oversize requests are served unpooled,
    // rounded up to whole 64 KB multiples to limit size fragmentation.
    fn rent(&self, min_len: usize) -> Box<[u8]> {
        let (sub_pool, block_len) = match min_len {
            0..=BLOCK_1K => (&self.pool_1k, BLOCK_1K),
            ..=BLOCK_4K => (&self.pool_4k, BLOCK_4K),
            ..=BLOCK_16K => (&self.pool_16k, BLOCK_16K),
            ..=BLOCK_64K => (&self.pool_64k, BLOCK_64K),
            _ => {
                let unpooled_len = min_len.div_ceil(BLOCK_64K) * BLOCK_64K;

                return vec![0; unpooled_len].into_boxed_slice();
            }
        };

        let recycled = sub_pool.lock().expect(ERR_POISONED_LOCK).pop();

        recycled.unwrap_or_else(|| vec![0; block_len].into_boxed_slice())
    }

    fn recycle(&self, storage: Box<[u8]>) {
        let sub_pool = match storage.len() {
            BLOCK_1K => &self.pool_1k,
            BLOCK_4K => &self.pool_4k,
            BLOCK_16K => &self.pool_16k,
            BLOCK_64K => &self.pool_64k,
            // Oversize blocks go back to the allocator.
            _ => return,
        };

        sub_pool.lock().expect(ERR_POISONED_LOCK).push(storage);
    }
}

// Histogram buckets for the requested allocation size, matching sub-pool sizes plus
// finer granularity below them.
const ALLOCATION_SIZE_BUCKETS: &[Magnitude] = &[
    0, 256, 512, 1024, 2048, 4096, 8192, 16_384, 32_768, 65_536, 131_072, 262_144, 524_288,
];

thread_local! {
    static ALLOCATION_REQUESTED_SIZE: Event = Event::builder()
        .name("serbuf_global_pool_allocation_requested_size")
        .histogram(ALLOCATION_SIZE_BUCKETS)
        .build();
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(GlobalPool: Send, Sync);

    #[test]
    fn serves_at_least_the_requested_capacity() {
        let pool = GlobalPool::new();

        for min_len in [0, 1, 1000, 1024, 1025, 60_000, 65_536, 65_537, 1_000_000] {
            let segment = pool.allocate(min_len).expect("global pool never fails");

            assert!(segment.capacity() >= min_len, "requested {min_len}");
            assert!(segment.is_empty());

            assert!(pool.release(segment));
        }
    }

    #[test]
    fn reuses_released_blocks() {
        let pool = GlobalPool::new();

        let segment = pool.allocate(500).expect("global pool never fails");
        let original_capacity = segment.capacity();
        assert!(pool.release(segment));

        // Same sub-pool, so the recycled block is handed back out.
        let segment = pool.allocate(900).expect("global pool never fails");
        assert_eq!(segment.capacity(), original_capacity);
    }

    #[test]
    fn growth_preserves_contents() {
        let pool = GlobalPool::new();

        let mut segment = pool.allocate(100).expect("global pool never fails");
        segment.unfilled_slice()[..5].copy_from_slice(b"serbu");
        segment.advance(5);

        pool.grow(&mut segment, 100_000).expect("global pool never fails");

        assert!(segment.capacity() >= 100_000);
        assert_eq!(segment.as_slice(), b"serbu");
    }

    #[test]
    fn growth_is_a_no_op_when_capacity_suffices() {
        let pool = GlobalPool::new();

        let mut segment = pool.allocate(100).expect("global pool never fails");
        let capacity = segment.capacity();

        pool.grow(&mut segment, 50).expect("global pool never fails");

        assert_eq!(segment.capacity(), capacity);
    }

    #[test]
    fn clones_share_capacity() {
        let pool = GlobalPool::new();
        let clone = pool.clone();

        let segment = pool.allocate(100).expect("global pool never fails");
        let capacity = segment.capacity();
        assert!(clone.release(segment));

        let segment = clone.allocate(100).expect("global pool never fails");
        assert_eq!(segment.capacity(), capacity);
    }
}
