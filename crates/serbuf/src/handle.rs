// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use nm::{Event, Magnitude};
use tracing::{Level, event};

use crate::{Pool, Result, Segment, SizeTable};

/// Tunable constants governing how fast an [`AllocHandle`] moves through its size table.
///
/// These ratios are policy observed from real workloads, not proven optimal - they are
/// deliberately exposed rather than hard-coded so a deployment can adjust them.
#[derive(Clone, Copy, Debug)]
pub struct SizingPolicy {
    /// How many table entries to move up when a write meets or exceeds the prediction.
    ///
    /// Growing is cheap to undo and under-sizing forces a mid-write reallocation, so
    /// the default moves up faster than it moves down.
    pub index_increment: usize,

    /// How many table entries to move down once a shrink is confirmed.
    pub index_decrement: usize,

    /// How many entries below the current one a write must fall to count as a small-usage
    /// signal. Only such writes arm (and then trigger) a shrink.
    pub shrink_threshold: usize,
}

impl Default for SizingPolicy {
    fn default() -> Self {
        Self {
            index_increment: 2,
            index_decrement: 1,
            shrink_threshold: 2,
        }
    }
}

/// Hysteresis state for shrink decisions.
///
/// A single unusually small write must not shrink an otherwise stable handle, so the
/// first small-usage signal only arms the shrink and the second one triggers it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ShrinkState {
    /// No pending shrink; the next small-usage signal arms one.
    Stable,

    /// One small-usage signal observed; another will shrink the handle.
    PendingShrink,
}

/// Learns the buffer size that fits the writes observed at one allocation site.
///
/// A handle wraps a shared, immutable [`SizeTable`] and moves a cursor through it:
/// [`allocate()`] requests a segment of the currently predicted size, and
/// [`record()`] - called once per completed write with the actual byte count - nudges
/// the cursor so the next prediction converges toward the smallest table entry that
/// comfortably fits recent writes. This trades a little historical lag for avoiding
/// both repeated mid-write reallocation (under-sizing) and wasted pooled memory
/// (over-sizing).
///
/// # One handle per site
///
/// A handle carries mutable cursor state with no internal locking. Create one per
/// logical allocation site (e.g. per connection), keep it for the lifetime of that
/// site, and never share it between concurrently active write sequences. Serializing
/// access through ownership is deliberately cheaper than locking a shared handle -
/// [`AllocSite`][crate::AllocSite] enforces the discipline through the borrow checker.
///
/// [`allocate()`]: Self::allocate
/// [`record()`]: Self::record
#[derive(Debug)]
pub struct AllocHandle {
    table: Arc<SizeTable>,
    policy: SizingPolicy,
    current_index: usize,
    next_receive_size: usize,
    shrink_state: ShrinkState,
}

impl AllocHandle {
    /// Creates a handle over the given table, starting at the table's initial index.
    #[must_use]
    pub fn new(table: Arc<SizeTable>) -> Self {
        Self::with_policy(table, SizingPolicy::default())
    }

    /// Creates a handle with an explicit sizing policy.
    #[must_use]
    pub fn with_policy(table: Arc<SizeTable>, policy: SizingPolicy) -> Self {
        let current_index = table.initial_index();
        let next_receive_size = table.size_at(current_index);

        Self {
            table,
            policy,
            current_index,
            next_receive_size,
            shrink_state: ShrinkState::Stable,
        }
    }

    /// Allocates a segment of the currently predicted size from `pool`.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::AllocationFailed`][crate::Error::AllocationFailed] from the
    /// pool without retrying.
    pub fn allocate<P: Pool>(&self, pool: &P) -> Result<Segment> {
        pool.allocate(self.next_receive_size)
    }

    /// Records the actual byte count of a completed write, updating the prediction for
    /// the next allocation at this site.
    ///
    /// A write at least [`shrink_threshold`][SizingPolicy::shrink_threshold] entries
    /// below the current prediction is a small-usage signal: the first such signal
    /// arms a shrink and the second triggers it. A write that meets or exceeds the
    /// prediction grows the handle immediately. A write within the predicted band
    /// leaves the cursor alone and disarms any pending shrink.
    pub fn record(&mut self, actual_written: usize) {
        RECORDED_WRITE_SIZE.with(|e| e.observe(actual_written));

        let threshold_index = self.current_index.saturating_sub(self.policy.shrink_threshold);

        if actual_written <= self.table.size_at(threshold_index) {
            match self.shrink_state {
                ShrinkState::Stable => {
                    self.shrink_state = ShrinkState::PendingShrink;
                }
                ShrinkState::PendingShrink => {
                    let shrunk = self.current_index.saturating_sub(self.policy.index_decrement);

                    event!(
                        Level::TRACE,
                        message = "shrinking allocation handle",
                        from_index = self.current_index,
                        to_index = shrunk,
                        actual_written,
                    );

                    self.current_index = shrunk;
                    self.shrink_state = ShrinkState::Stable;
                }
            }
        } else if actual_written >= self.next_receive_size {
            let grown = (self.current_index + self.policy.index_increment).min(self.table.maximum_index());

            if grown != self.current_index {
                event!(
                    Level::TRACE,
                    message = "growing allocation handle",
                    from_index = self.current_index,
                    to_index = grown,
                    actual_written,
                );
            }

            self.current_index = grown;
            self.shrink_state = ShrinkState::Stable;
        } else {
            self.shrink_state = ShrinkState::Stable;
        }

        self.next_receive_size = self.table.size_at(self.current_index);
    }

    /// Returns the size the next allocation at this site will request.
    #[must_use]
    pub fn next_receive_size(&self) -> usize {
        self.next_receive_size
    }

    /// Returns the current cursor position within the size table.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Returns the shared table this handle moves through.
    #[must_use]
    pub fn table(&self) -> &Arc<SizeTable> {
        &self.table
    }
}

// Histogram buckets for recorded write sizes, matching the default table's spread.
const WRITE_SIZE_BUCKETS: &[Magnitude] = &[
    0, 64, 256, 512, 1024, 4096, 16_384, 65_536, 262_144, 524_288,
];

thread_local! {
    static RECORDED_WRITE_SIZE: Event = Event::builder()
        .name("serbuf_handle_recorded_write_size")
        .histogram(WRITE_SIZE_BUCKETS)
        .build();
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(AllocHandle: Send);

    fn scenario_table() -> Arc<SizeTable> {
        Arc::new(SizeTable::from_sizes(vec![64, 128, 256, 512, 1024], 2))
    }

    #[test]
    fn fresh_handle_predicts_initial_size() {
        let handle = AllocHandle::new(scenario_table());

        assert_eq!(handle.current_index(), 2);
        assert_eq!(handle.next_receive_size(), 256);
    }

    #[test]
    fn single_small_write_does_not_shrink() {
        let mut handle = AllocHandle::new(scenario_table());

        handle.record(20);

        assert_eq!(handle.current_index(), 2);
        assert_eq!(handle.next_receive_size(), 256);
    }

    #[test]
    fn two_consecutive_small_writes_shrink_by_one_step() {
        let mut handle = AllocHandle::new(scenario_table());

        handle.record(20);
        handle.record(20);

        assert_eq!(handle.current_index(), 1);
        assert_eq!(handle.next_receive_size(), 128);
    }

    #[test]
    fn in_band_write_disarms_pending_shrink() {
        let mut handle = AllocHandle::new(scenario_table());

        handle.record(20);
        handle.record(200); // Within the predicted band: above threshold, below 256.
        handle.record(20);

        // The pending shrink was disarmed, so this counts as the first signal again.
        assert_eq!(handle.current_index(), 2);
    }

    #[test]
    fn oversized_write_grows_immediately() {
        let mut handle = AllocHandle::new(scenario_table());

        handle.record(20);
        handle.record(20);
        assert_eq!(handle.current_index(), 1);

        handle.record(600);

        assert_eq!(handle.current_index(), 3);
        assert_eq!(handle.next_receive_size(), 512);
    }

    #[test]
    fn growth_is_monotonic_until_the_ceiling() {
        let mut handle = AllocHandle::new(scenario_table());
        let mut previous = handle.current_index();

        for _ in 0..10 {
            handle.record(handle.next_receive_size());

            assert!(handle.current_index() >= previous);
            previous = handle.current_index();
        }

        assert_eq!(handle.current_index(), handle.table().maximum_index());
        assert_eq!(handle.next_receive_size(), 1024);
    }

    #[test]
    fn index_never_leaves_table_bounds() {
        let table = scenario_table();
        let mut handle = AllocHandle::new(Arc::clone(&table));

        let mut rng = fastrand::Rng::with_seed(0x5eed);

        for _ in 0..10_000 {
            handle.record(rng.usize(0..4096));

            assert!(handle.current_index() <= table.maximum_index());
            assert!(handle.next_receive_size() >= table.size_at(0));
            assert!(handle.next_receive_size() <= table.size_at(table.maximum_index()));
        }
    }

    #[test]
    fn shrink_clamps_at_the_floor() {
        let mut handle = AllocHandle::new(scenario_table());

        for _ in 0..20 {
            handle.record(1);
        }

        assert_eq!(handle.current_index(), 0);
        assert_eq!(handle.next_receive_size(), 64);
    }

    #[test]
    fn custom_policy_changes_step_sizes() {
        let policy = SizingPolicy {
            index_increment: 4,
            index_decrement: 1,
            shrink_threshold: 1,
        };
        let mut handle = AllocHandle::with_policy(scenario_table(), policy);

        handle.record(2048);

        assert_eq!(handle.current_index(), 4);
    }

    #[test]
    fn allocate_requests_the_predicted_size() {
        let pool = crate::TransparentPool::new();
        let handle = AllocHandle::new(scenario_table());

        let segment = handle.allocate(&pool).expect("transparent pool never fails");

        assert!(segment.capacity() >= 256);
    }
}
