// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use crate::{AllocHandle, Pool, PooledInputBuf, PooledOutputBuf, Result, Segment, SizeTable, SizingPolicy};

/// One logical allocation site: a pool handle plus the [`AllocHandle`] that accumulates
/// sizing history for the writes made at this site.
///
/// Create one site per point of repeated buffer acquisition - typically one per
/// connection or per reusable call path - and keep it for the lifetime of that site.
/// There are deliberately no shared or static instances: a site is constructed
/// explicitly and threaded through the call path that uses it.
///
/// [`output_buf()`][Self::output_buf] is the factory serializer collaborators are
/// given: each call produces a fresh [`PooledOutputBuf`] of the currently predicted
/// size, bound to this site's handle for learning. The factory borrows the site
/// mutably for the lifetime of the returned buffer, so two concurrently active writers
/// on one site do not compile - the single-writer discipline is enforced by ownership
/// rather than locking.
///
/// # Example
///
/// ```
/// use serbuf::{AllocSite, GlobalPool, InputBuf, OutputBuf};
///
/// let mut site = AllocSite::new(GlobalPool::new());
///
/// let mut buf = site.output_buf()?;
/// let mut view = buf.as_flat_view(Some(16))?;
/// view.put_num_be(0xCAFE_u16);
/// drop(view);
///
/// let finished = buf.complete()?;
///
/// let mut input = site.input_buf(finished);
/// assert_eq!(input.size(), 2);
/// assert!(input.release());
/// # Ok::<(), serbuf::Error>(())
/// ```
#[derive(Debug)]
pub struct AllocSite<P: Pool> {
    pool: P,
    handle: AllocHandle,
}

impl<P: Pool + Clone> AllocSite<P> {
    /// Creates a site over `pool` using the default size table.
    #[must_use]
    pub fn new(pool: P) -> Self {
        Self::with_table(pool, SizeTable::shared())
    }

    /// Creates a site over `pool` using a shared custom size table.
    #[must_use]
    pub fn with_table(pool: P, table: Arc<SizeTable>) -> Self {
        Self {
            pool,
            handle: AllocHandle::new(table),
        }
    }

    /// Creates a site with an explicit sizing policy.
    #[must_use]
    pub fn with_policy(pool: P, table: Arc<SizeTable>, policy: SizingPolicy) -> Self {
        Self {
            pool,
            handle: AllocHandle::with_policy(table, policy),
        }
    }

    /// Creates a fresh output buffer of the currently predicted size, bound to this
    /// site's handle.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::AllocationFailed`][crate::Error::AllocationFailed] from the
    /// pool.
    pub fn output_buf(&mut self) -> Result<PooledOutputBuf<'_, P>> {
        let segment = self.handle.allocate(&self.pool)?;

        Ok(PooledOutputBuf::new(self.pool.clone(), &mut self.handle, segment))
    }

    /// Wraps a finished segment as an input buffer for reading, bound to this site's
    /// pool for the eventual release.
    #[must_use]
    pub fn input_buf(&self, finished: Segment) -> PooledInputBuf<P> {
        PooledInputBuf::new(self.pool.clone(), finished)
    }

    /// Returns the site's allocation handle, e.g. to inspect the current prediction.
    #[must_use]
    pub fn handle(&self) -> &AllocHandle {
        &self.handle
    }
}
