// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io;

use crate::{AllocHandle, Error, FlatView, OutputBuf, Pool, Result, Segment};

const ERR_NO_SEGMENT: &str = "segment is present until completion consumes the buffer";

/// Bookkeeping for a materialized flat view over the segment's storage.
///
/// `origin` is the segment's write cursor at the moment the view was first created;
/// `cursor` counts bytes written through the view, relative to `origin`. Both cursors
/// observe the same storage, so readers must max-merge them and `complete()` sums them
/// - they are never double-counted.
#[derive(Clone, Copy, Debug)]
struct Window {
    origin: usize,
    cursor: usize,
}

/// An [`OutputBuf`] over one pooled [`Segment`], bound to its site's [`AllocHandle`].
///
/// Created via [`AllocSite::output_buf()`][crate::AllocSite::output_buf]. The buffer
/// exclusively borrows the site's handle for its lifetime, which is what makes
/// overlapping writers at one site a compile error rather than a data race.
///
/// On [`complete()`][OutputBuf::complete] the buffer commits the flat view's cursor
/// into the segment, records the actual byte count to the handle (feeding the adaptive
/// size prediction), and hands the finished segment to the caller. Dropping the buffer
/// without completing it returns the segment to the pool.
#[derive(Debug)]
pub struct PooledOutputBuf<'site, P: Pool> {
    pool: P,
    handle: &'site mut AllocHandle,
    segment: Option<Segment>,
    window: Option<Window>,
    stream_taken: bool,
}

impl<'site, P: Pool> PooledOutputBuf<'site, P> {
    pub(crate) fn new(pool: P, handle: &'site mut AllocHandle, segment: Segment) -> Self {
        Self {
            pool,
            handle,
            segment: Some(segment),
            window: None,
            stream_taken: false,
        }
    }
}

impl<P: Pool> OutputBuf for PooledOutputBuf<'_, P> {
    type Finished = Segment;

    fn as_stream(&mut self) -> Result<impl io::Write + '_> {
        if self.stream_taken {
            return Err(Error::ContractViolation(
                "as_stream() was already called on this output buffer".to_string(),
            ));
        }

        self.stream_taken = true;

        let segment = self.segment.as_mut().expect(ERR_NO_SEGMENT);

        Ok(SegmentStream {
            pool: &self.pool,
            segment,
        })
    }

    fn as_flat_view(&mut self, min_writable: Option<usize>) -> Result<FlatView<'_>> {
        if self.window.is_none() {
            let origin = self.segment.as_ref().expect(ERR_NO_SEGMENT).len();

            self.window = Some(Window { origin, cursor: 0 });
        }

        let window = self.window.as_mut().expect("window was just ensured to exist");
        let segment = self.segment.as_mut().expect(ERR_NO_SEGMENT);

        // `None` means "whatever is currently available" - no growth.
        let required = window.origin + window.cursor + min_writable.unwrap_or(0);

        if segment.capacity() < required {
            self.pool.grow(segment, required)?;
        }

        let bytes = &mut segment.storage_mut()[window.origin..];

        Ok(FlatView::new(bytes, &mut window.cursor))
    }

    fn size(&self) -> usize {
        let backing = self.segment.as_ref().map_or(0, Segment::len);
        let view = self.window.map_or(0, |window| window.origin + window.cursor);

        backing.max(view)
    }

    fn complete(mut self) -> Result<Segment> {
        let mut segment = self.segment.take().expect(ERR_NO_SEGMENT);

        let pending = self.window.map_or(0, |window| window.cursor);
        let actual_written = segment.len() + pending;

        segment.commit(actual_written);
        self.handle.record(actual_written);

        Ok(segment)
    }
}

impl<P: Pool> Drop for PooledOutputBuf<'_, P> {
    fn drop(&mut self) {
        // An abandoned write still returns its segment to the pool.
        if let Some(segment) = self.segment.take() {
            _ = self.pool.release(segment);
        }
    }
}

/// Write stream over a segment, growing the backing through the pool on demand.
#[derive(Debug)]
struct SegmentStream<'a, P: Pool> {
    pool: &'a P,
    segment: &'a mut Segment,
}

impl<P: Pool> io::Write for SegmentStream<'_, P> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.segment.remaining_capacity() < buf.len() {
            let required = self.segment.len() + buf.len();

            self.pool.grow(self.segment, required).map_err(io::Error::from)?;
        }

        self.segment.unfilled_slice()[..buf.len()].copy_from_slice(buf);
        self.segment.advance(buf.len());

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
