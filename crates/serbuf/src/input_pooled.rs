// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io::Read;

use crate::{Error, InputBuf, Pool, Result, Segment};

/// An [`InputBuf`] over one finished pooled [`Segment`].
///
/// Created via [`AllocSite::input_buf()`][crate::AllocSite::input_buf] from the
/// segment an [`OutputBuf`][crate::OutputBuf] produced on completion. The reader owns
/// the buffer exclusively and must eventually [`release()`][InputBuf::release] it;
/// dropping an unreleased buffer releases it as a backstop.
#[derive(Debug)]
pub struct PooledInputBuf<P: Pool> {
    pool: P,
    segment: Option<Segment>,
    stream_taken: bool,
    view_taken: bool,
}

impl<P: Pool> PooledInputBuf<P> {
    pub(crate) fn new(pool: P, segment: Segment) -> Self {
        Self {
            pool,
            segment: Some(segment),
            stream_taken: false,
            view_taken: false,
        }
    }
}

impl<P: Pool> InputBuf for PooledInputBuf<P> {
    fn as_stream(&mut self) -> Result<impl Read + '_> {
        if self.stream_taken {
            return Err(Error::ContractViolation(
                "as_stream() was already called on this input buffer".to_string(),
            ));
        }

        let Some(segment) = self.segment.as_ref() else {
            return Err(Error::ContractViolation(
                "as_stream() was called on a released input buffer".to_string(),
            ));
        };

        self.stream_taken = true;

        // A shared byte slice is itself a reader; reads shrink it from the front.
        Ok(segment.as_slice())
    }

    fn as_flat_view(&mut self) -> Result<&[u8]> {
        if self.view_taken {
            return Err(Error::ContractViolation(
                "as_flat_view() was already called on this input buffer".to_string(),
            ));
        }

        let Some(segment) = self.segment.as_ref() else {
            return Err(Error::ContractViolation(
                "as_flat_view() was called on a released input buffer".to_string(),
            ));
        };

        self.view_taken = true;

        Ok(segment.as_slice())
    }

    fn size(&self) -> usize {
        self.segment.as_ref().map_or(0, Segment::len)
    }

    fn release(&mut self) -> bool {
        match self.segment.take() {
            Some(segment) => self.pool.release(segment),
            None => false,
        }
    }
}

impl<P: Pool> Drop for PooledInputBuf<P> {
    fn drop(&mut self) {
        // A reader that forgot to release still returns the segment to the pool.
        if let Some(segment) = self.segment.take() {
            _ = self.pool.release(segment);
        }
    }
}
