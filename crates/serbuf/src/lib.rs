// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Pluggable buffers for serializer I/O, with adaptive per-site sizing.
//!
//! This crate separates two concerns that are usually tangled together: what a
//! serializer is allowed to do with a buffer, and how the memory behind that buffer is
//! obtained, sized and recycled. Serializers code against two small capability traits,
//! [`InputBuf`] and [`OutputBuf`]; everything behind those traits - pooling, growth,
//! size prediction - is swappable without touching codec logic.
//!
//! # The capability contract
//!
//! An [`OutputBuf`] offers two ways of producing bytes:
//!
//! * [`as_stream()`][OutputBuf::as_stream] returns a `std::io::Write` for sequential,
//!   copying output. It may be taken at most once.
//! * [`as_flat_view()`][OutputBuf::as_flat_view] exposes the backing memory directly
//!   as a [`FlatView`] - a mutable window with a persistent write cursor - so encoders
//!   can place bytes with no intermediate copy. The view can be dropped and retaken;
//!   the cursor survives.
//!
//! When the write is finished, [`complete()`][OutputBuf::complete] consumes the buffer
//! and returns the finished backing, carrying exactly the bytes written through either
//! facility. An [`InputBuf`] mirrors this on the read side with a single-use stream, a
//! single-use flat view and an idempotent [`release()`][InputBuf::release].
//!
//! ```
//! use serbuf::{AllocSite, GlobalPool, InputBuf, OutputBuf};
//!
//! let mut site = AllocSite::new(GlobalPool::new());
//!
//! let mut buf = site.output_buf()?;
//! let mut view = buf.as_flat_view(Some(32))?;
//! view.put_num_be(1234_u64);
//! view.put_slice(*b"Hello, world!");
//! drop(view);
//!
//! let finished = buf.complete()?;
//!
//! let mut input = site.input_buf(finished);
//! assert_eq!(input.size(), 8 + 13);
//! assert_eq!(&input.as_flat_view()?[8..], b"Hello, world!");
//! assert!(input.release());
//! # Ok::<(), serbuf::Error>(())
//! ```
//!
//! # Adaptive sizing
//!
//! How large should an output buffer be? Too small and every write pays for mid-write
//! reallocation; too large and pooled memory sits idle. Instead of asking the caller
//! to guess, each [`AllocSite`] learns from the writes made at that site: an
//! [`AllocHandle`] moves a cursor through a shared [`SizeTable`] of candidate sizes,
//! growing eagerly when a write outgrows the prediction and shrinking only after two
//! consecutive unusually small writes. One handle per logical site (per connection,
//! per call path) keeps the histories from polluting each other.
//!
//! ```
//! use serbuf::{AllocSite, GlobalPool, OutputBuf};
//!
//! let mut site = AllocSite::new(GlobalPool::new());
//! let starting_prediction = site.handle().next_receive_size();
//!
//! // A write that outgrows the prediction teaches the site to start bigger.
//! let mut buf = site.output_buf()?;
//! let mut view = buf.as_flat_view(Some(2 * starting_prediction))?;
//! for _ in 0..2 * starting_prediction {
//!     view.put_byte(0);
//! }
//! drop(view);
//! drop(buf.complete()?);
//!
//! assert!(site.handle().next_receive_size() > starting_prediction);
//! # Ok::<(), serbuf::Error>(())
//! ```
//!
//! # Memory pools
//!
//! Capacity comes from a [`Pool`], the three-operation interface the buffer layer
//! consumes: allocate a [`Segment`], grow it in place with contents preserved, release
//! it. [`GlobalPool`] is the production implementation, recycling released segments in
//! size-differentiated free lists. Test code (or the `test-util` feature) additionally
//! gets `TransparentPool`, which allocates exactly what is asked with no reuse, and
//! `BoundedPool`, which enforces a byte budget so allocation failure paths can be
//! exercised deterministically.
//!
//! The [`Serializer`] trait closes the loop: it is the call contract between a codec
//! and this buffer layer, defined here so codecs and buffers can evolve independently.

#[cfg(any(test, feature = "test-util"))]
mod bounded;
mod error;
mod flat_view;
mod global;
mod handle;
mod input;
mod input_pooled;
mod output;
mod output_pooled;
mod pool;
mod serializer;
mod site;
mod size_table;
#[cfg(any(test, feature = "test-util"))]
mod transparent;

#[cfg(any(test, feature = "test-util"))]
pub use bounded::BoundedPool;
pub use error::{Error, Result};
pub use flat_view::FlatView;
pub use global::GlobalPool;
pub use handle::{AllocHandle, SizingPolicy};
pub use input::InputBuf;
pub use input_pooled::PooledInputBuf;
pub use output::OutputBuf;
pub use output_pooled::PooledOutputBuf;
pub use pool::{Pool, Segment};
pub use serializer::Serializer;
pub use site::AllocSite;
pub use size_table::{DEFAULT_INITIAL, DEFAULT_MAXIMUM, DEFAULT_MINIMUM, SizeTable};
#[cfg(any(test, feature = "test-util"))]
pub use transparent::TransparentPool;
