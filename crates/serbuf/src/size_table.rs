// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

/// The default smallest buffer size a table built via [`SizeTable::new()`] will contain.
pub const DEFAULT_MINIMUM: usize = 64;

/// The default buffer size used for the very first allocation at a fresh site.
pub const DEFAULT_INITIAL: usize = 512;

/// The default largest buffer size a table built via [`SizeTable::new()`] will contain.
pub const DEFAULT_MAXIMUM: usize = 524_288;

// Candidate sizes advance in linear steps of this size until the ceiling, then double.
// Small writes cluster tightly, so the low end of the table is finer-grained.
const LINEAR_STEP: usize = 16;
const LINEAR_CEILING: usize = 512;

/// An ordered progression of candidate buffer sizes shared by allocation handles.
///
/// The table is immutable once constructed and holds no per-handle state, so a single
/// instance can be shared read-only across any number of [`AllocHandle`]s and threads
/// (typically via [`shared()`]).
///
/// Each [`AllocHandle`] keeps its own cursor into the table; the table itself only
/// answers index lookups in O(1) and is never re-sorted or re-sized at runtime.
///
/// # Shape
///
/// Tables built via [`new()`] step linearly in 16-byte increments up to 512 bytes and
/// double from there, clipped to the requested bounds. This keeps the low end of the
/// table fine-grained (where small serialized messages cluster) while still reaching
/// large sizes in a handful of steps.
///
/// [`AllocHandle`]: crate::AllocHandle
/// [`new()`]: Self::new
/// [`shared()`]: Self::shared
#[derive(Clone, Debug)]
pub struct SizeTable {
    sizes: Box<[usize]>,
    initial_index: usize,
}

impl SizeTable {
    /// Creates a table of stepped sizes covering `[minimum, maximum]`, with the entry
    /// covering `initial` used for the first allocation at a fresh handle.
    ///
    /// # Panics
    ///
    /// Panics if `minimum` is zero or the bounds are not ordered
    /// `minimum <= initial <= maximum`.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Mutating the step increments can cause infinite loops.
    pub fn new(minimum: usize, initial: usize, maximum: usize) -> Self {
        assert!(minimum > 0, "minimum buffer size must be positive");
        assert!(minimum <= initial, "initial buffer size must not be below the minimum");
        assert!(initial <= maximum, "initial buffer size must not exceed the maximum");

        let mut sizes = Vec::new();

        let mut candidate = LINEAR_STEP;
        while candidate < LINEAR_CEILING {
            if candidate >= minimum && candidate <= maximum {
                sizes.push(candidate);
            }

            candidate += LINEAR_STEP;
        }

        candidate = LINEAR_CEILING;
        while candidate <= maximum {
            if candidate >= minimum {
                sizes.push(candidate);
            }

            let Some(doubled) = candidate.checked_mul(2) else {
                break;
            };

            candidate = doubled;
        }

        // Bounds that fall between candidates must still be representable, otherwise a
        // table over e.g. [100, 100] would come out empty.
        if sizes.is_empty() {
            sizes.push(maximum);
        }

        let initial_index = sizes
            .iter()
            .position(|&size| size >= initial)
            .unwrap_or(sizes.len() - 1);

        Self {
            sizes: sizes.into_boxed_slice(),
            initial_index,
        }
    }

    /// Creates a table from an explicit sequence of sizes.
    ///
    /// # Panics
    ///
    /// Panics if `sizes` is empty, not strictly increasing, starts at zero, or
    /// `initial_index` is out of bounds.
    #[must_use]
    pub fn from_sizes(sizes: Vec<usize>, initial_index: usize) -> Self {
        assert!(!sizes.is_empty(), "size table must contain at least one entry");
        assert!(
            sizes.first().is_some_and(|&first| first > 0),
            "size table entries must be positive"
        );
        assert!(
            sizes.windows(2).all(|pair| pair[0] < pair[1]),
            "size table entries must be strictly increasing"
        );
        assert!(initial_index < sizes.len(), "initial index must be within the table");

        Self {
            sizes: sizes.into_boxed_slice(),
            initial_index,
        }
    }

    /// Creates a table with the default bounds, wrapped for sharing across handles.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the size at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn size_at(&self, index: usize) -> usize {
        self.sizes[index]
    }

    /// Returns the index used for the very first allocation at a fresh handle.
    #[must_use]
    pub fn initial_index(&self) -> usize {
        self.initial_index
    }

    /// Returns the smallest valid index.
    #[must_use]
    pub fn minimum_index(&self) -> usize {
        0
    }

    /// Returns the largest valid index.
    #[must_use]
    pub fn maximum_index(&self) -> usize {
        self.sizes.len() - 1
    }

    /// Returns the number of entries in the table.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.sizes.len()
    }
}

impl Default for SizeTable {
    fn default() -> Self {
        Self::new(DEFAULT_MINIMUM, DEFAULT_INITIAL, DEFAULT_MAXIMUM)
    }
}
