// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Sizing parameters for [`HdrVec`](crate::HdrVec).

/// Sizing parameters of a vector.
///
/// Fixed for the lifetime of the vector; checked on every initialization and
/// growth before the allocator is called.
///
/// # Example
///
/// ```rust
/// use hdrvec::{HdrVec, VecConfig};
///
/// let config = VecConfig::new(1 << 20).with_initial_capacity(64);
/// let mut vec = HdrVec::<u64>::with_config(config);
/// vec.push(7).expect("Failed to push(..)");
///
/// assert_eq!(vec.capacity(), 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VecConfig {
    /// Capacity of a freshly initialized block when no larger one is requested.
    ///
    /// Default: 16. Values below 1 are treated as 1.
    pub initial_capacity: usize,

    /// Ceiling for the total block size in bytes (header plus elements).
    ///
    /// Default: 2 GiB. Exceeding it yields
    /// [`HdrVecError::SizeLimitExceeded`](crate::HdrVecError::SizeLimitExceeded).
    pub max_size: usize,
}

impl VecConfig {
    /// Default initial capacity.
    pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

    /// Default block size ceiling: 2 GiB.
    pub const DEFAULT_MAX_SIZE: usize = 1 << 31;

    /// Factor applied to the capacity on every growth.
    pub const GROWTH_MULTIPLIER: usize = 2;

    /// Creates a config with an explicit block size ceiling.
    pub const fn new(max_size: usize) -> Self {
        Self {
            initial_capacity: Self::DEFAULT_INITIAL_CAPACITY,
            max_size,
        }
    }

    /// Overrides the initial capacity.
    pub const fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Overrides the block size ceiling.
    pub const fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Capacity used when initializing with `requested` elements.
    pub(crate) fn initial_capacity_for(&self, requested: usize) -> usize {
        self.initial_capacity.max(requested).max(1)
    }
}

impl Default for VecConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_SIZE)
    }
}
