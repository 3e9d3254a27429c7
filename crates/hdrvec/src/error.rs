// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Error types for hdrvec.

use thiserror::Error;

/// Errors raised while initializing or growing an [`HdrVec`](crate::HdrVec).
///
/// Every variant is reported to the process-wide error handler before it is
/// returned. None of them leaves the vector in a modified state.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum HdrVecError {
    /// `init()` was called on a vector that already owns a block.
    #[error("vector is already initialized")]
    DoubleInitialization,

    /// The requested element count does not fit in the header.
    #[error("capacity of {requested} elements exceeds the maximum of {max}")]
    CapacityLimitExceeded {
        /// Element count that was asked for.
        requested: usize,
        /// Largest element count a block can record.
        max: usize,
    },

    /// The block (header plus elements) would be larger than the configured ceiling.
    ///
    /// `requested` saturates at `usize::MAX` when computing the size overflowed.
    #[error("block of {requested} bytes exceeds the configured maximum of {max} bytes")]
    SizeLimitExceeded {
        /// Total block size in bytes that was asked for.
        requested: usize,
        /// Configured `max_size`.
        max: usize,
    },

    /// The allocator could not provide the block.
    #[error("out of memory: allocator failed to provide {bytes} bytes")]
    OutOfMemory {
        /// Total block size in bytes that was asked for.
        bytes: usize,
    },
}

/// Failure reported by a [`RawAllocator`](crate::RawAllocator).
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
#[error("allocation failed")]
pub struct AllocError;
