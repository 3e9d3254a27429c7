// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Growable array whose metadata header lives in the same allocation as its elements.
//!
//! `HdrVec<T, A>` keeps a 16-byte header (`len`, `cap`) directly in front of the
//! element storage, inside one block obtained from a pluggable allocator. The
//! element storage always starts on a 16-byte boundary, whatever `T` is.
//!
//! # Core Guarantees
//!
//! - **One block**: header and elements move together on every growth and are
//!   released by a single deallocation through the allocator the vector was
//!   created with.
//! - **Amortized doubling**: capacity starts at 16 and doubles, so `N` pushes
//!   cost `O(N)` copies in total.
//! - **Bounded arithmetic**: capacity never exceeds [`MAX_CAPACITY`] and the
//!   block never exceeds [`VecConfig::max_size`]; both limits are checked before
//!   any allocation happens.
//! - **Fallible growth**: every operation that may allocate returns
//!   [`HdrVecError`]. Failures leave the vector untouched and are reported to the
//!   process-wide [error handler](set_error_handler) first.
//!
//! # Example: Basic Usage
//!
//! ```rust
//! use hdrvec::{HdrVec, HdrVecError};
//!
//! fn example() -> Result<(), HdrVecError> {
//!     let mut vec = HdrVec::new();
//!
//!     for i in 0..17u32 {
//!         vec.push(i)?;
//!     }
//!
//!     assert_eq!(vec.len(), 17);
//!     assert_eq!(vec.capacity(), 32);
//!     assert_eq!(vec.pop(), 16);
//!     assert_eq!(vec.pop_or(0), 15);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```
//!
//! # Example: Custom Resize Function
//!
//! A single `resize(block, size)` function can drive the vector: `None` asks for a
//! fresh block, a size of `0` releases the block.
//!
//! ```rust
//! use hdrvec::{HdrVec, HdrVecError, ResizeFnAllocator, platform_resize};
//!
//! fn example() -> Result<(), HdrVecError> {
//!     let mut vec = HdrVec::new_in(ResizeFnAllocator::new(platform_resize));
//!     vec.extend_from_slice(&[1u8, 2, 3])?;
//!
//!     assert_eq!(vec.as_slice(), &[1, 2, 3]);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```
//!
//! # Test Utilities
//!
//! Enable the `test_utils` feature to get an instrumented allocator with
//! injectable failures:
//!
//! ```toml
//! [dev-dependencies]
//! hdrvec = { version = "*", features = ["test_utils"] }
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]

extern crate alloc;

#[cfg(test)]
mod tests;

mod allocator;
mod config;
mod error;
mod error_handler;
mod growth;
mod layout;
mod vec;

#[cfg(unix)]
mod page_allocator;

#[cfg(any(test, feature = "test_utils"))]
mod test_utils;

pub use allocator::{
    RESIZE_FN_ALIGNMENT, RawAllocator, ResizeFn, ResizeFnAllocator, SystemAllocator,
    platform_resize,
};
pub use config::VecConfig;
pub use error::{AllocError, HdrVecError};
pub use error_handler::{ErrorHandler, abort_on_error, log_error, set_error_handler};
pub use layout::{DATA_ALIGNMENT, HEADER_SIZE, MAX_CAPACITY};
pub use vec::HdrVec;

#[cfg(unix)]
pub use page_allocator::PageAllocator;

#[cfg(any(test, feature = "test_utils"))]
pub use test_utils::{AllocatorBehaviour, TestAllocator, null_resize};
