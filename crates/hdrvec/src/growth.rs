// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Capacity and growth engine.
//!
//! Computes capacities, validates them against [`MAX_CAPACITY`] and
//! [`VecConfig::max_size`], calls the allocator, and writes the header into the
//! (possibly relocated) block. Every failure is reported exactly once, here.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::allocator::RawAllocator;
use crate::config::VecConfig;
use crate::error::HdrVecError;
use crate::error_handler::fail;
use crate::layout::{
    Header, MAX_CAPACITY, block_layout, block_of, data_of, header_of, live_block_layout,
    read_header,
};

/// Validates `capacity` and returns the layout of a block holding it.
pub(crate) fn checked_block_layout<T>(
    capacity: usize,
    config: &VecConfig,
) -> Result<Layout, HdrVecError> {
    if capacity > MAX_CAPACITY {
        return fail(HdrVecError::CapacityLimitExceeded {
            requested: capacity,
            max: MAX_CAPACITY,
        });
    }

    match block_layout::<T>(capacity) {
        Some(layout) if layout.size() <= config.max_size => Ok(layout),
        Some(layout) => fail(HdrVecError::SizeLimitExceeded {
            requested: layout.size(),
            max: config.max_size,
        }),
        None => fail(HdrVecError::SizeLimitExceeded {
            requested: usize::MAX,
            max: config.max_size,
        }),
    }
}

/// Capacity after one growth step of `old_capacity`.
///
/// The limit is checked on the pre-multiplication value so the product is never
/// computed overflowed.
pub(crate) fn grown_capacity(old_capacity: usize) -> Result<usize, HdrVecError> {
    if old_capacity > MAX_CAPACITY / VecConfig::GROWTH_MULTIPLIER {
        return fail(HdrVecError::CapacityLimitExceeded {
            requested: old_capacity.saturating_mul(VecConfig::GROWTH_MULTIPLIER),
            max: MAX_CAPACITY,
        });
    }

    Ok(old_capacity * VecConfig::GROWTH_MULTIPLIER)
}

/// Allocates an empty block for at least `requested` elements and returns its
/// element storage.
pub(crate) fn init_block<T, A>(
    alloc: &A,
    config: &VecConfig,
    requested: usize,
) -> Result<NonNull<T>, HdrVecError>
where
    A: RawAllocator,
{
    let capacity = config.initial_capacity_for(requested);
    let layout = checked_block_layout::<T>(capacity, config)?;

    let Ok(block) = alloc.allocate(layout) else {
        return fail(HdrVecError::OutOfMemory {
            bytes: layout.size(),
        });
    };

    // SAFETY (PRECONDITIONS ARE MET): block was allocated with a block_layout().
    let data = unsafe { data_of::<T>(block) };

    // SAFETY (PRECONDITIONS ARE MET): the header slot lies inside the block and
    // is suitably aligned (DATA_ALIGNMENT divides data_offset).
    unsafe {
        header_of(data).write(Header {
            len: 0,
            cap: capacity as u32,
        })
    };

    log::trace!(
        "hdrvec: initialized block of {} bytes (capacity {capacity})",
        layout.size()
    );

    Ok(data)
}

/// Doubles the capacity of the block owning `data` and returns the new element
/// storage.
///
/// On error the block owning `data` is left untouched.
///
/// # Safety
///
/// `data` must point at the element storage of a live block allocated by `alloc`
/// for element type `T`.
pub(crate) unsafe fn grow_block<T, A>(
    alloc: &A,
    config: &VecConfig,
    data: NonNull<T>,
) -> Result<NonNull<T>, HdrVecError>
where
    A: RawAllocator,
{
    // SAFETY (PRECONDITIONS ARE MET): guaranteed by the caller.
    let header = unsafe { read_header(data) };
    let old_capacity = header.cap as usize;

    let new_capacity = grown_capacity(old_capacity)?;
    let new_layout = checked_block_layout::<T>(new_capacity, config)?;

    // SAFETY (PRECONDITIONS ARE MET): the block was allocated for old_capacity.
    let old_layout = unsafe { live_block_layout::<T>(old_capacity) };
    // SAFETY (PRECONDITIONS ARE MET): guaranteed by the caller.
    let block = unsafe { block_of(data) };

    // SAFETY (PRECONDITIONS ARE MET): block came from alloc with old_layout;
    // new_layout has the same alignment and is larger.
    let Ok(new_block) = (unsafe { alloc.grow(block, old_layout, new_layout) }) else {
        return fail(HdrVecError::OutOfMemory {
            bytes: new_layout.size(),
        });
    };

    // SAFETY (PRECONDITIONS ARE MET): new_block was allocated with a block_layout().
    let new_data = unsafe { data_of::<T>(new_block) };

    // SAFETY (PRECONDITIONS ARE MET): the header was carried over by grow() and
    // sits in front of new_data.
    unsafe {
        header_of(new_data).write(Header {
            len: header.len,
            cap: new_capacity as u32,
        })
    };

    log::trace!(
        "hdrvec: grew block {} -> {} elements ({} -> {} bytes, relocated: {})",
        old_capacity,
        new_capacity,
        old_layout.size(),
        new_layout.size(),
        new_block != block
    );

    Ok(new_data)
}

/// Releases the block owning `data`.
///
/// # Safety
///
/// `data` must point at the element storage of a live block allocated by `alloc`
/// for element type `T`, whose elements have already been dropped. The block
/// must not be used afterwards.
pub(crate) unsafe fn free_block<T, A>(alloc: &A, data: NonNull<T>)
where
    A: RawAllocator,
{
    // SAFETY (PRECONDITIONS ARE MET): guaranteed by the caller.
    let capacity = unsafe { read_header(data) }.cap as usize;
    // SAFETY (PRECONDITIONS ARE MET): the block was allocated for capacity.
    let layout = unsafe { live_block_layout::<T>(capacity) };

    // SAFETY (PRECONDITIONS ARE MET): guaranteed by the caller.
    unsafe { alloc.deallocate(block_of(data), layout) };

    log::trace!("hdrvec: released block of {} bytes", layout.size());
}
