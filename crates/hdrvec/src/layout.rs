// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Block layout: a [`Header`] immediately followed by the element storage.
//!
//! ```text
//! block                              data (returned to HdrVec)
//! │                                  │
//! ▼                                  ▼
//! ┌───────────────┬──────────────────┬──────────────────────────────┐
//! │ padding (*)   │ Header len / cap │ cap * size_of::<T>() bytes   │
//! └───────────────┴──────────────────┴──────────────────────────────┘
//!                  ◄── HEADER_SIZE ──►
//! ```
//!
//! (*) Only present when `align_of::<T>() > DATA_ALIGNMENT`.

use core::alloc::Layout;
use core::mem;
use core::ptr::NonNull;

/// Alignment of the first element, independent of the element type.
pub const DATA_ALIGNMENT: usize = 16;

/// Largest element count a block can record.
///
/// Derived from the `u32` header fields, leaving a little headroom below
/// `u32::MAX`.
pub const MAX_CAPACITY: usize = u32::MAX as usize - 2;

/// Size in bytes of the header stored in front of the elements.
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

/// Metadata co-located with the element storage.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    pub(crate) len: u32,
    pub(crate) cap: u32,
}

const _: () = assert!(HEADER_SIZE == DATA_ALIGNMENT);
const _: () = assert!(mem::align_of::<Header>() == DATA_ALIGNMENT);

/// Offset of the element storage from the start of the block.
#[inline(always)]
pub(crate) const fn data_offset<T>() -> usize {
    // Both values are powers of two, so the larger one is a multiple of the other.
    if mem::align_of::<T>() > HEADER_SIZE {
        mem::align_of::<T>()
    } else {
        HEADER_SIZE
    }
}

/// Alignment of the whole block.
#[inline(always)]
pub(crate) const fn block_align<T>() -> usize {
    if mem::align_of::<T>() > DATA_ALIGNMENT {
        mem::align_of::<T>()
    } else {
        DATA_ALIGNMENT
    }
}

/// Layout of a block holding `capacity` elements, `None` on arithmetic overflow.
pub(crate) fn block_layout<T>(capacity: usize) -> Option<Layout> {
    let size = mem::size_of::<T>()
        .checked_mul(capacity)?
        .checked_add(data_offset::<T>())?;

    Layout::from_size_align(size, block_align::<T>()).ok()
}

/// Layout of a block that was already allocated with `capacity` elements.
///
/// # Safety
///
/// `block_layout::<T>(capacity)` must have succeeded before.
#[inline(always)]
pub(crate) unsafe fn live_block_layout<T>(capacity: usize) -> Layout {
    let size = data_offset::<T>() + mem::size_of::<T>() * capacity;

    // SAFETY (PRECONDITIONS ARE MET): the same size and alignment were validated
    // by block_layout() when the block was allocated.
    unsafe { Layout::from_size_align_unchecked(size, block_align::<T>()) }
}

/// Returns the header sitting right in front of `data`.
///
/// # Safety
///
/// `data` must point at the element storage of a live block.
#[inline(always)]
pub(crate) unsafe fn header_of<T>(data: NonNull<T>) -> NonNull<Header> {
    // SAFETY (PRECONDITIONS ARE MET): the header occupies the HEADER_SIZE bytes
    // immediately before the element storage of the same block.
    unsafe { data.cast::<u8>().sub(HEADER_SIZE).cast() }
}

/// Returns the start of the block owning `data`.
///
/// # Safety
///
/// `data` must point at the element storage of a live block.
#[inline(always)]
pub(crate) unsafe fn block_of<T>(data: NonNull<T>) -> NonNull<u8> {
    // SAFETY (PRECONDITIONS ARE MET): data was derived as block + data_offset.
    unsafe { data.cast::<u8>().sub(data_offset::<T>()) }
}

/// Returns the element storage of `block`.
///
/// # Safety
///
/// `block` must have been allocated with a layout from [`block_layout`].
#[inline(always)]
pub(crate) unsafe fn data_of<T>(block: NonNull<u8>) -> NonNull<T> {
    // SAFETY (PRECONDITIONS ARE MET): the block is at least data_offset bytes long.
    unsafe { block.add(data_offset::<T>()).cast() }
}

/// Reads the header of a live block.
///
/// # Safety
///
/// `data` must point at the element storage of a live block.
#[inline(always)]
pub(crate) unsafe fn read_header<T>(data: NonNull<T>) -> Header {
    unsafe { header_of(data).read() }
}
