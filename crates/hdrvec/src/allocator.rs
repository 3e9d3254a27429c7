// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Allocator seam for [`HdrVec`](crate::HdrVec).
//!
//! Two contracts are supported:
//!
//! - [`RawAllocator`]: explicit `allocate` / `grow` / `deallocate` operations,
//!   used directly by the vector.
//! - [`ResizeFn`]: a single `resize(block, size)` function where `None` asks for
//!   a fresh block and a size of `0` releases the block. [`ResizeFnAllocator`]
//!   adapts it to [`RawAllocator`].

use core::alloc::Layout;
use core::fmt;
use core::ptr::{self, NonNull};

use crate::error::AllocError;
use crate::layout::DATA_ALIGNMENT;

/// Low-level memory source for header + element blocks.
///
/// # Safety
///
/// [`HdrVec`](crate::HdrVec) writes its header and elements through the returned
/// pointers without further checks. Implementors must guarantee that every block
/// returned by `allocate` or `grow`:
///
/// - is valid for reads and writes of at least `layout.size()` bytes,
/// - is aligned to `layout.align()`,
/// - stays valid until passed to `grow` or `deallocate`.
pub unsafe trait RawAllocator {
    /// Allocates a fresh block for `layout`.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Resizes `block` from `old_layout` to `new_layout`, in place or by relocation.
    ///
    /// The first `old_layout.size()` bytes are preserved. On `Err` the old block is
    /// left untouched and still belongs to the caller.
    ///
    /// # Safety
    ///
    /// `block` must have been returned by this allocator for `old_layout`, and
    /// `new_layout` must have the same alignment and a size of at least
    /// `old_layout.size()`.
    unsafe fn grow(
        &self,
        block: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<u8>, AllocError>;

    /// Releases `block`.
    ///
    /// # Safety
    ///
    /// `block` must have been returned by this allocator for `layout` and must not
    /// be used afterwards.
    unsafe fn deallocate(&self, block: NonNull<u8>, layout: Layout);
}

// SAFETY (PRECONDITIONS ARE MET): every call forwards to A, which upholds the contract.
unsafe impl<A> RawAllocator for &A
where
    A: RawAllocator + ?Sized,
{
    #[inline(always)]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline(always)]
    unsafe fn grow(
        &self,
        block: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<u8>, AllocError> {
        unsafe { (**self).grow(block, old_layout, new_layout) }
    }

    #[inline(always)]
    unsafe fn deallocate(&self, block: NonNull<u8>, layout: Layout) {
        unsafe { (**self).deallocate(block, layout) }
    }
}

/// The global Rust allocator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SystemAllocator;

// SAFETY (PRECONDITIONS ARE MET): the global allocator returns blocks of the
// requested layout.
unsafe impl RawAllocator for SystemAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() > 0, "blocks always contain a header");

        // SAFETY (PRECONDITIONS ARE MET): layout has a non-zero size.
        NonNull::new(unsafe { alloc::alloc::alloc(layout) }).ok_or(AllocError)
    }

    unsafe fn grow(
        &self,
        block: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<u8>, AllocError> {
        debug_assert_eq!(old_layout.align(), new_layout.align());

        // SAFETY (PRECONDITIONS ARE MET): the caller guarantees block came from
        // this allocator with old_layout; new_layout.size() was validated as a
        // Layout, so it does not overflow isize when rounded to the alignment.
        let grown = unsafe { alloc::alloc::realloc(block.as_ptr(), old_layout, new_layout.size()) };

        NonNull::new(grown).ok_or(AllocError)
    }

    unsafe fn deallocate(&self, block: NonNull<u8>, layout: Layout) {
        // SAFETY (PRECONDITIONS ARE MET): guaranteed by the caller.
        unsafe { alloc::alloc::dealloc(block.as_ptr(), layout) }
    }
}

/// Single-function allocator contract.
///
/// - `resize(None, size)` allocates a fresh block of `size` bytes.
/// - `resize(Some(block), 0)` releases `block`; the return value is ignored.
/// - `resize(Some(block), size)` resizes or relocates `block`, preserving its
///   contents up to the smaller of both sizes. Returning `None` signals failure
///   and leaves `block` valid.
///
/// Blocks must be aligned to at least [`RESIZE_FN_ALIGNMENT`] bytes.
pub type ResizeFn = fn(Option<NonNull<u8>>, usize) -> Option<NonNull<u8>>;

/// Largest block alignment a [`ResizeFn`] is expected to honour.
pub const RESIZE_FN_ALIGNMENT: usize = DATA_ALIGNMENT;

/// Adapts a [`ResizeFn`] to [`RawAllocator`].
///
/// A resize function only sees sizes, so layouts aligned beyond
/// [`RESIZE_FN_ALIGNMENT`] are refused with [`AllocError`]. A fresh block that
/// comes back misaligned is released and reported as [`AllocError`]; a resized
/// block that comes back misaligned is moved into a fresh aligned block.
#[derive(Clone, Copy)]
pub struct ResizeFnAllocator {
    resize: ResizeFn,
}

impl ResizeFnAllocator {
    /// Wraps `resize`.
    pub const fn new(resize: ResizeFn) -> Self {
        Self { resize }
    }

    /// Wraps [`platform_resize`], the C library's `realloc` / `free`.
    pub const fn platform() -> Self {
        Self::new(platform_resize)
    }

    /// Returns the wrapped function.
    pub fn resize_fn(&self) -> ResizeFn {
        self.resize
    }

    /// Moves the contents of a misaligned `grown` block into a fresh aligned one.
    ///
    /// The block `grown` came from can no longer be handed back to the caller, so
    /// when no aligned replacement is available the process aborts.
    #[cold]
    fn realign(&self, grown: NonNull<u8>, old_layout: Layout, new_layout: Layout) -> NonNull<u8> {
        log::warn!(
            "hdrvec: resize function returned a misaligned block of {} bytes, relocating",
            new_layout.size()
        );

        let Ok(fresh) = self.allocate(new_layout) else {
            alloc::alloc::handle_alloc_error(new_layout)
        };

        // SAFETY (PRECONDITIONS ARE MET): grown holds the old contents and fresh
        // was just allocated with at least old_layout.size() bytes; both are live
        // and distinct.
        unsafe { ptr::copy_nonoverlapping(grown.as_ptr(), fresh.as_ptr(), old_layout.size()) };
        let _ = (self.resize)(Some(grown), 0);

        fresh
    }
}

impl Default for ResizeFnAllocator {
    fn default() -> Self {
        Self::platform()
    }
}

impl fmt::Debug for ResizeFnAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeFnAllocator")
            .field("resize", &(self.resize as *const ()))
            .finish()
    }
}

// SAFETY (PRECONDITIONS ARE MET): sizes come from the resize function's own
// contract, and misaligned blocks are released (allocate) or relocated (grow)
// before they are returned.
unsafe impl RawAllocator for ResizeFnAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.align() > RESIZE_FN_ALIGNMENT {
            return Err(AllocError);
        }

        let block = (self.resize)(None, layout.size()).ok_or(AllocError)?;

        if (block.as_ptr() as usize) % layout.align() != 0 {
            let _ = (self.resize)(Some(block), 0);
            return Err(AllocError);
        }

        Ok(block)
    }

    unsafe fn grow(
        &self,
        block: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(new_layout.size() >= old_layout.size());

        let grown = (self.resize)(Some(block), new_layout.size()).ok_or(AllocError)?;

        if (grown.as_ptr() as usize) % new_layout.align() != 0 {
            return Ok(self.realign(grown, old_layout, new_layout));
        }

        Ok(grown)
    }

    unsafe fn deallocate(&self, block: NonNull<u8>, _layout: Layout) {
        let _ = (self.resize)(Some(block), 0);
    }
}

/// [`ResizeFn`] over the C library's `realloc` and `free`.
///
/// On 64-bit targets `malloc` returns 16-byte aligned blocks, which satisfies
/// [`RESIZE_FN_ALIGNMENT`]. Where it does not, [`ResizeFnAllocator`] refuses the
/// block instead of handing out misaligned storage.
pub fn platform_resize(block: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
    let old = block.map_or(ptr::null_mut(), |b| b.as_ptr().cast::<libc::c_void>());

    if size == 0 {
        // SAFETY (PRECONDITIONS ARE MET): old is null or a block from realloc.
        unsafe { libc::free(old) };
        return None;
    }

    // SAFETY (PRECONDITIONS ARE MET): old is null or a live block from realloc.
    NonNull::new(unsafe { libc::realloc(old, size) }.cast::<u8>())
}
