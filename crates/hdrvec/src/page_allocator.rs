// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! PageAllocator - `mmap`-backed blocks.
//!
//! Each block is an anonymous private mapping rounded up to whole pages, so the
//! block start is page-aligned. Optionally the pages are locked in RAM.

use core::alloc::Layout;
use core::ptr::{self, NonNull};

use crate::allocator::RawAllocator;
use crate::error::AllocError;

/// Allocator handing out whole-page `mmap` mappings.
///
/// # Example
///
/// ```rust
/// #[cfg(unix)]
/// fn example() -> Result<(), hdrvec::HdrVecError> {
///     use hdrvec::{HdrVec, PageAllocator};
///
///     let mut vec = HdrVec::new_in(PageAllocator::new());
///     vec.push(1u64)?;
///
///     assert_eq!(vec.as_ptr() as usize % hdrvec::DATA_ALIGNMENT, 0);
///     Ok(())
/// }
/// # #[cfg(unix)]
/// # example().unwrap();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageAllocator {
    page_size: usize,
    lock: bool,
}

impl PageAllocator {
    /// Creates an allocator whose pages may be swapped.
    pub fn new() -> Self {
        // SAFETY (PRECONDITIONS ARE MET): sysconf has no preconditions.
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;

        Self {
            page_size,
            lock: false,
        }
    }

    /// Creates an allocator that `mlock`s every mapping.
    ///
    /// Allocation fails with [`AllocError`] when the pages cannot be locked
    /// (e.g. `RLIMIT_MEMLOCK` reached).
    pub fn locked() -> Self {
        Self {
            lock: true,
            ..Self::new()
        }
    }

    /// Returns the system page size used for rounding.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns `true` if mappings are locked in RAM.
    pub fn is_locked(&self) -> bool {
        self.lock
    }

    fn mapping_len(&self, size: usize) -> Option<usize> {
        size.checked_next_multiple_of(self.page_size)
    }

    fn map(&self, len: usize) -> Result<NonNull<u8>, AllocError> {
        // SAFETY (PRECONDITIONS ARE MET): anonymous mapping, no file descriptor.
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(AllocError);
        }

        let block = NonNull::new(ptr.cast::<u8>()).ok_or(AllocError)?;

        if self.lock {
            // SAFETY (PRECONDITIONS ARE MET): block spans exactly len bytes.
            let failed = unsafe { libc::mlock(block.as_ptr() as *const _, len) } != 0;

            if failed {
                // SAFETY (PRECONDITIONS ARE MET): block was just mapped with len.
                unsafe { libc::munmap(block.as_ptr().cast(), len) };
                return Err(AllocError);
            }
        }

        Ok(block)
    }

    /// # Safety
    ///
    /// `block` must be a mapping of `len` bytes created by [`Self::map`].
    unsafe fn unmap(&self, block: NonNull<u8>, len: usize) {
        if self.lock {
            unsafe { libc::munlock(block.as_ptr() as *const _, len) };
        }

        unsafe { libc::munmap(block.as_ptr().cast(), len) };
    }
}

impl Default for PageAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY (PRECONDITIONS ARE MET): mappings are page-aligned, rounded up to whole
// pages, and alignments above the page size are refused.
unsafe impl RawAllocator for PageAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.align() > self.page_size {
            return Err(AllocError);
        }

        let len = self.mapping_len(layout.size()).ok_or(AllocError)?;
        self.map(len)
    }

    unsafe fn grow(
        &self,
        block: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<u8>, AllocError> {
        let old_len = self.mapping_len(old_layout.size()).ok_or(AllocError)?;
        let new_len = self.mapping_len(new_layout.size()).ok_or(AllocError)?;

        if new_len <= old_len {
            return Ok(block);
        }

        let new_block = self.map(new_len)?;

        // SAFETY (PRECONDITIONS ARE MET): both mappings are live, distinct, and
        // at least old_layout.size() bytes long.
        unsafe {
            ptr::copy_nonoverlapping(block.as_ptr(), new_block.as_ptr(), old_layout.size());
            self.unmap(block, old_len);
        }

        Ok(new_block)
    }

    unsafe fn deallocate(&self, block: NonNull<u8>, layout: Layout) {
        // Layout sizes were already rounded successfully in allocate()/grow().
        let len = layout.size().next_multiple_of(self.page_size);

        // SAFETY (PRECONDITIONS ARE MET): guaranteed by the caller.
        unsafe { self.unmap(block, len) };
    }
}
