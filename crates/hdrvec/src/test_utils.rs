// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Instrumented allocator for exercising error paths.

use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::NonNull;

use crate::allocator::{RawAllocator, SystemAllocator};
use crate::error::AllocError;

/// Failure injection for [`TestAllocator`].
///
/// The behaviour is sticky - once set, it remains active until changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocatorBehaviour {
    /// Normal behaviour - no injected failures.
    #[default]
    None,
    /// `allocate()` fails.
    FailAtAllocate,
    /// `grow()` fails.
    FailAtGrow,
    /// Both `allocate()` and `grow()` fail.
    FailAlways,
}

/// [`SystemAllocator`] wrapper that counts calls and can inject failures.
///
/// Counters use interior mutability, so share it by reference:
///
/// ```rust
/// use hdrvec::{AllocatorBehaviour, HdrVec, HdrVecError, TestAllocator};
///
/// let alloc = TestAllocator::new();
/// let mut vec = HdrVec::new_in(&alloc);
///
/// alloc.change_behaviour(AllocatorBehaviour::FailAtAllocate);
/// assert!(matches!(vec.push(1u8), Err(HdrVecError::OutOfMemory { .. })));
/// assert_eq!(alloc.failures(), 1);
/// ```
#[derive(Debug, Default)]
pub struct TestAllocator {
    behaviour: Cell<AllocatorBehaviour>,
    allocations: Cell<usize>,
    grows: Cell<usize>,
    deallocations: Cell<usize>,
    failures: Cell<usize>,
    live_bytes: Cell<usize>,
}

impl TestAllocator {
    /// Creates an allocator with [`AllocatorBehaviour::None`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator with the given behaviour.
    pub fn with_behaviour(behaviour: AllocatorBehaviour) -> Self {
        let alloc = Self::new();
        alloc.change_behaviour(behaviour);
        alloc
    }

    /// Changes the injected behaviour.
    pub fn change_behaviour(&self, behaviour: AllocatorBehaviour) {
        self.behaviour.set(behaviour);
    }

    /// Returns the active behaviour.
    pub fn behaviour(&self) -> AllocatorBehaviour {
        self.behaviour.get()
    }

    /// Successful `allocate()` calls.
    pub fn allocations(&self) -> usize {
        self.allocations.get()
    }

    /// Successful `grow()` calls.
    pub fn grows(&self) -> usize {
        self.grows.get()
    }

    /// `deallocate()` calls.
    pub fn deallocations(&self) -> usize {
        self.deallocations.get()
    }

    /// Injected failures.
    pub fn failures(&self) -> usize {
        self.failures.get()
    }

    /// Bytes currently allocated through this allocator.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.get()
    }

    /// Returns `true` if every allocated block has been released.
    pub fn is_balanced(&self) -> bool {
        self.allocations() == self.deallocations() && self.live_bytes() == 0
    }

    fn inject(&self, failing: AllocatorBehaviour) -> Result<(), AllocError> {
        let behaviour = self.behaviour.get();

        if behaviour == failing || behaviour == AllocatorBehaviour::FailAlways {
            self.failures.set(self.failures.get() + 1);
            return Err(AllocError);
        }

        Ok(())
    }
}

// SAFETY (PRECONDITIONS ARE MET): every block comes from SystemAllocator.
unsafe impl RawAllocator for TestAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.inject(AllocatorBehaviour::FailAtAllocate)?;

        let block = SystemAllocator.allocate(layout)?;
        self.allocations.set(self.allocations.get() + 1);
        self.live_bytes.set(self.live_bytes.get() + layout.size());

        Ok(block)
    }

    unsafe fn grow(
        &self,
        block: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<u8>, AllocError> {
        self.inject(AllocatorBehaviour::FailAtGrow)?;

        let grown = unsafe { SystemAllocator.grow(block, old_layout, new_layout) }?;
        self.grows.set(self.grows.get() + 1);
        self.live_bytes
            .set(self.live_bytes.get() - old_layout.size() + new_layout.size());

        Ok(grown)
    }

    unsafe fn deallocate(&self, block: NonNull<u8>, layout: Layout) {
        unsafe { SystemAllocator.deallocate(block, layout) };
        self.deallocations.set(self.deallocations.get() + 1);
        self.live_bytes.set(self.live_bytes.get() - layout.size());
    }
}

/// [`ResizeFn`](crate::ResizeFn) that never provides memory.
pub fn null_resize(_block: Option<NonNull<u8>>, _size: usize) -> Option<NonNull<u8>> {
    None
}
