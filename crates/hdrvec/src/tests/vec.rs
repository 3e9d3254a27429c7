// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use std::cell::Cell;
use std::rc::Rc;

use serial_test::serial;

use crate::allocator::ResizeFnAllocator;
use crate::config::VecConfig;
use crate::error::HdrVecError;
use crate::layout::{DATA_ALIGNMENT, HEADER_SIZE, MAX_CAPACITY, header_of};
use crate::test_utils::{AllocatorBehaviour, TestAllocator, null_resize};
use crate::vec::HdrVec;

use super::utils::{CountingHandlerGuard, DropCounter, Over64, last_reported, reported};

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_init_without_capacity() {
    let mut vec = HdrVec::<u32>::new();
    vec.init(0).expect("Failed to init(..)");

    assert_eq!(vec.capacity(), 16);
    assert_eq!(vec.len(), 0);
    assert!(vec.is_initialized());
}

#[test]
fn test_seventeen_pushes_double_once() {
    let mut vec = HdrVec::new();

    for i in 0..17u64 {
        vec.push(i).expect("Failed to push(..)");
        assert_eq!(vec.len(), i as usize + 1);
        assert!(vec.capacity() >= vec.len());
    }

    assert_eq!(vec.capacity(), 32);
    assert_eq!(vec.len(), 17);
}

#[test]
fn test_push_then_pop() {
    let mut vec = HdrVec::new();
    vec.extend_from_slice(&[10, 20, 30])
        .expect("Failed to extend_from_slice(..)");

    assert_eq!(vec.pop(), 30);
    assert_eq!(vec.len(), 2);
    assert_eq!(vec.as_slice(), &[10, 20]);
}

#[test]
fn test_pop_or_on_empty() {
    let mut vec = HdrVec::<i32>::new();

    assert_eq!(vec.pop_or(-1), -1);
    assert_eq!(vec.len(), 0);
    assert!(!vec.is_initialized());

    vec.init(0).expect("Failed to init(..)");
    assert_eq!(vec.pop_or(-1), -1);
    assert_eq!(vec.len(), 0);
}

#[test]
#[serial(error_handler)]
fn test_init_above_max_capacity() {
    let _guard = CountingHandlerGuard::install();
    let alloc = TestAllocator::new();
    let mut vec = HdrVec::<u8, _>::new_in(&alloc);

    let result = vec.init(u32::MAX as usize);

    assert_eq!(
        result,
        Err(HdrVecError::CapacityLimitExceeded {
            requested: u32::MAX as usize,
            max: MAX_CAPACITY,
        })
    );
    assert_eq!(alloc.allocations(), 0);
    assert!(!vec.is_initialized());
    assert_eq!(reported(), 1);
}

#[test]
#[serial(error_handler)]
fn test_grow_failure_reported_once_at_seventeenth_push() {
    let _guard = CountingHandlerGuard::install();
    let alloc = TestAllocator::with_behaviour(AllocatorBehaviour::FailAtGrow);
    let mut vec = HdrVec::new_in(&alloc);

    for i in 0..16i32 {
        vec.push(i).expect("Failed to push(..)");
    }
    assert_eq!(reported(), 0);

    let result = vec.push(16);
    let expected = HdrVecError::OutOfMemory {
        bytes: HEADER_SIZE + 32 * 4,
    };

    assert_eq!(result.map(|v| *v), Err(expected));
    assert_eq!(reported(), 1);
    assert_eq!(last_reported(), Some(expected));

    // Failed growth leaves the vector untouched.
    assert_eq!(vec.len(), 16);
    assert_eq!(vec.capacity(), 16);
    assert_eq!(vec.as_slice(), (0..16).collect::<Vec<_>>().as_slice());
}

// =============================================================================
// init() / with_capacity()
// =============================================================================

#[test]
#[serial(error_handler)]
fn test_double_initialization() {
    let _guard = CountingHandlerGuard::install();
    let mut vec = HdrVec::<u8>::new();
    vec.init(0).expect("Failed to init(..)");
    vec.push(1).expect("Failed to push(..)");

    assert_eq!(vec.init(64), Err(HdrVecError::DoubleInitialization));
    assert_eq!(reported(), 1);
    assert_eq!(vec.capacity(), 16);
    assert_eq!(vec.as_slice(), &[1]);
}

#[test]
fn test_with_capacity_takes_the_larger_request() {
    let vec = HdrVec::<u16>::with_capacity(100).expect("Failed to with_capacity(..)");
    assert_eq!(vec.capacity(), 100);

    let vec = HdrVec::<u16>::with_capacity(3).expect("Failed to with_capacity(..)");
    assert_eq!(vec.capacity(), 16);
}

#[test]
fn test_custom_initial_capacity() {
    let mut vec = HdrVec::<u8>::with_config(VecConfig::default().with_initial_capacity(4));

    for i in 0..5 {
        vec.push(i).expect("Failed to push(..)");
    }

    assert_eq!(vec.capacity(), 8);
}

#[test]
fn test_max_size_below_first_block() {
    let alloc = TestAllocator::new();
    let mut vec = HdrVec::<u32, _>::with_config_in(VecConfig::new(64), &alloc);

    assert_eq!(
        vec.push(1).map(|v| *v),
        Err(HdrVecError::SizeLimitExceeded {
            requested: HEADER_SIZE + 16 * 4,
            max: 64,
        })
    );
    assert!(!vec.is_initialized());
    assert_eq!(alloc.allocations(), 0);
}

#[test]
fn test_resize_fn_without_memory() {
    let mut vec = HdrVec::<i32, _>::new_in(ResizeFnAllocator::new(null_resize));

    assert_eq!(
        vec.push(1).map(|v| *v),
        Err(HdrVecError::OutOfMemory {
            bytes: HEADER_SIZE + 16 * 4,
        })
    );
    assert_eq!(vec.len(), 0);
    assert!(!vec.is_initialized());
}

// =============================================================================
// fit() / grow()
// =============================================================================

#[test]
fn test_fit_grows_repeatedly() {
    let alloc = TestAllocator::new();
    let mut vec = HdrVec::<u8, _>::new_in(&alloc);

    vec.fit(100).expect("Failed to fit(..)");

    assert_eq!(vec.capacity(), 128);
    assert_eq!(vec.len(), 0);
    assert_eq!(alloc.allocations(), 1);
    assert_eq!(alloc.grows(), 3);

    vec.fit(128).expect("Failed to fit(..)");
    assert_eq!(alloc.grows(), 3);
}

#[test]
fn test_fit_above_max_capacity_allocates_nothing() {
    let alloc = TestAllocator::new();
    let mut vec = HdrVec::<u8, _>::new_in(&alloc);

    assert_eq!(
        vec.fit(MAX_CAPACITY + 1),
        Err(HdrVecError::CapacityLimitExceeded {
            requested: MAX_CAPACITY + 1,
            max: MAX_CAPACITY,
        })
    );
    assert_eq!(alloc.allocations(), 0);
}

#[test]
fn test_fit_keeps_steps_before_the_failure() {
    let alloc = TestAllocator::new();
    let mut vec = HdrVec::<u64, _>::with_config_in(VecConfig::new(HEADER_SIZE + 64 * 8), &alloc);

    assert!(matches!(
        vec.fit(100),
        Err(HdrVecError::SizeLimitExceeded { .. })
    ));
    assert_eq!(vec.capacity(), 64);

    drop(vec);
    assert!(alloc.is_balanced());
}

#[test]
fn test_grow_on_uninitialized_then_doubles() {
    let mut vec = HdrVec::<u32>::new();

    vec.grow().expect("Failed to grow()");
    assert_eq!(vec.capacity(), 16);

    vec.grow().expect("Failed to grow()");
    assert_eq!(vec.capacity(), 32);
}

#[test]
fn test_always_failing_allocator() {
    let alloc = TestAllocator::with_behaviour(AllocatorBehaviour::FailAlways);
    let mut vec = HdrVec::<u8, _>::new_in(&alloc);

    assert!(matches!(vec.grow(), Err(HdrVecError::OutOfMemory { .. })));
    assert!(!vec.is_initialized());
    assert_eq!(alloc.failures(), 1);
}

// =============================================================================
// push() / extend_from_slice()
// =============================================================================

#[test]
fn test_push_returns_stored_element() {
    let mut vec = HdrVec::new();

    let slot = vec.push(5u32).expect("Failed to push(..)");
    *slot += 1;

    assert_eq!(vec.peek(), &6);
}

#[test]
fn test_extend_from_slice_fits_once() {
    let alloc = TestAllocator::new();
    let mut vec = HdrVec::new_in(&alloc);
    let items: Vec<u32> = (0..40).collect();

    vec.extend_from_slice(&items)
        .expect("Failed to extend_from_slice(..)");

    assert_eq!(vec.capacity(), 64);
    assert_eq!(alloc.grows(), 2);
    assert_eq!(vec.as_slice(), items.as_slice());
}

#[test]
fn test_extend_from_slice_failure_appends_nothing() {
    let alloc = TestAllocator::new();
    let mut vec = HdrVec::new_in(&alloc);
    vec.push(1u8).expect("Failed to push(..)");

    alloc.change_behaviour(AllocatorBehaviour::FailAtGrow);

    assert!(vec.extend_from_slice(&[2u8; 20]).is_err());
    assert_eq!(vec.as_slice(), &[1]);
}

// =============================================================================
// pop() / peek() and friends
// =============================================================================

#[test]
#[should_panic(expected = "HdrVec::pop: vector is empty")]
fn test_pop_on_empty_panics() {
    let mut vec = HdrVec::<u8>::new();
    vec.pop();
}

#[test]
#[should_panic(expected = "HdrVec::peek: vector is empty")]
fn test_peek_on_empty_panics() {
    let vec = HdrVec::<u8>::new();
    vec.peek();
}

#[test]
fn test_peek_or_does_not_mutate() {
    let mut vec = HdrVec::new();
    assert_eq!(vec.peek_or(7), 7);

    vec.push(3).expect("Failed to push(..)");
    assert_eq!(vec.peek_or(7), 3);
    assert_eq!(vec.len(), 1);
}

#[test]
fn test_try_pop_and_last() {
    let mut vec = HdrVec::new();
    assert_eq!(vec.try_pop(), None);
    assert_eq!(vec.last(), None);

    vec.push('a').expect("Failed to push(..)");
    vec.push('b').expect("Failed to push(..)");

    assert_eq!(vec.last(), Some(&'b'));
    assert_eq!(vec.try_pop(), Some('b'));
    assert_eq!(vec.try_pop(), Some('a'));
    assert_eq!(vec.try_pop(), None);
    assert_eq!(vec.capacity(), 16);
}

// =============================================================================
// Element lifetimes
// =============================================================================

#[test]
fn test_drops_run_exactly_once() {
    let drops = Rc::new(Cell::new(0));
    let alloc = TestAllocator::new();

    {
        let mut vec = HdrVec::new_in(&alloc);
        for _ in 0..10 {
            vec.push(DropCounter::new(&drops)).expect("Failed to push(..)");
        }

        drop(vec.pop());
        assert_eq!(drops.get(), 1);

        vec.truncate(6);
        assert_eq!(drops.get(), 4);
        assert_eq!(vec.len(), 6);

        vec.truncate(8);
        assert_eq!(drops.get(), 4);

        vec.clear();
        assert_eq!(drops.get(), 10);
        assert_eq!(vec.capacity(), 16);

        for _ in 0..3 {
            vec.push(DropCounter::new(&drops)).expect("Failed to push(..)");
        }
        vec.free();
        assert_eq!(drops.get(), 13);

        vec.push(DropCounter::new(&drops)).expect("Failed to push(..)");
    }

    assert_eq!(drops.get(), 14);
    assert_eq!(alloc.allocations(), 2);
    assert!(alloc.is_balanced());
}

#[test]
fn test_push_failure_drops_value() {
    let drops = Rc::new(Cell::new(0));
    let alloc = TestAllocator::with_behaviour(AllocatorBehaviour::FailAtAllocate);
    let mut vec = HdrVec::new_in(&alloc);

    assert!(vec.push(DropCounter::new(&drops)).is_err());
    assert_eq!(drops.get(), 1);
}

// =============================================================================
// free()
// =============================================================================

#[test]
fn test_free_releases_one_block_and_allows_reinit() {
    let alloc = TestAllocator::new();
    let mut vec = HdrVec::new_in(&alloc);

    for i in 0..40u16 {
        vec.push(i).expect("Failed to push(..)");
    }
    vec.free();

    assert_eq!(alloc.deallocations(), 1);
    assert!(alloc.is_balanced());
    assert!(!vec.is_initialized());
    assert_eq!(vec.len(), 0);
    assert_eq!(vec.capacity(), 0);
    assert!(vec.as_slice().is_empty());

    vec.free();
    assert_eq!(alloc.deallocations(), 1);

    vec.init(0).expect("Failed to init(..)");
    assert_eq!(vec.capacity(), 16);
}

// =============================================================================
// Layout of the live block
// =============================================================================

#[test]
fn test_header_sits_in_front_of_data() {
    let mut vec = HdrVec::new();
    vec.extend_from_slice(&[1u8, 2, 3])
        .expect("Failed to extend_from_slice(..)");

    let data = core::ptr::NonNull::new(vec.as_mut_ptr()).expect("Failed to NonNull::new(..)");
    let header = unsafe { header_of(data) };

    assert_eq!(data.as_ptr() as usize - header.as_ptr() as usize, HEADER_SIZE);
    assert_eq!(unsafe { header.read() }.len, 3);
    assert_eq!(unsafe { header.read() }.cap, 16);
}

#[test]
fn test_data_alignment_across_element_types() {
    let mut bytes = HdrVec::new();
    bytes.push(1u8).expect("Failed to push(..)");
    assert_eq!(bytes.as_ptr() as usize % DATA_ALIGNMENT, 0);

    let mut triples = HdrVec::new();
    triples.push([1u8; 3]).expect("Failed to push(..)");
    assert_eq!(triples.as_ptr() as usize % DATA_ALIGNMENT, 0);

    let mut wide = HdrVec::new();
    wide.push(1u128).expect("Failed to push(..)");
    assert_eq!(wide.as_ptr() as usize % DATA_ALIGNMENT, 0);
}

#[cfg(target_pointer_width = "64")]
#[test]
fn test_data_alignment_across_growth_with_platform_resize() {
    let mut vec = HdrVec::new_in(ResizeFnAllocator::platform());

    for i in 0..300u16 {
        vec.push([i as u8; 3]).expect("Failed to push(..)");
        assert_eq!(vec.as_ptr() as usize % DATA_ALIGNMENT, 0);
    }

    assert_eq!(vec.capacity(), 512);
}

#[test]
fn test_over_aligned_elements() {
    let mut vec = HdrVec::new();

    for i in 0..20 {
        vec.push(Over64(i)).expect("Failed to push(..)");
    }

    assert_eq!(vec.as_ptr() as usize % 64, 0);
    assert_eq!(vec.capacity(), 32);
    assert_eq!(vec[19], Over64(19));
}

#[test]
fn test_zero_sized_elements() {
    let mut vec = HdrVec::new();

    for _ in 0..17 {
        vec.push(()).expect("Failed to push(..)");
    }

    assert_eq!(vec.len(), 17);
    assert_eq!(vec.capacity(), 32);

    vec.pop();
    assert_eq!(vec.len(), 16);
}

#[test]
fn test_end_bounds_the_elements() {
    let mut vec = HdrVec::<u32>::new();
    assert_eq!(vec.end(), vec.as_ptr());

    vec.extend_from_slice(&[1, 2, 3])
        .expect("Failed to extend_from_slice(..)");

    assert_eq!(vec.end(), vec.as_ptr().wrapping_add(3));
}

// =============================================================================
// Trait impls
// =============================================================================

#[test]
fn test_slice_access() {
    let mut vec = HdrVec::new();
    vec.extend_from_slice(&[3, 1, 2])
        .expect("Failed to extend_from_slice(..)");

    vec.sort();
    for value in &mut vec {
        *value *= 10;
    }

    assert_eq!(vec.iter().sum::<i32>(), 60);
    assert_eq!((&vec).into_iter().copied().collect::<Vec<_>>(), [10, 20, 30]);
}

#[test]
fn test_debug_output() {
    let mut vec = HdrVec::new();
    vec.extend_from_slice(&[1, 2])
        .expect("Failed to extend_from_slice(..)");

    assert_eq!(
        format!("{vec:?}"),
        "HdrVec { len: 2, capacity: 16, data: [1, 2] }"
    );
}

#[test]
fn test_default_is_uninitialized() {
    let vec: HdrVec<u8> = HdrVec::default();

    assert!(!vec.is_initialized());
    assert_eq!(vec.config(), &VecConfig::default());
}

#[test]
fn test_vec_is_send() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    assert_send::<HdrVec<u64>>();
    assert_sync::<HdrVec<u64>>();
}
