// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};
use core::slice;

use crate::allocator::{RawAllocator, SystemAllocator};
use crate::config::VecConfig;
use crate::error::HdrVecError;
use crate::error_handler::fail;
use crate::growth::{free_block, grow_block, init_block};
use crate::layout::{MAX_CAPACITY, header_of, read_header};

/// Growable array whose header shares one allocation with its elements.
///
/// An uninitialized (or freed) vector owns no memory and reports a length and
/// capacity of `0`. The first [`init()`](Self::init) or growth allocates a block
/// through `A`; every later growth and the final release go through the same
/// allocator.
///
/// # Example
///
/// ```rust
/// use hdrvec::{HdrVec, HdrVecError};
///
/// fn example() -> Result<(), HdrVecError> {
///     let mut vec = HdrVec::new();
///     vec.push(10)?;
///     vec.push(20)?;
///     vec.push(30)?;
///
///     assert_eq!(vec.pop(), 30);
///     assert_eq!(vec.len(), 2);
///     assert_eq!(vec.peek_or(-1), 20);
///     Ok(())
/// }
/// # example().unwrap();
/// ```
pub struct HdrVec<T, A = SystemAllocator>
where
    A: RawAllocator,
{
    data: Option<NonNull<T>>,
    alloc: A,
    config: VecConfig,
    _marker: PhantomData<T>,
}

// Safety: HdrVec exclusively owns its block; access follows &self / &mut self.
unsafe impl<T: Send, A: RawAllocator + Send> Send for HdrVec<T, A> {}
unsafe impl<T: Sync, A: RawAllocator + Sync> Sync for HdrVec<T, A> {}

impl<T> HdrVec<T> {
    /// Creates an uninitialized vector backed by [`SystemAllocator`].
    pub fn new() -> Self {
        Self::new_in(SystemAllocator)
    }

    /// Creates an uninitialized vector with `config`, backed by [`SystemAllocator`].
    pub fn with_config(config: VecConfig) -> Self {
        Self::with_config_in(config, SystemAllocator)
    }

    /// Creates a vector holding at least `capacity` elements.
    ///
    /// # Errors
    ///
    /// See [`init()`](Self::init).
    pub fn with_capacity(capacity: usize) -> Result<Self, HdrVecError> {
        Self::with_capacity_in(capacity, SystemAllocator)
    }
}

impl<T, A> HdrVec<T, A>
where
    A: RawAllocator,
{
    /// Creates an uninitialized vector backed by `alloc`.
    pub fn new_in(alloc: A) -> Self {
        Self::with_config_in(VecConfig::default(), alloc)
    }

    /// Creates an uninitialized vector with `config`, backed by `alloc`.
    pub fn with_config_in(config: VecConfig, alloc: A) -> Self {
        Self {
            data: None,
            alloc,
            config,
            _marker: PhantomData,
        }
    }

    /// Creates a vector holding at least `capacity` elements, backed by `alloc`.
    ///
    /// # Errors
    ///
    /// See [`init()`](Self::init).
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Result<Self, HdrVecError> {
        let mut vec = Self::new_in(alloc);
        vec.init(capacity)?;

        Ok(vec)
    }

    /// Allocates the first block, sized for
    /// `max(config.initial_capacity, requested_capacity)` elements.
    ///
    /// # Errors
    ///
    /// - [`HdrVecError::DoubleInitialization`] if the vector already owns a block.
    /// - [`HdrVecError::CapacityLimitExceeded`] if the capacity exceeds
    ///   [`MAX_CAPACITY`].
    /// - [`HdrVecError::SizeLimitExceeded`] if the block exceeds
    ///   [`VecConfig::max_size`].
    /// - [`HdrVecError::OutOfMemory`] if the allocator fails.
    pub fn init(&mut self, requested_capacity: usize) -> Result<(), HdrVecError> {
        if self.data.is_some() {
            return fail(HdrVecError::DoubleInitialization);
        }

        self.data = Some(init_block(&self.alloc, &self.config, requested_capacity)?);

        Ok(())
    }

    /// Returns `true` if the vector owns a block.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.data.is_some()
    }

    /// Returns the number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        match self.data {
            // SAFETY (PRECONDITIONS ARE MET): data points into our live block.
            Some(data) => unsafe { read_header(data) }.len as usize,
            None => 0,
        }
    }

    /// Returns `true` if the vector holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of elements the current block can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        match self.data {
            // SAFETY (PRECONDITIONS ARE MET): data points into our live block.
            Some(data) => unsafe { read_header(data) }.cap as usize,
            None => 0,
        }
    }

    /// Returns the allocator backing this vector.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Returns the sizing parameters of this vector.
    pub fn config(&self) -> &VecConfig {
        &self.config
    }

    /// Makes room for `required_len` elements, growing as often as needed.
    ///
    /// Does nothing if the capacity already suffices. An uninitialized vector is
    /// initialized first.
    ///
    /// # Errors
    ///
    /// [`HdrVecError::CapacityLimitExceeded`], [`HdrVecError::SizeLimitExceeded`]
    /// or [`HdrVecError::OutOfMemory`]. The vector is unchanged by the failing
    /// step; growth steps that succeeded before it are kept.
    pub fn fit(&mut self, required_len: usize) -> Result<(), HdrVecError> {
        self.fit_data(required_len).map(|_| ())
    }

    /// Doubles the capacity, or initializes an uninitialized vector with the
    /// default capacity.
    ///
    /// # Errors
    ///
    /// Same as [`fit()`](Self::fit).
    pub fn grow(&mut self) -> Result<(), HdrVecError> {
        match self.data {
            // SAFETY (PRECONDITIONS ARE MET): data points into our live block,
            // allocated by self.alloc for T.
            Some(data) => self.data = Some(unsafe { grow_block(&self.alloc, &self.config, data) }?),
            None => self.init(0)?,
        }

        Ok(())
    }

    fn fit_data(&mut self, required_len: usize) -> Result<NonNull<T>, HdrVecError> {
        if let Some(data) = self.data {
            // SAFETY (PRECONDITIONS ARE MET): data points into our live block.
            if required_len <= unsafe { read_header(data) }.cap as usize {
                return Ok(data);
            }
        }

        if required_len > MAX_CAPACITY {
            return fail(HdrVecError::CapacityLimitExceeded {
                requested: required_len,
                max: MAX_CAPACITY,
            });
        }

        let mut data = match self.data {
            Some(data) => data,
            None => {
                let data = init_block(&self.alloc, &self.config, 0)?;
                self.data = Some(data);
                data
            }
        };

        // SAFETY (PRECONDITIONS ARE MET): data always points into our live block;
        // it is stored back after every successful step.
        while (unsafe { read_header(data) }.cap as usize) < required_len {
            // SAFETY (PRECONDITIONS ARE MET): data points into our live block,
            // allocated by self.alloc for T; on error that block is untouched.
            data = unsafe { grow_block(&self.alloc, &self.config, data) }?;
            self.data = Some(data);
        }

        Ok(data)
    }

    /// Appends `value` and returns a reference to the stored element.
    ///
    /// # Errors
    ///
    /// Same as [`fit()`](Self::fit). On error `value` is dropped and the vector
    /// is unchanged.
    pub fn push(&mut self, value: T) -> Result<&mut T, HdrVecError> {
        let data = self.fit_data(self.len() + 1)?;
        // SAFETY (PRECONDITIONS ARE MET): data points into our live block.
        let header = unsafe { header_of(data) }.as_ptr();

        // SAFETY (PRECONDITIONS ARE MET): fit_data() guarantees len < cap, so slot
        // `len` lies inside the element storage and is uninitialized.
        unsafe {
            let len = (*header).len as usize;
            let slot = data.add(len);
            slot.write(value);
            (*header).len += 1;

            Ok(&mut *slot.as_ptr())
        }
    }

    /// Appends clones of every element of `items`.
    ///
    /// Capacity is fitted once for the whole slice.
    ///
    /// # Errors
    ///
    /// Same as [`fit()`](Self::fit). On error nothing is appended.
    pub fn extend_from_slice(&mut self, items: &[T]) -> Result<(), HdrVecError>
    where
        T: Clone,
    {
        let Some(required_len) = self.len().checked_add(items.len()) else {
            return fail(HdrVecError::CapacityLimitExceeded {
                requested: usize::MAX,
                max: MAX_CAPACITY,
            });
        };

        let data = self.fit_data(required_len)?;
        // SAFETY (PRECONDITIONS ARE MET): data points into our live block.
        let header = unsafe { header_of(data) }.as_ptr();

        for item in items {
            // SAFETY (PRECONDITIONS ARE MET): capacity covers required_len; the
            // length is bumped per element so a panicking clone leaks nothing.
            unsafe {
                let len = (*header).len as usize;
                data.add(len).write(item.clone());
                (*header).len += 1;
            }
        }

        Ok(())
    }

    /// Removes and returns the last element.
    ///
    /// # Panics
    ///
    /// Panics if the vector is empty. Use [`try_pop()`](Self::try_pop) or
    /// [`pop_or()`](Self::pop_or) when emptiness is possible.
    pub fn pop(&mut self) -> T {
        match self.try_pop() {
            Some(value) => value,
            None => panic!("HdrVec::pop: vector is empty"),
        }
    }

    /// Removes and returns the last element, or `None` if the vector is empty.
    pub fn try_pop(&mut self) -> Option<T> {
        let data = self.data?;
        // SAFETY (PRECONDITIONS ARE MET): data points into our live block.
        let header = unsafe { header_of(data) }.as_ptr();

        // SAFETY (PRECONDITIONS ARE MET): the element at len - 1 is initialized;
        // the length is decremented first so it is read out exactly once.
        unsafe {
            if (*header).len == 0 {
                return None;
            }

            (*header).len -= 1;
            Some(data.add((*header).len as usize).read())
        }
    }

    /// Removes and returns the last element, or `default` if the vector is empty.
    pub fn pop_or(&mut self, default: T) -> T {
        self.try_pop().unwrap_or(default)
    }

    /// Returns the last element.
    ///
    /// # Panics
    ///
    /// Panics if the vector is empty. Use [`last()`](Self::last) or
    /// [`peek_or()`](Self::peek_or) when emptiness is possible.
    pub fn peek(&self) -> &T {
        match self.last() {
            Some(value) => value,
            None => panic!("HdrVec::peek: vector is empty"),
        }
    }

    /// Returns a clone of the last element, or `default` if the vector is empty.
    pub fn peek_or(&self, default: T) -> T
    where
        T: Clone,
    {
        self.last().cloned().unwrap_or(default)
    }

    /// Shortens the vector to `new_len` elements, dropping the rest.
    ///
    /// Does nothing if `new_len >= len()`. The capacity is kept.
    pub fn truncate(&mut self, new_len: usize) {
        let Some(data) = self.data else {
            return;
        };
        // SAFETY (PRECONDITIONS ARE MET): data points into our live block.
        let header = unsafe { header_of(data) }.as_ptr();

        // SAFETY (PRECONDITIONS ARE MET): elements in new_len..len are initialized;
        // the length is lowered before dropping so a panicking Drop cannot cause
        // a double drop.
        unsafe {
            let len = (*header).len as usize;
            if new_len >= len {
                return;
            }

            (*header).len = new_len as u32;
            let tail = ptr::slice_from_raw_parts_mut(data.add(new_len).as_ptr(), len - new_len);
            ptr::drop_in_place(tail);
        }
    }

    /// Drops every element. The capacity and the block are kept.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Drops every element and releases the block through the allocator.
    ///
    /// Afterwards the vector is uninitialized: it reports a length and capacity of
    /// `0` and may be initialized again.
    pub fn free(&mut self) {
        self.clear();

        if let Some(data) = self.data.take() {
            // SAFETY (PRECONDITIONS ARE MET): data points into our live block,
            // allocated by self.alloc for T, and holds no elements anymore.
            unsafe { free_block(&self.alloc, data) };
        }
    }

    /// Returns a raw pointer to the first element.
    ///
    /// Dangling (but aligned) when the vector is uninitialized.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.data.unwrap_or(NonNull::dangling()).as_ptr()
    }

    /// Returns a raw mutable pointer to the first element.
    ///
    /// Dangling (but aligned) when the vector is uninitialized.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.data.unwrap_or(NonNull::dangling()).as_ptr()
    }

    /// Returns a pointer one past the last element.
    ///
    /// Only meaningful as an exclusive iteration bound; never dereference it.
    #[inline]
    pub fn end(&self) -> *const T {
        self.as_slice().as_ptr_range().end
    }

    /// Returns the last element, or `None` if the vector is empty.
    #[inline]
    pub fn last(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// Returns the elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY (PRECONDITIONS ARE MET): the first len() elements are initialized;
        // as_ptr() is non-null and aligned even when uninitialized.
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len()) }
    }

    /// Returns the elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.len();

        // SAFETY (PRECONDITIONS ARE MET): see as_slice(); &mut self is exclusive.
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), len) }
    }
}

impl<T, A> Drop for HdrVec<T, A>
where
    A: RawAllocator,
{
    fn drop(&mut self) {
        self.free();
    }
}

impl<T, A> Default for HdrVec<T, A>
where
    A: RawAllocator + Default,
{
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T, A> Deref for HdrVec<T, A>
where
    A: RawAllocator,
{
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T, A> DerefMut for HdrVec<T, A>
where
    A: RawAllocator,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<'a, T, A> IntoIterator for &'a HdrVec<T, A>
where
    A: RawAllocator,
{
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<'a, T, A> IntoIterator for &'a mut HdrVec<T, A>
where
    A: RawAllocator,
{
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}

impl<T, A> fmt::Debug for HdrVec<T, A>
where
    T: fmt::Debug,
    A: RawAllocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdrVec")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("data", &self.as_slice())
            .finish()
    }
}
