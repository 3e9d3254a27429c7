// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Process-wide error handler.
//!
//! Every [`HdrVecError`] is passed to the active handler at the point where it is
//! detected, then returned to the caller. The default handler only logs; install
//! [`abort_on_error`] to make every failure fatal.
//!
//! The handler is meant to be configured once during start-up.

use core::mem;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::error::HdrVecError;

/// Callback invoked for every [`HdrVecError`].
pub type ErrorHandler = fn(&HdrVecError);

/// Null means "use the default handler".
static HANDLER: AtomicPtr<()> = AtomicPtr::new(ptr::null_mut());

/// Replaces the process-wide error handler.
///
/// Passing `None` restores the default handler ([`log_error`]).
///
/// # Example
///
/// ```rust
/// use hdrvec::{HdrVecError, set_error_handler};
///
/// fn count(_: &HdrVecError) {
///     // forward to metrics...
/// }
///
/// set_error_handler(Some(count));
/// set_error_handler(None);
/// ```
pub fn set_error_handler(handler: Option<ErrorHandler>) {
    let raw = handler.map_or(ptr::null_mut(), |h| h as *mut ());
    HANDLER.store(raw, Ordering::Release);
}

/// Passes `error` to the active handler.
pub(crate) fn report(error: &HdrVecError) {
    let raw = HANDLER.load(Ordering::Acquire);

    if raw.is_null() {
        log_error(error);
        return;
    }

    // SAFETY (PRECONDITIONS ARE MET): non-null values are only ever stored by
    // set_error_handler() from an ErrorHandler.
    let handler = unsafe { mem::transmute::<*mut (), ErrorHandler>(raw) };
    handler(error);
}

/// Reports `error` and returns it as `Err`.
#[cold]
#[inline(never)]
pub(crate) fn fail<T>(error: HdrVecError) -> Result<T, HdrVecError> {
    report(&error);
    Err(error)
}

/// Default handler: logs the error at `error` level.
pub fn log_error(error: &HdrVecError) {
    log::error!("hdrvec: {error}");
}

/// Logs the error, then aborts the process.
pub fn abort_on_error(error: &HdrVecError) {
    log_error(error);

    // SAFETY (PRECONDITIONS ARE MET): abort() has no preconditions.
    unsafe { libc::abort() }
}
