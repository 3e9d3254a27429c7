// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Test utilities for hdrvec.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::HdrVecError;
use crate::error_handler::set_error_handler;

thread_local! {
    static REPORTED: Cell<usize> = const { Cell::new(0) };
    static LAST_REPORTED: Cell<Option<HdrVecError>> = const { Cell::new(None) };
}

/// Error handler recording reports for the current thread.
pub fn counting_handler(error: &HdrVecError) {
    REPORTED.with(|count| count.set(count.get() + 1));
    LAST_REPORTED.with(|last| last.set(Some(*error)));
}

/// Reports seen by [`counting_handler`] on this thread.
pub fn reported() -> usize {
    REPORTED.with(Cell::get)
}

/// Last error seen by [`counting_handler`] on this thread.
pub fn last_reported() -> Option<HdrVecError> {
    LAST_REPORTED.with(Cell::get)
}

/// Installs [`counting_handler`] until dropped, then restores the default handler.
///
/// Tests using it must be `#[serial(error_handler)]`.
pub struct CountingHandlerGuard;

impl CountingHandlerGuard {
    pub fn install() -> Self {
        REPORTED.with(|count| count.set(0));
        LAST_REPORTED.with(|last| last.set(None));
        set_error_handler(Some(counting_handler));

        Self
    }
}

impl Drop for CountingHandlerGuard {
    fn drop(&mut self) {
        set_error_handler(None);
    }
}

/// Element that counts how often it is dropped.
#[derive(Debug, Clone)]
pub struct DropCounter {
    drops: Rc<Cell<usize>>,
}

impl DropCounter {
    pub fn new(drops: &Rc<Cell<usize>>) -> Self {
        Self {
            drops: Rc::clone(drops),
        }
    }
}

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

/// Element aligned beyond `DATA_ALIGNMENT`.
#[repr(align(64))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Over64(pub u8);

/// Runs an ignored test as a subprocess and returns its exit code.
///
/// Returns `Some(-1)` when `test_name` matches no test.
#[cfg(unix)]
pub fn run_test_as_subprocess(test_name: &str) -> Option<i32> {
    let exe = std::env::current_exe().expect("Failed to current_exe()");
    let output = std::process::Command::new(exe)
        .args([
            "--exact",
            test_name,
            "--ignored",
            "--test-threads=1",
            "--nocapture",
        ])
        .output()
        .expect("Failed to run subprocess");

    if output.stdout.starts_with(b"\nrunning 0 tests") {
        return Some(-1);
    }

    output.status.code()
}

#[cfg(unix)]
#[test]
fn test_run_test_as_subprocess_detects_unknown_test() {
    let exit_code = run_test_as_subprocess("unknown::test");
    assert_eq!(exit_code, Some(-1));
}
