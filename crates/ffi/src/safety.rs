// Panic boundary for C entry points

use std::panic::{catch_unwind, AssertUnwindSafe};

pub const OK: i32 = 0;
pub const ERR_NOT_STARTED: i32 = -1;
pub const ERR_INVALID_ARG: i32 = -2;
pub const ERR_INTERNAL: i32 = -99;

/// Run an entry point body; a panic becomes `ERR_INTERNAL`.
///
/// Shared state behind the boundary uses `parking_lot::Mutex`, which does not
/// poison, so unwinding through a held guard leaves it usable.
pub fn ffi_boundary<F>(name: &str, f: F) -> i32
where
    F: FnOnce() -> i32,
{
    ffi_boundary_or(name, ERR_INTERNAL, f)
}

pub fn ffi_boundary_or<T, F>(name: &str, default: T, f: F) -> T
where
    F: FnOnce() -> T,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            log::error!("[ffi] panic caught in {}", name);
            default
        }
    }
}
