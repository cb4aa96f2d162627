// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Tango C bindings
//!
//! Flat, C-compatible containers and `extern "C"` entry points over the
//! native `tango` client model.
//!
//! Every entry point returns `ErrorStack *`: NULL on success, otherwise an
//! owned stack to release with `tango_free_ErrorStack`. When a stack is
//! returned the output container was not written and must not be read or
//! freed. Containers filled by the library are released with the matching
//! `tango_free_*` function; releasing twice is harmless.
//!
//! # Safety
//!
//! All pointer-taking functions are `unsafe` and require the caller to
//! uphold the invariants documented in each function's safety comment.

mod alloc;
mod attribute;
mod command;
mod consts;
mod dbase;
mod error;
mod logging;
mod property;
mod proxy;
mod types;

pub use attribute::*;
pub use command::*;
pub use consts::*;
pub use dbase::*;
pub use error::tango_free_ErrorStack;
pub use logging::*;
pub use property::*;
pub use proxy::*;
pub use types::*;

use std::os::raw::c_char;

/// Library version, NUL-terminated.
#[no_mangle]
pub extern "C" fn tango_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr().cast::<c_char>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn version_is_the_package_version() {
        let version = unsafe { CStr::from_ptr(tango_version()) };
        assert_eq!(version.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
    }
}
