// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Failure translation.
//!
//! Every boundary call returns `ErrorStack *`: null on success, an owned
//! stack on failure. The stack mirrors the native failure record by record,
//! in the same order. When a stack is returned the output container was not
//! written.

use std::alloc::{handle_alloc_error, Layout};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use tango::{DevError, TangoError, TangoResult};

use crate::alloc::{alloc_list, dup_string, free_list, free_string, Scratch};
use crate::types::{DevFailed, ErrorStack, Zeroed};

const ORIGIN: &str = "tango_translate_exception";
const REASON_INTERNAL: &str = "API_InternalError";

fn record_to_c(record: &DevError) -> TangoResult<DevFailed> {
    let mut out = Scratch::new(DevFailed::zeroed(), release_dev_failed);
    out.desc = dup_string(&record.desc, ORIGIN)?;
    out.reason = dup_string(&record.reason, ORIGIN)?;
    out.origin = dup_string(&record.origin, ORIGIN)?;
    out.severity = record.severity.code();
    Ok(out.publish())
}

unsafe fn release_dev_failed(record: &mut DevFailed) {
    free_string(&mut record.desc);
    free_string(&mut record.reason);
    free_string(&mut record.origin);
}

unsafe fn release_records(stack: &mut ErrorStack) {
    free_list(stack, release_dev_failed);
}

/// Running out of memory while reporting a failure aborts: returning null
/// would read as success.
fn oom() -> ! {
    handle_alloc_error(Layout::new::<ErrorStack>())
}

/// Heap-allocate the C form of `err`.
pub(crate) fn translate(err: &TangoError) -> *mut ErrorStack {
    let records = alloc_list(
        err.failures.iter().collect::<Vec<_>>(),
        record_to_c,
        release_records,
        ORIGIN,
    )
    .unwrap_or_else(|_| oom());

    // SAFETY: plain allocation, checked for null.
    let stack = unsafe { libc::malloc(std::mem::size_of::<ErrorStack>()) }.cast::<ErrorStack>();
    if stack.is_null() {
        oom();
    }
    // SAFETY: `stack` is a fresh, suitably sized allocation.
    unsafe { ptr::write(stack, records) };
    stack
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "unknown panic payload".to_string()
}

/// Run a boundary body: never unwinds into C, maps `Err` to a stack.
pub(crate) fn guarded(
    origin: &'static str,
    body: impl FnOnce() -> TangoResult<()>,
) -> *mut ErrorStack {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => ptr::null_mut(),
        Ok(Err(err)) if err.failures.is_empty() => {
            // An empty stack would still read as a failure with nothing to show.
            log::error!("{}: failure without records", origin);
            translate(&TangoError::new(
                REASON_INTERNAL,
                "failure without records",
                origin,
            ))
        }
        Ok(Err(err)) => {
            log::error!("{}: {}", origin, err);
            translate(&err)
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            log::error!("{}: panic: {}", origin, msg);
            translate(&TangoError::panic(msg, origin))
        }
    }
}

/// Release a stack returned by any `tango_*` call.
///
/// # Safety
/// `error_stack` must be null or a pointer returned by this library that
/// has not been released yet. The pointer itself is freed.
#[no_mangle]
pub unsafe extern "C" fn tango_free_ErrorStack(error_stack: *mut ErrorStack) {
    if error_stack.is_null() {
        return;
    }
    release_records(&mut *error_stack);
    libc::free(error_stack.cast::<libc::c_void>());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::read_string;
    use tango::ErrSeverity;

    #[test]
    fn records_keep_order_and_content() {
        let err = TangoError::new("API_First", "inner", "device")
            .push("API_Second", "outer", "proxy");
        let stack = translate(&err);
        assert!(!stack.is_null());
        unsafe {
            let records = (*stack).as_slice();
            assert_eq!(records.len(), 2);
            assert_eq!(read_string(records[0].reason), "API_First");
            assert_eq!(read_string(records[0].desc), "inner");
            assert_eq!(read_string(records[0].origin), "device");
            assert_eq!(records[0].severity, ErrSeverity::Err.code());
            assert_eq!(read_string(records[1].reason), "API_Second");
            tango_free_ErrorStack(stack);
        }
    }

    #[test]
    fn success_is_null() {
        assert!(guarded("test", || Ok(())).is_null());
    }

    #[test]
    fn failure_is_translated() {
        let stack = guarded("test", || Err(TangoError::data_type("command writing", "test")));
        unsafe {
            let records = (*stack).as_slice();
            assert_eq!(read_string(records[0].reason), "Data type error");
            tango_free_ErrorStack(stack);
        }
    }

    #[test]
    fn empty_failure_gets_a_record() {
        let stack = guarded("test", || Err(TangoError { failures: Vec::new() }));
        assert!(!stack.is_null());
        unsafe {
            let records = (*stack).as_slice();
            assert_eq!(records.len(), 1);
            assert_eq!(read_string(records[0].reason), REASON_INTERNAL);
            assert_eq!(read_string(records[0].origin), "test");
            assert_eq!(records[0].severity, ErrSeverity::Err.code());
            tango_free_ErrorStack(stack);
        }
    }

    #[test]
    fn panic_does_not_unwind() {
        let stack = guarded("test", || panic!("exploded"));
        unsafe {
            let records = (*stack).as_slice();
            assert_eq!(read_string(records[0].desc), "exploded");
            assert_eq!(records[0].severity, ErrSeverity::Panic.code());
            tango_free_ErrorStack(stack);
        }
    }

    #[test]
    fn free_null_is_noop() {
        unsafe { tango_free_ErrorStack(ptr::null_mut()) };
    }
}
