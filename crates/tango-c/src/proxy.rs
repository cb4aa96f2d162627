// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Device proxy handles.

use std::os::raw::c_char;
use std::sync::Once;

use parking_lot::Mutex;
use tango::{DevSource, DeviceProxy, TangoError, TangoResult};

use crate::alloc::{dup_string, free_string, required_string};
use crate::error::guarded;
use crate::types::{ErrorStack, TangoDevSource};

/// Opaque handle to a device proxy.
#[repr(C)]
pub struct TangoDeviceProxy {
    _private: [u8; 0],
}

/// Borrow the proxy behind a handle.
///
/// # Safety
/// `proxy` must be null or a live handle from `tango_create_device_proxy`.
pub(crate) unsafe fn device_proxy<'a>(
    proxy: *mut TangoDeviceProxy,
    origin: &str,
) -> TangoResult<&'a Mutex<DeviceProxy>> {
    proxy
        .cast::<Mutex<DeviceProxy>>()
        .as_ref()
        .ok_or_else(|| TangoError::invalid_args("device proxy handle is NULL", origin))
}

fn init_logger_once() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = env_logger::try_init();
    });
}

/// Connect to a device.
///
/// # Safety
/// `dev_name` must be a valid NUL-terminated string; `proxy` must be valid
/// for writes. On success `*proxy` holds a handle to release with
/// `tango_delete_device_proxy`.
#[no_mangle]
pub unsafe extern "C" fn tango_create_device_proxy(
    dev_name: *const c_char,
    proxy: *mut *mut TangoDeviceProxy,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_create_device_proxy";
    init_logger_once();
    guarded(ORIGIN, || {
        let name = required_string(dev_name, "dev_name", ORIGIN)?;
        if proxy.is_null() {
            return Err(TangoError::invalid_args("proxy is NULL", ORIGIN));
        }
        let device = DeviceProxy::new(&name)?;
        log::debug!("[tango-c] device proxy created for {}", name);
        *proxy = Box::into_raw(Box::new(Mutex::new(device))).cast::<TangoDeviceProxy>();
        Ok(())
    })
}

/// # Safety
/// `proxy` must be NULL or a handle from `tango_create_device_proxy` that
/// has not been deleted yet.
#[no_mangle]
pub unsafe extern "C" fn tango_delete_device_proxy(proxy: *mut TangoDeviceProxy) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_delete_device_proxy";
    guarded(ORIGIN, || {
        if !proxy.is_null() {
            let device = Box::from_raw(proxy.cast::<Mutex<DeviceProxy>>());
            log::debug!("[tango-c] device proxy for {} deleted", device.lock().name());
        }
        Ok(())
    })
}

/// # Safety
/// `proxy` from `tango_create_device_proxy`.
#[no_mangle]
pub unsafe extern "C" fn tango_set_timeout_millis(
    proxy: *mut TangoDeviceProxy,
    millis: i32,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_set_timeout_millis";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        let millis = u32::try_from(millis).map_err(|_| {
            TangoError::invalid_args(format!("negative timeout {millis}"), ORIGIN)
        })?;
        proxy.lock().set_timeout_millis(millis)
    })
}

/// # Safety
/// `proxy` from `tango_create_device_proxy`, `millis` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tango_get_timeout_millis(
    proxy: *mut TangoDeviceProxy,
    millis: *mut i32,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_get_timeout_millis";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        let Some(millis) = millis.as_mut() else {
            return Err(TangoError::invalid_args("millis is NULL", ORIGIN));
        };
        let current = proxy.lock().timeout_millis()?;
        *millis = i32::try_from(current).unwrap_or(i32::MAX);
        Ok(())
    })
}

/// # Safety
/// `proxy` from `tango_create_device_proxy`.
#[no_mangle]
pub unsafe extern "C" fn tango_set_source(
    proxy: *mut TangoDeviceProxy,
    source: TangoDevSource,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_set_source";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        let source = DevSource::from_code(source).ok_or_else(|| {
            TangoError::invalid_args(format!("Unknown DevSource code {source}"), ORIGIN)
        })?;
        proxy.lock().set_source(source)
    })
}

/// # Safety
/// `proxy` from `tango_create_device_proxy`, `source` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tango_get_source(
    proxy: *mut TangoDeviceProxy,
    source: *mut TangoDevSource,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_get_source";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        let Some(source) = source.as_mut() else {
            return Err(TangoError::invalid_args("source is NULL", ORIGIN));
        };
        *source = proxy.lock().source()?.code();
        Ok(())
    })
}

/// # Safety
/// `proxy` from `tango_create_device_proxy`.
#[no_mangle]
pub unsafe extern "C" fn tango_lock(proxy: *mut TangoDeviceProxy) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_lock";
    guarded(ORIGIN, || device_proxy(proxy, ORIGIN)?.lock().lock())
}

/// # Safety
/// `proxy` from `tango_create_device_proxy`.
#[no_mangle]
pub unsafe extern "C" fn tango_unlock(proxy: *mut TangoDeviceProxy) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_unlock";
    guarded(ORIGIN, || device_proxy(proxy, ORIGIN)?.lock().unlock())
}

/// # Safety
/// `proxy` from `tango_create_device_proxy`, `is_locked` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tango_is_locked(
    proxy: *mut TangoDeviceProxy,
    is_locked: *mut bool,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_is_locked";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        if is_locked.is_null() {
            return Err(TangoError::invalid_args("is_locked is NULL", ORIGIN));
        }
        *is_locked = proxy.lock().is_locked()?;
        Ok(())
    })
}

/// # Safety
/// `proxy` from `tango_create_device_proxy`, `is_locked_by_me` valid for
/// writes.
#[no_mangle]
pub unsafe extern "C" fn tango_is_locked_by_me(
    proxy: *mut TangoDeviceProxy,
    is_locked_by_me: *mut bool,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_is_locked_by_me";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        if is_locked_by_me.is_null() {
            return Err(TangoError::invalid_args("is_locked_by_me is NULL", ORIGIN));
        }
        *is_locked_by_me = proxy.lock().is_locked_by_me()?;
        Ok(())
    })
}

/// Human-readable lock status. Release the string with `tango_free_string`.
///
/// # Safety
/// `proxy` from `tango_create_device_proxy`, `lock_status` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tango_locking_status(
    proxy: *mut TangoDeviceProxy,
    lock_status: *mut *mut c_char,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_locking_status";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        if lock_status.is_null() {
            return Err(TangoError::invalid_args("lock_status is NULL", ORIGIN));
        }
        let status = proxy.lock().locking_status()?;
        *lock_status = dup_string(&status, ORIGIN)?;
        Ok(())
    })
}

/// # Safety
/// `string` must be NULL or a string returned by this library.
#[no_mangle]
pub unsafe extern "C" fn tango_free_string(mut string: *mut c_char) {
    free_string(&mut string);
}
