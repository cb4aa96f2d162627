// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Database proxy handles, listing queries and free-object properties.

use std::os::raw::c_char;

use parking_lot::Mutex;
use tango::{DataType, DatabaseProxy, TangoError, TangoResult};

use crate::alloc::required_string;
use crate::error::guarded;
use crate::property::{data_from_c, datum_to_c, fill_slots, slot_names};
use crate::types::{DbData, DbDatum, ErrorStack};

/// Opaque handle to a database proxy.
#[repr(C)]
pub struct TangoDatabaseProxy {
    _private: [u8; 0],
}

unsafe fn database_proxy<'a>(
    db_proxy: *mut TangoDatabaseProxy,
    origin: &str,
) -> TangoResult<&'a Mutex<DatabaseProxy>> {
    db_proxy
        .cast::<Mutex<DatabaseProxy>>()
        .as_ref()
        .ok_or_else(|| TangoError::invalid_args("database proxy handle is NULL", origin))
}

/// Run a listing query and store its result as a string sequence.
unsafe fn listing(
    db_proxy: *mut TangoDatabaseProxy,
    out: *mut DbDatum,
    origin: &'static str,
    query: impl FnOnce(&mut DatabaseProxy) -> TangoResult<tango::DbDatum>,
) -> *mut ErrorStack {
    guarded(origin, || {
        let db = database_proxy(db_proxy, origin)?;
        if out.is_null() {
            return Err(TangoError::invalid_args("output datum is NULL", origin));
        }
        let found = query(&mut db.lock())?;
        *out = datum_to_c(&found, DataType::StringArray.code())?;
        Ok(())
    })
}

/// Connect to the database named by `TANGO_HOST`.
///
/// # Safety
/// `db_proxy` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tango_create_database_proxy(
    db_proxy: *mut *mut TangoDatabaseProxy,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_create_database_proxy";
    guarded(ORIGIN, || {
        if db_proxy.is_null() {
            return Err(TangoError::invalid_args("db_proxy is NULL", ORIGIN));
        }
        let db = DatabaseProxy::new()?;
        log::debug!("[tango-c] database proxy created");
        *db_proxy = Box::into_raw(Box::new(Mutex::new(db))).cast::<TangoDatabaseProxy>();
        Ok(())
    })
}

/// # Safety
/// `db_proxy` must be NULL or a live handle from
/// `tango_create_database_proxy`.
#[no_mangle]
pub unsafe extern "C" fn tango_delete_database_proxy(
    db_proxy: *mut TangoDatabaseProxy,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_delete_database_proxy";
    guarded(ORIGIN, || {
        if !db_proxy.is_null() {
            drop(Box::from_raw(db_proxy.cast::<Mutex<DatabaseProxy>>()));
            log::debug!("[tango-c] database proxy deleted");
        }
        Ok(())
    })
}

/// Exported devices matching `name_filter` (`*` wildcards).
///
/// # Safety
/// `db_proxy` from `tango_create_database_proxy`, `name_filter` a valid
/// string, `dev_list` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tango_get_device_exported(
    db_proxy: *mut TangoDatabaseProxy,
    name_filter: *const c_char,
    dev_list: *mut DbDatum,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_get_device_exported";
    listing(db_proxy, dev_list, ORIGIN, |db| {
        let filter = required_string(name_filter, "name_filter", ORIGIN)?;
        db.get_device_exported(&filter)
    })
}

/// # Safety
/// `db_proxy` from `tango_create_database_proxy`, `class_name` a valid
/// string, `dev_list` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tango_get_device_exported_for_class(
    db_proxy: *mut TangoDatabaseProxy,
    class_name: *const c_char,
    dev_list: *mut DbDatum,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_get_device_exported_for_class";
    listing(db_proxy, dev_list, ORIGIN, |db| {
        let class = required_string(class_name, "class_name", ORIGIN)?;
        db.get_device_exported_for_class(&class)
    })
}

/// Free objects matching `name_filter`.
///
/// # Safety
/// `db_proxy` from `tango_create_database_proxy`, `name_filter` a valid
/// string, `obj_list` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tango_get_object_list(
    db_proxy: *mut TangoDatabaseProxy,
    name_filter: *const c_char,
    obj_list: *mut DbDatum,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_get_object_list";
    listing(db_proxy, obj_list, ORIGIN, |db| {
        let filter = required_string(name_filter, "name_filter", ORIGIN)?;
        db.get_object_list(&filter)
    })
}

/// # Safety
/// `db_proxy` from `tango_create_database_proxy`, `obj_name` and
/// `name_filter` valid strings, `prop_list` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tango_get_object_property_list(
    db_proxy: *mut TangoDatabaseProxy,
    obj_name: *const c_char,
    name_filter: *const c_char,
    prop_list: *mut DbDatum,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_get_object_property_list";
    listing(db_proxy, prop_list, ORIGIN, |db| {
        let object = required_string(obj_name, "obj_name", ORIGIN)?;
        let filter = required_string(name_filter, "name_filter", ORIGIN)?;
        db.get_object_property_list(&object, &filter)
    })
}

/// Read free-object properties into the caller's slots.
///
/// Slot names are replaced as in `tango_get_device_property`: the caller
/// keeps its own name strings and releases the filled slots with
/// `tango_free_DbData`.
///
/// # Safety
/// `db_proxy` from `tango_create_database_proxy`, `obj_name` a valid
/// string, `prop_list` a valid list of named, tagged slots.
#[no_mangle]
pub unsafe extern "C" fn tango_get_property(
    db_proxy: *mut TangoDatabaseProxy,
    obj_name: *const c_char,
    prop_list: *mut DbData,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_get_property";
    guarded(ORIGIN, || {
        let db = database_proxy(db_proxy, ORIGIN)?;
        let object = required_string(obj_name, "obj_name", ORIGIN)?;
        let Some(list) = prop_list.as_mut() else {
            return Err(TangoError::invalid_args("prop_list is NULL", ORIGIN));
        };
        let slots = list.as_mut_slice();
        let names = slot_names(slots, ORIGIN)?;
        let found = db.lock().get_property(&object, &names)?;
        fill_slots(slots, &found, ORIGIN)
    })
}

/// # Safety
/// `db_proxy` from `tango_create_database_proxy`, `obj_name` a valid
/// string, `prop_list` a valid list.
#[no_mangle]
pub unsafe extern "C" fn tango_put_property(
    db_proxy: *mut TangoDatabaseProxy,
    obj_name: *const c_char,
    prop_list: *mut DbData,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_put_property";
    guarded(ORIGIN, || {
        let db = database_proxy(db_proxy, ORIGIN)?;
        let object = required_string(obj_name, "obj_name", ORIGIN)?;
        let Some(list) = prop_list.as_ref() else {
            return Err(TangoError::invalid_args("prop_list is NULL", ORIGIN));
        };
        let properties = data_from_c(list)?;
        db.lock().put_property(&object, properties)
    })
}

/// # Safety
/// `db_proxy` from `tango_create_database_proxy`, `obj_name` a valid
/// string, `prop_list` a valid list.
#[no_mangle]
pub unsafe extern "C" fn tango_delete_property(
    db_proxy: *mut TangoDatabaseProxy,
    obj_name: *const c_char,
    prop_list: *mut DbData,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_delete_property";
    guarded(ORIGIN, || {
        let db = database_proxy(db_proxy, ORIGIN)?;
        let object = required_string(obj_name, "obj_name", ORIGIN)?;
        let Some(list) = prop_list.as_ref() else {
            return Err(TangoError::invalid_args("prop_list is NULL", ORIGIN));
        };
        let names = slot_names(list.as_slice(), ORIGIN)?;
        db.lock().delete_property(&object, &names)
    })
}
