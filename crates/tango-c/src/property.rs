// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Property conversion and device properties.
//!
//! A property read is driven by the caller: each `DbDatum` slot names the
//! property and the tag to coerce it to. The slot is then overwritten with
//! an owned copy of the name and either a value or one of the two flags.

use tango::property::is_property_type;
use tango::{DataType, Extracted, PropertyValue, TangoError, TangoResult};

use crate::alloc::{
    alloc_array, alloc_string_array, dup_string, free_array, free_string, free_string_array,
    read_array, read_bool, read_string, read_strings, required_string, Scratch,
};
use crate::error::guarded;
use crate::proxy::device_proxy;
use crate::types::{DbData, DbDatum, ErrorStack, TangoPropertyData, Zeroed};
use crate::TangoDeviceProxy;

const READ_ORIGIN: &str = "tango_get_property";
const WRITE_ORIGIN: &str = "tango_put_property";

/// Flat form of `native` coerced to `requested`, still guarded.
pub(crate) fn datum_scratch(
    native: &tango::DbDatum,
    requested: u32,
) -> TangoResult<Scratch<DbDatum>> {
    const OP: &str = "property reading";
    let Some(tag) = DataType::from_code(requested) else {
        return Err(TangoError::unknown_tag(OP, requested, READ_ORIGIN));
    };
    if !is_property_type(tag) {
        return Err(TangoError::data_type(OP, READ_ORIGIN));
    }

    let mut out = Scratch::new(DbDatum::zeroed(), release_db_datum);
    out.data_type = requested;
    out.property_name = dup_string(&native.name, READ_ORIGIN)?;

    let value = match native.extract(tag)? {
        Extracted::Empty => {
            out.is_empty = true;
            return Ok(out);
        }
        Extracted::WrongType => {
            out.wrong_data_type = true;
            return Ok(out);
        }
        Extracted::Value(value) => value,
    };

    let p = &mut out.prop_data;
    match value {
        PropertyValue::Boolean(v) => p.bool_val = v,
        PropertyValue::UChar(v) => p.char_val = v,
        PropertyValue::Short(v) => p.short_val = v,
        PropertyValue::UShort(v) => p.ushort_val = v,
        PropertyValue::Long(v) => p.long_val = v,
        PropertyValue::ULong(v) => p.ulong_val = v,
        PropertyValue::Long64(v) => p.long64_val = v,
        PropertyValue::ULong64(v) => p.ulong64_val = v,
        PropertyValue::Float(v) => p.float_val = v,
        PropertyValue::Double(v) => p.double_val = v,
        PropertyValue::String(v) => p.string_val = dup_string(&v, READ_ORIGIN)?,
        PropertyValue::ShortArray(v) => p.short_arr = alloc_array(&v, READ_ORIGIN)?,
        PropertyValue::UShortArray(v) => p.ushort_arr = alloc_array(&v, READ_ORIGIN)?,
        PropertyValue::LongArray(v) => p.long_arr = alloc_array(&v, READ_ORIGIN)?,
        PropertyValue::ULongArray(v) => p.ulong_arr = alloc_array(&v, READ_ORIGIN)?,
        PropertyValue::Long64Array(v) => p.long64_arr = alloc_array(&v, READ_ORIGIN)?,
        PropertyValue::ULong64Array(v) => p.ulong64_arr = alloc_array(&v, READ_ORIGIN)?,
        PropertyValue::FloatArray(v) => p.float_arr = alloc_array(&v, READ_ORIGIN)?,
        PropertyValue::DoubleArray(v) => p.double_arr = alloc_array(&v, READ_ORIGIN)?,
        PropertyValue::StringArray(v) => p.string_arr = alloc_string_array(&v, READ_ORIGIN)?,
    }
    Ok(out)
}

pub(crate) fn datum_to_c(native: &tango::DbDatum, requested: u32) -> TangoResult<DbDatum> {
    datum_scratch(native, requested).map(Scratch::publish)
}

/// Native datum to store, read from a caller-owned container.
///
/// # Safety
/// `property_name` and the union arm selected by `data_type` must be null
/// or valid.
pub(crate) unsafe fn datum_from_c(datum: &DbDatum) -> TangoResult<tango::DbDatum> {
    const OP: &str = "property writing";
    let Some(tag) = DataType::from_code(datum.data_type) else {
        return Err(TangoError::unknown_tag(OP, datum.data_type, WRITE_ORIGIN));
    };
    let name = required_string(datum.property_name, "property_name", WRITE_ORIGIN)?;
    let p = &datum.prop_data;

    let value = match tag {
        DataType::Boolean => PropertyValue::Boolean(read_bool(&p.bool_val)),
        DataType::UChar => PropertyValue::UChar(p.char_val),
        DataType::Short => PropertyValue::Short(p.short_val),
        DataType::UShort => PropertyValue::UShort(p.ushort_val),
        DataType::Long => PropertyValue::Long(p.long_val),
        DataType::ULong => PropertyValue::ULong(p.ulong_val),
        DataType::Long64 => PropertyValue::Long64(p.long64_val),
        DataType::ULong64 => PropertyValue::ULong64(p.ulong64_val),
        DataType::Float => PropertyValue::Float(p.float_val),
        DataType::Double => PropertyValue::Double(p.double_val),
        DataType::String | DataType::ConstString => {
            PropertyValue::String(read_string(p.string_val))
        }
        DataType::ShortArray => {
            PropertyValue::ShortArray(read_array(p.short_arr.length, p.short_arr.sequence))
        }
        DataType::UShortArray => {
            PropertyValue::UShortArray(read_array(p.ushort_arr.length, p.ushort_arr.sequence))
        }
        DataType::LongArray => {
            PropertyValue::LongArray(read_array(p.long_arr.length, p.long_arr.sequence))
        }
        DataType::ULongArray => {
            PropertyValue::ULongArray(read_array(p.ulong_arr.length, p.ulong_arr.sequence))
        }
        DataType::Long64Array => {
            PropertyValue::Long64Array(read_array(p.long64_arr.length, p.long64_arr.sequence))
        }
        DataType::ULong64Array => {
            PropertyValue::ULong64Array(read_array(p.ulong64_arr.length, p.ulong64_arr.sequence))
        }
        DataType::FloatArray => {
            PropertyValue::FloatArray(read_array(p.float_arr.length, p.float_arr.sequence))
        }
        DataType::DoubleArray => {
            PropertyValue::DoubleArray(read_array(p.double_arr.length, p.double_arr.sequence))
        }
        DataType::StringArray => {
            PropertyValue::StringArray(read_strings(p.string_arr.length, p.string_arr.sequence))
        }
        _ => return Err(TangoError::data_type(OP, WRITE_ORIGIN)),
    };
    Ok(tango::DbDatum::with_value(name, &value))
}

pub(crate) unsafe fn release_db_datum(datum: &mut DbDatum) {
    free_string(&mut datum.property_name);
    let p = &mut datum.prop_data;
    match DataType::from_code(datum.data_type) {
        Some(DataType::String | DataType::ConstString) => free_string(&mut p.string_val),
        Some(DataType::ShortArray) => free_array(&mut p.short_arr),
        Some(DataType::UShortArray) => free_array(&mut p.ushort_arr),
        Some(DataType::LongArray) => free_array(&mut p.long_arr),
        Some(DataType::ULongArray) => free_array(&mut p.ulong_arr),
        Some(DataType::Long64Array) => free_array(&mut p.long64_arr),
        Some(DataType::ULong64Array) => free_array(&mut p.ulong64_arr),
        Some(DataType::FloatArray) => free_array(&mut p.float_arr),
        Some(DataType::DoubleArray) => free_array(&mut p.double_arr),
        Some(DataType::StringArray) => free_string_array(&mut p.string_arr),
        Some(_) => {}
        None => log::warn!(
            "tango_free_DbDatum: unknown tag {}, value not released",
            datum.data_type
        ),
    }
    datum.prop_data = TangoPropertyData::zeroed();
}

/// Names of the caller's slots.
///
/// # Safety
/// Each slot's `property_name` must be null or a valid string.
pub(crate) unsafe fn slot_names(slots: &[DbDatum], origin: &str) -> TangoResult<Vec<String>> {
    slots
        .iter()
        .map(|slot| required_string(slot.property_name, "property_name", origin))
        .collect()
}

/// Overwrite the caller's slots with `found`, coerced to each slot's tag.
/// Every slot is converted before any of them is written.
///
/// Each slot's `property_name` is replaced by a library-owned copy. The
/// string the caller passed in stays the caller's and is neither freed nor
/// written here; the new name is released by `tango_free_DbData` (or
/// `tango_free_DbDatum`), never by the caller directly. On failure no slot
/// is touched.
///
/// # Safety
/// `slots` must be the caller's `DbData` elements.
pub(crate) unsafe fn fill_slots(
    slots: &mut [DbDatum],
    found: &[tango::DbDatum],
    origin: &str,
) -> TangoResult<()> {
    if found.len() != slots.len() {
        return Err(TangoError::new(
            "API_PropertyCountMismatch",
            format!(
                "{} properties requested, {} returned",
                slots.len(),
                found.len()
            ),
            origin,
        ));
    }
    let converted = slots
        .iter()
        .zip(found)
        .map(|(slot, native)| datum_scratch(native, slot.data_type))
        .collect::<TangoResult<Vec<_>>>()?;
    for (slot, datum) in slots.iter_mut().zip(converted) {
        *slot = datum.publish();
    }
    Ok(())
}

/// # Safety
/// Every element must be a valid caller-owned datum.
pub(crate) unsafe fn data_from_c(list: &DbData) -> TangoResult<Vec<tango::DbDatum>> {
    list.as_slice().iter().map(|datum| datum_from_c(datum)).collect()
}

// =======================================================================
// Boundary
// =======================================================================

/// Release the name and value of one datum.
///
/// # Safety
/// `db_datum` must be NULL or filled by this library.
#[no_mangle]
pub unsafe extern "C" fn tango_free_DbDatum(db_datum: *mut DbDatum) {
    if let Some(datum) = db_datum.as_mut() {
        release_db_datum(datum);
    }
}

/// Release the contents of every datum. The sequence itself belongs to the
/// caller and is left in place.
///
/// # Safety
/// `db_data` must be NULL or a list whose elements were filled by this
/// library.
#[no_mangle]
pub unsafe extern "C" fn tango_free_DbData(db_data: *mut DbData) {
    if let Some(list) = db_data.as_mut() {
        for datum in list.as_mut_slice() {
            release_db_datum(datum);
        }
    }
}

/// Read device properties into the caller's slots.
///
/// On success every slot's name pointer is swapped for a library-owned copy;
/// the caller keeps ownership of the original name string. Release the
/// filled slots with `tango_free_DbData`.
///
/// # Safety
/// `proxy` from `tango_create_device_proxy`; `prop_list` a valid list whose
/// slots carry a property name and a requested tag.
#[no_mangle]
pub unsafe extern "C" fn tango_get_device_property(
    proxy: *mut TangoDeviceProxy,
    prop_list: *mut DbData,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_get_device_property";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        let Some(list) = prop_list.as_mut() else {
            return Err(TangoError::invalid_args("prop_list is NULL", ORIGIN));
        };
        let slots = list.as_mut_slice();
        let names = slot_names(slots, ORIGIN)?;
        let found = proxy.lock().get_property(&names)?;
        fill_slots(slots, &found, ORIGIN)
    })
}

/// # Safety
/// `proxy` from `tango_create_device_proxy`; `prop_list` a valid list.
#[no_mangle]
pub unsafe extern "C" fn tango_put_device_property(
    proxy: *mut TangoDeviceProxy,
    prop_list: *mut DbData,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_put_device_property";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        let Some(list) = prop_list.as_ref() else {
            return Err(TangoError::invalid_args("prop_list is NULL", ORIGIN));
        };
        let properties = data_from_c(list)?;
        proxy.lock().put_property(properties)
    })
}

/// Only the names of the slots are read.
///
/// # Safety
/// `proxy` from `tango_create_device_proxy`; `prop_list` a valid list.
#[no_mangle]
pub unsafe extern "C" fn tango_delete_device_property(
    proxy: *mut TangoDeviceProxy,
    prop_list: *mut DbData,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_delete_device_property";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        let Some(list) = prop_list.as_ref() else {
            return Err(TangoError::invalid_args("prop_list is NULL", ORIGIN));
        };
        let names = slot_names(list.as_slice(), ORIGIN)?;
        proxy.lock().delete_property(&names)
    })
}
