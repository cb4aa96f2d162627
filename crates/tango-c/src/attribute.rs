// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Attribute reading, writing and configuration.
//!
//! The payload union only has sequence arms: a scalar travels as a
//! one-element sequence and `data_format` tells the two apart. The tag is
//! always the element type (`DEV_DOUBLE`, never `DEVVAR_DOUBLEARRAY`).

use std::os::raw::c_char;

use tango::config::STATE_ATTRIBUTE;
use tango::{
    AttrDataFormat, AttrQuality, AttrValue, DataType, DevEncoded, DevState, TangoError,
    TangoResult, TimeVal,
};

use crate::alloc::{
    alloc_array, alloc_encoded_array, alloc_list, alloc_string_array, dup_string, free_array,
    free_encoded_array, free_list, free_string, free_string_array, read_array, read_bools,
    read_encoded_array, read_strings, required_string, Scratch,
};
use crate::command::decode_state;
use crate::error::guarded;
use crate::proxy::device_proxy;
use crate::types::{
    AttributeData, AttributeDataList, AttributeInfo, AttributeInfoList, ErrorStack,
    TangoAttributeData, VarStringArray, Zeroed,
};
use crate::TangoDeviceProxy;

const READ_ORIGIN: &str = "tango_read_attribute";
const WRITE_ORIGIN: &str = "tango_write_attribute";

fn dimension(value: usize) -> TangoResult<i32> {
    i32::try_from(value).map_err(|_| TangoError::too_large(value, READ_ORIGIN))
}

fn state_shape_mismatch(name: &str, delivered: &str) -> TangoError {
    TangoError::new(
        "API_IncompatibleAttrArgumentType",
        format!("Cannot extract attribute {name} as a state sequence: {delivered} delivered"),
        READ_ORIGIN,
    )
}

/// Flat form of a reading.
///
/// Metadata is always copied. An `ATTR_INVALID` reading keeps its tag but
/// leaves the payload empty.
pub(crate) fn attribute_to_c(reading: tango::AttributeData) -> TangoResult<AttributeData> {
    let mut out = Scratch::new(AttributeData::zeroed(), release_attribute_data);
    out.data_type = reading.data_type().code();
    out.data_format = reading.format.code();
    out.quality = reading.quality.code();
    out.name = dup_string(&reading.name, READ_ORIGIN)?;
    out.dim_x = dimension(reading.dim_x)?;
    out.dim_y = dimension(reading.dim_y)?;
    out.time_stamp = libc::timeval {
        tv_sec: reading.time_stamp.tv_sec as libc::time_t,
        tv_usec: reading.time_stamp.tv_usec as libc::suseconds_t,
    };

    if reading.quality == AttrQuality::Invalid {
        return Ok(out.publish());
    }

    // The built-in State attribute arrives as a lone scalar; every other
    // state attribute is read as a sequence.
    let is_state_attribute = reading.name == STATE_ATTRIBUTE;

    macro_rules! put {
        ($slot:expr, $arr:expr) => {{
            let arr = $arr;
            $slot = arr;
            arr.length
        }};
    }

    let d = &mut out.attr_data;
    let count = match reading.data {
        AttrValue::Boolean(v) => put!(d.bool_arr, alloc_array(&[v], READ_ORIGIN)?),
        AttrValue::UChar(v) => put!(d.char_arr, alloc_array(&[v], READ_ORIGIN)?),
        AttrValue::Short(v) => put!(d.short_arr, alloc_array(&[v], READ_ORIGIN)?),
        AttrValue::UShort(v) => put!(d.ushort_arr, alloc_array(&[v], READ_ORIGIN)?),
        AttrValue::Long(v) => put!(d.long_arr, alloc_array(&[v], READ_ORIGIN)?),
        AttrValue::ULong(v) => put!(d.ulong_arr, alloc_array(&[v], READ_ORIGIN)?),
        AttrValue::Long64(v) => put!(d.long64_arr, alloc_array(&[v], READ_ORIGIN)?),
        AttrValue::ULong64(v) => put!(d.ulong64_arr, alloc_array(&[v], READ_ORIGIN)?),
        AttrValue::Float(v) => put!(d.float_arr, alloc_array(&[v], READ_ORIGIN)?),
        AttrValue::Double(v) => put!(d.double_arr, alloc_array(&[v], READ_ORIGIN)?),
        AttrValue::String(v) => put!(d.string_arr, alloc_string_array(&[v], READ_ORIGIN)?),
        AttrValue::Encoded(v) => put!(d.encoded_arr, alloc_encoded_array(&[v], READ_ORIGIN)?),
        AttrValue::State(v) => {
            if !is_state_attribute {
                return Err(state_shape_mismatch(&reading.name, "scalar"));
            }
            put!(d.state_arr, alloc_array(&[v.code()], READ_ORIGIN)?)
        }

        AttrValue::BooleanArray(v) => put!(d.bool_arr, alloc_array(&v, READ_ORIGIN)?),
        AttrValue::UCharArray(v) => put!(d.char_arr, alloc_array(&v, READ_ORIGIN)?),
        AttrValue::ShortArray(v) => put!(d.short_arr, alloc_array(&v, READ_ORIGIN)?),
        AttrValue::UShortArray(v) => put!(d.ushort_arr, alloc_array(&v, READ_ORIGIN)?),
        AttrValue::LongArray(v) => put!(d.long_arr, alloc_array(&v, READ_ORIGIN)?),
        AttrValue::ULongArray(v) => put!(d.ulong_arr, alloc_array(&v, READ_ORIGIN)?),
        AttrValue::Long64Array(v) => put!(d.long64_arr, alloc_array(&v, READ_ORIGIN)?),
        AttrValue::ULong64Array(v) => put!(d.ulong64_arr, alloc_array(&v, READ_ORIGIN)?),
        AttrValue::FloatArray(v) => put!(d.float_arr, alloc_array(&v, READ_ORIGIN)?),
        AttrValue::DoubleArray(v) => put!(d.double_arr, alloc_array(&v, READ_ORIGIN)?),
        AttrValue::StringArray(v) => put!(d.string_arr, alloc_string_array(&v, READ_ORIGIN)?),
        AttrValue::EncodedArray(v) => {
            put!(d.encoded_arr, alloc_encoded_array(&v, READ_ORIGIN)?)
        }
        AttrValue::StateArray(v) => {
            if is_state_attribute {
                return Err(state_shape_mismatch(&reading.name, "sequence"));
            }
            let codes: Vec<u32> = v.iter().map(|s| s.code()).collect();
            put!(d.state_arr, alloc_array(&codes, READ_ORIGIN)?)
        }
    };
    out.nb_read = count as libc::c_long;
    Ok(out.publish())
}

/// Pick the scalar or the sequence variant for a payload.
fn shaped<T>(
    mut values: Vec<T>,
    scalar: bool,
    one: fn(T) -> AttrValue,
    many: fn(Vec<T>) -> AttrValue,
) -> AttrValue {
    if scalar && values.len() == 1 {
        if let Some(value) = values.pop() {
            return one(value);
        }
    }
    many(values)
}

/// Native value to write, read from a caller-owned container.
///
/// # Safety
/// The sequence selected by `data_type` and `name` must be null or valid.
pub(crate) unsafe fn attribute_from_c(attr: &AttributeData) -> TangoResult<tango::AttributeData> {
    const OP: &str = "attribute writing";
    let Some(tag) = DataType::from_code(attr.data_type) else {
        return Err(TangoError::unknown_tag(OP, attr.data_type, WRITE_ORIGIN));
    };
    let format = AttrDataFormat::from_code(attr.data_format).ok_or_else(|| {
        TangoError::invalid_args(
            format!("Unknown AttrDataFormat code {}", attr.data_format),
            WRITE_ORIGIN,
        )
    })?;
    let quality = AttrQuality::from_code(attr.quality).ok_or_else(|| {
        TangoError::invalid_args(
            format!("Unknown AttrQuality code {}", attr.quality),
            WRITE_ORIGIN,
        )
    })?;
    let name = required_string(attr.name, "attribute name", WRITE_ORIGIN)?;
    let scalar = format == AttrDataFormat::Scalar;
    let d = &attr.attr_data;

    let data = match tag {
        DataType::Boolean => shaped(
            read_bools(d.bool_arr.length, d.bool_arr.sequence),
            scalar,
            AttrValue::Boolean,
            AttrValue::BooleanArray,
        ),
        DataType::UChar => shaped(
            read_array(d.char_arr.length, d.char_arr.sequence),
            scalar,
            AttrValue::UChar,
            AttrValue::UCharArray,
        ),
        DataType::Short => shaped(
            read_array(d.short_arr.length, d.short_arr.sequence),
            scalar,
            AttrValue::Short,
            AttrValue::ShortArray,
        ),
        DataType::UShort => shaped(
            read_array(d.ushort_arr.length, d.ushort_arr.sequence),
            scalar,
            AttrValue::UShort,
            AttrValue::UShortArray,
        ),
        DataType::Long => shaped(
            read_array(d.long_arr.length, d.long_arr.sequence),
            scalar,
            AttrValue::Long,
            AttrValue::LongArray,
        ),
        DataType::ULong => shaped(
            read_array(d.ulong_arr.length, d.ulong_arr.sequence),
            scalar,
            AttrValue::ULong,
            AttrValue::ULongArray,
        ),
        DataType::Long64 => shaped(
            read_array(d.long64_arr.length, d.long64_arr.sequence),
            scalar,
            AttrValue::Long64,
            AttrValue::Long64Array,
        ),
        DataType::ULong64 => shaped(
            read_array(d.ulong64_arr.length, d.ulong64_arr.sequence),
            scalar,
            AttrValue::ULong64,
            AttrValue::ULong64Array,
        ),
        DataType::Float => shaped(
            read_array(d.float_arr.length, d.float_arr.sequence),
            scalar,
            AttrValue::Float,
            AttrValue::FloatArray,
        ),
        DataType::Double => shaped(
            read_array(d.double_arr.length, d.double_arr.sequence),
            scalar,
            AttrValue::Double,
            AttrValue::DoubleArray,
        ),
        DataType::String => shaped(
            read_strings(d.string_arr.length, d.string_arr.sequence),
            scalar,
            AttrValue::String,
            AttrValue::StringArray,
        ),
        DataType::Encoded => shaped::<DevEncoded>(
            read_encoded_array(&d.encoded_arr),
            scalar,
            AttrValue::Encoded,
            AttrValue::EncodedArray,
        ),
        DataType::State => {
            let states = read_array(d.state_arr.length, d.state_arr.sequence)
                .into_iter()
                .map(|code| decode_state(code, WRITE_ORIGIN))
                .collect::<TangoResult<Vec<DevState>>>()?;
            shaped(states, scalar, AttrValue::State, AttrValue::StateArray)
        }
        _ => return Err(TangoError::data_type(OP, WRITE_ORIGIN)),
    };

    // Callers often leave the dimensions at zero; the payload knows better.
    let dim_x = usize::try_from(attr.dim_x)
        .ok()
        .filter(|x| *x > 0)
        .unwrap_or_else(|| data.len());
    let dim_y = usize::try_from(attr.dim_y).unwrap_or(0);

    Ok(tango::AttributeData {
        data,
        format,
        quality,
        name,
        dim_x,
        dim_y,
        time_stamp: TimeVal {
            tv_sec: attr.time_stamp.tv_sec as i64,
            tv_usec: attr.time_stamp.tv_usec as i64,
        },
    })
}

unsafe fn release_attribute_data(attr: &mut AttributeData) {
    free_string(&mut attr.name);
    let d = &mut attr.attr_data;
    match DataType::from_code(attr.data_type) {
        Some(DataType::Boolean) => free_array(&mut d.bool_arr),
        Some(DataType::UChar) => free_array(&mut d.char_arr),
        Some(DataType::Short) => free_array(&mut d.short_arr),
        Some(DataType::UShort) => free_array(&mut d.ushort_arr),
        Some(DataType::Long) => free_array(&mut d.long_arr),
        Some(DataType::ULong) => free_array(&mut d.ulong_arr),
        Some(DataType::Long64) => free_array(&mut d.long64_arr),
        Some(DataType::ULong64) => free_array(&mut d.ulong64_arr),
        Some(DataType::Float) => free_array(&mut d.float_arr),
        Some(DataType::Double) => free_array(&mut d.double_arr),
        Some(DataType::String) => free_string_array(&mut d.string_arr),
        Some(DataType::State) => free_array(&mut d.state_arr),
        Some(DataType::Encoded) => free_encoded_array(&mut d.encoded_arr),
        Some(_) => {}
        None => log::warn!(
            "tango_free_AttributeData: unknown tag {}, payload not released",
            attr.data_type
        ),
    }
    attr.attr_data = TangoAttributeData::zeroed();
    attr.nb_read = 0;
}

unsafe fn release_attribute_data_list(list: &mut AttributeDataList) {
    free_list(list, release_attribute_data);
}

fn attribute_info_to_c(info: tango::AttributeInfo) -> TangoResult<AttributeInfo> {
    const ORIGIN: &str = "tango_get_attribute_config";
    let mut out = Scratch::new(AttributeInfo::zeroed(), release_attribute_info);
    out.name = dup_string(&info.name, ORIGIN)?;
    out.writable = info.writable.code();
    out.data_format = info.data_format.code();
    out.data_type = info.data_type.code();
    out.max_dim_x = info.max_dim_x;
    out.max_dim_y = info.max_dim_y;
    out.description = dup_string(&info.description, ORIGIN)?;
    out.label = dup_string(&info.label, ORIGIN)?;
    out.unit = dup_string(&info.unit, ORIGIN)?;
    out.standard_unit = dup_string(&info.standard_unit, ORIGIN)?;
    out.display_unit = dup_string(&info.display_unit, ORIGIN)?;
    out.format = dup_string(&info.format, ORIGIN)?;
    out.min_value = dup_string(&info.min_value, ORIGIN)?;
    out.max_value = dup_string(&info.max_value, ORIGIN)?;
    out.min_alarm = dup_string(&info.min_alarm, ORIGIN)?;
    out.max_alarm = dup_string(&info.max_alarm, ORIGIN)?;
    out.writable_attr_name = dup_string(&info.writable_attr_name, ORIGIN)?;
    out.disp_level = info.disp_level.code();
    Ok(out.publish())
}

unsafe fn release_attribute_info(info: &mut AttributeInfo) {
    for field in [
        &mut info.name,
        &mut info.description,
        &mut info.label,
        &mut info.unit,
        &mut info.standard_unit,
        &mut info.display_unit,
        &mut info.format,
        &mut info.min_value,
        &mut info.max_value,
        &mut info.min_alarm,
        &mut info.max_alarm,
        &mut info.writable_attr_name,
    ] {
        free_string(field);
    }
}

unsafe fn release_attribute_info_list(list: &mut AttributeInfoList) {
    free_list(list, release_attribute_info);
}

unsafe fn read_names(names: *const VarStringArray, origin: &str) -> TangoResult<Vec<String>> {
    let Some(names) = names.as_ref() else {
        return Err(TangoError::invalid_args("attribute name list is NULL", origin));
    };
    Ok(read_strings(names.length, names.sequence))
}

// =======================================================================
// Boundary
// =======================================================================

/// Read one attribute.
///
/// # Safety
/// `proxy` from `tango_create_device_proxy`, `attr_name` a valid string,
/// `argout` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tango_read_attribute(
    proxy: *mut TangoDeviceProxy,
    attr_name: *const c_char,
    argout: *mut AttributeData,
) -> *mut ErrorStack {
    guarded(READ_ORIGIN, || {
        let proxy = device_proxy(proxy, READ_ORIGIN)?;
        let attr_name = required_string(attr_name, "attr_name", READ_ORIGIN)?;
        if argout.is_null() {
            return Err(TangoError::invalid_args("argout is NULL", READ_ORIGIN));
        }
        let reading = proxy.lock().read_attribute(&attr_name)?;
        *argout = attribute_to_c(reading)?;
        Ok(())
    })
}

/// Read several attributes in one call. The first attribute that fails
/// fails the whole call.
///
/// # Safety
/// `proxy` from `tango_create_device_proxy`, `attr_names` a valid string
/// sequence, `argout` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tango_read_attributes(
    proxy: *mut TangoDeviceProxy,
    attr_names: *const VarStringArray,
    argout: *mut AttributeDataList,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_read_attributes";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        let names = read_names(attr_names, ORIGIN)?;
        if argout.is_null() {
            return Err(TangoError::invalid_args("argout is NULL", ORIGIN));
        }
        let readings = proxy
            .lock()
            .read_attributes(&names)?
            .into_iter()
            .collect::<TangoResult<Vec<_>>>()?;
        *argout = alloc_list(readings, attribute_to_c, release_attribute_data_list, ORIGIN)?;
        Ok(())
    })
}

/// Write one attribute. The container stays owned by the caller.
///
/// # Safety
/// `proxy` from `tango_create_device_proxy`; `argin` a valid container.
#[no_mangle]
pub unsafe extern "C" fn tango_write_attribute(
    proxy: *mut TangoDeviceProxy,
    argin: *const AttributeData,
) -> *mut ErrorStack {
    guarded(WRITE_ORIGIN, || {
        let proxy = device_proxy(proxy, WRITE_ORIGIN)?;
        let Some(argin) = argin.as_ref() else {
            return Err(TangoError::invalid_args("argin is NULL", WRITE_ORIGIN));
        };
        let value = attribute_from_c(argin)?;
        proxy.lock().write_attribute(value)
    })
}

/// Write several attributes. Nothing is written if any element fails to
/// convert.
///
/// # Safety
/// `proxy` from `tango_create_device_proxy`; `argin` a valid list.
#[no_mangle]
pub unsafe extern "C" fn tango_write_attributes(
    proxy: *mut TangoDeviceProxy,
    argin: *const AttributeDataList,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_write_attributes";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        let Some(argin) = argin.as_ref() else {
            return Err(TangoError::invalid_args("argin is NULL", ORIGIN));
        };
        let values = argin
            .as_slice()
            .iter()
            .map(|attr| attribute_from_c(attr))
            .collect::<TangoResult<Vec<_>>>()?;
        proxy.lock().write_attributes(values)
    })
}

/// # Safety
/// `attribute_data` must be NULL or filled by `tango_read_attribute`.
#[no_mangle]
pub unsafe extern "C" fn tango_free_AttributeData(attribute_data: *mut AttributeData) {
    if let Some(attr) = attribute_data.as_mut() {
        release_attribute_data(attr);
    }
}

/// # Safety
/// `attribute_data_list` must be NULL or filled by `tango_read_attributes`.
#[no_mangle]
pub unsafe extern "C" fn tango_free_AttributeDataList(attribute_data_list: *mut AttributeDataList) {
    if let Some(list) = attribute_data_list.as_mut() {
        release_attribute_data_list(list);
    }
}

/// Names of every attribute of the device.
///
/// # Safety
/// `proxy` from `tango_create_device_proxy`, `attr_names` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tango_get_attribute_list(
    proxy: *mut TangoDeviceProxy,
    attr_names: *mut VarStringArray,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_get_attribute_list";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        if attr_names.is_null() {
            return Err(TangoError::invalid_args("attr_names is NULL", ORIGIN));
        }
        let names = proxy.lock().get_attribute_list()?;
        *attr_names = alloc_string_array(&names, ORIGIN)?;
        Ok(())
    })
}

/// # Safety
/// `string_arr` must be NULL or filled by this library.
#[no_mangle]
pub unsafe extern "C" fn tango_free_VarStringArray(string_arr: *mut VarStringArray) {
    if let Some(arr) = string_arr.as_mut() {
        free_string_array(arr);
    }
}

/// Configuration of the named attributes.
///
/// # Safety
/// `proxy` from `tango_create_device_proxy`, `attr_names` a valid string
/// sequence, `attr_info_list` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tango_get_attribute_config(
    proxy: *mut TangoDeviceProxy,
    attr_names: *const VarStringArray,
    attr_info_list: *mut AttributeInfoList,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_get_attribute_config";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        let names = read_names(attr_names, ORIGIN)?;
        if attr_info_list.is_null() {
            return Err(TangoError::invalid_args("attr_info_list is NULL", ORIGIN));
        }
        let infos = proxy.lock().get_attribute_config(&names)?;
        *attr_info_list =
            alloc_list(infos, attribute_info_to_c, release_attribute_info_list, ORIGIN)?;
        Ok(())
    })
}

/// Configuration of every attribute of the device.
///
/// # Safety
/// `proxy` from `tango_create_device_proxy`, `attr_info_list` valid for
/// writes.
#[no_mangle]
pub unsafe extern "C" fn tango_attribute_list_query(
    proxy: *mut TangoDeviceProxy,
    attr_info_list: *mut AttributeInfoList,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_attribute_list_query";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        if attr_info_list.is_null() {
            return Err(TangoError::invalid_args("attr_info_list is NULL", ORIGIN));
        }
        let infos = proxy.lock().attribute_list_query()?;
        *attr_info_list =
            alloc_list(infos, attribute_info_to_c, release_attribute_info_list, ORIGIN)?;
        Ok(())
    })
}

/// # Safety
/// `attribute_info_list` must be NULL or filled by this library.
#[no_mangle]
pub unsafe extern "C" fn tango_free_AttributeInfoList(attribute_info_list: *mut AttributeInfoList) {
    if let Some(list) = attribute_info_list.as_mut() {
        release_attribute_info_list(list);
    }
}
