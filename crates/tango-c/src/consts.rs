// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Enumeration values and static name tables.
//!
//! Container fields carry these values as plain integers; the constants
//! give them their usual C names.

#![allow(non_upper_case_globals)]

use std::os::raw::c_char;

use crate::types::{
    TangoAttrDataFormat, TangoAttrQuality, TangoAttrWriteType, TangoDataType, TangoDevSource,
    TangoDevState, TangoDispLevel, TangoErrSeverity,
};

// TangoDataType
pub const DEV_VOID: TangoDataType = 0;
pub const DEV_BOOLEAN: TangoDataType = 1;
pub const DEV_SHORT: TangoDataType = 2;
pub const DEV_LONG: TangoDataType = 3;
pub const DEV_FLOAT: TangoDataType = 4;
pub const DEV_DOUBLE: TangoDataType = 5;
pub const DEV_USHORT: TangoDataType = 6;
pub const DEV_ULONG: TangoDataType = 7;
pub const DEV_STRING: TangoDataType = 8;
pub const DEVVAR_CHARARRAY: TangoDataType = 9;
pub const DEVVAR_SHORTARRAY: TangoDataType = 10;
pub const DEVVAR_LONGARRAY: TangoDataType = 11;
pub const DEVVAR_FLOATARRAY: TangoDataType = 12;
pub const DEVVAR_DOUBLEARRAY: TangoDataType = 13;
pub const DEVVAR_USHORTARRAY: TangoDataType = 14;
pub const DEVVAR_ULONGARRAY: TangoDataType = 15;
pub const DEVVAR_STRINGARRAY: TangoDataType = 16;
pub const DEVVAR_LONGSTRINGARRAY: TangoDataType = 17;
pub const DEVVAR_DOUBLESTRINGARRAY: TangoDataType = 18;
pub const DEV_STATE: TangoDataType = 19;
pub const CONST_DEV_STRING: TangoDataType = 20;
pub const DEVVAR_BOOLEANARRAY: TangoDataType = 21;
pub const DEV_UCHAR: TangoDataType = 22;
pub const DEV_LONG64: TangoDataType = 23;
pub const DEV_ULONG64: TangoDataType = 24;
pub const DEVVAR_LONG64ARRAY: TangoDataType = 25;
pub const DEVVAR_ULONG64ARRAY: TangoDataType = 26;
pub const DEV_INT: TangoDataType = 27;
pub const DEV_ENCODED: TangoDataType = 28;

// TangoDevState
pub const ON: TangoDevState = 0;
pub const OFF: TangoDevState = 1;
pub const CLOSE: TangoDevState = 2;
pub const OPEN: TangoDevState = 3;
pub const INSERT: TangoDevState = 4;
pub const EXTRACT: TangoDevState = 5;
pub const MOVING: TangoDevState = 6;
pub const STANDBY: TangoDevState = 7;
pub const FAULT: TangoDevState = 8;
pub const INIT: TangoDevState = 9;
pub const RUNNING: TangoDevState = 10;
pub const ALARM: TangoDevState = 11;
pub const DISABLE: TangoDevState = 12;
pub const UNKNOWN: TangoDevState = 13;

pub const ATTR_VALID: TangoAttrQuality = 0;
pub const ATTR_INVALID: TangoAttrQuality = 1;
pub const ATTR_ALARM: TangoAttrQuality = 2;
pub const ATTR_CHANGING: TangoAttrQuality = 3;
pub const ATTR_WARNING: TangoAttrQuality = 4;

pub const READ: TangoAttrWriteType = 0;
pub const READ_WITH_WRITE: TangoAttrWriteType = 1;
pub const WRITE: TangoAttrWriteType = 2;
pub const READ_WRITE: TangoAttrWriteType = 3;

pub const SCALAR: TangoAttrDataFormat = 0;
pub const SPECTRUM: TangoAttrDataFormat = 1;
pub const IMAGE: TangoAttrDataFormat = 2;

pub const OPERATOR: TangoDispLevel = 0;
pub const EXPERT: TangoDispLevel = 1;

pub const WARN: TangoErrSeverity = 0;
pub const ERR: TangoErrSeverity = 1;
pub const PANIC: TangoErrSeverity = 2;

pub const DEV: TangoDevSource = 0;
pub const CACHE: TangoDevSource = 1;
pub const CACHE_DEV: TangoDevSource = 2;

macro_rules! c_names {
    ($($name:literal),+ $(,)?) => {
        [$(concat!($name, "\0").as_ptr().cast::<c_char>()),+]
    };
}

/// Names of the data types, indexed by `TangoDataType`.
#[repr(transparent)]
pub struct DataTypeNames(pub [*const c_char; 29]);

/// Names of the device states, indexed by `TangoDevState`.
#[repr(transparent)]
pub struct DevStateNames(pub [*const c_char; 14]);

// SAFETY: the tables only point at immutable static strings.
unsafe impl Sync for DataTypeNames {}
unsafe impl Sync for DevStateNames {}

#[no_mangle]
pub static TangoDataTypeName: DataTypeNames = DataTypeNames(c_names![
    "DevVoid",
    "DevBoolean",
    "DevShort",
    "DevLong",
    "DevFloat",
    "DevDouble",
    "DevUShort",
    "DevULong",
    "DevString",
    "DevVarCharArray",
    "DevVarShortArray",
    "DevVarLongArray",
    "DevVarFloatArray",
    "DevVarDoubleArray",
    "DevVarUShortArray",
    "DevVarULongArray",
    "DevVarStringArray",
    "DevVarLongStringArray",
    "DevVarDoubleStringArray",
    "DevState",
    "ConstDevString",
    "DevVarBooleanArray",
    "DevUChar",
    "DevLong64",
    "DevULong64",
    "DevVarLong64Array",
    "DevVarULong64Array",
    "DevInt",
    "DevEncoded",
]);

#[no_mangle]
pub static TangoDevStateName: DevStateNames = DevStateNames(c_names![
    "ON", "OFF", "CLOSE", "OPEN", "INSERT", "EXTRACT", "MOVING", "STANDBY", "FAULT", "INIT",
    "RUNNING", "ALARM", "DISABLE", "UNKNOWN",
]);

/// Name of a data type, or NULL for an unknown code.
#[no_mangle]
pub extern "C" fn tango_data_type_name(data_type: TangoDataType) -> *const c_char {
    TangoDataTypeName
        .0
        .get(data_type as usize)
        .copied()
        .unwrap_or(std::ptr::null())
}

/// Name of a device state, or NULL for an unknown code.
#[no_mangle]
pub extern "C" fn tango_dev_state_name(state: TangoDevState) -> *const c_char {
    TangoDevStateName
        .0
        .get(state as usize)
        .copied()
        .unwrap_or(std::ptr::null())
}
