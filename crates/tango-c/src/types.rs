// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Flat, self-describing containers shared with C.
//!
//! Every container pairs a tag with a union; the tag alone decides which
//! union arm holds meaningful data. Enumeration fields are plain `u32` so a
//! foreign caller can store any value without undefined behaviour; decoding
//! happens on the Rust side and rejects unknown codes.
//!
//! Sequences follow one rule: `length == 0` if and only if `sequence` is
//! null. Every pointer in a container produced by this library is owned by
//! that container and released by the matching `tango_free_*` function.

use std::os::raw::c_char;
use std::ptr;
use std::slice;

pub type TangoDataType = u32;
pub type TangoDevState = u32;
pub type TangoAttrQuality = u32;
pub type TangoAttrWriteType = u32;
pub type TangoAttrDataFormat = u32;
pub type TangoDispLevel = u32;
pub type TangoErrSeverity = u32;
pub type TangoDevSource = u32;

/// Length-prefixed sequence.
#[repr(C)]
#[derive(Debug)]
pub struct VarArray<T> {
    pub length: u32,
    pub sequence: *mut T,
}

impl<T> Clone for VarArray<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for VarArray<T> {}

impl<T> Default for VarArray<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> VarArray<T> {
    pub const fn empty() -> Self {
        Self {
            length: 0,
            sequence: ptr::null_mut(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0 || self.sequence.is_null()
    }

    /// View the elements.
    ///
    /// # Safety
    /// `sequence` must be null or point to `length` initialised elements.
    pub(crate) unsafe fn as_slice<'a>(&self) -> &'a [T] {
        raw_slice(self.length, self.sequence)
    }

    /// # Safety
    /// Same as [`VarArray::as_slice`], and no other reference to the
    /// elements may be alive.
    pub(crate) unsafe fn as_mut_slice<'a>(&mut self) -> &'a mut [T] {
        if self.sequence.is_null() {
            return &mut [];
        }
        slice::from_raw_parts_mut(self.sequence, self.length as usize)
    }
}

/// Borrow a foreign `(length, pointer)` pair. A null pointer reads as empty
/// whatever the length says.
///
/// # Safety
/// `sequence` must be null or point to `length` initialised elements.
pub(crate) unsafe fn raw_slice<'a, T>(length: u32, sequence: *const T) -> &'a [T] {
    if sequence.is_null() {
        if length != 0 {
            log::warn!(
                "null sequence with length {}: treated as empty",
                length
            );
        }
        return &[];
    }
    slice::from_raw_parts(sequence, length as usize)
}

pub type VarBoolArray = VarArray<bool>;
pub type VarCharArray = VarArray<u8>;
pub type VarShortArray = VarArray<i16>;
pub type VarUShortArray = VarArray<u16>;
pub type VarLongArray = VarArray<i32>;
pub type VarULongArray = VarArray<u32>;
pub type VarLong64Array = VarArray<i64>;
pub type VarULong64Array = VarArray<u64>;
pub type VarFloatArray = VarArray<f32>;
pub type VarDoubleArray = VarArray<f64>;
pub type VarStringArray = VarArray<*mut c_char>;
pub type VarStateArray = VarArray<TangoDevState>;
pub type VarEncodedArray = VarArray<TangoDevEncoded>;

/// Encoded blob: format label plus raw bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TangoDevEncoded {
    pub encoded_format: *mut c_char,
    pub encoded_length: u32,
    pub encoded_data: *mut u8,
}

impl Default for TangoDevEncoded {
    fn default() -> Self {
        Self {
            encoded_format: ptr::null_mut(),
            encoded_length: 0,
            encoded_data: ptr::null_mut(),
        }
    }
}

/// Two independently sized halves: integers and strings.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VarLongStringArray {
    pub long_length: u32,
    pub long_sequence: *mut i32,
    pub string_length: u32,
    pub string_sequence: *mut *mut c_char,
}

impl VarLongStringArray {
    pub(crate) fn from_halves(longs: VarLongArray, strings: VarStringArray) -> Self {
        Self {
            long_length: longs.length,
            long_sequence: longs.sequence,
            string_length: strings.length,
            string_sequence: strings.sequence,
        }
    }
}

/// Two independently sized halves: doubles and strings.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VarDoubleStringArray {
    pub double_length: u32,
    pub double_sequence: *mut f64,
    pub string_length: u32,
    pub string_sequence: *mut *mut c_char,
}

impl VarDoubleStringArray {
    pub(crate) fn from_halves(doubles: VarDoubleArray, strings: VarStringArray) -> Self {
        Self {
            double_length: doubles.length,
            double_sequence: doubles.sequence,
            string_length: strings.length,
            string_sequence: strings.sequence,
        }
    }
}

// =======================================================================
// Commands
// =======================================================================

#[repr(C)]
#[derive(Clone, Copy)]
pub union TangoCommandData {
    pub bool_val: bool,
    pub short_val: i16,
    pub ushort_val: u16,
    pub long_val: i32,
    pub ulong_val: u32,
    pub float_val: f32,
    pub double_val: f64,
    pub string_val: *mut c_char,
    pub state_val: TangoDevState,
    pub long64_val: i64,
    pub ulong64_val: u64,

    pub bool_arr: VarBoolArray,
    pub char_arr: VarCharArray,
    pub short_arr: VarShortArray,
    pub ushort_arr: VarUShortArray,
    pub long_arr: VarLongArray,
    pub ulong_arr: VarULongArray,
    pub long64_arr: VarLong64Array,
    pub ulong64_arr: VarULong64Array,
    pub float_arr: VarFloatArray,
    pub double_arr: VarDoubleArray,
    pub string_arr: VarStringArray,
    pub state_arr: VarStateArray,
    pub encoded_val: TangoDevEncoded,

    pub long_string_arr: VarLongStringArray,
    pub double_string_arr: VarDoubleStringArray,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct CommandData {
    pub arg_type: TangoDataType,
    pub cmd_data: TangoCommandData,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CommandInfo {
    pub cmd_name: *mut c_char,
    pub cmd_tag: i32,
    pub in_type: TangoDataType,
    pub out_type: TangoDataType,
    pub in_type_desc: *mut c_char,
    pub out_type_desc: *mut c_char,
    pub disp_level: TangoDispLevel,
}

pub type CommandInfoList = VarArray<CommandInfo>;

// =======================================================================
// Attributes
// =======================================================================

/// Attribute payload. Scalars travel as one-element sequences.
#[repr(C)]
#[derive(Clone, Copy)]
pub union TangoAttributeData {
    pub bool_arr: VarBoolArray,
    pub char_arr: VarCharArray,
    pub short_arr: VarShortArray,
    pub ushort_arr: VarUShortArray,
    pub long_arr: VarLongArray,
    pub ulong_arr: VarULongArray,
    pub long64_arr: VarLong64Array,
    pub ulong64_arr: VarULong64Array,
    pub float_arr: VarFloatArray,
    pub double_arr: VarDoubleArray,
    pub string_arr: VarStringArray,
    pub state_arr: VarStateArray,
    pub encoded_arr: VarEncodedArray,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct AttributeData {
    pub data_type: TangoDataType,
    pub attr_data: TangoAttributeData,
    pub data_format: TangoAttrDataFormat,
    pub quality: TangoAttrQuality,
    /// Number of elements in `attr_data`.
    pub nb_read: libc::c_long,
    pub name: *mut c_char,
    pub dim_x: i32,
    pub dim_y: i32,
    pub time_stamp: libc::timeval,
}

pub type AttributeDataList = VarArray<AttributeData>;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AttributeInfo {
    pub name: *mut c_char,
    pub writable: TangoAttrWriteType,
    pub data_format: TangoAttrDataFormat,
    pub data_type: TangoDataType,
    pub max_dim_x: i32,
    pub max_dim_y: i32,
    pub description: *mut c_char,
    pub label: *mut c_char,
    pub unit: *mut c_char,
    pub standard_unit: *mut c_char,
    pub display_unit: *mut c_char,
    pub format: *mut c_char,
    pub min_value: *mut c_char,
    pub max_value: *mut c_char,
    pub min_alarm: *mut c_char,
    pub max_alarm: *mut c_char,
    pub writable_attr_name: *mut c_char,
    pub disp_level: TangoDispLevel,
}

pub type AttributeInfoList = VarArray<AttributeInfo>;

// =======================================================================
// Properties
// =======================================================================

#[repr(C)]
#[derive(Clone, Copy)]
pub union TangoPropertyData {
    pub bool_val: bool,
    pub char_val: u8,
    pub short_val: i16,
    pub ushort_val: u16,
    pub long_val: i32,
    pub ulong_val: u32,
    pub float_val: f32,
    pub double_val: f64,
    pub string_val: *mut c_char,
    pub long64_val: i64,
    pub ulong64_val: u64,

    pub short_arr: VarShortArray,
    pub ushort_arr: VarUShortArray,
    pub long_arr: VarLongArray,
    pub ulong_arr: VarULongArray,
    pub long64_arr: VarLong64Array,
    pub ulong64_arr: VarULong64Array,
    pub float_arr: VarFloatArray,
    pub double_arr: VarDoubleArray,
    pub string_arr: VarStringArray,
}

/// One property. `is_empty` and `wrong_data_type` are never both set; when
/// either is set `prop_data` holds nothing.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct DbDatum {
    pub property_name: *mut c_char,
    pub data_type: TangoDataType,
    pub prop_data: TangoPropertyData,
    pub is_empty: bool,
    pub wrong_data_type: bool,
}

pub type DbData = VarArray<DbDatum>;

// =======================================================================
// Failures
// =======================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DevFailed {
    pub desc: *mut c_char,
    pub reason: *mut c_char,
    pub origin: *mut c_char,
    pub severity: TangoErrSeverity,
}

/// Ordered failure records, innermost cause first.
pub type ErrorStack = VarArray<DevFailed>;

// =======================================================================
// Zero values
// =======================================================================

/// Containers whose all-zero bit pattern is a valid empty value: null
/// pointers, zero lengths, `false` flags, code 0.
///
/// # Safety
/// Implementors must only contain integers, floats, `bool` and raw
/// pointers, directly or through other `Zeroed` types.
pub(crate) unsafe trait Zeroed: Sized {
    fn zeroed() -> Self {
        // SAFETY: guaranteed by the trait contract.
        unsafe { std::mem::zeroed() }
    }
}

unsafe impl Zeroed for TangoCommandData {}
unsafe impl Zeroed for TangoAttributeData {}
unsafe impl Zeroed for TangoPropertyData {}
unsafe impl Zeroed for TangoDevEncoded {}
unsafe impl Zeroed for CommandData {}
unsafe impl Zeroed for CommandInfo {}
unsafe impl Zeroed for AttributeData {}
unsafe impl Zeroed for AttributeInfo {}
unsafe impl Zeroed for DbDatum {}
unsafe impl Zeroed for DevFailed {}
unsafe impl Zeroed for *mut c_char {}
unsafe impl<T> Zeroed for VarArray<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_containers_are_empty() {
        let data = CommandData::zeroed();
        assert_eq!(data.arg_type, 0);
        // SAFETY: every arm of a zeroed union is a valid empty value.
        unsafe {
            assert!(data.cmd_data.string_arr.is_empty());
            assert!(data.cmd_data.string_val.is_null());
        }
        let datum = DbDatum::zeroed();
        assert!(!datum.is_empty && !datum.wrong_data_type);
        assert!(datum.property_name.is_null());
    }

    #[test]
    fn null_sequence_reads_empty() {
        let arr = VarLongArray {
            length: 4,
            sequence: ptr::null_mut(),
        };
        // SAFETY: null pointer is accepted and yields an empty slice.
        assert!(unsafe { arr.as_slice() }.is_empty());
        assert!(arr.is_empty());
    }

    #[test]
    fn union_is_large_enough() {
        assert!(
            std::mem::size_of::<TangoCommandData>() >= std::mem::size_of::<VarLongStringArray>()
        );
        assert!(
            std::mem::size_of::<TangoAttributeData>() >= std::mem::size_of::<VarEncodedArray>()
        );
    }
}
