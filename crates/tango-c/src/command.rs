// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Command invocation and command metadata.

use std::os::raw::c_char;

use tango::{DataType, DevState, TangoError, TangoResult};

use crate::alloc::{
    alloc_array, alloc_encoded, alloc_list, alloc_string_array, dup_string, free_array,
    free_encoded, free_list, free_string, free_string_array, read_array, read_bool, read_bools,
    read_encoded, read_string, read_strings, required_string, Scratch,
};
use crate::error::guarded;
use crate::proxy::device_proxy;
use crate::types::{
    CommandData, CommandInfo, CommandInfoList, ErrorStack, TangoCommandData,
    VarDoubleStringArray, VarLongStringArray, VarStringArray, Zeroed,
};
use crate::TangoDeviceProxy;

const ORIGIN: &str = "tango_command_inout";

/// Native argument from a flat container. The container is only read.
///
/// # Safety
/// Every pointer in the union arm selected by `arg_type` must be null or
/// valid for its length.
pub(crate) unsafe fn command_from_c(argin: &CommandData) -> TangoResult<tango::CommandData> {
    use tango::CommandData as Native;

    const OP: &str = "command writing";
    let Some(tag) = DataType::from_code(argin.arg_type) else {
        return Err(TangoError::unknown_tag(OP, argin.arg_type, ORIGIN));
    };
    let d = &argin.cmd_data;

    let value = match tag {
        DataType::Void => Native::Void,
        DataType::Boolean => Native::Boolean(read_bool(&d.bool_val)),
        DataType::Short => Native::Short(d.short_val),
        DataType::UShort => Native::UShort(d.ushort_val),
        DataType::Long => Native::Long(d.long_val),
        DataType::ULong => Native::ULong(d.ulong_val),
        DataType::Long64 => Native::Long64(d.long64_val),
        DataType::ULong64 => Native::ULong64(d.ulong64_val),
        DataType::Float => Native::Float(d.float_val),
        DataType::Double => Native::Double(d.double_val),
        DataType::String | DataType::ConstString => Native::String(read_string(d.string_val)),
        DataType::State => Native::State(decode_state(d.state_val, ORIGIN)?),
        DataType::Encoded => Native::Encoded(read_encoded(&d.encoded_val)),

        DataType::CharArray => Native::CharArray(read_array(d.char_arr.length, d.char_arr.sequence)),
        DataType::ShortArray => {
            Native::ShortArray(read_array(d.short_arr.length, d.short_arr.sequence))
        }
        DataType::UShortArray => {
            Native::UShortArray(read_array(d.ushort_arr.length, d.ushort_arr.sequence))
        }
        DataType::LongArray => Native::LongArray(read_array(d.long_arr.length, d.long_arr.sequence)),
        DataType::ULongArray => {
            Native::ULongArray(read_array(d.ulong_arr.length, d.ulong_arr.sequence))
        }
        DataType::Long64Array => {
            Native::Long64Array(read_array(d.long64_arr.length, d.long64_arr.sequence))
        }
        DataType::ULong64Array => {
            Native::ULong64Array(read_array(d.ulong64_arr.length, d.ulong64_arr.sequence))
        }
        DataType::FloatArray => {
            Native::FloatArray(read_array(d.float_arr.length, d.float_arr.sequence))
        }
        DataType::DoubleArray => {
            Native::DoubleArray(read_array(d.double_arr.length, d.double_arr.sequence))
        }
        DataType::BooleanArray => {
            Native::BooleanArray(read_bools(d.bool_arr.length, d.bool_arr.sequence))
        }
        DataType::StringArray => {
            Native::StringArray(read_strings(d.string_arr.length, d.string_arr.sequence))
        }
        DataType::LongStringArray => {
            let pair = &d.long_string_arr;
            Native::LongStringArray(
                read_array(pair.long_length, pair.long_sequence),
                read_strings(pair.string_length, pair.string_sequence),
            )
        }
        DataType::DoubleStringArray => {
            let pair = &d.double_string_arr;
            Native::DoubleStringArray(
                read_array(pair.double_length, pair.double_sequence),
                read_strings(pair.string_length, pair.string_sequence),
            )
        }

        DataType::UChar | DataType::Int => return Err(TangoError::data_type(OP, ORIGIN)),
    };
    Ok(value)
}

pub(crate) fn decode_state(code: u32, origin: &str) -> TangoResult<DevState> {
    DevState::from_code(code)
        .ok_or_else(|| TangoError::invalid_args(format!("Unknown DevState code {code}"), origin))
}

/// Fresh flat container for a command result. The tag comes from the
/// result itself.
pub(crate) fn command_to_c(value: tango::CommandData) -> TangoResult<CommandData> {
    use tango::CommandData as Native;

    let mut out = Scratch::new(
        CommandData {
            arg_type: value.data_type().code(),
            cmd_data: TangoCommandData::zeroed(),
        },
        release_command_data,
    );
    let d = &mut out.cmd_data;

    match value {
        Native::Void => {}
        Native::Boolean(v) => d.bool_val = v,
        Native::Short(v) => d.short_val = v,
        Native::UShort(v) => d.ushort_val = v,
        Native::Long(v) => d.long_val = v,
        Native::ULong(v) => d.ulong_val = v,
        Native::Long64(v) => d.long64_val = v,
        Native::ULong64(v) => d.ulong64_val = v,
        Native::Float(v) => d.float_val = v,
        Native::Double(v) => d.double_val = v,
        Native::State(v) => d.state_val = v.code(),
        Native::String(s) => d.string_val = dup_string(&s, ORIGIN)?,
        Native::Encoded(e) => d.encoded_val = alloc_encoded(&e, ORIGIN)?,

        Native::CharArray(v) => d.char_arr = alloc_array(&v, ORIGIN)?,
        Native::ShortArray(v) => d.short_arr = alloc_array(&v, ORIGIN)?,
        Native::UShortArray(v) => d.ushort_arr = alloc_array(&v, ORIGIN)?,
        Native::LongArray(v) => d.long_arr = alloc_array(&v, ORIGIN)?,
        Native::ULongArray(v) => d.ulong_arr = alloc_array(&v, ORIGIN)?,
        Native::Long64Array(v) => d.long64_arr = alloc_array(&v, ORIGIN)?,
        Native::ULong64Array(v) => d.ulong64_arr = alloc_array(&v, ORIGIN)?,
        Native::FloatArray(v) => d.float_arr = alloc_array(&v, ORIGIN)?,
        Native::DoubleArray(v) => d.double_arr = alloc_array(&v, ORIGIN)?,
        Native::BooleanArray(v) => d.bool_arr = alloc_array(&v, ORIGIN)?,
        Native::StringArray(v) => d.string_arr = alloc_string_array(&v, ORIGIN)?,

        // Each half is published into the union as soon as it exists so a
        // failure on the second half still releases the first.
        Native::LongStringArray(longs, strings) => {
            let longs = alloc_array(&longs, ORIGIN)?;
            d.long_string_arr = VarLongStringArray::from_halves(longs, VarStringArray::empty());
            let strings = alloc_string_array(&strings, ORIGIN)?;
            d.long_string_arr = VarLongStringArray::from_halves(longs, strings);
        }
        Native::DoubleStringArray(doubles, strings) => {
            let doubles = alloc_array(&doubles, ORIGIN)?;
            d.double_string_arr =
                VarDoubleStringArray::from_halves(doubles, VarStringArray::empty());
            let strings = alloc_string_array(&strings, ORIGIN)?;
            d.double_string_arr = VarDoubleStringArray::from_halves(doubles, strings);
        }
    }
    Ok(out.publish())
}

/// Release whatever the tag says the union owns, then zero the union.
unsafe fn release_command_data(data: &mut CommandData) {
    let d = &mut data.cmd_data;
    match DataType::from_code(data.arg_type) {
        Some(DataType::String | DataType::ConstString) => free_string(&mut d.string_val),
        Some(DataType::Encoded) => free_encoded(&mut d.encoded_val),
        Some(DataType::CharArray) => free_array(&mut d.char_arr),
        Some(DataType::ShortArray) => free_array(&mut d.short_arr),
        Some(DataType::UShortArray) => free_array(&mut d.ushort_arr),
        Some(DataType::LongArray) => free_array(&mut d.long_arr),
        Some(DataType::ULongArray) => free_array(&mut d.ulong_arr),
        Some(DataType::Long64Array) => free_array(&mut d.long64_arr),
        Some(DataType::ULong64Array) => free_array(&mut d.ulong64_arr),
        Some(DataType::FloatArray) => free_array(&mut d.float_arr),
        Some(DataType::DoubleArray) => free_array(&mut d.double_arr),
        Some(DataType::BooleanArray) => free_array(&mut d.bool_arr),
        Some(DataType::StringArray) => free_string_array(&mut d.string_arr),
        Some(DataType::LongStringArray) => {
            let pair = &mut d.long_string_arr;
            let mut longs = crate::types::VarLongArray {
                length: pair.long_length,
                sequence: pair.long_sequence,
            };
            let mut strings = VarStringArray {
                length: pair.string_length,
                sequence: pair.string_sequence,
            };
            free_array(&mut longs);
            free_string_array(&mut strings);
        }
        Some(DataType::DoubleStringArray) => {
            let pair = &mut d.double_string_arr;
            let mut doubles = crate::types::VarDoubleArray {
                length: pair.double_length,
                sequence: pair.double_sequence,
            };
            let mut strings = VarStringArray {
                length: pair.string_length,
                sequence: pair.string_sequence,
            };
            free_array(&mut doubles);
            free_string_array(&mut strings);
        }
        Some(
            DataType::Void
            | DataType::Boolean
            | DataType::Short
            | DataType::UShort
            | DataType::Long
            | DataType::ULong
            | DataType::Long64
            | DataType::ULong64
            | DataType::Float
            | DataType::Double
            | DataType::State
            | DataType::UChar
            | DataType::Int,
        ) => {}
        None => log::warn!(
            "tango_free_CommandData: unknown tag {}, nothing released",
            data.arg_type
        ),
    }
    data.cmd_data = TangoCommandData::zeroed();
}

fn command_info_to_c(info: tango::CommandInfo) -> TangoResult<CommandInfo> {
    const ORIGIN: &str = "tango_command_query";
    let mut out = Scratch::new(CommandInfo::zeroed(), release_command_info);
    out.cmd_name = dup_string(&info.cmd_name, ORIGIN)?;
    out.cmd_tag = info.cmd_tag;
    out.in_type = info.in_type.code();
    out.out_type = info.out_type.code();
    out.in_type_desc = dup_string(&info.in_type_desc, ORIGIN)?;
    out.out_type_desc = dup_string(&info.out_type_desc, ORIGIN)?;
    out.disp_level = info.disp_level.code();
    Ok(out.publish())
}

unsafe fn release_command_info(info: &mut CommandInfo) {
    free_string(&mut info.cmd_name);
    free_string(&mut info.in_type_desc);
    free_string(&mut info.out_type_desc);
}

unsafe fn release_command_info_list(list: &mut CommandInfoList) {
    free_list(list, release_command_info);
}

// =======================================================================
// Boundary
// =======================================================================

/// Execute a command.
///
/// `argin` may be NULL for commands taking no argument. On success `argout`
/// holds a result owned by the caller, to be released with
/// `tango_free_CommandData`.
///
/// # Safety
/// - `proxy` must come from `tango_create_device_proxy`.
/// - `cmd_name` must be a valid NUL-terminated string.
/// - `argin` must be NULL or a container valid for its tag.
/// - `argout` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tango_command_inout(
    proxy: *mut TangoDeviceProxy,
    cmd_name: *const c_char,
    argin: *const CommandData,
    argout: *mut CommandData,
) -> *mut ErrorStack {
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        let cmd_name = required_string(cmd_name, "cmd_name", ORIGIN)?;
        if argout.is_null() {
            return Err(TangoError::invalid_args("argout is NULL", ORIGIN));
        }
        let argin = match argin.as_ref() {
            Some(argin) => command_from_c(argin)?,
            None => tango::CommandData::Void,
        };

        let result = proxy.lock().command_inout(&cmd_name, argin)?;
        *argout = command_to_c(result)?;
        Ok(())
    })
}

/// # Safety
/// `argout` must be NULL or a container filled by this library.
#[no_mangle]
pub unsafe extern "C" fn tango_free_CommandData(argout: *mut CommandData) {
    if let Some(data) = argout.as_mut() {
        release_command_data(data);
    }
}

/// Describe one command.
///
/// # Safety
/// `proxy` from `tango_create_device_proxy`, `cmd_name` a valid string,
/// `cmd_info` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tango_command_query(
    proxy: *mut TangoDeviceProxy,
    cmd_name: *const c_char,
    cmd_info: *mut CommandInfo,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_command_query";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        let cmd_name = required_string(cmd_name, "cmd_name", ORIGIN)?;
        if cmd_info.is_null() {
            return Err(TangoError::invalid_args("cmd_info is NULL", ORIGIN));
        }
        let info = proxy.lock().command_query(&cmd_name)?;
        *cmd_info = command_info_to_c(info)?;
        Ok(())
    })
}

/// Describe every command of the device.
///
/// # Safety
/// `proxy` from `tango_create_device_proxy`, `cmd_info_list` valid for
/// writes.
#[no_mangle]
pub unsafe extern "C" fn tango_command_list_query(
    proxy: *mut TangoDeviceProxy,
    cmd_info_list: *mut CommandInfoList,
) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_command_list_query";
    guarded(ORIGIN, || {
        let proxy = device_proxy(proxy, ORIGIN)?;
        if cmd_info_list.is_null() {
            return Err(TangoError::invalid_args("cmd_info_list is NULL", ORIGIN));
        }
        let infos = proxy.lock().command_list_query()?;
        *cmd_info_list = alloc_list(infos, command_info_to_c, release_command_info_list, ORIGIN)?;
        Ok(())
    })
}

/// # Safety
/// `command_info` must be NULL or filled by `tango_command_query`.
#[no_mangle]
pub unsafe extern "C" fn tango_free_CommandInfo(command_info: *mut CommandInfo) {
    if let Some(info) = command_info.as_mut() {
        release_command_info(info);
    }
}

/// # Safety
/// `command_info_list` must be NULL or filled by `tango_command_list_query`.
#[no_mangle]
pub unsafe extern "C" fn tango_free_CommandInfoList(command_info_list: *mut CommandInfoList) {
    if let Some(list) = command_info_list.as_mut() {
        release_command_info_list(list);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tango::{CommandData as Native, DevEncoded};

    fn round_trip(value: Native) -> Native {
        let mut flat = command_to_c(value).unwrap();
        let back = unsafe { command_from_c(&flat).unwrap() };
        unsafe { release_command_data(&mut flat) };
        back
    }

    #[test]
    fn scalars_survive() {
        for value in [
            Native::Void,
            Native::Boolean(true),
            Native::Short(i16::MIN),
            Native::ULong64(u64::MAX),
            Native::Double(-1.5e300),
            Native::State(DevState::Alarm),
        ] {
            assert_eq!(round_trip(value.clone()), value);
        }
    }

    #[test]
    fn paired_halves_are_independent() {
        let value = Native::LongStringArray(vec![1, 2, 3], vec!["one".to_string()]);
        let mut flat = command_to_c(value.clone()).unwrap();
        unsafe {
            let pair = flat.cmd_data.long_string_arr;
            assert_eq!(pair.long_length, 3);
            assert_eq!(pair.string_length, 1);
            assert_eq!(command_from_c(&flat).unwrap(), value);
            release_command_data(&mut flat);
            let pair = flat.cmd_data.long_string_arr;
            assert!(pair.long_sequence.is_null() && pair.string_sequence.is_null());
            assert_eq!((pair.long_length, pair.string_length), (0, 0));
        }

        let value = Native::DoubleStringArray(vec![], vec!["a".to_string(), "b".to_string()]);
        assert_eq!(round_trip(value.clone()), value);
    }

    #[test]
    fn encoded_and_strings() {
        let value = Native::Encoded(DevEncoded::new("jpeg", vec![0xff, 0xd8]));
        assert_eq!(round_trip(value.clone()), value);
        let value = Native::StringArray(vec![String::new(), "x".to_string()]);
        assert_eq!(round_trip(value.clone()), value);
    }

    #[test]
    fn const_string_reads_as_string() {
        let mut flat = command_to_c(Native::String("ok".to_string())).unwrap();
        flat.arg_type = DataType::ConstString.code();
        let back = unsafe { command_from_c(&flat).unwrap() };
        assert_eq!(back, Native::String("ok".to_string()));
        unsafe { release_command_data(&mut flat) };
    }

    #[test]
    fn unsupported_tags_are_rejected() {
        for tag in [DataType::UChar.code(), DataType::Int.code(), 4242] {
            let flat = CommandData {
                arg_type: tag,
                cmd_data: TangoCommandData::zeroed(),
            };
            let err = unsafe { command_from_c(&flat).unwrap_err() };
            assert!(err.is_data_type_error());
            assert!(err.failures[0]
                .desc
                .starts_with("The requested data type is not implemented for command writing!"));
        }
    }

    #[test]
    fn unknown_state_code() {
        let mut flat = CommandData {
            arg_type: DataType::State.code(),
            cmd_data: TangoCommandData::zeroed(),
        };
        flat.cmd_data.state_val = 99;
        let err = unsafe { command_from_c(&flat).unwrap_err() };
        assert_eq!(err.reason(), "API_InvalidArgs");
    }

    #[test]
    fn release_is_idempotent() {
        let mut flat = command_to_c(Native::DoubleArray(vec![1.0, 2.0])).unwrap();
        unsafe {
            tango_free_CommandData(&mut flat);
            assert!(flat.cmd_data.double_arr.sequence.is_null());
            tango_free_CommandData(&mut flat);
            tango_free_CommandData(std::ptr::null_mut());
        }
    }
}
