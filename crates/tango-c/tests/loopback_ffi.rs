// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! C entry points driven against the in-process loopback connector.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use tango::{AttrQuality, AttrValue, AttrWriteType, DevState, Loopback};
use tango_c::*;

fn cstring(s: &str) -> CString {
    CString::new(s).unwrap()
}

unsafe fn text(s: *const c_char) -> String {
    assert!(!s.is_null());
    CStr::from_ptr(s).to_string_lossy().into_owned()
}

unsafe fn seq<'a, T>(length: u32, sequence: *const T) -> &'a [T] {
    if sequence.is_null() {
        assert_eq!(length, 0);
        return &[];
    }
    std::slice::from_raw_parts(sequence, length as usize)
}

/// Panics with the first reason when `err` is a failure.
unsafe fn ok(err: *mut ErrorStack) {
    if !err.is_null() {
        let reason = first_reason(err);
        tango_free_ErrorStack(err);
        panic!("unexpected failure: {reason}");
    }
}

unsafe fn first_reason(err: *mut ErrorStack) -> String {
    let records = seq((*err).length, (*err).sequence);
    text(records[0].reason)
}

/// Reason of an expected failure; the stack is released.
unsafe fn failure(err: *mut ErrorStack) -> String {
    assert!(!err.is_null(), "call was expected to fail");
    let reason = first_reason(err);
    tango_free_ErrorStack(err);
    reason
}

unsafe fn open(name: &str) -> *mut TangoDeviceProxy {
    let name = cstring(name);
    let mut proxy = ptr::null_mut();
    ok(tango_create_device_proxy(name.as_ptr(), &mut proxy));
    proxy
}

unsafe fn command(arg_type: TangoDataType) -> CommandData {
    CommandData {
        arg_type,
        cmd_data: std::mem::zeroed(),
    }
}

unsafe fn inout(proxy: *mut TangoDeviceProxy, name: &str, argin: &CommandData) -> CommandData {
    let name = cstring(name);
    let mut argout = command(DEV_VOID);
    ok(tango_command_inout(proxy, name.as_ptr(), argin, &mut argout));
    argout
}

#[test]
fn echo_scalars() {
    unsafe {
        let proxy = open("ffi/echo/scalars");

        let mut argin = command(DEV_BOOLEAN);
        argin.cmd_data.bool_val = true;
        let mut out = inout(proxy, "DevBoolean", &argin);
        assert_eq!(out.arg_type, DEV_BOOLEAN);
        assert!(out.cmd_data.bool_val);
        tango_free_CommandData(&mut out);

        let mut argin = command(DEV_LONG);
        argin.cmd_data.long_val = -123_456;
        let out = inout(proxy, "DevLong", &argin);
        assert_eq!(out.cmd_data.long_val, -123_456);

        let mut argin = command(DEV_ULONG64);
        argin.cmd_data.ulong64_val = u64::MAX;
        let out = inout(proxy, "DevULong64", &argin);
        assert_eq!(out.cmd_data.ulong64_val, u64::MAX);

        let mut argin = command(DEV_DOUBLE);
        argin.cmd_data.double_val = 6.02e23;
        let out = inout(proxy, "DevDouble", &argin);
        assert_eq!(out.cmd_data.double_val, 6.02e23);

        let mut argin = command(DEV_STATE);
        argin.cmd_data.state_val = MOVING;
        let out = inout(proxy, "DevState", &argin);
        assert_eq!(out.arg_type, DEV_STATE);
        assert_eq!(out.cmd_data.state_val, MOVING);

        ok(tango_delete_device_proxy(proxy));
    }
}

#[test]
fn string_command_and_single_free() {
    unsafe {
        let proxy = open("ffi/echo/string");
        let ok_text = cstring("ok");
        let mut argin = command(DEV_STRING);
        argin.cmd_data.string_val = ok_text.as_ptr() as *mut c_char;

        let mut out = inout(proxy, "DevString", &argin);
        assert_eq!(out.arg_type, DEV_STRING);
        assert_ne!(out.cmd_data.string_val, argin.cmd_data.string_val);
        assert_eq!(text(out.cmd_data.string_val), "ok");

        tango_free_CommandData(&mut out);
        assert!(out.cmd_data.string_val.is_null());
        tango_free_CommandData(&mut out);

        ok(tango_delete_device_proxy(proxy));
    }
}

#[test]
fn void_command() {
    unsafe {
        let proxy = open("ffi/echo/void");
        let name = cstring("DevVoid");
        let mut argout = command(DEV_STRING);
        ok(tango_command_inout(proxy, name.as_ptr(), ptr::null(), &mut argout));
        assert_eq!(argout.arg_type, DEV_VOID);
        tango_free_CommandData(&mut argout);
        ok(tango_delete_device_proxy(proxy));
    }
}

#[test]
fn string_arrays_keep_empty_elements() {
    unsafe {
        let proxy = open("ffi/echo/strings");
        let owned = [cstring(""), cstring("x"), cstring("")];
        let mut ptrs: Vec<*mut c_char> = owned.iter().map(|s| s.as_ptr() as *mut c_char).collect();

        let mut argin = command(DEVVAR_STRINGARRAY);
        argin.cmd_data.string_arr = VarStringArray {
            length: 3,
            sequence: ptrs.as_mut_ptr(),
        };
        let mut out = inout(proxy, "DevVarStringArray", &argin);
        let arr = out.cmd_data.string_arr;
        let got: Vec<String> = seq(arr.length, arr.sequence).iter().map(|s| text(*s)).collect();
        assert_eq!(got, vec!["", "x", ""]);
        tango_free_CommandData(&mut out);
        assert!(out.cmd_data.string_arr.sequence.is_null());
        assert_eq!(out.cmd_data.string_arr.length, 0);

        // zero-length in, zero-length out
        let argin = command(DEVVAR_STRINGARRAY);
        let mut out = inout(proxy, "DevVarStringArray", &argin);
        assert_eq!(out.cmd_data.string_arr.length, 0);
        assert!(out.cmd_data.string_arr.sequence.is_null());
        tango_free_CommandData(&mut out);

        ok(tango_delete_device_proxy(proxy));
    }
}

#[test]
fn encoded_blob() {
    unsafe {
        let proxy = open("ffi/echo/encoded");
        let format = cstring("jpeg");
        let mut payload = vec![0xffu8, 0xd8, 0x00, 0x10];

        let mut argin = command(DEV_ENCODED);
        argin.cmd_data.encoded_val = TangoDevEncoded {
            encoded_format: format.as_ptr() as *mut c_char,
            encoded_length: payload.len() as u32,
            encoded_data: payload.as_mut_ptr(),
        };
        let mut out = inout(proxy, "DevEncoded", &argin);
        let enc = out.cmd_data.encoded_val;
        assert_eq!(text(enc.encoded_format), "jpeg");
        assert_eq!(seq(enc.encoded_length, enc.encoded_data), payload.as_slice());
        assert_ne!(enc.encoded_data, payload.as_mut_ptr());

        tango_free_CommandData(&mut out);
        assert!(out.cmd_data.encoded_val.encoded_format.is_null());
        assert!(out.cmd_data.encoded_val.encoded_data.is_null());
        ok(tango_delete_device_proxy(proxy));
    }
}

#[test]
fn paired_arrays_with_different_lengths() {
    unsafe {
        let proxy = open("ffi/echo/paired");
        let mut longs = vec![1, 2, 3];
        let owned = [cstring("one")];
        let mut strings: Vec<*mut c_char> =
            owned.iter().map(|s| s.as_ptr() as *mut c_char).collect();

        let mut argin = command(DEVVAR_LONGSTRINGARRAY);
        argin.cmd_data.long_string_arr = VarLongStringArray {
            long_length: 3,
            long_sequence: longs.as_mut_ptr(),
            string_length: 1,
            string_sequence: strings.as_mut_ptr(),
        };
        let mut out = inout(proxy, "DevVarLongStringArray", &argin);
        let pair = out.cmd_data.long_string_arr;
        assert_eq!(seq(pair.long_length, pair.long_sequence), &[1, 2, 3]);
        assert_eq!(pair.string_length, 1);
        assert_eq!(text(*pair.string_sequence), "one");
        tango_free_CommandData(&mut out);
        let pair = out.cmd_data.long_string_arr;
        assert!(pair.long_sequence.is_null() && pair.string_sequence.is_null());

        let owned = [cstring("a"), cstring("b")];
        let mut strings: Vec<*mut c_char> =
            owned.iter().map(|s| s.as_ptr() as *mut c_char).collect();
        let mut argin = command(DEVVAR_DOUBLESTRINGARRAY);
        argin.cmd_data.double_string_arr = VarDoubleStringArray {
            double_length: 0,
            double_sequence: ptr::null_mut(),
            string_length: 2,
            string_sequence: strings.as_mut_ptr(),
        };
        let mut out = inout(proxy, "DevVarDoubleStringArray", &argin);
        let pair = out.cmd_data.double_string_arr;
        assert_eq!(pair.double_length, 0);
        assert!(pair.double_sequence.is_null());
        let got: Vec<String> = seq(pair.string_length, pair.string_sequence)
            .iter()
            .map(|s| text(*s))
            .collect();
        assert_eq!(got, vec!["a", "b"]);
        tango_free_CommandData(&mut out);

        ok(tango_delete_device_proxy(proxy));
    }
}

#[test]
fn failure_leaves_output_untouched() {
    unsafe {
        let proxy = open("ffi/errors/1");
        let name = cstring("NoSuchCommand");
        let mut argout = command(999);
        let err = tango_command_inout(proxy, name.as_ptr(), ptr::null(), &mut argout);
        assert_eq!(failure(err), "API_CommandNotFound");
        assert_eq!(argout.arg_type, 999);

        let name = cstring("DevLong");
        let argin = command(DEV_UCHAR);
        let err = tango_command_inout(proxy, name.as_ptr(), &argin, &mut argout);
        assert_eq!(failure(err), "Data type error");
        assert_eq!(argout.arg_type, 999);

        let attr = cstring("does_not_exist");
        let mut reading: AttributeData = std::mem::zeroed();
        reading.dim_x = -7;
        let err = tango_read_attribute(proxy, attr.as_ptr(), &mut reading);
        assert_eq!(failure(err), "API_AttrNotFound");
        assert_eq!(reading.dim_x, -7);
        assert!(reading.name.is_null());

        ok(tango_delete_device_proxy(proxy));
    }
}

#[test]
fn builtin_and_generic_state_attributes() {
    const DEVICE: &str = "ffi/state/1";
    unsafe {
        let proxy = open(DEVICE);
        Loopback::global()
            .define_attribute(
                DEVICE,
                "valve_state",
                AttrValue::StateArray(vec![DevState::Open]),
                AttrWriteType::Read,
            )
            .unwrap();
        Loopback::global()
            .define_attribute(
                DEVICE,
                "valve",
                AttrValue::State(DevState::Close),
                AttrWriteType::ReadWrite,
            )
            .unwrap();

        for (attr, expected) in [("State", ON), ("valve_state", OPEN), ("valve", CLOSE)] {
            let name = cstring(attr);
            let mut reading: AttributeData = std::mem::zeroed();
            ok(tango_read_attribute(proxy, name.as_ptr(), &mut reading));
            assert_eq!(reading.data_type, DEV_STATE);
            assert_eq!(reading.nb_read, 1);
            let states = reading.attr_data.state_arr;
            assert_eq!(seq(states.length, states.sequence), &[expected]);
            tango_free_AttributeData(&mut reading);
        }
        ok(tango_delete_device_proxy(proxy));
    }
}

#[test]
fn invalid_quality_keeps_metadata() {
    const DEVICE: &str = "ffi/quality/1";
    unsafe {
        let proxy = open(DEVICE);
        Loopback::global()
            .set_attribute_quality(DEVICE, "double_spectrum", AttrQuality::Invalid)
            .unwrap();

        let name = cstring("double_spectrum");
        let mut reading: AttributeData = std::mem::zeroed();
        ok(tango_read_attribute(proxy, name.as_ptr(), &mut reading));
        assert_eq!(reading.quality, ATTR_INVALID);
        assert_eq!(reading.data_type, DEV_DOUBLE);
        assert_eq!(reading.data_format, SPECTRUM);
        assert_eq!(text(reading.name), "double_spectrum");
        assert_eq!(reading.nb_read, 0);
        assert_eq!(reading.attr_data.double_arr.length, 0);
        assert!(reading.attr_data.double_arr.sequence.is_null());

        tango_free_AttributeData(&mut reading);
        assert!(reading.name.is_null());
        tango_free_AttributeData(&mut reading);
        ok(tango_delete_device_proxy(proxy));
    }
}

#[test]
fn write_then_read_attributes() {
    unsafe {
        let proxy = open("ffi/attrs/1");
        let name = cstring("long_scalar");
        let mut value = [77i32];
        let mut write: AttributeData = std::mem::zeroed();
        write.data_type = DEV_LONG;
        write.data_format = SCALAR;
        write.quality = ATTR_VALID;
        write.name = name.as_ptr() as *mut c_char;
        write.attr_data.long_arr = VarLongArray {
            length: 1,
            sequence: value.as_mut_ptr(),
        };
        ok(tango_write_attribute(proxy, &write));

        let owned = [cstring("long_scalar"), cstring("Status")];
        let mut names: Vec<*mut c_char> = owned.iter().map(|s| s.as_ptr() as *mut c_char).collect();
        let names = VarStringArray {
            length: 2,
            sequence: names.as_mut_ptr(),
        };
        let mut list: AttributeDataList = std::mem::zeroed();
        ok(tango_read_attributes(proxy, &names, &mut list));
        let readings = seq(list.length, list.sequence);
        assert_eq!(readings.len(), 2);
        assert_eq!(seq(readings[0].attr_data.long_arr.length, readings[0].attr_data.long_arr.sequence), &[77]);
        let status = readings[1].attr_data.string_arr;
        assert_eq!(text(*status.sequence), "The device is in ON state.");
        tango_free_AttributeDataList(&mut list);
        assert!(list.sequence.is_null());

        let mut read_only = write;
        read_only.name = owned[1].as_ptr() as *mut c_char;
        assert_eq!(
            failure(tango_write_attribute(proxy, &read_only)),
            "API_AttrNotWritable"
        );
        ok(tango_delete_device_proxy(proxy));
    }
}

#[test]
fn metadata_queries() {
    unsafe {
        let proxy = open("ffi/meta/1");

        let name = cstring("DevVarDoubleStringArray");
        let mut info: CommandInfo = std::mem::zeroed();
        ok(tango_command_query(proxy, name.as_ptr(), &mut info));
        assert_eq!(text(info.cmd_name), "DevVarDoubleStringArray");
        assert_eq!(info.in_type, DEVVAR_DOUBLESTRINGARRAY);
        assert_eq!(info.out_type, DEVVAR_DOUBLESTRINGARRAY);
        tango_free_CommandInfo(&mut info);
        assert!(info.cmd_name.is_null());

        let mut commands: CommandInfoList = std::mem::zeroed();
        ok(tango_command_list_query(proxy, &mut commands));
        assert!(seq(commands.length, commands.sequence)
            .iter()
            .any(|c| text(c.cmd_name) == "Status"));
        tango_free_CommandInfoList(&mut commands);

        let mut attrs: VarStringArray = std::mem::zeroed();
        ok(tango_get_attribute_list(proxy, &mut attrs));
        let names: Vec<String> = seq(attrs.length, attrs.sequence).iter().map(|s| text(*s)).collect();
        assert!(names.iter().any(|n| n == "ampli"));
        tango_free_VarStringArray(&mut attrs);

        let owned = [cstring("ampli")];
        let mut ptrs: Vec<*mut c_char> = owned.iter().map(|s| s.as_ptr() as *mut c_char).collect();
        let wanted = VarStringArray {
            length: 1,
            sequence: ptrs.as_mut_ptr(),
        };
        let mut config: AttributeInfoList = std::mem::zeroed();
        ok(tango_get_attribute_config(proxy, &wanted, &mut config));
        let infos = seq(config.length, config.sequence);
        assert_eq!(infos[0].data_type, DEV_DOUBLE);
        assert_eq!(infos[0].writable, READ_WRITE);
        tango_free_AttributeInfoList(&mut config);

        let mut all: AttributeInfoList = std::mem::zeroed();
        ok(tango_attribute_list_query(proxy, &mut all));
        assert!(all.length as usize >= names.len());
        tango_free_AttributeInfoList(&mut all);

        ok(tango_delete_device_proxy(proxy));
    }
}

#[test]
fn proxy_settings() {
    unsafe {
        let proxy = open("ffi/settings/1");
        ok(tango_set_source(proxy, DEV));
        let mut source = CACHE;
        ok(tango_get_source(proxy, &mut source));
        assert_eq!(source, DEV);
        assert_eq!(failure(tango_set_source(proxy, 17)), "API_InvalidArgs");

        let mut millis = 0;
        ok(tango_get_timeout_millis(proxy, &mut millis));
        assert!(millis > 0);
        ok(tango_delete_device_proxy(proxy));
    }
}

#[test]
fn lock_is_visible_to_other_clients() {
    unsafe {
        let first = open("ffi/lock/1");
        let second = open("ffi/lock/1");
        ok(tango_lock(first));

        let mut locked = false;
        ok(tango_is_locked(second, &mut locked));
        assert!(locked);
        let mut mine = true;
        ok(tango_is_locked_by_me(second, &mut mine));
        assert!(!mine);

        let mut status = ptr::null_mut();
        ok(tango_locking_status(second, &mut status));
        assert!(text(status).contains("is locked by client"));
        tango_free_string(status);

        ok(tango_unlock(first));
        ok(tango_delete_device_proxy(first));
        ok(tango_delete_device_proxy(second));
    }
}

#[test]
fn name_tables() {
    unsafe {
        assert_eq!(text(tango_data_type_name(DEVVAR_LONGSTRINGARRAY)), "DevVarLongStringArray");
        assert_eq!(text(tango_dev_state_name(FAULT)), "FAULT");
        assert_eq!(text(TangoDataTypeName.0[DEV_ENCODED as usize]), "DevEncoded");
        assert!(tango_dev_state_name(14).is_null());
    }
}
