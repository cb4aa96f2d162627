// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client API against the default in-process connector.

use tango::{
    AttrValue, AttributeData, CommandData, DataType, DatabaseProxy, DbDatum, DevEncoded,
    DevState, DeviceProxy, Extracted, PropertyValue,
};

#[test]
fn echo_every_command_type() {
    let mut dev = DeviceProxy::new("it/echo/1").unwrap();
    let samples = vec![
        CommandData::Void,
        CommandData::Boolean(true),
        CommandData::Short(-12),
        CommandData::Long(1 << 20),
        CommandData::Float(1.25),
        CommandData::Double(-0.5),
        CommandData::UShort(65535),
        CommandData::ULong(u32::MAX),
        CommandData::Long64(i64::MIN),
        CommandData::ULong64(u64::MAX),
        CommandData::String("hello".to_string()),
        CommandData::State(DevState::Moving),
        CommandData::Encoded(DevEncoded::new("raw", vec![0, 1, 2, 255])),
        CommandData::CharArray(vec![b'a', 0, b'b']),
        CommandData::ShortArray(vec![1, -1]),
        CommandData::LongArray(vec![]),
        CommandData::FloatArray(vec![0.1]),
        CommandData::DoubleArray(vec![1.0, 2.0, 3.0]),
        CommandData::UShortArray(vec![7]),
        CommandData::ULongArray(vec![8, 9]),
        CommandData::Long64Array(vec![-5]),
        CommandData::ULong64Array(vec![5]),
        CommandData::BooleanArray(vec![true, false]),
        CommandData::StringArray(vec!["a".to_string(), String::new()]),
        CommandData::LongStringArray(vec![1, 2, 3], vec!["x".to_string()]),
        CommandData::DoubleStringArray(vec![], vec!["only".to_string(), "strings".to_string()]),
    ];

    for sample in samples {
        let command = sample.data_type().name();
        let echoed = dev.command_inout(command, sample.clone()).unwrap();
        assert_eq!(echoed, sample, "echo of {}", command);
    }
}

#[test]
fn command_metadata() {
    let mut dev = DeviceProxy::new("it/meta/1").unwrap();
    let info = dev.command_query("DevVarLongStringArray").unwrap();
    assert_eq!(info.in_type, DataType::LongStringArray);
    assert_eq!(info.out_type, DataType::LongStringArray);

    let all = dev.command_list_query().unwrap();
    assert!(all.iter().any(|c| c.cmd_name == "State"));
    assert!(all.iter().any(|c| c.cmd_name == "DevEncoded"));

    let attrs = dev.get_attribute_list().unwrap();
    assert!(attrs.contains(&"State".to_string()));
    assert!(attrs.contains(&"double_spectrum".to_string()));

    let config = dev
        .get_attribute_config(&["ampli".to_string(), "Status".to_string()])
        .unwrap();
    assert_eq!(config[0].data_type, DataType::Double);
    assert_eq!(config[1].data_type, DataType::String);
}

#[test]
fn batch_read_keeps_per_attribute_failures() {
    let mut dev = DeviceProxy::new("it/batch/1").unwrap();
    dev.write_attribute(AttributeData::simple("long_scalar", AttrValue::Long(99)))
        .unwrap();
    let results = dev
        .read_attributes(&[
            "long_scalar".to_string(),
            "does_not_exist".to_string(),
            "State".to_string(),
        ])
        .unwrap();
    assert_eq!(results[0].as_ref().unwrap().data, AttrValue::Long(99));
    assert_eq!(
        results[1].as_ref().unwrap_err().reason(),
        "API_AttrNotFound"
    );
    assert_eq!(
        results[2].as_ref().unwrap().data,
        AttrValue::State(DevState::On)
    );
}

#[test]
fn device_and_free_properties() {
    let mut dev = DeviceProxy::new("it/props/1").unwrap();
    dev.put_property(vec![DbDatum::with_value(
        "offsets",
        &PropertyValue::LongArray(vec![1, -2, 3]),
    )])
    .unwrap();
    let got = dev.get_property(&["offsets".to_string()]).unwrap();
    assert_eq!(
        got[0].extract(DataType::LongArray).unwrap(),
        Extracted::Value(PropertyValue::LongArray(vec![1, -2, 3]))
    );
    assert_eq!(
        got[0].extract(DataType::Double).unwrap(),
        Extracted::Value(PropertyValue::Double(1.0))
    );

    let mut db = DatabaseProxy::new().unwrap();
    db.put_property(
        "it_free_object",
        vec![DbDatum::with_value("label", &PropertyValue::String("x".to_string()))],
    )
    .unwrap();
    let list = db.get_object_list("it_free_*").unwrap();
    assert_eq!(list.values, vec!["it_free_object".to_string()]);
    let names = db.get_object_property_list("it_free_object", "*").unwrap();
    assert_eq!(names.values, vec!["label".to_string()]);

    let exported = db.get_device_exported("it/props/*").unwrap();
    assert_eq!(exported.values, vec!["it/props/1".to_string()]);
}

#[test]
fn bad_device_name() {
    let err = DeviceProxy::new("not-a-device").err().unwrap();
    assert_eq!(err.reason(), "API_WrongDeviceNameSyntax");
}

#[test]
fn random_spectra_survive_write_and_read() {
    let mut rng = fastrand::Rng::with_seed(42);
    let mut dev = DeviceProxy::new("it/spectra/1").unwrap();
    for _ in 0..50 {
        let len = rng.usize(0..64);
        let values: Vec<f64> = (0..len).map(|_| rng.f64() * 1e6 - 5e5).collect();
        let shorts: Vec<i16> = (0..len).map(|_| rng.i16(..)).collect();
        dev.write_attributes(vec![
            AttributeData::simple("double_spectrum", AttrValue::DoubleArray(values.clone())),
            AttributeData::simple("short_spectrum", AttrValue::ShortArray(shorts.clone())),
        ])
        .unwrap();

        let read = dev
            .read_attributes(&["double_spectrum".to_string(), "short_spectrum".to_string()])
            .unwrap();
        let doubles = read[0].as_ref().unwrap();
        assert_eq!(doubles.data, AttrValue::DoubleArray(values));
        assert_eq!(doubles.dim_x, len);
        assert_eq!(read[1].as_ref().unwrap().data, AttrValue::ShortArray(shorts));
    }
}
