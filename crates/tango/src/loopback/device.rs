// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Simulated test device.
//!
//! Every device served by the loopback behaves like the usual Tango test
//! device: one echo command per data type named after the type, the
//! built-in `State` and `Status` attributes, and a set of writable scalar
//! and spectrum attributes that read back what was written last.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::database::{PropertyDb, Scope};
use crate::config::{self, STATE_ATTRIBUTE, STATUS_ATTRIBUTE};
use crate::data::{
    AttrValue, AttributeData, AttributeInfo, CommandData, CommandInfo, DevEncoded, TimeVal,
};
use crate::error::{TangoError, TangoResult};
use crate::property::DbDatum;
use crate::transport::DeviceTransport;
use crate::types::{AttrDataFormat, AttrQuality, AttrWriteType, DataType, DevSource, DevState, DispLevel};

/// Tags that have an echo command.
const ECHO_TYPES: &[DataType] = &[
    DataType::Void,
    DataType::Boolean,
    DataType::Short,
    DataType::Long,
    DataType::Float,
    DataType::Double,
    DataType::UShort,
    DataType::ULong,
    DataType::String,
    DataType::CharArray,
    DataType::ShortArray,
    DataType::LongArray,
    DataType::FloatArray,
    DataType::DoubleArray,
    DataType::UShortArray,
    DataType::ULongArray,
    DataType::StringArray,
    DataType::LongStringArray,
    DataType::DoubleStringArray,
    DataType::State,
    DataType::BooleanArray,
    DataType::Long64,
    DataType::ULong64,
    DataType::Long64Array,
    DataType::ULong64Array,
    DataType::Encoded,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Echo,
    State,
    Status,
    Init,
    SwitchStates,
}

#[derive(Debug, Clone)]
struct Command {
    info: CommandInfo,
    kind: Builtin,
}

#[derive(Debug, Clone)]
struct StoredAttribute {
    info: AttributeInfo,
    value: AttrValue,
    quality: AttrQuality,
    time_stamp: TimeVal,
}

impl StoredAttribute {
    fn new(name: &str, value: AttrValue, writable: AttrWriteType) -> Self {
        let format = if value.is_scalar() {
            AttrDataFormat::Scalar
        } else {
            AttrDataFormat::Spectrum
        };
        Self {
            info: AttributeInfo::new(name, value.data_type(), format, writable),
            value,
            quality: AttrQuality::Valid,
            time_stamp: TimeVal::now(),
        }
    }

    fn reading(&self) -> AttributeData {
        let (dim_x, dim_y) = match self.info.data_format {
            AttrDataFormat::Scalar => (1, 0),
            _ => (self.value.len(), 0),
        };
        // Only the built-in State attribute travels as a lone state; user
        // state attributes are delivered as sequences.
        let data = match &self.value {
            AttrValue::State(state) => AttrValue::StateArray(vec![*state]),
            value => value.clone(),
        };
        AttributeData {
            data,
            format: self.info.data_format,
            quality: self.quality,
            name: self.info.name.clone(),
            dim_x,
            dim_y,
            time_stamp: self.time_stamp,
        }
    }
}

/// Shared server-side state of one device.
pub(crate) struct DeviceState {
    name: String,
    state: DevState,
    status: String,
    commands: BTreeMap<String, Command>,
    attributes: BTreeMap<String, StoredAttribute>,
    locker: Option<u64>,
}

impl DeviceState {
    pub(crate) fn test_device(name: &str) -> Self {
        let mut dev = Self {
            name: name.to_string(),
            state: DevState::On,
            status: String::new(),
            commands: BTreeMap::new(),
            attributes: BTreeMap::new(),
            locker: None,
        };
        dev.update_status();

        for tag in ECHO_TYPES {
            dev.add_command(tag.name(), *tag, *tag, Builtin::Echo);
        }
        dev.add_command("State", DataType::Void, DataType::State, Builtin::State);
        dev.add_command("Status", DataType::Void, DataType::String, Builtin::Status);
        dev.add_command("Init", DataType::Void, DataType::Void, Builtin::Init);
        dev.add_command(
            "SwitchStates",
            DataType::Void,
            DataType::Void,
            Builtin::SwitchStates,
        );

        let rw = AttrWriteType::ReadWrite;
        for (attr, value) in [
            ("boolean_scalar", AttrValue::Boolean(false)),
            ("uchar_scalar", AttrValue::UChar(0)),
            ("short_scalar", AttrValue::Short(0)),
            ("ushort_scalar", AttrValue::UShort(0)),
            ("long_scalar", AttrValue::Long(0)),
            ("ulong_scalar", AttrValue::ULong(0)),
            ("long64_scalar", AttrValue::Long64(0)),
            ("ulong64_scalar", AttrValue::ULong64(0)),
            ("float_scalar", AttrValue::Float(0.0)),
            ("double_scalar", AttrValue::Double(0.0)),
            ("string_scalar", AttrValue::String("Default string".to_string())),
            ("encoded_scalar", AttrValue::Encoded(DevEncoded::default())),
            ("ampli", AttrValue::Double(1.0)),
            ("boolean_spectrum", AttrValue::BooleanArray(vec![false; 4])),
            ("short_spectrum", AttrValue::ShortArray(vec![0; 4])),
            ("long_spectrum", AttrValue::LongArray(vec![0; 4])),
            ("double_spectrum", AttrValue::DoubleArray(vec![0.0; 4])),
            ("string_spectrum", AttrValue::StringArray(Vec::new())),
        ] {
            dev.define_attribute(attr, value, rw);
        }
        dev
    }

    fn add_command(&mut self, name: &str, in_type: DataType, out_type: DataType, kind: Builtin) {
        let (in_type_desc, out_type_desc) = match kind {
            Builtin::Echo => ("Any value", "Echo of the argin value"),
            Builtin::State => ("Uninitialised", "Device state"),
            Builtin::Status => ("Uninitialised", "Device status"),
            Builtin::Init | Builtin::SwitchStates => ("Uninitialised", "Uninitialised"),
        };
        let info = CommandInfo {
            cmd_name: name.to_string(),
            cmd_tag: 0,
            in_type,
            out_type,
            in_type_desc: in_type_desc.to_string(),
            out_type_desc: out_type_desc.to_string(),
            disp_level: DispLevel::Operator,
        };
        self.commands
            .insert(name.to_lowercase(), Command { info, kind });
    }

    /// Create or replace a user attribute.
    pub(crate) fn define_attribute(&mut self, name: &str, value: AttrValue, writable: AttrWriteType) {
        self.attributes
            .insert(name.to_lowercase(), StoredAttribute::new(name, value, writable));
    }

    pub(crate) fn set_quality(&mut self, attr: &str, quality: AttrQuality) -> TangoResult<()> {
        let stored = self
            .attributes
            .get_mut(&attr.to_lowercase())
            .ok_or_else(|| attr_not_found(&self.name, attr))?;
        stored.quality = quality;
        Ok(())
    }

    pub(crate) fn set_state(&mut self, state: DevState) {
        self.state = state;
        self.update_status();
    }

    fn update_status(&mut self) {
        self.status = format!("The device is in {} state.", self.state);
    }

    fn state_info(&self) -> AttributeInfo {
        AttributeInfo::new(
            STATE_ATTRIBUTE,
            DataType::State,
            AttrDataFormat::Scalar,
            AttrWriteType::Read,
        )
    }

    fn status_info(&self) -> AttributeInfo {
        AttributeInfo::new(
            STATUS_ATTRIBUTE,
            DataType::String,
            AttrDataFormat::Scalar,
            AttrWriteType::Read,
        )
    }

    fn attribute_info(&self, name: &str) -> TangoResult<AttributeInfo> {
        if name.eq_ignore_ascii_case(STATE_ATTRIBUTE) {
            return Ok(self.state_info());
        }
        if name.eq_ignore_ascii_case(STATUS_ATTRIBUTE) {
            return Ok(self.status_info());
        }
        self.attributes
            .get(&name.to_lowercase())
            .map(|stored| stored.info.clone())
            .ok_or_else(|| attr_not_found(&self.name, name))
    }

    fn all_attribute_info(&self) -> Vec<AttributeInfo> {
        let mut infos: Vec<AttributeInfo> =
            self.attributes.values().map(|s| s.info.clone()).collect();
        infos.push(self.state_info());
        infos.push(self.status_info());
        infos
    }

    fn read_one(&self, name: &str) -> TangoResult<AttributeData> {
        if name.eq_ignore_ascii_case(STATE_ATTRIBUTE) {
            return Ok(AttributeData::simple(
                STATE_ATTRIBUTE,
                AttrValue::State(self.state),
            ));
        }
        if name.eq_ignore_ascii_case(STATUS_ATTRIBUTE) {
            return Ok(AttributeData::simple(
                STATUS_ATTRIBUTE,
                AttrValue::String(self.status.clone()),
            ));
        }
        self.attributes
            .get(&name.to_lowercase())
            .map(StoredAttribute::reading)
            .ok_or_else(|| attr_not_found(&self.name, name))
    }

    fn check_write(&self, value: &AttributeData) -> TangoResult<()> {
        let origin = "DeviceImpl::write_attributes";
        let info = self.attribute_info(&value.name)?;
        if !info.writable.is_writable() {
            return Err(TangoError::new(
                "API_AttrNotWritable",
                format!("Attribute {} of device {} is not writable", value.name, self.name),
                origin,
            ));
        }
        let shape_ok = match info.data_format {
            AttrDataFormat::Scalar => value.data.is_scalar(),
            _ => true,
        };
        if info.data_type != value.data.data_type() || !shape_ok {
            return Err(TangoError::new(
                "API_IncompatibleAttrArgumentType",
                format!(
                    "Incompatible value for attribute {}: expected {} {}, got {}",
                    value.name,
                    info.data_format,
                    info.data_type,
                    value.data.data_type()
                ),
                origin,
            ));
        }
        Ok(())
    }

    fn check_lock(&self, client: u64, origin: &str) -> TangoResult<()> {
        match self.locker {
            Some(owner) if owner != client => Err(TangoError::new(
                "API_DeviceLocked",
                format!("Device {} is locked by another client", self.name),
                origin,
            )),
            _ => Ok(()),
        }
    }

    fn execute(&mut self, command: &str, argin: CommandData) -> TangoResult<CommandData> {
        let cmd = self
            .commands
            .get(&command.to_lowercase())
            .cloned()
            .ok_or_else(|| {
                TangoError::new(
                    "API_CommandNotFound",
                    format!("Command {} not found", command),
                    "Device_3Impl::command_inout",
                )
            })?;
        if argin.data_type() != cmd.info.in_type {
            return Err(TangoError::new(
                "API_IncompatibleCmdArgumentType",
                format!(
                    "Incompatible command argument type, expected type is : Tango::{}",
                    cmd.info.in_type
                ),
                "Command::extract",
            ));
        }
        let out = match cmd.kind {
            Builtin::Echo => argin,
            Builtin::State => CommandData::State(self.state),
            Builtin::Status => CommandData::String(self.status.clone()),
            Builtin::Init => {
                self.set_state(DevState::On);
                CommandData::Void
            }
            Builtin::SwitchStates => {
                let next = if self.state == DevState::On {
                    DevState::Fault
                } else {
                    DevState::On
                };
                self.set_state(next);
                CommandData::Void
            }
        };
        Ok(out)
    }
}

fn attr_not_found(device: &str, attr: &str) -> TangoError {
    TangoError::new(
        "API_AttrNotFound",
        format!("Attribute {} not found for device {}", attr, device),
        "MultiAttribute::get_attr_by_name",
    )
}

/// Client-side connection to a loopback device.
pub(crate) struct LoopbackDevice {
    name: String,
    client: u64,
    timeout_ms: u32,
    source: DevSource,
    state: Arc<Mutex<DeviceState>>,
    db: Arc<PropertyDb>,
}

impl LoopbackDevice {
    pub(crate) fn new(
        name: &str,
        client: u64,
        state: Arc<Mutex<DeviceState>>,
        db: Arc<PropertyDb>,
    ) -> Self {
        Self {
            name: name.to_string(),
            client,
            timeout_ms: config::default_timeout_ms(),
            source: DevSource::default(),
            state,
            db,
        }
    }
}

impl Drop for LoopbackDevice {
    fn drop(&mut self) {
        let mut dev = self.state.lock();
        if dev.locker == Some(self.client) {
            log::debug!("[loopback] {} unlocked on proxy drop", self.name);
            dev.locker = None;
        }
    }
}

impl DeviceTransport for LoopbackDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn command_inout(&mut self, command: &str, argin: CommandData) -> TangoResult<CommandData> {
        let mut dev = self.state.lock();
        dev.check_lock(self.client, "DeviceProxy::command_inout")?;
        dev.execute(command, argin)
    }

    fn command_query(&mut self, command: &str) -> TangoResult<CommandInfo> {
        let dev = self.state.lock();
        dev.commands
            .get(&command.to_lowercase())
            .map(|cmd| cmd.info.clone())
            .ok_or_else(|| {
                TangoError::new(
                    "API_CommandNotFound",
                    format!("Command {} not found", command),
                    "DeviceProxy::command_query",
                )
            })
    }

    fn command_list_query(&mut self) -> TangoResult<Vec<CommandInfo>> {
        let dev = self.state.lock();
        Ok(dev.commands.values().map(|cmd| cmd.info.clone()).collect())
    }

    fn get_attribute_list(&mut self) -> TangoResult<Vec<String>> {
        let dev = self.state.lock();
        Ok(dev
            .all_attribute_info()
            .into_iter()
            .map(|info| info.name)
            .collect())
    }

    fn get_attribute_config(&mut self, names: &[String]) -> TangoResult<Vec<AttributeInfo>> {
        let dev = self.state.lock();
        names.iter().map(|name| dev.attribute_info(name)).collect()
    }

    fn attribute_list_query(&mut self) -> TangoResult<Vec<AttributeInfo>> {
        Ok(self.state.lock().all_attribute_info())
    }

    fn read_attributes(
        &mut self,
        names: &[String],
    ) -> TangoResult<Vec<TangoResult<AttributeData>>> {
        let dev = self.state.lock();
        Ok(names.iter().map(|name| dev.read_one(name)).collect())
    }

    fn write_attributes(&mut self, values: Vec<AttributeData>) -> TangoResult<()> {
        let mut dev = self.state.lock();
        dev.check_lock(self.client, "DeviceProxy::write_attributes")?;
        for value in &values {
            dev.check_write(value)?;
        }
        for value in values {
            if let Some(stored) = dev.attributes.get_mut(&value.name.to_lowercase()) {
                stored.value = value.data;
                stored.quality = AttrQuality::Valid;
                stored.time_stamp = TimeVal::now();
            }
        }
        Ok(())
    }

    fn get_property(&mut self, names: &[String]) -> TangoResult<Vec<DbDatum>> {
        Ok(self.db.get(Scope::Device, &self.name, names))
    }

    fn put_property(&mut self, properties: Vec<DbDatum>) -> TangoResult<()> {
        self.db.put(Scope::Device, &self.name, properties);
        Ok(())
    }

    fn delete_property(&mut self, names: &[String]) -> TangoResult<()> {
        self.db.delete(Scope::Device, &self.name, names);
        Ok(())
    }

    fn timeout_millis(&self) -> TangoResult<u32> {
        Ok(self.timeout_ms)
    }

    fn set_timeout_millis(&mut self, millis: u32) -> TangoResult<()> {
        self.timeout_ms = millis;
        Ok(())
    }

    fn source(&self) -> TangoResult<DevSource> {
        Ok(self.source)
    }

    fn set_source(&mut self, source: DevSource) -> TangoResult<()> {
        self.source = source;
        Ok(())
    }

    fn lock(&mut self) -> TangoResult<()> {
        let mut dev = self.state.lock();
        dev.check_lock(self.client, "DeviceProxy::lock")?;
        dev.locker = Some(self.client);
        Ok(())
    }

    fn unlock(&mut self) -> TangoResult<()> {
        let mut dev = self.state.lock();
        dev.check_lock(self.client, "DeviceProxy::unlock")?;
        dev.locker = None;
        Ok(())
    }

    fn is_locked(&mut self) -> TangoResult<bool> {
        Ok(self.state.lock().locker.is_some())
    }

    fn is_locked_by_me(&mut self) -> TangoResult<bool> {
        Ok(self.state.lock().locker == Some(self.client))
    }

    fn locking_status(&mut self) -> TangoResult<String> {
        let dev = self.state.lock();
        Ok(match dev.locker {
            None => format!("Device {} is not locked", self.name),
            Some(owner) if owner == self.client => {
                format!("Device {} is locked by this client", self.name)
            }
            Some(owner) => format!("Device {} is locked by client {}", self.name, owner),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(state: &Arc<Mutex<DeviceState>>, client: u64) -> LoopbackDevice {
        LoopbackDevice::new(
            "sys/tg_test/1",
            client,
            Arc::clone(state),
            Arc::new(PropertyDb::default()),
        )
    }

    fn device() -> Arc<Mutex<DeviceState>> {
        Arc::new(Mutex::new(DeviceState::test_device("sys/tg_test/1")))
    }

    #[test]
    fn echo_commands() {
        let state = device();
        let mut dev = connect(&state, 1);
        assert_eq!(
            dev.command_inout("DevLong", CommandData::Long(7)).unwrap(),
            CommandData::Long(7)
        );
        assert_eq!(
            dev.command_inout("devvoid", CommandData::Void).unwrap(),
            CommandData::Void
        );
        let err = dev
            .command_inout("DevLong", CommandData::Double(1.0))
            .unwrap_err();
        assert_eq!(err.reason(), "API_IncompatibleCmdArgumentType");
        let err = dev.command_inout("Nope", CommandData::Void).unwrap_err();
        assert_eq!(err.reason(), "API_CommandNotFound");
    }

    #[test]
    fn switch_states() {
        let state = device();
        let mut dev = connect(&state, 1);
        dev.command_inout("SwitchStates", CommandData::Void).unwrap();
        assert_eq!(
            dev.command_inout("State", CommandData::Void).unwrap(),
            CommandData::State(DevState::Fault)
        );
        let status = dev.command_inout("Status", CommandData::Void).unwrap();
        assert_eq!(status.as_str(), Some("The device is in FAULT state."));
        dev.command_inout("Init", CommandData::Void).unwrap();
        assert_eq!(
            dev.command_inout("State", CommandData::Void).unwrap(),
            CommandData::State(DevState::On)
        );
    }

    #[test]
    fn state_attribute_is_scalar() {
        let state = device();
        let mut dev = connect(&state, 1);
        let read = dev.read_attributes(&["state".to_string()]).unwrap();
        let attr = read[0].as_ref().unwrap();
        assert_eq!(attr.name, "State");
        assert_eq!(attr.data, AttrValue::State(DevState::On));
    }

    #[test]
    fn user_state_attribute_reads_as_sequence() {
        let state = device();
        state.lock().define_attribute(
            "valve",
            AttrValue::State(DevState::Open),
            AttrWriteType::ReadWrite,
        );
        let mut dev = connect(&state, 1);
        let read = dev.read_attributes(&["valve".to_string()]).unwrap();
        let attr = read[0].as_ref().unwrap();
        assert_eq!(attr.data, AttrValue::StateArray(vec![DevState::Open]));
        assert_eq!(attr.dim_x, 1);

        dev.write_attributes(vec![AttributeData::simple(
            "valve",
            AttrValue::State(DevState::Close),
        )])
        .unwrap();
        let read = dev.read_attributes(&["valve".to_string()]).unwrap();
        assert_eq!(
            read[0].as_ref().unwrap().data,
            AttrValue::StateArray(vec![DevState::Close])
        );
    }

    #[test]
    fn write_then_read() {
        let state = device();
        let mut dev = connect(&state, 1);
        dev.write_attributes(vec![AttributeData::simple(
            "double_spectrum",
            AttrValue::DoubleArray(vec![1.0, 2.0]),
        )])
        .unwrap();
        let read = dev.read_attributes(&["double_spectrum".to_string()]).unwrap();
        let attr = read[0].as_ref().unwrap();
        assert_eq!(attr.data, AttrValue::DoubleArray(vec![1.0, 2.0]));
        assert_eq!(attr.dim_x, 2);
    }

    #[test]
    fn write_rejections() {
        let state = device();
        let mut dev = connect(&state, 1);
        let err = dev
            .write_attributes(vec![AttributeData::simple("State", AttrValue::State(DevState::Off))])
            .unwrap_err();
        assert_eq!(err.reason(), "API_AttrNotWritable");
        let err = dev
            .write_attributes(vec![AttributeData::simple("long_scalar", AttrValue::Double(1.0))])
            .unwrap_err();
        assert_eq!(err.reason(), "API_IncompatibleAttrArgumentType");
        let err = dev
            .write_attributes(vec![AttributeData::simple("nope", AttrValue::Long(1))])
            .unwrap_err();
        assert_eq!(err.reason(), "API_AttrNotFound");
    }

    #[test]
    fn per_attribute_failures() {
        let state = device();
        let mut dev = connect(&state, 1);
        let read = dev
            .read_attributes(&["long_scalar".to_string(), "missing".to_string()])
            .unwrap();
        assert!(read[0].is_ok());
        assert_eq!(read[1].as_ref().unwrap_err().reason(), "API_AttrNotFound");
    }

    #[test]
    fn locking_between_clients() {
        let state = device();
        let mut a = connect(&state, 1);
        let mut b = connect(&state, 2);
        a.lock().unwrap();
        assert!(a.is_locked_by_me().unwrap());
        assert!(b.is_locked().unwrap());
        assert!(!b.is_locked_by_me().unwrap());
        assert_eq!(
            b.command_inout("DevVoid", CommandData::Void).unwrap_err().reason(),
            "API_DeviceLocked"
        );
        assert!(b.locking_status().unwrap().contains("locked by client 1"));
        drop(a);
        assert!(!b.is_locked().unwrap());
        assert!(b.locking_status().unwrap().ends_with("is not locked"));
    }
}
