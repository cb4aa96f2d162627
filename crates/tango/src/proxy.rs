// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client proxies over a transport.

use crate::config::{TangoHost, ENV_TANGO_HOST};
use crate::data::{AttributeData, AttributeInfo, CommandData, CommandInfo};
use crate::error::{TangoError, TangoResult};
use crate::property::DbDatum;
use crate::transport::{self, DatabaseTransport, DeviceTransport};
use crate::types::DevSource;

/// Handle on one remote device.
pub struct DeviceProxy {
    transport: Box<dyn DeviceTransport>,
}

impl DeviceProxy {
    /// Connect through the process-wide connector.
    pub fn new(name: &str) -> TangoResult<Self> {
        let transport = transport::connector().connect_device(name)?;
        log::debug!("[tango] device proxy created for {}", name);
        Ok(Self { transport })
    }

    pub fn with_transport(transport: Box<dyn DeviceTransport>) -> Self {
        Self { transport }
    }

    pub fn name(&self) -> &str {
        self.transport.name()
    }

    pub fn command_inout(&mut self, command: &str, argin: CommandData) -> TangoResult<CommandData> {
        self.transport.command_inout(command, argin)
    }

    pub fn command_query(&mut self, command: &str) -> TangoResult<CommandInfo> {
        self.transport.command_query(command)
    }

    pub fn command_list_query(&mut self) -> TangoResult<Vec<CommandInfo>> {
        self.transport.command_list_query()
    }

    pub fn get_attribute_list(&mut self) -> TangoResult<Vec<String>> {
        self.transport.get_attribute_list()
    }

    pub fn get_attribute_config(&mut self, names: &[String]) -> TangoResult<Vec<AttributeInfo>> {
        self.transport.get_attribute_config(names)
    }

    pub fn attribute_list_query(&mut self) -> TangoResult<Vec<AttributeInfo>> {
        self.transport.attribute_list_query()
    }

    pub fn read_attribute(&mut self, name: &str) -> TangoResult<AttributeData> {
        let mut results = self.transport.read_attributes(&[name.to_string()])?;
        match results.pop() {
            Some(result) if results.is_empty() => result,
            _ => Err(TangoError::new(
                "API_InternalError",
                format!("Expected exactly one reading for attribute {}", name),
                "DeviceProxy::read_attribute",
            )),
        }
    }

    /// Read several attributes. Per-attribute failures stay per element.
    pub fn read_attributes(
        &mut self,
        names: &[String],
    ) -> TangoResult<Vec<TangoResult<AttributeData>>> {
        self.transport.read_attributes(names)
    }

    pub fn write_attribute(&mut self, value: AttributeData) -> TangoResult<()> {
        self.transport.write_attributes(vec![value])
    }

    pub fn write_attributes(&mut self, values: Vec<AttributeData>) -> TangoResult<()> {
        self.transport.write_attributes(values)
    }

    pub fn get_property(&mut self, names: &[String]) -> TangoResult<Vec<DbDatum>> {
        self.transport.get_property(names)
    }

    pub fn put_property(&mut self, properties: Vec<DbDatum>) -> TangoResult<()> {
        self.transport.put_property(properties)
    }

    pub fn delete_property(&mut self, names: &[String]) -> TangoResult<()> {
        self.transport.delete_property(names)
    }

    pub fn timeout_millis(&self) -> TangoResult<u32> {
        self.transport.timeout_millis()
    }

    pub fn set_timeout_millis(&mut self, millis: u32) -> TangoResult<()> {
        self.transport.set_timeout_millis(millis)
    }

    pub fn source(&self) -> TangoResult<DevSource> {
        self.transport.source()
    }

    pub fn set_source(&mut self, source: DevSource) -> TangoResult<()> {
        self.transport.set_source(source)
    }

    pub fn lock(&mut self) -> TangoResult<()> {
        self.transport.lock()
    }

    pub fn unlock(&mut self) -> TangoResult<()> {
        self.transport.unlock()
    }

    pub fn is_locked(&mut self) -> TangoResult<bool> {
        self.transport.is_locked()
    }

    pub fn is_locked_by_me(&mut self) -> TangoResult<bool> {
        self.transport.is_locked_by_me()
    }

    pub fn locking_status(&mut self) -> TangoResult<String> {
        self.transport.locking_status()
    }
}

/// Handle on the database server.
pub struct DatabaseProxy {
    transport: Box<dyn DatabaseTransport>,
}

impl DatabaseProxy {
    pub fn new() -> TangoResult<Self> {
        match TangoHost::from_env() {
            Some(Ok(host)) => log::debug!("[tango] database proxy for {}", host),
            Some(Err(err)) => log::warn!("[tango] ignoring {}: {}", ENV_TANGO_HOST, err),
            None => log::debug!("[tango] {} not set, using installed connector", ENV_TANGO_HOST),
        }
        let transport = transport::connector().connect_database()?;
        Ok(Self { transport })
    }

    pub fn with_transport(transport: Box<dyn DatabaseTransport>) -> Self {
        Self { transport }
    }

    pub fn get_device_exported(&mut self, filter: &str) -> TangoResult<DbDatum> {
        self.transport.get_device_exported(filter)
    }

    pub fn get_device_exported_for_class(&mut self, class: &str) -> TangoResult<DbDatum> {
        self.transport.get_device_exported_for_class(class)
    }

    pub fn get_object_list(&mut self, filter: &str) -> TangoResult<DbDatum> {
        self.transport.get_object_list(filter)
    }

    pub fn get_object_property_list(&mut self, object: &str, filter: &str) -> TangoResult<DbDatum> {
        self.transport.get_object_property_list(object, filter)
    }

    pub fn get_property(&mut self, object: &str, names: &[String]) -> TangoResult<Vec<DbDatum>> {
        self.transport.get_property(object, names)
    }

    pub fn put_property(&mut self, object: &str, properties: Vec<DbDatum>) -> TangoResult<()> {
        self.transport.put_property(object, properties)
    }

    pub fn delete_property(&mut self, object: &str, names: &[String]) -> TangoResult<()> {
        self.transport.delete_property(object, names)
    }
}
