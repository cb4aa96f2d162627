// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport seams.
//!
//! Everything that talks to a device server or to the database goes through
//! these traits. Calls are blocking and return either the payload or a
//! [`TangoError`](crate::TangoError) stack exactly as the server produced it.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::data::{AttributeData, AttributeInfo, CommandData, CommandInfo};
use crate::error::TangoResult;
use crate::loopback::Loopback;
use crate::property::DbDatum;
use crate::types::DevSource;

/// Connection to one device.
pub trait DeviceTransport: Send {
    /// Device name this transport is bound to.
    fn name(&self) -> &str;

    fn command_inout(&mut self, command: &str, argin: CommandData) -> TangoResult<CommandData>;
    fn command_query(&mut self, command: &str) -> TangoResult<CommandInfo>;
    fn command_list_query(&mut self) -> TangoResult<Vec<CommandInfo>>;

    fn get_attribute_list(&mut self) -> TangoResult<Vec<String>>;
    fn get_attribute_config(&mut self, names: &[String]) -> TangoResult<Vec<AttributeInfo>>;
    fn attribute_list_query(&mut self) -> TangoResult<Vec<AttributeInfo>>;

    /// One result per requested name. The outer error covers failures of
    /// the call itself; each inner one covers a single attribute.
    fn read_attributes(
        &mut self,
        names: &[String],
    ) -> TangoResult<Vec<TangoResult<AttributeData>>>;
    fn write_attributes(&mut self, values: Vec<AttributeData>) -> TangoResult<()>;

    fn get_property(&mut self, names: &[String]) -> TangoResult<Vec<DbDatum>>;
    fn put_property(&mut self, properties: Vec<DbDatum>) -> TangoResult<()>;
    fn delete_property(&mut self, names: &[String]) -> TangoResult<()>;

    fn timeout_millis(&self) -> TangoResult<u32>;
    fn set_timeout_millis(&mut self, millis: u32) -> TangoResult<()>;
    fn source(&self) -> TangoResult<DevSource>;
    fn set_source(&mut self, source: DevSource) -> TangoResult<()>;

    fn lock(&mut self) -> TangoResult<()>;
    fn unlock(&mut self) -> TangoResult<()>;
    fn is_locked(&mut self) -> TangoResult<bool>;
    fn is_locked_by_me(&mut self) -> TangoResult<bool>;
    fn locking_status(&mut self) -> TangoResult<String>;
}

/// Connection to the database server.
pub trait DatabaseTransport: Send {
    /// Exported devices matching a `*` wildcard filter.
    fn get_device_exported(&mut self, filter: &str) -> TangoResult<DbDatum>;
    fn get_device_exported_for_class(&mut self, class: &str) -> TangoResult<DbDatum>;
    /// Free objects matching a `*` wildcard filter.
    fn get_object_list(&mut self, filter: &str) -> TangoResult<DbDatum>;
    fn get_object_property_list(&mut self, object: &str, filter: &str) -> TangoResult<DbDatum>;

    fn get_property(&mut self, object: &str, names: &[String]) -> TangoResult<Vec<DbDatum>>;
    fn put_property(&mut self, object: &str, properties: Vec<DbDatum>) -> TangoResult<()>;
    fn delete_property(&mut self, object: &str, names: &[String]) -> TangoResult<()>;
}

/// Opens transports. One connector is installed per process.
pub trait Connector: Send + Sync {
    fn connect_device(&self, name: &str) -> TangoResult<Box<dyn DeviceTransport>>;
    fn connect_database(&self) -> TangoResult<Box<dyn DatabaseTransport>>;
}

fn registry() -> &'static RwLock<Arc<dyn Connector>> {
    static CONNECTOR: OnceLock<RwLock<Arc<dyn Connector>>> = OnceLock::new();
    CONNECTOR.get_or_init(|| {
        let loopback: Arc<dyn Connector> = Loopback::global();
        RwLock::new(loopback)
    })
}

/// Replace the process-wide connector. Existing proxies keep their
/// transport; only later connections use the new one.
pub fn set_connector(connector: Arc<dyn Connector>) {
    *registry().write() = connector;
    log::debug!("[tango] connector replaced");
}

/// Currently installed connector. Defaults to the in-process loopback.
pub fn connector() -> Arc<dyn Connector> {
    Arc::clone(&registry().read())
}
