// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process control system.
//!
//! `Loopback` implements [`Connector`] without any network: devices are
//! created on first connection and live for the lifetime of the `Loopback`
//! value, and the database is a pair of in-memory property tables. It is the
//! default connector, which makes the whole marshalling stack usable and
//! testable without a Tango installation.

mod database;
mod device;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::data::AttrValue;
use crate::error::{TangoError, TangoResult};
use crate::transport::{Connector, DatabaseTransport, DeviceTransport};
use crate::types::{AttrQuality, AttrWriteType, DevState};

use database::{LoopbackDatabase, PropertyDb};
use device::{DeviceState, LoopbackDevice};

/// Device class reported for every device the loopback creates.
pub const LOOPBACK_CLASS: &str = "TangoTest";

pub struct Loopback {
    devices: DashMap<String, Arc<Mutex<DeviceState>>>,
    db: Arc<PropertyDb>,
    next_client: AtomicU64,
}

impl Default for Loopback {
    fn default() -> Self {
        Self::new()
    }
}

impl Loopback {
    pub fn new() -> Self {
        Self {
            devices: DashMap::new(),
            db: Arc::new(PropertyDb::default()),
            next_client: AtomicU64::new(1),
        }
    }

    /// Process-wide instance used by the default connector.
    pub fn global() -> Arc<Loopback> {
        static GLOBAL: OnceLock<Arc<Loopback>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Loopback::new())))
    }

    fn device(&self, name: &str) -> TangoResult<Arc<Mutex<DeviceState>>> {
        check_device_name(name)?;
        let entry = self
            .devices
            .entry(name.to_lowercase())
            .or_insert_with(|| {
                log::debug!("[loopback] creating device {}", name);
                self.db.export(name, LOOPBACK_CLASS);
                Arc::new(Mutex::new(DeviceState::test_device(name)))
            });
        Ok(Arc::clone(entry.value()))
    }

    /// Add or replace an attribute on `device`.
    pub fn define_attribute(
        &self,
        device: &str,
        attr: &str,
        value: AttrValue,
        writable: AttrWriteType,
    ) -> TangoResult<()> {
        self.device(device)?
            .lock()
            .define_attribute(attr, value, writable);
        Ok(())
    }

    /// Force the quality reported for an attribute.
    pub fn set_attribute_quality(
        &self,
        device: &str,
        attr: &str,
        quality: AttrQuality,
    ) -> TangoResult<()> {
        self.device(device)?.lock().set_quality(attr, quality)
    }

    pub fn set_state(&self, device: &str, state: DevState) -> TangoResult<()> {
        self.device(device)?.lock().set_state(state);
        Ok(())
    }

    /// List a device in the exported table without creating it.
    pub fn export_device(&self, name: &str, class: &str) -> TangoResult<()> {
        check_device_name(name)?;
        self.db.export(name, class);
        Ok(())
    }
}

impl Connector for Loopback {
    fn connect_device(&self, name: &str) -> TangoResult<Box<dyn DeviceTransport>> {
        let state = self.device(name)?;
        let client = self.next_client.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(LoopbackDevice::new(
            name,
            client,
            state,
            Arc::clone(&self.db),
        )))
    }

    fn connect_database(&self) -> TangoResult<Box<dyn DatabaseTransport>> {
        Ok(Box::new(LoopbackDatabase::new(Arc::clone(&self.db))))
    }
}

/// `domain/family/member`, each part non-empty.
fn check_device_name(name: &str) -> TangoResult<()> {
    let parts: Vec<&str> = name.split('/').collect();
    if parts.len() == 3 && parts.iter().all(|part| !part.trim().is_empty()) {
        return Ok(());
    }
    Err(TangoError::new(
        "API_WrongDeviceNameSyntax",
        format!("Device name {:?} is not of the form domain/family/member", name),
        "DeviceProxy::parse_name",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CommandData;

    #[test]
    fn device_names() {
        assert!(check_device_name("sys/tg_test/1").is_ok());
        assert!(check_device_name("sys/tg_test").is_err());
        assert!(check_device_name("sys//1").is_err());
        assert!(check_device_name("a/b/c/d").is_err());
    }

    #[test]
    fn connections_share_device_state() {
        let lb = Loopback::new();
        let mut a = lb.connect_device("test/share/1").unwrap();
        let mut b = lb.connect_device("TEST/share/1").unwrap();
        a.command_inout("SwitchStates", CommandData::Void).unwrap();
        assert_eq!(
            b.command_inout("State", CommandData::Void).unwrap(),
            CommandData::State(DevState::Fault)
        );
    }

    #[test]
    fn connecting_exports() {
        let lb = Loopback::new();
        lb.connect_device("test/export/1").unwrap();
        let mut db = lb.connect_database().unwrap();
        let exported = db.get_device_exported("test/export/*").unwrap();
        assert_eq!(exported.values, vec!["test/export/1".to_string()]);
        let by_class = db.get_device_exported_for_class(LOOPBACK_CLASS).unwrap();
        assert!(by_class.values.contains(&"test/export/1".to_string()));
    }

    #[test]
    fn listed_devices_are_exported_without_connecting() {
        let lb = Loopback::new();
        lb.export_device("test/listed/1", "Motor").unwrap();
        let mut db = lb.connect_database().unwrap();
        assert_eq!(
            db.get_device_exported_for_class("motor").unwrap().values,
            vec!["test/listed/1".to_string()]
        );
        assert!(db
            .get_device_exported_for_class(LOOPBACK_CLASS)
            .unwrap()
            .values
            .is_empty());
        assert!(lb.devices.is_empty());
        assert!(lb.export_device("test/listed", "Motor").is_err());
    }

    #[test]
    fn device_properties_are_per_device() {
        let lb = Loopback::new();
        let mut a = lb.connect_device("test/prop/1").unwrap();
        let mut b = lb.connect_device("test/prop/2").unwrap();
        a.put_property(vec![crate::DbDatum::with_strings(
            "speed",
            vec!["3".to_string()],
        )])
        .unwrap();
        let names = ["speed".to_string()];
        assert_eq!(a.get_property(&names).unwrap()[0].values, vec!["3".to_string()]);
        assert!(b.get_property(&names).unwrap()[0].is_empty());
        a.delete_property(&names).unwrap();
        assert!(a.get_property(&names).unwrap()[0].is_empty());
    }

    #[test]
    fn quality_hook() {
        let lb = Loopback::new();
        lb.set_attribute_quality("test/quality/1", "double_scalar", AttrQuality::Invalid)
            .unwrap();
        let mut dev = lb.connect_device("test/quality/1").unwrap();
        let read = dev.read_attributes(&["double_scalar".to_string()]).unwrap();
        assert_eq!(read[0].as_ref().unwrap().quality, AttrQuality::Invalid);
        assert!(lb
            .set_attribute_quality("test/quality/1", "missing", AttrQuality::Invalid)
            .is_err());
    }
}
