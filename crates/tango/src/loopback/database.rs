// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Simulated database: free-object properties, device properties and the
//! table of exported devices.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{TangoError, TangoResult};
use crate::property::DbDatum;
use crate::transport::DatabaseTransport;

/// Properties of one object, keyed by lower-cased property name. `name`
/// keeps the spelling the object was first written with.
#[derive(Debug)]
struct StoredObject {
    name: String,
    props: BTreeMap<String, DbDatum>,
}

/// lower-cased object name -> stored object
type PropertyTable = BTreeMap<String, StoredObject>;

#[derive(Debug, Clone)]
struct ExportedDevice {
    name: String,
    class: String,
}

#[derive(Default)]
pub(crate) struct PropertyDb {
    free: RwLock<PropertyTable>,
    device: RwLock<PropertyTable>,
    exported: RwLock<BTreeMap<String, ExportedDevice>>,
}

/// Which property table a request targets.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Scope {
    Free,
    Device,
}

impl PropertyDb {
    fn table(&self, scope: Scope) -> &RwLock<PropertyTable> {
        match scope {
            Scope::Free => &self.free,
            Scope::Device => &self.device,
        }
    }

    pub(crate) fn get(&self, scope: Scope, object: &str, names: &[String]) -> Vec<DbDatum> {
        let table = self.table(scope).read();
        let stored = table.get(&object.to_lowercase());
        names
            .iter()
            .map(|name| {
                stored
                    .and_then(|object| object.props.get(&name.to_lowercase()))
                    .map_or_else(|| DbDatum::new(name.as_str()), |datum| DbDatum {
                        name: name.clone(),
                        values: datum.values.clone(),
                    })
            })
            .collect()
    }

    pub(crate) fn put(&self, scope: Scope, object: &str, properties: Vec<DbDatum>) {
        let mut table = self.table(scope).write();
        let stored = table
            .entry(object.to_lowercase())
            .or_insert_with(|| StoredObject {
                name: object.to_string(),
                props: BTreeMap::new(),
            });
        for datum in properties {
            log::debug!(
                "[loopback] put {}/{} = {:?}",
                object,
                datum.name,
                datum.values
            );
            stored.props.insert(datum.name.to_lowercase(), datum);
        }
    }

    pub(crate) fn delete(&self, scope: Scope, object: &str, names: &[String]) {
        let mut table = self.table(scope).write();
        let key = object.to_lowercase();
        let Some(stored) = table.get_mut(&key) else {
            return;
        };
        for name in names {
            stored.props.remove(&name.to_lowercase());
        }
        if stored.props.is_empty() {
            table.remove(&key);
        }
    }

    pub(crate) fn export(&self, name: &str, class: &str) {
        self.exported
            .write()
            .entry(name.to_lowercase())
            .or_insert_with(|| ExportedDevice {
                name: name.to_string(),
                class: class.to_string(),
            });
    }

    fn exported_matching(&self, keep: impl Fn(&ExportedDevice) -> bool) -> Vec<String> {
        self.exported
            .read()
            .values()
            .filter(|dev| keep(dev))
            .map(|dev| dev.name.clone())
            .collect()
    }

    fn objects_matching(&self, filter: &str) -> Vec<String> {
        self.free
            .read()
            .values()
            .filter(|object| wildcard_match(filter, &object.name))
            .map(|object| object.name.clone())
            .collect()
    }

    fn property_names(&self, object: &str, filter: &str) -> Vec<String> {
        self.free
            .read()
            .get(&object.to_lowercase())
            .map(|object| {
                object
                    .props
                    .values()
                    .filter(|datum| wildcard_match(filter, &datum.name))
                    .map(|datum| datum.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Case-insensitive glob where `*` matches any run of characters.
pub(crate) fn wildcard_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let candidate: Vec<char> = candidate.to_lowercase().chars().collect();

    let (mut p, mut c) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while c < candidate.len() {
        if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, c));
            p += 1;
        } else if p < pattern.len() && pattern[p] == candidate[c] {
            p += 1;
            c += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            c = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|ch| *ch == '*')
}

pub(crate) struct LoopbackDatabase {
    db: Arc<PropertyDb>,
}

impl LoopbackDatabase {
    pub(crate) fn new(db: Arc<PropertyDb>) -> Self {
        Self { db }
    }
}

fn check_object(object: &str, origin: &str) -> TangoResult<()> {
    if object.trim().is_empty() {
        return Err(TangoError::new(
            "DB_IncorrectArguments",
            "Object name must not be empty",
            origin,
        ));
    }
    Ok(())
}

impl DatabaseTransport for LoopbackDatabase {
    fn get_device_exported(&mut self, filter: &str) -> TangoResult<DbDatum> {
        let names = self
            .db
            .exported_matching(|dev| wildcard_match(filter, &dev.name));
        Ok(DbDatum::with_strings(filter, names))
    }

    fn get_device_exported_for_class(&mut self, class: &str) -> TangoResult<DbDatum> {
        let names = self
            .db
            .exported_matching(|dev| dev.class.eq_ignore_ascii_case(class));
        Ok(DbDatum::with_strings(class, names))
    }

    fn get_object_list(&mut self, filter: &str) -> TangoResult<DbDatum> {
        Ok(DbDatum::with_strings(filter, self.db.objects_matching(filter)))
    }

    fn get_object_property_list(&mut self, object: &str, filter: &str) -> TangoResult<DbDatum> {
        check_object(object, "Database::get_object_property_list")?;
        Ok(DbDatum::with_strings(
            filter,
            self.db.property_names(object, filter),
        ))
    }

    fn get_property(&mut self, object: &str, names: &[String]) -> TangoResult<Vec<DbDatum>> {
        check_object(object, "Database::get_property")?;
        Ok(self.db.get(Scope::Free, object, names))
    }

    fn put_property(&mut self, object: &str, properties: Vec<DbDatum>) -> TangoResult<()> {
        check_object(object, "Database::put_property")?;
        self.db.put(Scope::Free, object, properties);
        Ok(())
    }

    fn delete_property(&mut self, object: &str, names: &[String]) -> TangoResult<()> {
        check_object(object, "Database::delete_property")?;
        self.db.delete(Scope::Free, object, names);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcards() {
        assert!(wildcard_match("*", "sys/tg_test/1"));
        assert!(wildcard_match("sys/*", "sys/tg_test/1"));
        assert!(wildcard_match("SYS/*/1", "sys/tg_test/1"));
        assert!(wildcard_match("*test*", "sys/tg_test/1"));
        assert!(!wildcard_match("sys/*/2", "sys/tg_test/1"));
        assert!(wildcard_match("exact", "exact"));
        assert!(!wildcard_match("exact", "exactly"));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(!wildcard_match("a*b*c", "aXXbYY"));
    }

    #[test]
    fn free_properties() {
        let db = Arc::new(PropertyDb::default());
        let mut trans = LoopbackDatabase::new(Arc::clone(&db));
        trans
            .put_property(
                "Beamline",
                vec![DbDatum::with_strings("Energy", vec!["12.5".to_string()])],
            )
            .unwrap();

        let got = trans
            .get_property("beamline", &["energy".to_string(), "missing".to_string()])
            .unwrap();
        assert_eq!(got[0].name, "energy");
        assert_eq!(got[0].values, vec!["12.5".to_string()]);
        assert!(got[1].is_empty());

        trans
            .put_property(
                "BEAMLINE",
                vec![DbDatum::with_strings("Gap", vec!["4".to_string()])],
            )
            .unwrap();
        let objects = trans.get_object_list("beam*").unwrap();
        assert_eq!(objects.values, vec!["Beamline".to_string()]);
        let names = trans.get_object_property_list("beamline", "*").unwrap();
        assert_eq!(names.values, vec!["Energy".to_string(), "Gap".to_string()]);
        trans
            .delete_property("Beamline", &["gap".to_string()])
            .unwrap();
        let names = trans.get_object_property_list("Beamline", "*").unwrap();
        assert_eq!(names.values, vec!["Energy".to_string()]);

        trans
            .delete_property("Beamline", &["ENERGY".to_string()])
            .unwrap();
        assert!(trans.get_object_list("beam*").unwrap().values.is_empty());
    }

    #[test]
    fn exported_devices() {
        let db = Arc::new(PropertyDb::default());
        db.export("sys/tg_test/1", "TangoTest");
        db.export("sys/motor/1", "Motor");
        let mut trans = LoopbackDatabase::new(db);
        assert_eq!(
            trans.get_device_exported("sys/*").unwrap().values,
            vec!["sys/motor/1".to_string(), "sys/tg_test/1".to_string()]
        );
        assert_eq!(
            trans.get_device_exported_for_class("tangotest").unwrap().values,
            vec!["sys/tg_test/1".to_string()]
        );
    }

    #[test]
    fn empty_object_rejected() {
        let mut trans = LoopbackDatabase::new(Arc::new(PropertyDb::default()));
        let err = trans.get_property(" ", &[]).unwrap_err();
        assert_eq!(err.reason(), "DB_IncorrectArguments");
    }
}
