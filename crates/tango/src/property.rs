// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Database properties.
//!
//! The database stores every property as a list of strings. Typing happens
//! on extraction: the caller asks for a tag and the stored strings are
//! coerced to it, which either succeeds, finds nothing stored, or finds
//! strings that do not parse as the requested type.

use std::str::FromStr;

use crate::error::{TangoError, TangoResult};
use crate::types::DataType;

/// Typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Boolean(bool),
    UChar(u8),
    Short(i16),
    UShort(u16),
    Long(i32),
    ULong(u32),
    Long64(i64),
    ULong64(u64),
    Float(f32),
    Double(f64),
    String(String),

    ShortArray(Vec<i16>),
    UShortArray(Vec<u16>),
    LongArray(Vec<i32>),
    ULongArray(Vec<u32>),
    Long64Array(Vec<i64>),
    ULong64Array(Vec<u64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    StringArray(Vec<String>),
}

impl PropertyValue {
    pub fn data_type(&self) -> DataType {
        match self {
            PropertyValue::Boolean(_) => DataType::Boolean,
            PropertyValue::UChar(_) => DataType::UChar,
            PropertyValue::Short(_) => DataType::Short,
            PropertyValue::UShort(_) => DataType::UShort,
            PropertyValue::Long(_) => DataType::Long,
            PropertyValue::ULong(_) => DataType::ULong,
            PropertyValue::Long64(_) => DataType::Long64,
            PropertyValue::ULong64(_) => DataType::ULong64,
            PropertyValue::Float(_) => DataType::Float,
            PropertyValue::Double(_) => DataType::Double,
            PropertyValue::String(_) => DataType::String,
            PropertyValue::ShortArray(_) => DataType::ShortArray,
            PropertyValue::UShortArray(_) => DataType::UShortArray,
            PropertyValue::LongArray(_) => DataType::LongArray,
            PropertyValue::ULongArray(_) => DataType::ULongArray,
            PropertyValue::Long64Array(_) => DataType::Long64Array,
            PropertyValue::ULong64Array(_) => DataType::ULong64Array,
            PropertyValue::FloatArray(_) => DataType::FloatArray,
            PropertyValue::DoubleArray(_) => DataType::DoubleArray,
            PropertyValue::StringArray(_) => DataType::StringArray,
        }
    }

    /// Storage form.
    pub fn to_strings(&self) -> Vec<String> {
        fn all<T: ToString>(items: &[T]) -> Vec<String> {
            items.iter().map(ToString::to_string).collect()
        }

        match self {
            PropertyValue::Boolean(v) => vec![v.to_string()],
            PropertyValue::UChar(v) => vec![v.to_string()],
            PropertyValue::Short(v) => vec![v.to_string()],
            PropertyValue::UShort(v) => vec![v.to_string()],
            PropertyValue::Long(v) => vec![v.to_string()],
            PropertyValue::ULong(v) => vec![v.to_string()],
            PropertyValue::Long64(v) => vec![v.to_string()],
            PropertyValue::ULong64(v) => vec![v.to_string()],
            PropertyValue::Float(v) => vec![v.to_string()],
            PropertyValue::Double(v) => vec![v.to_string()],
            PropertyValue::String(v) => vec![v.clone()],
            PropertyValue::ShortArray(v) => all(v),
            PropertyValue::UShortArray(v) => all(v),
            PropertyValue::LongArray(v) => all(v),
            PropertyValue::ULongArray(v) => all(v),
            PropertyValue::Long64Array(v) => all(v),
            PropertyValue::ULong64Array(v) => all(v),
            PropertyValue::FloatArray(v) => all(v),
            PropertyValue::DoubleArray(v) => all(v),
            PropertyValue::StringArray(v) => v.clone(),
        }
    }
}

/// Result of coercing stored strings to a requested tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// Nothing stored under the name.
    Empty,
    /// Stored strings do not parse as the requested tag.
    WrongType,
    Value(PropertyValue),
}

/// Named property as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DbDatum {
    pub name: String,
    pub values: Vec<String>,
}

impl DbDatum {
    /// Name only, used for queries and deletions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn with_value(name: impl Into<String>, value: &PropertyValue) -> Self {
        Self {
            name: name.into(),
            values: value.to_strings(),
        }
    }

    pub fn with_strings(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Coerce the stored strings to `data_type`.
    ///
    /// Tags with no property form (`DevState`, `DevEncoded`, the boolean and
    /// char sequences, the paired arrays, `DevVoid`, `DevInt`) fail with a
    /// data type error.
    pub fn extract(&self, data_type: DataType) -> TangoResult<Extracted> {
        if !is_property_type(data_type) {
            return Err(TangoError::data_type(
                "property reading",
                "DbDatum::extract",
            ));
        }
        if self.is_empty() {
            return Ok(Extracted::Empty);
        }
        Ok(self
            .coerce(data_type)
            .map_or(Extracted::WrongType, Extracted::Value))
    }

    fn coerce(&self, data_type: DataType) -> Option<PropertyValue> {
        let first = self.values.first()?;
        let value = match data_type {
            DataType::Boolean => PropertyValue::Boolean(parse_bool(first)?),
            DataType::UChar => PropertyValue::UChar(parse_num(first)?),
            DataType::Short => PropertyValue::Short(parse_num(first)?),
            DataType::UShort => PropertyValue::UShort(parse_num(first)?),
            DataType::Long => PropertyValue::Long(parse_num(first)?),
            DataType::ULong => PropertyValue::ULong(parse_num(first)?),
            DataType::Long64 => PropertyValue::Long64(parse_num(first)?),
            DataType::ULong64 => PropertyValue::ULong64(parse_num(first)?),
            DataType::Float => PropertyValue::Float(parse_num(first)?),
            DataType::Double => PropertyValue::Double(parse_num(first)?),
            DataType::String | DataType::ConstString => PropertyValue::String(first.clone()),
            DataType::ShortArray => PropertyValue::ShortArray(parse_all(&self.values)?),
            DataType::UShortArray => PropertyValue::UShortArray(parse_all(&self.values)?),
            DataType::LongArray => PropertyValue::LongArray(parse_all(&self.values)?),
            DataType::ULongArray => PropertyValue::ULongArray(parse_all(&self.values)?),
            DataType::Long64Array => PropertyValue::Long64Array(parse_all(&self.values)?),
            DataType::ULong64Array => PropertyValue::ULong64Array(parse_all(&self.values)?),
            DataType::FloatArray => PropertyValue::FloatArray(parse_all(&self.values)?),
            DataType::DoubleArray => PropertyValue::DoubleArray(parse_all(&self.values)?),
            DataType::StringArray => PropertyValue::StringArray(self.values.clone()),
            _ => return None,
        };
        Some(value)
    }
}

/// Tags a property can be read as or written from.
pub fn is_property_type(data_type: DataType) -> bool {
    matches!(
        data_type,
        DataType::Boolean
            | DataType::UChar
            | DataType::Short
            | DataType::UShort
            | DataType::Long
            | DataType::ULong
            | DataType::Long64
            | DataType::ULong64
            | DataType::Float
            | DataType::Double
            | DataType::String
            | DataType::ConstString
            | DataType::ShortArray
            | DataType::UShortArray
            | DataType::LongArray
            | DataType::ULongArray
            | DataType::Long64Array
            | DataType::ULong64Array
            | DataType::FloatArray
            | DataType::DoubleArray
            | DataType::StringArray
    )
}

fn parse_num<T: FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

fn parse_all<T: FromStr>(raw: &[String]) -> Option<Vec<T>> {
    raw.iter().map(|s| parse_num(s)).collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        return Some(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Some(false);
    }
    raw.parse::<i64>().ok().map(|v| v != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datum(values: &[&str]) -> DbDatum {
        DbDatum::with_strings("p", values.iter().map(|s| (*s).to_string()).collect())
    }

    #[test]
    fn never_set_is_empty() {
        let d = DbDatum::new("missing");
        assert_eq!(d.extract(DataType::Double), Ok(Extracted::Empty));
    }

    #[test]
    fn scalar_coercion() {
        assert_eq!(
            datum(&["42"]).extract(DataType::Long),
            Ok(Extracted::Value(PropertyValue::Long(42)))
        );
        assert_eq!(
            datum(&[" 2.5 "]).extract(DataType::Double),
            Ok(Extracted::Value(PropertyValue::Double(2.5)))
        );
        assert_eq!(
            datum(&["TRUE"]).extract(DataType::Boolean),
            Ok(Extracted::Value(PropertyValue::Boolean(true)))
        );
        assert_eq!(
            datum(&["0"]).extract(DataType::Boolean),
            Ok(Extracted::Value(PropertyValue::Boolean(false)))
        );
    }

    #[test]
    fn wrong_type_is_flagged() {
        assert_eq!(datum(&["abc"]).extract(DataType::Long), Ok(Extracted::WrongType));
        assert_eq!(datum(&["3.7"]).extract(DataType::Long), Ok(Extracted::WrongType));
        assert_eq!(datum(&["-1"]).extract(DataType::UShort), Ok(Extracted::WrongType));
        assert_eq!(
            datum(&["1", "x"]).extract(DataType::LongArray),
            Ok(Extracted::WrongType)
        );
        assert_eq!(datum(&["yes"]).extract(DataType::Boolean), Ok(Extracted::WrongType));
    }

    #[test]
    fn strings_never_fail() {
        assert_eq!(
            datum(&["a", ""]).extract(DataType::StringArray),
            Ok(Extracted::Value(PropertyValue::StringArray(vec![
                "a".to_string(),
                String::new()
            ])))
        );
        assert_eq!(
            datum(&["first", "second"]).extract(DataType::String),
            Ok(Extracted::Value(PropertyValue::String("first".to_string())))
        );
    }

    #[test]
    fn unsupported_tag_is_an_error() {
        let err = datum(&["ON"]).extract(DataType::State).unwrap_err();
        assert!(err.is_data_type_error());
        assert!(datum(&[]).extract(DataType::Encoded).is_err());
    }

    #[test]
    fn storage_form() {
        let v = PropertyValue::DoubleArray(vec![1.5, -2.0]);
        let d = DbDatum::with_value("gains", &v);
        assert_eq!(d.values, vec!["1.5".to_string(), "-2".to_string()]);
        assert_eq!(d.extract(DataType::DoubleArray), Ok(Extracted::Value(v)));
        assert_eq!(
            PropertyValue::Boolean(true).to_strings(),
            vec!["true".to_string()]
        );
    }
}
