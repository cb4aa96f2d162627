// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native command and attribute payloads.
//!
//! These are the richly typed values the transport consumes and produces.
//! The tag of a payload is always derived from the variant, so a value can
//! never disagree with its own type.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::{AttrDataFormat, AttrQuality, AttrWriteType, DataType, DevState, DispLevel};

/// Opaque encoded blob: a format label plus raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DevEncoded {
    pub format: String,
    pub data: Vec<u8>,
}

impl DevEncoded {
    pub fn new(format: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            format: format.into(),
            data: data.into(),
        }
    }
}

/// Command argument or result.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandData {
    Void,
    Boolean(bool),
    Short(i16),
    Long(i32),
    Float(f32),
    Double(f64),
    UShort(u16),
    ULong(u32),
    Long64(i64),
    ULong64(u64),
    String(String),
    State(DevState),
    Encoded(DevEncoded),

    CharArray(Vec<u8>),
    ShortArray(Vec<i16>),
    LongArray(Vec<i32>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    UShortArray(Vec<u16>),
    ULongArray(Vec<u32>),
    Long64Array(Vec<i64>),
    ULong64Array(Vec<u64>),
    BooleanArray(Vec<bool>),
    StringArray(Vec<String>),
    LongStringArray(Vec<i32>, Vec<String>),
    DoubleStringArray(Vec<f64>, Vec<String>),
}

impl CommandData {
    pub fn data_type(&self) -> DataType {
        match self {
            CommandData::Void => DataType::Void,
            CommandData::Boolean(_) => DataType::Boolean,
            CommandData::Short(_) => DataType::Short,
            CommandData::Long(_) => DataType::Long,
            CommandData::Float(_) => DataType::Float,
            CommandData::Double(_) => DataType::Double,
            CommandData::UShort(_) => DataType::UShort,
            CommandData::ULong(_) => DataType::ULong,
            CommandData::Long64(_) => DataType::Long64,
            CommandData::ULong64(_) => DataType::ULong64,
            CommandData::String(_) => DataType::String,
            CommandData::State(_) => DataType::State,
            CommandData::Encoded(_) => DataType::Encoded,
            CommandData::CharArray(_) => DataType::CharArray,
            CommandData::ShortArray(_) => DataType::ShortArray,
            CommandData::LongArray(_) => DataType::LongArray,
            CommandData::FloatArray(_) => DataType::FloatArray,
            CommandData::DoubleArray(_) => DataType::DoubleArray,
            CommandData::UShortArray(_) => DataType::UShortArray,
            CommandData::ULongArray(_) => DataType::ULongArray,
            CommandData::Long64Array(_) => DataType::Long64Array,
            CommandData::ULong64Array(_) => DataType::ULong64Array,
            CommandData::BooleanArray(_) => DataType::BooleanArray,
            CommandData::StringArray(_) => DataType::StringArray,
            CommandData::LongStringArray(..) => DataType::LongStringArray,
            CommandData::DoubleStringArray(..) => DataType::DoubleStringArray,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CommandData::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Widening conversion from any integer scalar that fits `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            CommandData::Boolean(v) => Some(i64::from(v)),
            CommandData::Short(v) => Some(i64::from(v)),
            CommandData::Long(v) => Some(i64::from(v)),
            CommandData::UShort(v) => Some(i64::from(v)),
            CommandData::ULong(v) => Some(i64::from(v)),
            CommandData::Long64(v) => Some(v),
            CommandData::ULong64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            CommandData::Boolean(v) => Some(u64::from(v)),
            CommandData::UShort(v) => Some(u64::from(v)),
            CommandData::ULong(v) => Some(u64::from(v)),
            CommandData::ULong64(v) => Some(v),
            CommandData::Short(v) => u64::try_from(v).ok(),
            CommandData::Long(v) => u64::try_from(v).ok(),
            CommandData::Long64(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            CommandData::Float(v) => Some(f64::from(v)),
            CommandData::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CommandData::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            CommandData::String(s) => Some(s),
            CommandData::CharArray(bytes) => String::from_utf8(bytes).ok(),
            _ => None,
        }
    }
}

impl From<bool> for CommandData {
    fn from(v: bool) -> Self {
        CommandData::Boolean(v)
    }
}

impl From<i32> for CommandData {
    fn from(v: i32) -> Self {
        CommandData::Long(v)
    }
}

impl From<f64> for CommandData {
    fn from(v: f64) -> Self {
        CommandData::Double(v)
    }
}

impl From<&str> for CommandData {
    fn from(v: &str) -> Self {
        CommandData::String(v.to_string())
    }
}

impl From<String> for CommandData {
    fn from(v: String) -> Self {
        CommandData::String(v)
    }
}

/// Attribute value. Scalars and sequences share a scalar element tag.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
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
    State(DevState),
    Encoded(DevEncoded),

    BooleanArray(Vec<bool>),
    UCharArray(Vec<u8>),
    ShortArray(Vec<i16>),
    UShortArray(Vec<u16>),
    LongArray(Vec<i32>),
    ULongArray(Vec<u32>),
    Long64Array(Vec<i64>),
    ULong64Array(Vec<u64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    StringArray(Vec<String>),
    StateArray(Vec<DevState>),
    EncodedArray(Vec<DevEncoded>),
}

impl AttrValue {
    /// Element tag, identical for the scalar and sequence forms.
    pub fn data_type(&self) -> DataType {
        match self {
            AttrValue::Boolean(_) | AttrValue::BooleanArray(_) => DataType::Boolean,
            AttrValue::UChar(_) | AttrValue::UCharArray(_) => DataType::UChar,
            AttrValue::Short(_) | AttrValue::ShortArray(_) => DataType::Short,
            AttrValue::UShort(_) | AttrValue::UShortArray(_) => DataType::UShort,
            AttrValue::Long(_) | AttrValue::LongArray(_) => DataType::Long,
            AttrValue::ULong(_) | AttrValue::ULongArray(_) => DataType::ULong,
            AttrValue::Long64(_) | AttrValue::Long64Array(_) => DataType::Long64,
            AttrValue::ULong64(_) | AttrValue::ULong64Array(_) => DataType::ULong64,
            AttrValue::Float(_) | AttrValue::FloatArray(_) => DataType::Float,
            AttrValue::Double(_) | AttrValue::DoubleArray(_) => DataType::Double,
            AttrValue::String(_) | AttrValue::StringArray(_) => DataType::String,
            AttrValue::State(_) | AttrValue::StateArray(_) => DataType::State,
            AttrValue::Encoded(_) | AttrValue::EncodedArray(_) => DataType::Encoded,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            AttrValue::Boolean(_)
                | AttrValue::UChar(_)
                | AttrValue::Short(_)
                | AttrValue::UShort(_)
                | AttrValue::Long(_)
                | AttrValue::ULong(_)
                | AttrValue::Long64(_)
                | AttrValue::ULong64(_)
                | AttrValue::Float(_)
                | AttrValue::Double(_)
                | AttrValue::String(_)
                | AttrValue::State(_)
                | AttrValue::Encoded(_)
        )
    }

    /// Number of elements; scalars count as one.
    pub fn len(&self) -> usize {
        match self {
            AttrValue::BooleanArray(v) => v.len(),
            AttrValue::UCharArray(v) => v.len(),
            AttrValue::ShortArray(v) => v.len(),
            AttrValue::UShortArray(v) => v.len(),
            AttrValue::LongArray(v) => v.len(),
            AttrValue::ULongArray(v) => v.len(),
            AttrValue::Long64Array(v) => v.len(),
            AttrValue::ULong64Array(v) => v.len(),
            AttrValue::FloatArray(v) => v.len(),
            AttrValue::DoubleArray(v) => v.len(),
            AttrValue::StringArray(v) => v.len(),
            AttrValue::StateArray(v) => v.len(),
            AttrValue::EncodedArray(v) => v.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Seconds and microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeVal {
    pub tv_sec: i64,
    pub tv_usec: i64,
}

impl TimeVal {
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            tv_sec: elapsed.as_secs() as i64,
            tv_usec: i64::from(elapsed.subsec_micros()),
        }
    }
}

/// One attribute reading, or the value to write.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeData {
    pub data: AttrValue,
    pub format: AttrDataFormat,
    pub quality: AttrQuality,
    pub name: String,
    pub dim_x: usize,
    pub dim_y: usize,
    pub time_stamp: TimeVal,
}

impl AttributeData {
    /// Valid reading stamped now, shape inferred from the value.
    pub fn simple(name: impl Into<String>, data: AttrValue) -> Self {
        let format = if data.is_scalar() {
            AttrDataFormat::Scalar
        } else {
            AttrDataFormat::Spectrum
        };
        let dim_x = data.len();
        Self {
            data,
            format,
            quality: AttrQuality::Valid,
            name: name.into(),
            dim_x,
            dim_y: 0,
            time_stamp: TimeVal::now(),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }
}

/// Static description of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    pub cmd_name: String,
    pub cmd_tag: i32,
    pub in_type: DataType,
    pub out_type: DataType,
    pub in_type_desc: String,
    pub out_type_desc: String,
    pub disp_level: DispLevel,
}

/// Static configuration of an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name: String,
    pub writable: AttrWriteType,
    pub data_format: AttrDataFormat,
    pub data_type: DataType,
    pub max_dim_x: i32,
    pub max_dim_y: i32,
    pub description: String,
    pub label: String,
    pub unit: String,
    pub standard_unit: String,
    pub display_unit: String,
    pub format: String,
    pub min_value: String,
    pub max_value: String,
    pub min_alarm: String,
    pub max_alarm: String,
    pub writable_attr_name: String,
    pub disp_level: DispLevel,
}

const NOT_SPECIFIED: &str = "Not specified";

impl AttributeInfo {
    /// Configuration with the defaults a device server reports for
    /// attributes nobody configured.
    pub fn new(
        name: impl Into<String>,
        data_type: DataType,
        data_format: AttrDataFormat,
        writable: AttrWriteType,
    ) -> Self {
        let name = name.into();
        let (max_dim_x, max_dim_y) = match data_format {
            AttrDataFormat::Scalar => (1, 0),
            AttrDataFormat::Spectrum => (4096, 0),
            AttrDataFormat::Image => (4096, 4096),
        };
        let writable_attr_name = if writable.is_writable() {
            name.clone()
        } else {
            "None".to_string()
        };
        Self {
            label: name.clone(),
            name,
            writable,
            data_format,
            data_type,
            max_dim_x,
            max_dim_y,
            description: "No description".to_string(),
            unit: String::new(),
            standard_unit: "No standard unit".to_string(),
            display_unit: "No display unit".to_string(),
            format: "%6.2f".to_string(),
            min_value: NOT_SPECIFIED.to_string(),
            max_value: NOT_SPECIFIED.to_string(),
            min_alarm: NOT_SPECIFIED.to_string(),
            max_alarm: NOT_SPECIFIED.to_string(),
            writable_attr_name,
            disp_level: DispLevel::Operator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_tags_follow_variant() {
        assert_eq!(CommandData::Void.data_type(), DataType::Void);
        assert_eq!(
            CommandData::LongStringArray(vec![1], vec![]).data_type(),
            DataType::LongStringArray
        );
        assert_eq!(
            CommandData::Encoded(DevEncoded::default()).data_type(),
            DataType::Encoded
        );
    }

    #[test]
    fn command_accessors() {
        assert_eq!(CommandData::Short(-3).as_i64(), Some(-3));
        assert_eq!(CommandData::Short(-3).as_u64(), None);
        assert_eq!(CommandData::ULong64(u64::MAX).as_i64(), None);
        assert_eq!(CommandData::Float(0.5).as_f64(), Some(0.5));
        assert_eq!(CommandData::from("ok").as_str(), Some("ok"));
        assert_eq!(
            CommandData::CharArray(b"abc".to_vec()).into_string(),
            Some("abc".to_string())
        );
        assert_eq!(CommandData::Boolean(true).as_bool(), Some(true));
    }

    #[test]
    fn attr_value_shape() {
        let scalar = AttrValue::State(DevState::On);
        let array = AttrValue::StateArray(vec![DevState::On, DevState::Off]);
        assert_eq!(scalar.data_type(), array.data_type());
        assert!(scalar.is_scalar());
        assert!(!array.is_scalar());
        assert_eq!(scalar.len(), 1);
        assert_eq!(array.len(), 2);
        assert!(AttrValue::DoubleArray(vec![]).is_empty());
    }

    #[test]
    fn simple_attribute_infers_format() {
        let attr = AttributeData::simple("double_spectrum", AttrValue::DoubleArray(vec![1.0; 3]));
        assert_eq!(attr.format, AttrDataFormat::Spectrum);
        assert_eq!(attr.dim_x, 3);
        assert_eq!(attr.quality, AttrQuality::Valid);
        assert!(attr.time_stamp.tv_sec > 0);
    }

    #[test]
    fn attribute_info_defaults() {
        let info = AttributeInfo::new(
            "ampli",
            DataType::Double,
            AttrDataFormat::Scalar,
            AttrWriteType::ReadWrite,
        );
        assert_eq!(info.writable_attr_name, "ampli");
        assert_eq!(info.max_dim_x, 1);
        assert_eq!(info.label, "ampli");
        let ro = AttributeInfo::new("x", DataType::Long, AttrDataFormat::Image, AttrWriteType::Read);
        assert_eq!(ro.writable_attr_name, "None");
        assert_eq!((ro.max_dim_x, ro.max_dim_y), (4096, 4096));
    }
}
