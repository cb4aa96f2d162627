// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Closed enumerations shared by every Tango payload.
//!
//! Each enumeration carries the numeric code used on the flat C boundary.
//! Codes coming from foreign callers are decoded with `from_code`, which
//! returns `None` for anything outside the table instead of trusting the
//! caller.

use std::fmt;

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $code:literal => $label:literal,
            )+
        }
    ) => {
        $(#[$meta])*
        #[repr(u32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant = $code,
            )+
        }

        impl $name {
            /// Every variant, in code order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Decode a wire code. Unknown codes yield `None`.
            pub fn from_code(code: u32) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Wire code of this variant.
            pub fn code(self) -> u32 {
                self as u32
            }

            /// Canonical Tango spelling.
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

coded_enum! {
    /// Data kind tag. Selects which payload arm of a container is valid.
    pub enum DataType {
        Void = 0 => "DevVoid",
        Boolean = 1 => "DevBoolean",
        Short = 2 => "DevShort",
        Long = 3 => "DevLong",
        Float = 4 => "DevFloat",
        Double = 5 => "DevDouble",
        UShort = 6 => "DevUShort",
        ULong = 7 => "DevULong",
        String = 8 => "DevString",
        CharArray = 9 => "DevVarCharArray",
        ShortArray = 10 => "DevVarShortArray",
        LongArray = 11 => "DevVarLongArray",
        FloatArray = 12 => "DevVarFloatArray",
        DoubleArray = 13 => "DevVarDoubleArray",
        UShortArray = 14 => "DevVarUShortArray",
        ULongArray = 15 => "DevVarULongArray",
        StringArray = 16 => "DevVarStringArray",
        LongStringArray = 17 => "DevVarLongStringArray",
        DoubleStringArray = 18 => "DevVarDoubleStringArray",
        State = 19 => "DevState",
        ConstString = 20 => "ConstDevString",
        BooleanArray = 21 => "DevVarBooleanArray",
        UChar = 22 => "DevUChar",
        Long64 = 23 => "DevLong64",
        ULong64 = 24 => "DevULong64",
        Long64Array = 25 => "DevVarLong64Array",
        ULong64Array = 26 => "DevVarULong64Array",
        Int = 27 => "DevInt",
        Encoded = 28 => "DevEncoded",
    }
}

coded_enum! {
    /// Device state machine value.
    pub enum DevState {
        On = 0 => "ON",
        Off = 1 => "OFF",
        Close = 2 => "CLOSE",
        Open = 3 => "OPEN",
        Insert = 4 => "INSERT",
        Extract = 5 => "EXTRACT",
        Moving = 6 => "MOVING",
        Standby = 7 => "STANDBY",
        Fault = 8 => "FAULT",
        Init = 9 => "INIT",
        Running = 10 => "RUNNING",
        Alarm = 11 => "ALARM",
        Disable = 12 => "DISABLE",
        Unknown = 13 => "UNKNOWN",
    }
}

coded_enum! {
    /// Quality flag attached to every attribute reading.
    pub enum AttrQuality {
        Valid = 0 => "ATTR_VALID",
        /// The value part of the reading must not be used.
        Invalid = 1 => "ATTR_INVALID",
        Alarm = 2 => "ATTR_ALARM",
        Changing = 3 => "ATTR_CHANGING",
        Warning = 4 => "ATTR_WARNING",
    }
}

coded_enum! {
    pub enum AttrWriteType {
        Read = 0 => "READ",
        ReadWithWrite = 1 => "READ_WITH_WRITE",
        Write = 2 => "WRITE",
        ReadWrite = 3 => "READ_WRITE",
    }
}

impl AttrWriteType {
    pub fn is_writable(self) -> bool {
        !matches!(self, AttrWriteType::Read)
    }
}

coded_enum! {
    /// Shape of an attribute value.
    pub enum AttrDataFormat {
        Scalar = 0 => "SCALAR",
        Spectrum = 1 => "SPECTRUM",
        Image = 2 => "IMAGE",
    }
}

coded_enum! {
    pub enum DispLevel {
        Operator = 0 => "OPERATOR",
        Expert = 1 => "EXPERT",
    }
}

coded_enum! {
    /// Severity of a single failure record.
    pub enum ErrSeverity {
        Warn = 0 => "WARN",
        Err = 1 => "ERR",
        Panic = 2 => "PANIC",
    }
}

coded_enum! {
    /// Where a device proxy reads its values from.
    pub enum DevSource {
        Dev = 0 => "DEV",
        Cache = 1 => "CACHE",
        CacheDev = 2 => "CACHE_DEV",
    }
}

impl Default for DevState {
    fn default() -> Self {
        DevState::Unknown
    }
}

impl Default for DevSource {
    fn default() -> Self {
        DevSource::CacheDev
    }
}
