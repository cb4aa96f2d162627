// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # tango
//!
//! Native model of the Tango Controls client protocol: type tags, command
//! and attribute payloads, database properties, the layered failure type,
//! and the transport seams the rest of the stack is written against.
//!
//! ```rust
//! use tango::{CommandData, DeviceProxy, TangoResult};
//!
//! fn main() -> TangoResult<()> {
//!     // The default connector is the in-process loopback.
//!     let mut dev = DeviceProxy::new("sys/tg_test/1")?;
//!     let echo = dev.command_inout("DevString", CommandData::from("ok"))?;
//!     assert_eq!(echo.as_str(), Some("ok"));
//!     Ok(())
//! }
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DataType`] | The 29 data kind tags and their wire codes |
//! | [`CommandData`] | Command argument / result |
//! | [`AttributeData`] | Attribute reading with quality, shape and timestamp |
//! | [`DbDatum`] | Property stored as strings, typed on extraction |
//! | [`TangoError`] | Ordered stack of failure records |
//! | [`DeviceTransport`] / [`DatabaseTransport`] | Blocking transport seams |
//! | [`Loopback`] | In-process transport used by default and in tests |

pub mod config;
pub mod data;
pub mod error;
pub mod loopback;
pub mod property;
pub mod proxy;
pub mod transport;
pub mod types;

pub use data::{
    AttrValue, AttributeData, AttributeInfo, CommandData, CommandInfo, DevEncoded, TimeVal,
};
pub use error::{DevError, TangoError, TangoResult};
pub use loopback::Loopback;
pub use property::{DbDatum, Extracted, PropertyValue};
pub use proxy::{DatabaseProxy, DeviceProxy};
pub use transport::{connector, set_connector, Connector, DatabaseTransport, DeviceTransport};
pub use types::{
    AttrDataFormat, AttrQuality, AttrWriteType, DataType, DevSource, DevState, DispLevel,
    ErrSeverity,
};
