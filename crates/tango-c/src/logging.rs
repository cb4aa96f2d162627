// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging initialization for C callers.

use std::os::raw::c_char;

use tango::TangoError;

use crate::alloc::required_string;
use crate::error::guarded;
use crate::types::ErrorStack;

/// Log level for the library's console output.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TangoLogLevel {
    TangoLogOff = 0,
    TangoLogError = 1,
    TangoLogWarn = 2,
    TangoLogInfo = 3,
    TangoLogDebug = 4,
    TangoLogTrace = 5,
}

impl From<TangoLogLevel> for log::LevelFilter {
    fn from(level: TangoLogLevel) -> Self {
        match level {
            TangoLogLevel::TangoLogOff => log::LevelFilter::Off,
            TangoLogLevel::TangoLogError => log::LevelFilter::Error,
            TangoLogLevel::TangoLogWarn => log::LevelFilter::Warn,
            TangoLogLevel::TangoLogInfo => log::LevelFilter::Info,
            TangoLogLevel::TangoLogDebug => log::LevelFilter::Debug,
            TangoLogLevel::TangoLogTrace => log::LevelFilter::Trace,
        }
    }
}

fn already_initialized(origin: &str) -> TangoError {
    TangoError::new(
        "API_LoggerAlreadyInitialized",
        "A logger is already installed for this process",
        origin,
    )
}

/// Install a console logger at `level`.
///
/// Fails if a logger is already installed.
///
/// # Example (C)
/// ```c
/// tango_free_ErrorStack(tango_logging_init(TangoLogInfo));
/// ```
#[no_mangle]
pub extern "C" fn tango_logging_init(level: TangoLogLevel) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_logging_init";
    guarded(ORIGIN, || {
        let filter: log::LevelFilter = level.into();
        env_logger::Builder::new()
            .filter_level(filter)
            .format_timestamp_millis()
            .try_init()
            .map_err(|_| already_initialized(ORIGIN))
    })
}

/// Like [`tango_logging_init`], but `RUST_LOG` wins when it is set.
#[no_mangle]
pub extern "C" fn tango_logging_init_env(default_level: TangoLogLevel) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_logging_init_env";
    guarded(ORIGIN, || {
        let filter: log::LevelFilter = default_level.into();
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(filter.to_string()),
        )
        .format_timestamp_millis()
        .try_init()
        .map_err(|_| already_initialized(ORIGIN))
    })
}

/// Install a console logger configured by an `env_logger` filter string
/// such as `"tango_c=debug,warn"`.
///
/// # Safety
/// `filter` must be NULL or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn tango_logging_init_with_filter(filter: *const c_char) -> *mut ErrorStack {
    const ORIGIN: &str = "tango_logging_init_with_filter";
    guarded(ORIGIN, || {
        let filter = required_string(filter, "filter", ORIGIN)?;
        env_logger::Builder::new()
            .parse_filters(&filter)
            .format_timestamp_millis()
            .try_init()
            .map_err(|_| already_initialized(ORIGIN))
    })
}
