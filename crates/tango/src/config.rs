// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client configuration.
//!
//! Compile-time constants live here and nowhere else. Runtime overrides come
//! from the environment, the same variables a C++ Tango client honours.

use std::env;
use std::fmt;

use crate::error::{TangoError, TangoResult};

/// Name of the built-in state attribute.
///
/// Reading it yields a lone `DevState`, never a sequence.
pub const STATE_ATTRIBUTE: &str = "State";

/// Name of the built-in status attribute.
pub const STATUS_ATTRIBUTE: &str = "Status";

/// Default database server port.
pub const DEFAULT_TANGO_PORT: u16 = 10000;

/// Default client call timeout, milliseconds.
pub const DEFAULT_TIMEOUT_MS: u32 = 3000;

/// Database server address, `host:port`.
pub const ENV_TANGO_HOST: &str = "TANGO_HOST";

/// Overrides [`DEFAULT_TIMEOUT_MS`] for every new proxy.
pub const ENV_TIMEOUT_MS: &str = "TANGO_TIMEOUT_MS";

/// Database server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TangoHost {
    pub host: String,
    pub port: u16,
}

impl TangoHost {
    /// Parse `host` or `host:port`.
    pub fn parse(raw: &str) -> TangoResult<Self> {
        let raw = raw.trim();
        let invalid = || {
            TangoError::new(
                "API_TangoHostNotSet",
                format!("Invalid {ENV_TANGO_HOST} value: {raw:?}"),
                "TangoHost::parse",
            )
        };
        let (host, port) = match raw.rsplit_once(':') {
            Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
            None => (raw, DEFAULT_TANGO_PORT),
        };
        if host.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Read `TANGO_HOST`. `None` when the variable is unset.
    pub fn from_env() -> Option<TangoResult<Self>> {
        env::var(ENV_TANGO_HOST).ok().map(|raw| Self::parse(&raw))
    }
}

impl fmt::Display for TangoHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Timeout applied to newly created proxies.
pub fn default_timeout_ms() -> u32 {
    let timeout = env::var(ENV_TIMEOUT_MS)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_MS);

    if timeout != DEFAULT_TIMEOUT_MS {
        log::info!("[tango] Using timeout={}ms from {}", timeout, ENV_TIMEOUT_MS);
    }
    timeout
}
