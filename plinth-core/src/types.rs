// SPDX-License-Identifier: Apache-2.0

//! Newtype wrappers for validated inputs.
//!
//! Following the "Newtype" pattern in Rust to ensure valid state by construction.
//! All types validate their invariants at creation time.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Monotonic source for runtime-assigned service identities. Zero is reserved.
static NEXT_SERVICE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one live service instance.
/// Must be non-zero; runtime-assigned ids come from a process-wide counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ServiceId(u64);

impl ServiceId {
    /// Create a ServiceId from a raw value with validation.
    pub fn new(raw: u64) -> Result<Self, ConfigError> {
        if raw == 0 {
            return Err(ConfigError::InvalidFieldValue {
                field: "service_id",
                value: "0".to_string(),
                reason: "Service ID 0 is reserved".to_string(),
            });
        }
        Ok(Self(raw))
    }

    /// Allocate the next runtime-assigned ServiceId.
    pub fn next() -> Self {
        Self(NEXT_SERVICE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the inner id value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for ServiceId {
    type Error = ConfigError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ServiceId> for u64 {
    fn from(id: ServiceId) -> Self {
        id.0
    }
}

/// Validated service name.
/// Must be non-empty, alphanumeric with hyphens/underscores, max 64 chars.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceName(String);

impl ServiceName {
    /// Create a new ServiceName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ConfigError::InvalidFieldValue {
                field: "service_name",
                value: name,
                reason: "Service name cannot be empty".to_string(),
            });
        }

        if name.len() > 64 {
            return Err(ConfigError::InvalidFieldValue {
                field: "service_name",
                value: name.clone(),
                reason: format!("Service name too long: {} chars (max 64)", name.len()),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::InvalidFieldValue {
                field: "service_name",
                value: name,
                reason: "Service name must contain only alphanumeric characters, hyphens, and underscores".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ServiceName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ServiceName> for String {
    fn from(name: ServiceName) -> Self {
        name.0
    }
}

/// How long a release caller is willing to wait for its completion
/// notification. The timeout never cancels the release itself.
///
/// The millisecond representation reserves 0 for [`ReleaseTimeout::Infinite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub enum ReleaseTimeout {
    /// Wait forever. Used by the shutdown drain barrier.
    Infinite,
    /// Wait at most this long.
    Bounded(Duration),
}

impl ReleaseTimeout {
    /// Parse from milliseconds; 0 means infinite.
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::Infinite
        } else {
            Self::Bounded(Duration::from_millis(ms))
        }
    }

    /// The bounded duration, if any.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Infinite => None,
            Self::Bounded(d) => Some(*d),
        }
    }
}

impl fmt::Display for ReleaseTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infinite => write!(f, "infinite"),
            Self::Bounded(d) => write!(f, "{}ms", d.as_millis()),
        }
    }
}

impl From<u64> for ReleaseTimeout {
    fn from(ms: u64) -> Self {
        Self::from_millis(ms)
    }
}

impl From<ReleaseTimeout> for u64 {
    fn from(timeout: ReleaseTimeout) -> Self {
        match timeout {
            ReleaseTimeout::Infinite => 0,
            ReleaseTimeout::Bounded(d) => d.as_millis() as u64,
        }
    }
}
