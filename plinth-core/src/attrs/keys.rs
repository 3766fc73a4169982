// SPDX-License-Identifier: Apache-2.0

//! Well-known manifest keys.
//!
//! Collaborators use these keys to describe a desired resource. The runtime
//! stores and compares them like any other attribute; it never interprets
//! the values.

/// Name of the service kind being requested.
pub const SERVICE_NAME: &str = "service_name";

/// Name of the library/module that hosts the factory for the service.
pub const MODULE_NAME: &str = "module_name";

/// Embedded configuration record (a nested attribute set).
pub const CONFIG_RECORD: &str = "config_record";

/// Numeric id of the hardware feature backing the service.
pub const FEATURE_ID: u64 = 1;

/// Numeric id of the vendor of the backing hardware.
pub const VENDOR_ID: u64 = 2;
