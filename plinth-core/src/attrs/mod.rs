// SPDX-License-Identifier: Apache-2.0

//! Heterogeneous named attribute containers.
//!
//! The manifest/config/result payload passed across every runtime boundary:
//! tagged values, deep-copying sets, and the well-known manifest keys.

pub mod keys;
mod set;
mod value;

pub use set::{AttrKey, AttrSet};
pub use value::{AttrKind, AttrValue, KindMismatch, ObjectHandle};
