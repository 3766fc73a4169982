// SPDX-License-Identifier: Apache-2.0

//! Transaction tokens.
//!
//! An immutable correlation value attached to every request and echoed on
//! its completion. Two tokens correlate iff their numeric ids are equal;
//! the opaque context and the completion-target override ride along but
//! never participate in comparison.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::ServiceClient;

/// Source for runtime-assigned transaction ids.
static NEXT_TX_ID: AtomicU64 = AtomicU64::new(1);

/// Numeric transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxId(u64);

impl TxId {
    /// Wrap a caller-assigned id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the inner id value.
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TxId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// A transaction token: numeric id, optional opaque application context,
/// optional completion-target override.
///
/// Cheap to clone; one copy travels with the request and comes back inside
/// the completion notification. Equality and hashing are over the id alone.
#[derive(Clone)]
pub struct TxToken {
    id: TxId,
    context: Option<Arc<dyn Any + Send + Sync>>,
    completion: Option<Arc<dyn ServiceClient>>,
}

impl TxToken {
    /// A token with a runtime-assigned unique id.
    pub fn new() -> Self {
        Self {
            id: TxId::new(NEXT_TX_ID.fetch_add(1, Ordering::Relaxed)),
            context: None,
            completion: None,
        }
    }

    /// A token with a caller-assigned id.
    pub fn with_id(id: impl Into<TxId>) -> Self {
        Self {
            id: id.into(),
            context: None,
            completion: None,
        }
    }

    /// Attach an opaque application context.
    pub fn context(mut self, context: Arc<dyn Any + Send + Sync>) -> Self {
        self.context = Some(context);
        self
    }

    /// Route this request's completion notifications to `target` instead of
    /// the manager's default client.
    pub fn completion_target(mut self, target: Arc<dyn ServiceClient>) -> Self {
        self.completion = Some(target);
        self
    }

    /// The numeric id.
    pub fn id(&self) -> TxId {
        self.id
    }

    /// The opaque application context, if any.
    pub fn app_context(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.context.as_deref()
    }

    /// The completion-target override, if any.
    pub fn completion(&self) -> Option<&Arc<dyn ServiceClient>> {
        self.completion.as_ref()
    }

    /// True iff the two tokens carry the same id.
    pub fn correlates(&self, other: &TxToken) -> bool {
        self.id == other.id
    }
}

impl Default for TxToken {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for TxToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TxToken {}

impl Hash for TxToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TxToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxToken")
            .field("id", &self.id)
            .field("has_context", &self.context.is_some())
            .field("has_completion", &self.completion.is_some())
            .finish()
    }
}
