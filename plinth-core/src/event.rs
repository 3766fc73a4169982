// SPDX-License-Identifier: Apache-2.0

//! Event payloads delivered to service clients.

use std::fmt;

use crate::attrs::AttrSet;
use crate::token::TxToken;
use crate::types::ServiceId;

/// Terminal failure description carried by allocate-failed and
/// release-failed notifications. Echoes the originating token.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    token: TxToken,
    message: String,
    details: AttrSet,
}

impl ErrorEvent {
    /// An error event for the transaction `token` failed with `message`.
    pub fn new(token: TxToken, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
            details: AttrSet::new(),
        }
    }

    /// Attach a structured detail record.
    pub fn with_details(mut self, details: AttrSet) -> Self {
        self.details = details;
        self
    }

    /// The originating transaction token.
    pub fn token(&self) -> &TxToken {
        &self.token
    }

    /// Human-readable failure description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured failure details, possibly empty.
    pub fn details(&self) -> &AttrSet {
        &self.details
    }
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx {}: {}", self.token.id(), self.message)
    }
}

/// An out-of-band event raised by a live service, delivered to its owning
/// client outside any request/response pair.
#[derive(Debug, Clone)]
pub struct ServiceEvent {
    source: ServiceId,
    payload: AttrSet,
}

impl ServiceEvent {
    pub fn new(source: ServiceId, payload: AttrSet) -> Self {
        Self { source, payload }
    }

    /// The service that raised the event.
    pub fn source(&self) -> ServiceId {
        self.source
    }

    /// The event payload.
    pub fn payload(&self) -> &AttrSet {
        &self.payload
    }
}
