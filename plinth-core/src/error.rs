//! Custom error types for Plinth.
//!
//! This module defines explicit enum error types as per coding guidelines.
//! No `Box<dyn Error>`, no `anyhow::Result` - all errors are strongly typed.

use std::path::PathBuf;

use thiserror::Error;

use crate::attrs::{AttrKey, AttrKind};
use crate::token::TxId;
use crate::types::ServiceId;

/// Top-level error type for the Plinth runtime.
/// All errors are explicit variants - no catch-all or generic handling.
#[derive(Debug, Error)]
pub enum PlinthError {
    // =========================================================================
    // Attribute Errors - Typed Access to Manifest Payloads
    // =========================================================================
    #[error("attribute error: {0}")]
    Attr(#[from] AttrError),

    // =========================================================================
    // State Machine Errors
    // =========================================================================
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(#[from] StateTransitionError),

    // =========================================================================
    // Lifecycle Errors - Terminal per Request, Never Retried
    // =========================================================================
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    // =========================================================================
    // Dispatch Errors - Scheduled Work Never Ran
    // =========================================================================
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Typed-access failures against an attribute set.
/// Reading with the wrong accessor reports the stored kind instead of
/// misreading the payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttrError {
    #[error("no attribute named {key}")]
    NotFound { key: AttrKey },

    #[error("attribute {key} holds {actual}, requested {requested}")]
    TypeMismatch {
        key: AttrKey,
        requested: AttrKind,
        actual: AttrKind,
    },
}

/// State transition errors for the service lifecycle state machine.
#[derive(Debug, Error)]
pub enum StateTransitionError {
    #[error("cannot transition from {from} to {to} for service {service_id}")]
    InvalidTransition {
        service_id: ServiceId,
        from: &'static str,
        to: &'static str,
    },

    #[error("service {service_id} is in terminal state: {state}")]
    TerminalState {
        service_id: ServiceId,
        state: &'static str,
    },
}

/// Lifecycle manager errors. These are the synchronous, caller-visible
/// failures; factory failures additionally culminate in exactly one client
/// notification.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("factory produced no instance for transaction {tx}")]
    CreateFailed { tx: TxId },

    #[error("factory refused initialization of service {service_id}")]
    InitFailed { service_id: ServiceId },

    #[error("service {service_id} is not registered")]
    NotRegistered { service_id: ServiceId },

    #[error("service {service_id} is already registered")]
    AlreadyRegistered { service_id: ServiceId },

    #[error("manager is shutting down")]
    ShuttingDown,

    #[error("transaction dropped before completion")]
    Abandoned,
}

/// Dispatch engine errors - scheduled notifications are fire-and-forget, so
/// a schedule failure is the only outcome the engine ever reports.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatch engine rejected work: {reason}")]
    Rejected { reason: String },

    #[error("no async runtime available to run scheduled work")]
    NoRuntime,
}

/// Configuration and input validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("configuration parse error: {message}")]
    Parse { message: String },

    #[error("invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Result type alias using PlinthError.
pub type PlinthResult<T> = Result<T, PlinthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_error_display() {
        let err = AttrError::TypeMismatch {
            key: AttrKey::from("depth"),
            requested: AttrKind::Int32,
            actual: AttrKind::String,
        };
        assert!(err.to_string().contains("depth"));
        assert!(err.to_string().contains("i32"));
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn test_error_chain() {
        let attr_err = AttrError::NotFound {
            key: AttrKey::from(7u64),
        };
        let top: PlinthError = attr_err.into();
        assert!(matches!(top, PlinthError::Attr(_)));
    }

    #[test]
    fn test_lifecycle_error_display() {
        let err = LifecycleError::CreateFailed { tx: TxId::new(42) };
        assert!(err.to_string().contains("42"));
    }
}
