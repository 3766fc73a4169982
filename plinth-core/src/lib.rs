//! Plinth Core Library
//!
//! Core lifecycle runtime for the Plinth platform. Provides the attribute
//! container, transaction tokens, the service registry and state machine,
//! notification dispatch, and drain-barrier shutdown.

pub mod attrs;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod factory;
pub mod manager;
pub mod registry;
pub mod service;
pub mod state;
pub mod token;
pub mod types;

// Re-export commonly used types
pub use attrs::{AttrKey, AttrKind, AttrSet, AttrValue, ObjectHandle};
pub use client::ServiceClient;
pub use config::{ConfigLoader, RuntimeConfig};
pub use dispatch::{Dispatcher, InlineDispatcher, Notification, TokioDispatcher};
pub use error::{
    AttrError, ConfigError, DispatchError, LifecycleError, PlinthError, PlinthResult,
    StateTransitionError,
};
pub use event::{ErrorEvent, ServiceEvent};
pub use factory::ServiceFactory;
pub use manager::{Completion, LifecycleHandle, LifecycleOutcome, ServiceManager};
pub use registry::{ServiceEntry, ServiceRegistry};
pub use service::{InitContext, ReleaseContext, Service, ServiceRef};
pub use state::{ServiceState, ServiceStateMachine, StateMachineMetrics};
pub use token::{TxId, TxToken};
pub use types::{ReleaseTimeout, ServiceId, ServiceName};
