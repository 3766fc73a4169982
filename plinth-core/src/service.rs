// SPDX-License-Identifier: Apache-2.0

//! Service instances and the contexts handed to them by the manager.
//!
//! A service is the live, heavyweight resource object. The registry tracks
//! it by identity; the caller only ever holds a capability-typed reference.

use std::fmt;
use std::sync::Arc;

use crate::attrs::AttrSet;
use crate::client::ServiceClient;
use crate::event::ErrorEvent;
use crate::manager::LifecycleHandle;
use crate::token::TxToken;
use crate::types::{ReleaseTimeout, ServiceId};

/// Shared reference to a live service instance.
pub type ServiceRef = Arc<dyn Service>;

/// The base capability every managed instance exposes.
///
/// Implementations are owned by the lifecycle manager once registered and
/// destroy themselves when the last reference drops after release.
pub trait Service: Send + Sync + fmt::Debug {
    /// Stable identity used by the registry.
    fn service_id(&self) -> ServiceId;

    /// Begin asynchronous teardown.
    ///
    /// Invoked when the scheduled release notification is processed. The
    /// instance must eventually call `cx.complete()` or `cx.fail(..)`, from
    /// any thread; until then it stays in the registry as releasing.
    fn begin_release(&self, cx: ReleaseContext);
}

/// Everything a factory needs to finish bringing up one instance:
/// the instance itself, the owning client, the request token, a deep copy
/// of the manifest, and the channel back into the manager.
pub struct InitContext {
    handle: LifecycleHandle,
    service: ServiceRef,
    client: Arc<dyn ServiceClient>,
    token: TxToken,
    manifest: AttrSet,
}

impl InitContext {
    pub(crate) fn new(
        handle: LifecycleHandle,
        service: ServiceRef,
        client: Arc<dyn ServiceClient>,
        token: TxToken,
        manifest: AttrSet,
    ) -> Self {
        Self {
            handle,
            service,
            client,
            token,
            manifest,
        }
    }

    /// The instance being initialized.
    pub fn service(&self) -> &ServiceRef {
        &self.service
    }

    /// The client that will own the instance.
    pub fn client(&self) -> &Arc<dyn ServiceClient> {
        &self.client
    }

    /// The request's transaction token.
    pub fn token(&self) -> &TxToken {
        &self.token
    }

    /// The request manifest. An independent deep copy; the caller keeps
    /// ownership of its original.
    pub fn manifest(&self) -> &AttrSet {
        &self.manifest
    }

    /// Report successful initialization. The manager registers the instance
    /// and notifies the client.
    pub fn succeed(self) {
        self.handle.initialized(self.service, self.token);
    }

    /// Report failed initialization. The manager destroys the instance
    /// through the factory and notifies the client.
    pub fn fail(self, message: impl Into<String>) {
        let event = ErrorEvent::new(self.token, message);
        self.handle.init_failed(self.service, event);
    }

    /// Report failed initialization with a prebuilt event.
    pub fn fail_with(self, event: ErrorEvent) {
        self.handle.init_failed(self.service, event);
    }
}

/// Handed to [`Service::begin_release`]; completes or fails the release.
pub struct ReleaseContext {
    handle: LifecycleHandle,
    service_id: ServiceId,
    token: TxToken,
    timeout: ReleaseTimeout,
}

impl ReleaseContext {
    pub(crate) fn new(
        handle: LifecycleHandle,
        service_id: ServiceId,
        token: TxToken,
        timeout: ReleaseTimeout,
    ) -> Self {
        Self {
            handle,
            service_id,
            token,
            timeout,
        }
    }

    /// The releasing instance's identity.
    pub fn service_id(&self) -> ServiceId {
        self.service_id
    }

    /// The release request's transaction token.
    pub fn token(&self) -> &TxToken {
        &self.token
    }

    /// How long the caller is willing to wait for the completion
    /// notification. Informational: the release itself is never cancelled.
    pub fn timeout(&self) -> ReleaseTimeout {
        self.timeout
    }

    /// Report completed teardown. The manager deregisters the instance and
    /// notifies the client; the instance then destroys itself as the last
    /// references drop.
    pub fn complete(self) {
        self.handle.release_complete(self.service_id, self.token);
    }

    /// Report failed teardown. The instance is deregistered all the same.
    pub fn fail(self, message: impl Into<String>) {
        let event = ErrorEvent::new(self.token, message);
        self.handle.release_failed(self.service_id, event);
    }

    /// Report failed teardown with a prebuilt event.
    pub fn fail_with(self, event: ErrorEvent) {
        self.handle.release_failed(self.service_id, event);
    }
}
