// SPDX-License-Identifier: Apache-2.0

//! The pluggable service factory capability.

use crate::attrs::AttrSet;
use crate::service::{InitContext, ServiceRef};

/// Creates, initializes, and destroys instances of one service kind.
///
/// Supplied to the lifecycle manager at construction. The factory owns the
/// hardware-specific bring-up; the manager owns tracking and notification.
pub trait ServiceFactory: Send + Sync {
    /// Create the concrete instance described by `manifest`.
    ///
    /// Returning `None` fails the request synchronously; neither
    /// `initialize` nor `destroy` will be called for it.
    fn create(&self, manifest: &AttrSet) -> Option<ServiceRef>;

    /// Start initialization of a created instance.
    ///
    /// Completion is reported through `cx` (`succeed`/`fail`), either before
    /// this returns or later from any thread. Returning `false` means the
    /// request was not accepted and no completion will be reported; the
    /// manager then destroys the instance itself.
    fn initialize(&self, cx: InitContext) -> bool;

    /// Destroy an instance whose initialization did not complete.
    ///
    /// Never called for instances that reached the registry; those destroy
    /// themselves when released.
    fn destroy(&self, service: ServiceRef);
}
