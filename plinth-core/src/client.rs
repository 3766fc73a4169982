// SPDX-License-Identifier: Apache-2.0

//! The service client capability.
//!
//! Implemented by the requester of a service. Every notification arrives
//! out-of-band on whatever thread the dispatch engine uses; implementations
//! must be thread-safe and should not block.

use crate::event::{ErrorEvent, ServiceEvent};
use crate::service::ServiceRef;
use crate::token::TxToken;

/// Receives lifecycle notifications for services requested by this client.
///
/// Exactly one of `allocate_succeeded`/`allocate_failed` fires per accepted
/// construct request, and exactly one of `release_succeeded`/`release_failed`
/// per release. The echoed token correlates with the request's token by id.
pub trait ServiceClient: Send + Sync {
    /// The requested service is live and registered.
    fn allocate_succeeded(&self, service: ServiceRef, token: TxToken);

    /// The request failed terminally; no instance was registered.
    fn allocate_failed(&self, event: ErrorEvent);

    /// The released instance has completed teardown and was deregistered.
    fn release_succeeded(&self, token: TxToken);

    /// Teardown failed; the instance was deregistered all the same.
    fn release_failed(&self, event: ErrorEvent);

    /// An out-of-band event from a live service owned by this client.
    fn unsolicited_event(&self, _event: ServiceEvent) {}
}
