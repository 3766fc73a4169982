// SPDX-License-Identifier: Apache-2.0

//! Thread-safe service registry using DashMap.
//!
//! Tracks instances between creation and init completion (pending) and
//! after registration (live). Membership changes only through the
//! lifecycle transitions; map guards are never held across a factory call
//! or a notification dispatch.

use std::sync::Arc;

use dashmap::DashMap;

use crate::client::ServiceClient;
use crate::error::{LifecycleError, PlinthError, PlinthResult};
use crate::service::ServiceRef;
use crate::state::{ServiceState, ServiceStateMachine, StateMachineMetrics};
use crate::types::ServiceId;

/// Entry in the service registry.
pub struct ServiceEntry {
    /// The live instance.
    pub service: ServiceRef,
    /// The client that owns the instance.
    pub client: Arc<dyn ServiceClient>,
    /// State machine managing the instance lifecycle.
    pub state_machine: ServiceStateMachine,
}

impl ServiceEntry {
    /// Create a new entry for a just-created instance.
    /// The state machine starts at Unconstructed; the caller drives it.
    pub fn new(service: ServiceRef, client: Arc<dyn ServiceClient>) -> Self {
        let state_machine = ServiceStateMachine::new(service.service_id());
        Self {
            service,
            client,
            state_machine,
        }
    }

    /// The instance identity.
    pub fn service_id(&self) -> ServiceId {
        self.state_machine.service_id()
    }
}

impl std::fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("service", &self.service)
            .field("state_machine", &self.state_machine)
            .finish()
    }
}

/// Registry of service instances owned by the lifecycle manager.
/// Uses DashMap for lock-free concurrent access.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    /// Instances created but not yet initialized.
    pending: DashMap<ServiceId, ServiceEntry>,
    /// Registered live instances.
    live: DashMap<ServiceId, ServiceEntry>,
}

impl ServiceRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            live: DashMap::new(),
        }
    }

    /// Track a just-created instance awaiting init completion.
    /// Returns AlreadyRegistered if the identity is known in either table.
    pub fn insert_pending(&self, entry: ServiceEntry) -> PlinthResult<()> {
        let id = entry.service_id();
        if self.pending.contains_key(&id) || self.live.contains_key(&id) {
            return Err(LifecycleError::AlreadyRegistered { service_id: id }.into());
        }
        self.pending.insert(id, entry);
        Ok(())
    }

    /// Remove and return a pending instance, if tracked.
    /// The owned entry lets the caller transition and act on it lock-free.
    pub fn take_pending(&self, id: ServiceId) -> Option<ServiceEntry> {
        self.pending.remove(&id).map(|(_, entry)| entry)
    }

    /// Register an initialized instance as live.
    /// Postcondition: the registry contains the instance exactly once.
    pub fn register(&self, entry: ServiceEntry) -> PlinthResult<()> {
        let id = entry.service_id();
        if self.pending.contains_key(&id) || self.live.contains_key(&id) {
            return Err(LifecycleError::AlreadyRegistered { service_id: id }.into());
        }
        self.live.insert(id, entry);
        Ok(())
    }

    /// Transition a live instance to Releasing.
    /// Fails for unknown instances and for instances already releasing.
    pub fn begin_release(&self, id: ServiceId) -> PlinthResult<()> {
        let mut entry = self
            .live
            .get_mut(&id)
            .ok_or(PlinthError::from(LifecycleError::NotRegistered {
                service_id: id,
            }))?;

        entry.state_machine.transition_to(ServiceState::Releasing)?;
        Ok(())
    }

    /// Deregister an instance whose release completed (or terminally
    /// failed). Returns the owned entry, or None if the instance is unknown
    /// or was not releasing - in which case nothing is mutated.
    pub fn complete_release(&self, id: ServiceId) -> Option<ServiceEntry> {
        let transitioned = match self.live.get_mut(&id) {
            Some(mut entry) => entry
                .state_machine
                .transition_to(ServiceState::Released)
                .is_ok(),
            None => false,
        };
        if !transitioned {
            return None;
        }
        self.live.remove(&id).map(|(_, entry)| entry)
    }

    /// Check if an instance is registered as live.
    pub fn contains(&self, id: ServiceId) -> bool {
        self.live.contains_key(&id)
    }

    /// Get the number of live instances.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Check if the registry has no live instances.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Get the number of instances awaiting init completion.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Snapshot of all live instance identities.
    pub fn service_ids(&self) -> Vec<ServiceId> {
        self.live.iter().map(|r| *r.key()).collect()
    }

    /// Snapshot of all live instances.
    pub fn services(&self) -> Vec<ServiceRef> {
        self.live.iter().map(|r| r.service.clone()).collect()
    }

    /// The owning client of a live instance.
    pub fn client_of(&self, id: ServiceId) -> Option<Arc<dyn ServiceClient>> {
        self.live.get(&id).map(|r| r.client.clone())
    }

    /// Get metrics for all tracked instances, pending ones included.
    pub fn metrics(&self) -> Vec<StateMachineMetrics> {
        self.pending
            .iter()
            .map(|r| StateMachineMetrics::from(&r.state_machine))
            .chain(
                self.live
                    .iter()
                    .map(|r| StateMachineMetrics::from(&r.state_machine)),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ErrorEvent, ServiceEvent};
    use crate::service::ReleaseContext;
    use crate::token::TxToken;

    #[derive(Debug)]
    struct StubService {
        id: ServiceId,
    }

    impl crate::service::Service for StubService {
        fn service_id(&self) -> ServiceId {
            self.id
        }

        fn begin_release(&self, cx: ReleaseContext) {
            cx.complete();
        }
    }

    struct StubClient;

    impl ServiceClient for StubClient {
        fn allocate_succeeded(&self, _service: ServiceRef, _token: TxToken) {}
        fn allocate_failed(&self, _event: ErrorEvent) {}
        fn release_succeeded(&self, _token: TxToken) {}
        fn release_failed(&self, _event: ErrorEvent) {}
        fn unsolicited_event(&self, _event: ServiceEvent) {}
    }

    fn make_entry() -> ServiceEntry {
        let service: ServiceRef = Arc::new(StubService {
            id: ServiceId::next(),
        });
        ServiceEntry::new(service, Arc::new(StubClient))
    }

    fn make_live_entry() -> ServiceEntry {
        let mut entry = make_entry();
        entry
            .state_machine
            .transition_to(ServiceState::Created)
            .unwrap();
        entry.state_machine.transition_to(ServiceState::Live).unwrap();
        entry
    }

    #[test]
    fn test_pending_then_register() {
        let registry = ServiceRegistry::new();
        let mut entry = make_entry();
        entry
            .state_machine
            .transition_to(ServiceState::Created)
            .unwrap();
        let id = entry.service_id();

        registry.insert_pending(entry).unwrap();
        assert_eq!(registry.pending_len(), 1);
        assert!(!registry.contains(id));

        let mut entry = registry.take_pending(id).unwrap();
        entry.state_machine.transition_to(ServiceState::Live).unwrap();
        registry.register(entry).unwrap();

        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.pending_len(), 0);
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let registry = ServiceRegistry::new();
        let entry = make_live_entry();
        let id = entry.service_id();
        registry.register(entry).unwrap();

        let dup_service: ServiceRef = Arc::new(StubService { id });
        let dup = ServiceEntry::new(dup_service, Arc::new(StubClient));
        assert!(registry.register(dup).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_release_cycle() {
        let registry = ServiceRegistry::new();
        let entry = make_live_entry();
        let id = entry.service_id();
        registry.register(entry).unwrap();

        registry.begin_release(id).unwrap();
        // a second release of the same instance is invalid
        assert!(registry.begin_release(id).is_err());

        let entry = registry.complete_release(id).unwrap();
        assert_eq!(entry.state_machine.state(), ServiceState::Released);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_complete_release_requires_releasing() {
        let registry = ServiceRegistry::new();
        let entry = make_live_entry();
        let id = entry.service_id();
        registry.register(entry).unwrap();

        // never released - completion must not deregister
        assert!(registry.complete_release(id).is_none());
        assert!(registry.contains(id));
    }

    #[test]
    fn test_unknown_instance() {
        let registry = ServiceRegistry::new();
        let id = ServiceId::next();
        assert!(registry.take_pending(id).is_none());
        assert!(registry.begin_release(id).is_err());
        assert!(registry.complete_release(id).is_none());
        assert!(registry.client_of(id).is_none());
    }

    #[test]
    fn test_concurrent_registration() {
        use std::thread;

        let registry = Arc::new(ServiceRegistry::new());

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let reg = Arc::clone(&registry);
                thread::spawn(move || {
                    reg.register(make_live_entry()).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 10);
        assert_eq!(registry.service_ids().len(), 10);
    }
}
