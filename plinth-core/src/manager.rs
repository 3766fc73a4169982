// SPDX-License-Identifier: Apache-2.0

//! The service lifecycle manager.
//!
//! Owns one service factory, the live-instance registry, and the
//! notification plumbing. Drives the per-instance state machine:
//! create → initialize-completion → optional release → release-completion,
//! and performs the drain-barrier shutdown.
//!
//! The manager performs no threading of its own. Factories and services
//! report completions through a [`LifecycleHandle`], a channel drained by a
//! single pump task, so external callbacks never mutate the registry
//! re-entrantly. Registry guards are never held across a factory call or a
//! notification dispatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, Notify};

use crate::attrs::AttrSet;
use crate::client::ServiceClient;
use crate::config::RuntimeConfig;
use crate::dispatch::{Dispatcher, Notification};
use crate::error::{LifecycleError, PlinthResult};
use crate::event::{ErrorEvent, ServiceEvent};
use crate::factory::ServiceFactory;
use crate::registry::{ServiceEntry, ServiceRegistry};
use crate::service::{InitContext, ReleaseContext, ServiceRef};
use crate::state::{ServiceState, StateMachineMetrics};
use crate::token::{TxId, TxToken};
use crate::types::{ReleaseTimeout, ServiceId};

/// Completion messages from factories and services back into the manager.
enum LifecycleMsg {
    Initialized {
        service: ServiceRef,
        token: TxToken,
    },
    InitFailed {
        service: ServiceRef,
        event: ErrorEvent,
    },
    ReleaseComplete {
        service_id: ServiceId,
        token: TxToken,
    },
    ReleaseFailed {
        service_id: ServiceId,
        event: ErrorEvent,
    },
    Unsolicited {
        source: ServiceId,
        payload: AttrSet,
    },
}

/// Clonable channel into the manager for completion reports.
///
/// Handed to factories inside [`InitContext`] and to services inside
/// [`ReleaseContext`]; safe to use from any thread, including from inside
/// the factory call that received it. Reports for instances the manager
/// does not know are logged and dropped.
#[derive(Clone)]
pub struct LifecycleHandle {
    tx: mpsc::UnboundedSender<LifecycleMsg>,
}

impl LifecycleHandle {
    /// Report successful initialization of `service`.
    pub fn initialized(&self, service: ServiceRef, token: TxToken) {
        self.send(LifecycleMsg::Initialized { service, token });
    }

    /// Report failed initialization of `service`.
    pub fn init_failed(&self, service: ServiceRef, event: ErrorEvent) {
        self.send(LifecycleMsg::InitFailed { service, event });
    }

    /// Report completed teardown of a releasing instance.
    pub fn release_complete(&self, service_id: ServiceId, token: TxToken) {
        self.send(LifecycleMsg::ReleaseComplete { service_id, token });
    }

    /// Report failed teardown of a releasing instance.
    pub fn release_failed(&self, service_id: ServiceId, event: ErrorEvent) {
        self.send(LifecycleMsg::ReleaseFailed { service_id, event });
    }

    /// Raise an out-of-band event from a live service.
    pub fn unsolicited(&self, source: ServiceId, payload: AttrSet) {
        self.send(LifecycleMsg::Unsolicited { source, payload });
    }

    fn send(&self, msg: LifecycleMsg) {
        if self.tx.send(msg).is_err() {
            tracing::warn!("lifecycle manager is gone; completion dropped");
        }
    }
}

/// Terminal outcome of one construct or release transaction.
#[derive(Debug)]
pub enum LifecycleOutcome {
    /// The requested service is live; the reference is the caller's handle.
    Allocated(ServiceRef),
    /// The request failed terminally.
    AllocateFailed(ErrorEvent),
    /// The instance finished teardown and was deregistered.
    Released(TxToken),
    /// Teardown failed; the instance was deregistered all the same.
    ReleaseFailed(ErrorEvent),
}

/// Awaitable completion of one transaction, keyed by its token id.
///
/// Resolves when the corresponding notification fires. Callers that want a
/// blocking API simply await it; callers that only care about the
/// notification may drop it.
pub struct Completion {
    rx: oneshot::Receiver<LifecycleOutcome>,
}

impl Completion {
    /// Wait for the transaction's terminal outcome.
    pub async fn wait(self) -> PlinthResult<LifecycleOutcome> {
        self.rx
            .await
            .map_err(|_| LifecycleError::Abandoned.into())
    }
}

/// The service registry / lifecycle manager.
///
/// Construct with [`ServiceManager::new`] inside a tokio runtime. All
/// operations are non-blocking except [`ServiceManager::shutdown`], the
/// drain barrier.
pub struct ServiceManager {
    factory: Arc<dyn ServiceFactory>,
    client: Arc<dyn ServiceClient>,
    dispatcher: Arc<dyn Dispatcher>,
    registry: ServiceRegistry,
    config: RuntimeConfig,
    waiters: DashMap<TxId, oneshot::Sender<LifecycleOutcome>>,
    lifecycle_tx: mpsc::UnboundedSender<LifecycleMsg>,
    drained: Notify,
    draining: AtomicBool,
}

impl ServiceManager {
    /// Create a manager with the default configuration.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime; the completion pump task
    /// needs one.
    pub fn new(
        factory: Arc<dyn ServiceFactory>,
        client: Arc<dyn ServiceClient>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Arc<Self> {
        Self::with_config(factory, client, dispatcher, RuntimeConfig::default())
    }

    /// Create a manager with an explicit configuration.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime; the completion pump task
    /// needs one.
    pub fn with_config(
        factory: Arc<dyn ServiceFactory>,
        client: Arc<dyn ServiceClient>,
        dispatcher: Arc<dyn Dispatcher>,
        config: RuntimeConfig,
    ) -> Arc<Self> {
        let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();

        if let Some(name) = &config.name {
            tracing::info!(runtime = %name, "lifecycle manager starting");
        }

        let manager = Arc::new(Self {
            factory,
            client,
            dispatcher,
            registry: ServiceRegistry::new(),
            config,
            waiters: DashMap::new(),
            lifecycle_tx,
            drained: Notify::new(),
            draining: AtomicBool::new(false),
        });

        tokio::spawn(Self::pump(Arc::downgrade(&manager), lifecycle_rx));

        manager
    }

    /// The channel factories and services use to report completions.
    pub fn handle(&self) -> LifecycleHandle {
        LifecycleHandle {
            tx: self.lifecycle_tx.clone(),
        }
    }

    /// Request construction of the service described by `manifest`.
    ///
    /// The manifest is deep-copied across the factory boundary; the caller
    /// keeps independent ownership of its original. On success the request
    /// is in flight and the returned [`Completion`] resolves when exactly
    /// one allocate notification has been issued. Synchronous errors mean
    /// no instance was registered and, for create failures, that the
    /// factory was not called again.
    pub fn construct(&self, manifest: &AttrSet, token: TxToken) -> PlinthResult<Completion> {
        if self.draining.load(Ordering::Acquire) {
            return Err(LifecycleError::ShuttingDown.into());
        }

        let client = self.client_for(&token);

        let Some(service) = self.factory.create(manifest) else {
            tracing::warn!(tx = %token.id(), "factory produced no instance");
            let event = ErrorEvent::new(token.clone(), "factory produced no instance");
            self.schedule(Notification::AllocateFailed { client, event });
            return Err(LifecycleError::CreateFailed { tx: token.id() }.into());
        };

        let id = service.service_id();
        let mut entry = ServiceEntry::new(service.clone(), client.clone());
        entry.state_machine.transition_to(ServiceState::Created)?;

        if let Err(err) = self.registry.insert_pending(entry) {
            // identity collision - clean up the orphaned instance
            self.factory.destroy(service);
            return Err(err);
        }

        let (done_tx, done_rx) = oneshot::channel();
        self.waiters.insert(token.id(), done_tx);

        let cx = InitContext::new(
            self.handle(),
            service.clone(),
            client,
            token.clone(),
            manifest.clone(),
        );

        tracing::debug!(service_id = %id, tx = %token.id(), "initializing service");

        if !self.factory.initialize(cx) {
            self.waiters.remove(&token.id());
            self.fail_pending_init(
                id,
                ErrorEvent::new(token, "factory refused initialization"),
            );
            return Err(LifecycleError::InitFailed { service_id: id }.into());
        }

        Ok(Completion { rx: done_rx })
    }

    /// Register an instance whose initialization completed.
    ///
    /// Returns `false` without mutating the registry when the instance is
    /// not pending (never created here, already registered, or stale).
    /// Otherwise the instance becomes live and exactly one
    /// allocate-succeeded notification is scheduled.
    pub fn service_initialized(&self, service: &ServiceRef, token: &TxToken) -> bool {
        let id = service.service_id();

        let Some(mut entry) = self.registry.take_pending(id) else {
            tracing::warn!(service_id = %id, "init completion for unknown service");
            return false;
        };

        let init_took = entry.state_machine.time_in_current_state();
        if self.config.slow_init_warn_ms > 0
            && init_took > Duration::from_millis(self.config.slow_init_warn_ms)
        {
            tracing::warn!(
                service_id = %id,
                elapsed_ms = init_took.as_millis() as u64,
                "slow service initialization"
            );
        }

        if let Err(err) = entry.state_machine.transition_to(ServiceState::Live) {
            tracing::error!(service_id = %id, error = %err, "cannot mark service live");
            return false;
        }

        let client = entry.client.clone();
        if let Err(err) = self.registry.register(entry) {
            tracing::error!(service_id = %id, error = %err, "cannot register service");
            return false;
        }

        self.complete_waiter(token.id(), LifecycleOutcome::Allocated(service.clone()));
        self.schedule(Notification::AllocateSucceeded {
            client,
            service: service.clone(),
            token: token.clone(),
        });

        tracing::info!(service_id = %id, tx = %token.id(), "service registered");
        true
    }

    /// Clean up an instance whose initialization failed.
    ///
    /// Returns `false` without side effects for unknown instances.
    /// Otherwise destroys the instance through the factory and schedules
    /// exactly one allocate-failed notification. The registry gains no
    /// entry.
    pub fn service_init_failed(&self, service: &ServiceRef, event: ErrorEvent) -> bool {
        let id = service.service_id();
        tracing::warn!(service_id = %id, error = %event, "service initialization failed");
        self.fail_pending_init(id, event)
    }

    /// Request release of a registered instance.
    ///
    /// Schedules a release notification; when the dispatch engine processes
    /// it, the instance begins teardown and later reports through the
    /// lifecycle handle. `timeout` bounds only how long the caller intends
    /// to wait on the completion - the release itself always runs to its
    /// terminal state.
    pub fn release(
        &self,
        service: &ServiceRef,
        token: TxToken,
        timeout: ReleaseTimeout,
    ) -> PlinthResult<Completion> {
        let id = service.service_id();
        self.registry.begin_release(id)?;

        let (done_tx, done_rx) = oneshot::channel();
        self.waiters.insert(token.id(), done_tx);

        let cx = ReleaseContext::new(self.handle(), id, token.clone(), timeout);

        tracing::debug!(service_id = %id, tx = %token.id(), timeout = %timeout, "release scheduled");

        if let Err(err) = self.dispatcher.schedule(Notification::Release {
            service: service.clone(),
            cx,
        }) {
            // the entry stays releasing; shutdown treats it as stuck
            self.waiters.remove(&token.id());
            tracing::error!(service_id = %id, error = %err, "failed to schedule release");
            return Err(err.into());
        }

        Ok(Completion { rx: done_rx })
    }

    /// Deregister an instance whose teardown completed.
    ///
    /// Returns `false` without mutating the registry when the instance is
    /// unknown or was not releasing. Otherwise the entry is removed (the
    /// instance destroys itself as its references drop), exactly one
    /// release-succeeded notification is scheduled, and an empty registry
    /// signals the drain barrier.
    pub fn release_complete(&self, service_id: ServiceId, token: TxToken) -> bool {
        let Some(entry) = self.registry.complete_release(service_id) else {
            tracing::warn!(service_id = %service_id, "release completion for unknown service");
            return false;
        };

        let client = entry.client.clone();
        drop(entry);

        self.complete_waiter(token.id(), LifecycleOutcome::Released(token.clone()));
        self.schedule(Notification::ReleaseSucceeded {
            client,
            token: token.clone(),
        });

        tracing::info!(service_id = %service_id, tx = %token.id(), "service released");

        if self.registry.is_empty() {
            self.drained.notify_waiters();
        }
        true
    }

    /// Deregister an instance whose teardown failed.
    ///
    /// The entry is removed like a completed release - a failed release
    /// never leaks a registry slot - but the client receives exactly one
    /// release-failed notification instead.
    pub fn release_failed(&self, service_id: ServiceId, event: ErrorEvent) -> bool {
        let Some(entry) = self.registry.complete_release(service_id) else {
            tracing::warn!(service_id = %service_id, "release failure for unknown service");
            return false;
        };

        let client = entry.client.clone();
        drop(entry);

        let token = event.token().clone();
        tracing::warn!(service_id = %service_id, error = %event, "service release failed");

        self.complete_waiter(token.id(), LifecycleOutcome::ReleaseFailed(event.clone()));
        self.schedule(Notification::ReleaseFailed { client, event });

        if self.registry.is_empty() {
            self.drained.notify_waiters();
        }
        true
    }

    /// Route an out-of-band event from a live service to its owning client.
    /// Returns `false` for unknown instances.
    pub fn post_unsolicited(&self, source: ServiceId, payload: AttrSet) -> bool {
        let Some(client) = self.registry.client_of(source) else {
            tracing::debug!(service_id = %source, "unsolicited event from unknown service");
            return false;
        };
        self.schedule(Notification::Unsolicited {
            client,
            event: ServiceEvent::new(source, payload),
        });
        true
    }

    /// Drain barrier: release every live instance once, then wait until the
    /// registry is empty.
    ///
    /// Each release is attempted exactly once with an infinite timeout; no
    /// failures are resolved here, the barrier only waits for every tracked
    /// instance to reach its terminal state. Returns immediately when the
    /// registry is already empty. New construct requests fail once shutdown
    /// has begun.
    pub async fn shutdown(&self) {
        self.draining.store(true, Ordering::Release);

        let services = self.registry.services();
        tracing::info!(outstanding = services.len(), "shutdown: draining registry");

        for service in services {
            if let Err(err) = self.release(&service, TxToken::new(), ReleaseTimeout::Infinite) {
                // already releasing, or the dispatch engine refused
                tracing::debug!(
                    service_id = %service.service_id(),
                    error = %err,
                    "drain release skipped"
                );
            }
        }

        let started = Instant::now();
        let mut warned = false;
        loop {
            let notified = self.drained.notified();
            if self.registry.is_empty() {
                break;
            }
            if !warned && self.config.drain_warn_ms > 0 {
                let limit = Duration::from_millis(self.config.drain_warn_ms);
                let remaining = limit.saturating_sub(started.elapsed());
                if tokio::time::timeout(remaining, notified).await.is_err() {
                    warned = true;
                    tracing::warn!(
                        outstanding = self.registry.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "shutdown drain is slow"
                    );
                }
            } else {
                notified.await;
            }
        }

        tracing::info!("shutdown complete: registry drained");
    }

    /// Number of live instances.
    pub fn live_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether an instance is registered as live.
    pub fn is_registered(&self, id: ServiceId) -> bool {
        self.registry.contains(id)
    }

    /// Metrics for every tracked instance.
    pub fn metrics(&self) -> Vec<StateMachineMetrics> {
        self.registry.metrics()
    }

    /// Shared init-failure path for sync refusals and async failures.
    fn fail_pending_init(&self, id: ServiceId, event: ErrorEvent) -> bool {
        let Some(entry) = self.registry.take_pending(id) else {
            tracing::warn!(service_id = %id, "init failure for unknown service");
            return false;
        };

        let ServiceEntry {
            service,
            client,
            mut state_machine,
        } = entry;

        if let Err(err) = state_machine.transition_to(ServiceState::InitFailed) {
            tracing::error!(service_id = %id, error = %err, "init failure in unexpected state");
        }

        self.factory.destroy(service);

        self.complete_waiter(
            event.token().id(),
            LifecycleOutcome::AllocateFailed(event.clone()),
        );
        self.schedule(Notification::AllocateFailed { client, event });
        true
    }

    fn client_for(&self, token: &TxToken) -> Arc<dyn ServiceClient> {
        token
            .completion()
            .cloned()
            .unwrap_or_else(|| self.client.clone())
    }

    fn complete_waiter(&self, id: TxId, outcome: LifecycleOutcome) {
        if let Some((_, tx)) = self.waiters.remove(&id) {
            let _ = tx.send(outcome);
        }
    }

    fn schedule(&self, work: Notification) {
        if let Err(err) = self.dispatcher.schedule(work) {
            tracing::error!(error = %err, "dispatch engine rejected notification");
        }
    }

    /// Drains completion reports from factories and services. One consumer,
    /// so external callbacks never race each other into the registry.
    async fn pump(manager: Weak<ServiceManager>, mut rx: mpsc::UnboundedReceiver<LifecycleMsg>) {
        while let Some(msg) = rx.recv().await {
            let Some(manager) = manager.upgrade() else {
                break;
            };
            match msg {
                LifecycleMsg::Initialized { service, token } => {
                    if !manager.service_initialized(&service, &token) {
                        tracing::debug!(tx = %token.id(), "stale init completion dropped");
                    }
                }
                LifecycleMsg::InitFailed { service, event } => {
                    manager.service_init_failed(&service, event);
                }
                LifecycleMsg::ReleaseComplete { service_id, token } => {
                    manager.release_complete(service_id, token);
                }
                LifecycleMsg::ReleaseFailed { service_id, event } => {
                    manager.release_failed(service_id, event);
                }
                LifecycleMsg::Unsolicited { source, payload } => {
                    manager.post_unsolicited(source, payload);
                }
            }
        }
    }
}
