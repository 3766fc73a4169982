// SPDX-License-Identifier: Apache-2.0

//! Fire-and-forget notification scheduling.
//!
//! The manager never calls a client directly: every completion is packaged
//! as a [`Notification`] and handed to a [`Dispatcher`] for out-of-band
//! delivery. Engines must tolerate being called from inside a factory
//! callback.

use std::fmt;
use std::sync::Arc;

use crate::client::ServiceClient;
use crate::error::DispatchError;
use crate::event::{ErrorEvent, ServiceEvent};
use crate::service::{ReleaseContext, ServiceRef};
use crate::token::TxToken;

/// One unit of scheduled work: a client notification or a release request.
pub enum Notification {
    AllocateSucceeded {
        client: Arc<dyn ServiceClient>,
        service: ServiceRef,
        token: TxToken,
    },
    AllocateFailed {
        client: Arc<dyn ServiceClient>,
        event: ErrorEvent,
    },
    ReleaseSucceeded {
        client: Arc<dyn ServiceClient>,
        token: TxToken,
    },
    ReleaseFailed {
        client: Arc<dyn ServiceClient>,
        event: ErrorEvent,
    },
    Unsolicited {
        client: Arc<dyn ServiceClient>,
        event: ServiceEvent,
    },
    /// Kicks off teardown of a live instance when processed.
    Release {
        service: ServiceRef,
        cx: ReleaseContext,
    },
}

impl Notification {
    /// Deliver the notification on the current thread.
    pub fn deliver(self) {
        match self {
            Self::AllocateSucceeded {
                client,
                service,
                token,
            } => client.allocate_succeeded(service, token),
            Self::AllocateFailed { client, event } => client.allocate_failed(event),
            Self::ReleaseSucceeded { client, token } => client.release_succeeded(token),
            Self::ReleaseFailed { client, event } => client.release_failed(event),
            Self::Unsolicited { client, event } => client.unsolicited_event(event),
            Self::Release { service, cx } => service.begin_release(cx),
        }
    }

    const fn kind_name(&self) -> &'static str {
        match self {
            Self::AllocateSucceeded { .. } => "AllocateSucceeded",
            Self::AllocateFailed { .. } => "AllocateFailed",
            Self::ReleaseSucceeded { .. } => "ReleaseSucceeded",
            Self::ReleaseFailed { .. } => "ReleaseFailed",
            Self::Unsolicited { .. } => "Unsolicited",
            Self::Release { .. } => "Release",
        }
    }
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Notification::{}", self.kind_name())
    }
}

/// The dispatch engine boundary.
///
/// `schedule` is fire-and-forget: once it returns `Ok`, the work will run
/// exactly once, at some later point, on a thread of the engine's choosing.
pub trait Dispatcher: Send + Sync {
    fn schedule(&self, work: Notification) -> Result<(), DispatchError>;
}

/// Dispatcher backed by a tokio runtime handle captured at construction.
///
/// Scheduling spawns a task, so it is safe from inside factory callbacks
/// and from threads outside the runtime.
pub struct TokioDispatcher {
    handle: tokio::runtime::Handle,
}

impl TokioDispatcher {
    /// Capture the current runtime. Fails outside a tokio context.
    pub fn new() -> Result<Self, DispatchError> {
        tokio::runtime::Handle::try_current()
            .map(|handle| Self { handle })
            .map_err(|_| DispatchError::NoRuntime)
    }

    /// Use an explicit runtime handle.
    pub fn with_handle(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl Dispatcher for TokioDispatcher {
    fn schedule(&self, work: Notification) -> Result<(), DispatchError> {
        tracing::trace!(work = ?work, "scheduling notification");
        self.handle.spawn(async move {
            work.deliver();
        });
        Ok(())
    }
}

/// Delivers on the calling thread, immediately.
///
/// Deterministic ordering for tests and single-threaded embeddings. Note
/// that delivery happens inside the scheduling call, so client callbacks
/// run on the manager's thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn schedule(&self, work: Notification) -> Result<(), DispatchError> {
        work.deliver();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        released: Mutex<Vec<TxToken>>,
        failures: AtomicUsize,
    }

    impl ServiceClient for RecordingClient {
        fn allocate_succeeded(&self, _service: ServiceRef, _token: TxToken) {}
        fn allocate_failed(&self, _event: ErrorEvent) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        fn release_succeeded(&self, token: TxToken) {
            self.released.lock().unwrap().push(token);
        }
        fn release_failed(&self, _event: ErrorEvent) {}
    }

    #[test]
    fn test_inline_delivery_is_immediate_and_ordered() {
        let client = Arc::new(RecordingClient::default());
        let engine = InlineDispatcher;

        for id in 1..=3u64 {
            engine
                .schedule(Notification::ReleaseSucceeded {
                    client: client.clone(),
                    token: TxToken::with_id(id),
                })
                .unwrap();
        }

        let released = client.released.lock().unwrap();
        let ids: Vec<u64> = released.iter().map(|t| t.id().value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_tokio_dispatcher_delivers() {
        let client = Arc::new(RecordingClient::default());
        let engine = TokioDispatcher::new().unwrap();

        engine
            .schedule(Notification::AllocateFailed {
                client: client.clone(),
                event: ErrorEvent::new(TxToken::new(), "no device"),
            })
            .unwrap();

        tokio::task::yield_now().await;
        assert_eq!(client.failures.load(Ordering::SeqCst), 1);
    }
}
