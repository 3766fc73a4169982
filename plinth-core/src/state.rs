// SPDX-License-Identifier: Apache-2.0

//! Service lifecycle state machine with typed state transitions.
//!
//! Implements the per-instance lifecycle:
//! Unconstructed → Created → Live → Releasing → Released,
//! with CreateFailed and InitFailed as terminal failure branches.
//! Invalid transitions result in StateTransitionError.

use std::time::Instant;

use serde::Serialize;

use crate::error::StateTransitionError;
use crate::types::ServiceId;

/// Service lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServiceState {
    /// Initial state - request accepted but the factory has not created yet.
    Unconstructed,

    /// Terminal - the factory produced no instance.
    CreateFailed,

    /// Instance exists; initialization is in flight.
    Created,

    /// Terminal - initialization failed and the instance was destroyed.
    InitFailed,

    /// Instance is initialized and registered.
    Live,

    /// Release has been issued; teardown is in flight.
    Releasing,

    /// Terminal - teardown completed and the instance was deregistered.
    Released,
}

impl ServiceState {
    /// Get the state name for error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unconstructed => "Unconstructed",
            Self::CreateFailed => "CreateFailed",
            Self::Created => "Created",
            Self::InitFailed => "InitFailed",
            Self::Live => "Live",
            Self::Releasing => "Releasing",
            Self::Released => "Released",
        }
    }

    /// Check if transition to the target state is valid.
    pub fn can_transition_to(&self, target: ServiceState) -> bool {
        matches!(
            (self, target),
            // From Unconstructed
            (Self::Unconstructed, Self::Created) |
            (Self::Unconstructed, Self::CreateFailed) |
            // From Created
            (Self::Created, Self::Live) |
            (Self::Created, Self::InitFailed) |
            // From Live
            (Self::Live, Self::Releasing) |
            // From Releasing
            (Self::Releasing, Self::Released)
        )
    }

    /// Check if the state is terminal (no outgoing transitions).
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::CreateFailed | Self::InitFailed | Self::Released)
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// State machine for one service instance's lifecycle.
/// Enforces valid state transitions and tracks timing metrics.
#[derive(Debug)]
pub struct ServiceStateMachine {
    service_id: ServiceId,
    current_state: ServiceState,
    last_transition: Instant,
    transition_count: u64,
}

impl ServiceStateMachine {
    /// Create a new state machine for a service instance.
    pub fn new(service_id: ServiceId) -> Self {
        Self {
            service_id,
            current_state: ServiceState::Unconstructed,
            last_transition: Instant::now(),
            transition_count: 0,
        }
    }

    /// Get the current state.
    pub fn state(&self) -> ServiceState {
        self.current_state
    }

    /// Get the service ID.
    pub fn service_id(&self) -> ServiceId {
        self.service_id
    }

    /// Get time since last transition.
    pub fn time_in_current_state(&self) -> std::time::Duration {
        self.last_transition.elapsed()
    }

    /// Get total number of transitions.
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Attempt to transition to a new state.
    /// Returns Ok(()) if successful, or StateTransitionError if invalid.
    pub fn transition_to(&mut self, target: ServiceState) -> Result<(), StateTransitionError> {
        if self.current_state.is_terminal() {
            return Err(StateTransitionError::TerminalState {
                service_id: self.service_id,
                state: self.current_state.name(),
            });
        }

        if !self.current_state.can_transition_to(target) {
            return Err(StateTransitionError::InvalidTransition {
                service_id: self.service_id,
                from: self.current_state.name(),
                to: target.name(),
            });
        }

        tracing::debug!(
            service_id = %self.service_id,
            from = self.current_state.name(),
            to = target.name(),
            "State transition"
        );

        self.current_state = target;
        self.last_transition = Instant::now();
        self.transition_count += 1;

        Ok(())
    }
}

/// Metrics for the state machine.
#[derive(Debug, Clone, Serialize)]
pub struct StateMachineMetrics {
    pub service_id: u64,
    pub current_state: String,
    pub time_in_state_ms: u64,
    pub transition_count: u64,
}

impl From<&ServiceStateMachine> for StateMachineMetrics {
    fn from(sm: &ServiceStateMachine) -> Self {
        Self {
            service_id: sm.service_id.value(),
            current_state: sm.current_state.name().to_string(),
            time_in_state_ms: sm.time_in_current_state().as_millis() as u64,
            transition_count: sm.transition_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_service_id() -> ServiceId {
        ServiceId::next()
    }

    #[test]
    fn test_initial_state() {
        let sm = ServiceStateMachine::new(make_service_id());
        assert_eq!(sm.state(), ServiceState::Unconstructed);
        assert_eq!(sm.transition_count(), 0);
    }

    #[test]
    fn test_success_path() {
        let mut sm = ServiceStateMachine::new(make_service_id());

        // Unconstructed → Created
        assert!(sm.transition_to(ServiceState::Created).is_ok());
        assert_eq!(sm.state(), ServiceState::Created);
        assert_eq!(sm.transition_count(), 1);

        // Created → Live
        assert!(sm.transition_to(ServiceState::Live).is_ok());
        assert_eq!(sm.state(), ServiceState::Live);

        // Live → Releasing
        assert!(sm.transition_to(ServiceState::Releasing).is_ok());
        assert_eq!(sm.state(), ServiceState::Releasing);

        // Releasing → Released
        assert!(sm.transition_to(ServiceState::Released).is_ok());
        assert!(sm.state().is_terminal());
    }

    #[test]
    fn test_failure_branches() {
        let mut sm = ServiceStateMachine::new(make_service_id());
        assert!(sm.transition_to(ServiceState::CreateFailed).is_ok());
        assert!(sm.state().is_terminal());

        let mut sm = ServiceStateMachine::new(make_service_id());
        sm.transition_to(ServiceState::Created).unwrap();
        assert!(sm.transition_to(ServiceState::InitFailed).is_ok());
        assert!(sm.state().is_terminal());
    }

    #[test]
    fn test_invalid_transitions() {
        let mut sm = ServiceStateMachine::new(make_service_id());

        // Unconstructed → Live (skips creation)
        assert!(sm.transition_to(ServiceState::Live).is_err());
        assert_eq!(sm.state(), ServiceState::Unconstructed);

        sm.transition_to(ServiceState::Created).unwrap();
        sm.transition_to(ServiceState::Live).unwrap();

        // double release-completion
        sm.transition_to(ServiceState::Releasing).unwrap();
        assert!(sm.transition_to(ServiceState::Releasing).is_err());
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let mut sm = ServiceStateMachine::new(make_service_id());
        sm.transition_to(ServiceState::Created).unwrap();
        sm.transition_to(ServiceState::InitFailed).unwrap();

        let err = sm.transition_to(ServiceState::Live).unwrap_err();
        assert!(matches!(err, StateTransitionError::TerminalState { .. }));
    }
}
