//! Runtime error types.

use tokio_timed_fsm_core::{BuildError, TransitionError};

/// Error returned by [`MachineHandle::send`](crate::MachineHandle::send).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The event was dispatched but did not change state.
    #[error(transparent)]
    Transition(#[from] TransitionError),
    /// The dispatcher task has stopped.
    #[error("machine is closed")]
    Closed,
}

impl SendError {
    /// The dispatch outcome, if the event reached the machine.
    #[must_use]
    pub fn transition(&self) -> Option<TransitionError> {
        match self {
            Self::Transition(err) => Some(*err),
            Self::Closed => None,
        }
    }

    /// Returns `true` when the event did not apply in the current state.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Transition(TransitionError::Noop))
    }
}

/// Error returned by [`Machine::spawn`](crate::Machine::spawn).
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    /// The configuration was rejected.
    #[error(transparent)]
    Build(#[from] BuildError),
    /// The machine could not settle into its initial state.
    #[error("initial settle failed: {0}")]
    Transition(#[from] TransitionError),
}

/// Error returned by the [`MachineTask`](crate::MachineTask) future.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The dispatcher task panicked or was cancelled.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}
