//! Error types for building and driving a machine.

use crate::types::State;

/// Configuration errors, reported while compiling a [`Config`](crate::Config).
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The initial state is [`State::UNSET`].
    #[error("initial state is required")]
    InitialNotSet,
    /// Two state entries share the same reference.
    #[error("state {0} is declared more than once")]
    DuplicateState(State),
    /// A state entry uses the reserved [`State::UNSET`] reference.
    #[error("state reference must be non-zero")]
    ReservedState,
    /// A transition is declared for the reserved empty event.
    #[error("state {state} declares a transition for the empty event")]
    EmptyEvent {
        /// State carrying the offending entry.
        state: State,
    },
    /// A transition or timeout points at an undeclared state.
    #[error("state {from} targets undeclared state {target}")]
    UnknownTarget {
        /// State whose transition or timeout holds the target.
        from: State,
        /// The undeclared destination.
        target: State,
    },
    /// A timeout duration string could not be parsed.
    #[error("invalid timeout duration {input:?}: {source}")]
    InvalidDuration {
        /// The rejected input.
        input: String,
        /// Parser error.
        #[source]
        source: humantime::DurationError,
    },
}

/// Outcome of a dispatch that did not change state.
///
/// `Noop` and `CondFailed` are routine: they mean the event does not apply in
/// the current state. `StateNotFound` points at a misconfigured target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// No transition matched, or no target qualified.
    #[error("no change")]
    Noop,
    /// The transition guard rejected the event.
    #[error("condition failed")]
    CondFailed,
    /// The selected destination has no descriptor.
    #[error("state {0} not found")]
    StateNotFound(State),
}
