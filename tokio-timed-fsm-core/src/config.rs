//! Declarative machine description.
//!
//! A [`Config`] lists every state the machine may occupy, the events each state
//! reacts to, and an optional per-state [`Timeout`]. It is plain data: build it
//! with struct literals or with the chained helpers below, then hand it to the
//! runtime.
//!
//! ```rust
//! use std::time::Duration;
//! use tokio_timed_fsm_core::{Config, On, State, StateConfig, Timeout};
//!
//! const CLOSED: State = State(1);
//! const LOCKED: State = State(2);
//!
//! let config = Config::new(CLOSED)
//!     .state(
//!         StateConfig::new(CLOSED)
//!             .timeout(Timeout::to(Duration::from_secs(10), LOCKED))
//!             .on(On::to("lock", LOCKED)),
//!     )
//!     .state(StateConfig::new(LOCKED));
//! assert_eq!(config.states.len(), 2);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::BuildError;
use crate::types::{Condition, Event, State, Target};

/// Default depth of the runtime's event queue.
pub const DEFAULT_CHANNEL_SIZE: usize = 100;

/// Observer invoked with `(previous, next)` on every committed transition.
pub type StateChanged = Arc<dyn Fn(State, State) + Send + Sync>;

/// Automatic transition taken after `duration` in a state without leaving it.
#[derive(Debug, Clone)]
pub struct Timeout {
    /// Time spent in the state before the timeout fires.
    pub duration: Duration,
    /// Candidates tried in order when the timeout fires.
    pub targets: Vec<Target>,
}

impl Timeout {
    /// Timeout with no targets yet; add them with [`Timeout::target`].
    #[must_use]
    pub fn after(duration: Duration) -> Self {
        Self {
            duration,
            targets: Vec::new(),
        }
    }

    /// Timeout with a single unconditional target.
    #[must_use]
    pub fn to(duration: Duration, state: State) -> Self {
        Self::after(duration).target(Target::to(state))
    }

    /// Parses a human-readable duration such as `"500ms"` or `"10s"`.
    pub fn parse(duration: &str) -> Result<Self, BuildError> {
        humantime::parse_duration(duration)
            .map(Self::after)
            .map_err(|source| BuildError::InvalidDuration {
                input: duration.to_owned(),
                source,
            })
    }

    /// Appends a candidate target.
    #[must_use]
    pub fn target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }
}

/// Event-driven transition out of a state.
#[derive(Debug, Clone)]
pub struct On {
    /// Event that triggers this transition.
    pub event: Event,
    /// Guard checked before any target; failing it yields `CondFailed`.
    pub cond: Option<Condition>,
    /// Candidates tried in order once the guard passes.
    pub targets: Vec<Target>,
}

impl On {
    /// Transition on `event` with no targets yet.
    pub fn event(event: impl Into<Event>) -> Self {
        Self {
            event: event.into(),
            cond: None,
            targets: Vec::new(),
        }
    }

    /// Transition on `event` to a single unconditional target.
    pub fn to(event: impl Into<Event>, state: State) -> Self {
        Self::event(event).target(Target::to(state))
    }

    /// Sets the guard.
    #[must_use]
    pub fn guard<F>(mut self, cond: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.cond = Some(Condition::new(cond));
        self
    }

    /// Appends a candidate target.
    #[must_use]
    pub fn target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }
}

/// One declared state.
#[derive(Debug, Clone)]
pub struct StateConfig {
    /// Identifier of the declared state.
    pub reference: State,
    /// Automatic transition out of this state.
    pub timeout: Option<Timeout>,
    /// Later entries for the same event replace earlier ones.
    pub on: Vec<On>,
}

impl StateConfig {
    /// Declares `reference` with no timeout and no transitions.
    #[must_use]
    pub fn new(reference: State) -> Self {
        Self {
            reference,
            timeout: None,
            on: Vec::new(),
        }
    }

    /// Sets the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Appends an event-driven transition.
    #[must_use]
    pub fn on(mut self, on: On) -> Self {
        self.on.push(on);
        self
    }
}

/// When undeclared transition targets are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetValidation {
    /// Reject undeclared targets while building the table.
    #[default]
    Eager,
    /// Accept them; entering one fails with `StateNotFound` at dispatch time.
    Lazy,
}

/// Complete machine description.
#[derive(Clone)]
pub struct Config {
    /// State entered when the machine starts. Must not be [`State::UNSET`].
    pub initial: State,
    /// Every state the machine may occupy.
    pub states: Vec<StateConfig>,
    /// Observer invoked on every committed transition.
    pub state_changed: Option<StateChanged>,
    /// When undeclared targets are reported.
    pub target_validation: TargetValidation,
    /// Depth of the runtime's event queue.
    pub channel_size: usize,
}

impl Config {
    /// Configuration starting in `initial`, with defaults for everything else.
    #[must_use]
    pub fn new(initial: State) -> Self {
        Self {
            initial,
            states: Vec::new(),
            state_changed: None,
            target_validation: TargetValidation::default(),
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }

    /// Appends a state declaration.
    #[must_use]
    pub fn state(mut self, state: StateConfig) -> Self {
        self.states.push(state);
        self
    }

    /// Registers the state-changed observer.
    ///
    /// The observer runs on the dispatcher task while the transition is being
    /// committed; it must not block or call back into the machine.
    #[must_use]
    pub fn on_state_changed<F>(mut self, observer: F) -> Self
    where
        F: Fn(State, State) + Send + Sync + 'static,
    {
        self.state_changed = Some(Arc::new(observer));
        self
    }

    /// Sets when undeclared targets are reported.
    #[must_use]
    pub fn target_validation(mut self, validation: TargetValidation) -> Self {
        self.target_validation = validation;
        self
    }

    /// Sets the depth of the runtime's event queue.
    #[must_use]
    pub fn channel_size(mut self, size: usize) -> Self {
        self.channel_size = size;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(State::UNSET)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("initial", &self.initial)
            .field("states", &self.states)
            .field("state_changed", &self.state_changed.is_some())
            .field("target_validation", &self.target_validation)
            .field("channel_size", &self.channel_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_human_durations() {
        let timeout = Timeout::parse("500ms").unwrap();
        assert_eq!(timeout.duration, Duration::from_millis(500));
        assert!(timeout.targets.is_empty());

        let timeout = Timeout::parse("1m 30s").unwrap().target(Target::to(State(2)));
        assert_eq!(timeout.duration, Duration::from_secs(90));
        assert_eq!(timeout.targets.len(), 1);
    }

    #[test]
    fn rejects_malformed_durations() {
        let err = Timeout::parse("soon").unwrap_err();
        assert!(matches!(err, BuildError::InvalidDuration { ref input, .. } if input == "soon"));
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.initial.is_unset());
        assert_eq!(config.channel_size, DEFAULT_CHANNEL_SIZE);
        assert_eq!(config.target_validation, TargetValidation::Eager);
        assert!(config.state_changed.is_none());
    }
}
