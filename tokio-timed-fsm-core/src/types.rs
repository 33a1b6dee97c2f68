//! Identifiers and predicates shared by the configuration and the runtime.

use std::fmt;
use std::sync::Arc;

/// Identifier of a machine state.
///
/// States are opaque non-zero integers. [`State::UNSET`] (zero) is reserved
/// and is never a valid state: it only appears as the "previous" state of the
/// very first settle reported to a state-changed observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct State(pub u32);

impl State {
    /// The reserved "no state" value.
    pub const UNSET: State = State(0);

    /// Creates a state identifier.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Returns `true` for [`State::UNSET`].
    #[must_use]
    pub const fn is_unset(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for State {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Name of an external stimulus.
///
/// Cloning is cheap. The empty event ([`Event::none`]) never matches a
/// transition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Event(Arc<str>);

impl Event {
    /// Creates an event from its name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The reserved "no event" value.
    #[must_use]
    pub fn none() -> Self {
        Self(Arc::from(""))
    }

    /// Returns the event name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the reserved empty event.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::none()
    }
}

impl From<&str> for Event {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Event {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Zero-argument predicate evaluated at dispatch time.
///
/// Conditions run on the dispatcher task, so they must be `Send + Sync`. They
/// should be quick and must not call back into the machine that owns them.
#[derive(Clone)]
pub struct Condition(Arc<dyn Fn() -> bool + Send + Sync>);

impl Condition {
    /// Wraps a predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// Evaluates the predicate.
    #[must_use]
    pub fn check(&self) -> bool {
        (self.0)()
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition(..)")
    }
}

/// Evaluates an optional condition; absence means "always true".
pub(crate) fn passes(cond: Option<&Condition>) -> bool {
    cond.is_none_or(Condition::check)
}

/// A candidate destination with an optional guard.
#[derive(Debug, Clone)]
pub struct Target {
    /// Guard for this candidate; `None` always qualifies.
    pub cond: Option<Condition>,
    /// Destination state.
    pub target: State,
}

impl Target {
    /// Unconditional target.
    #[must_use]
    pub fn to(state: State) -> Self {
        Self {
            cond: None,
            target: state,
        }
    }

    /// Target that qualifies only while `cond` returns `true`.
    pub fn when<F>(state: State, cond: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            cond: Some(Condition::new(cond)),
            target: state,
        }
    }

    /// Returns `true` if this candidate currently qualifies.
    #[must_use]
    pub fn qualifies(&self) -> bool {
        passes(self.cond.as_ref())
    }
}

/// Picks the first qualifying target, in declaration order.
#[must_use]
pub fn select_target(targets: &[Target]) -> Option<State> {
    targets.iter().find(|t| t.qualifies()).map(|t| t.target)
}
