//! Compiles a [`Config`] into immutable lookup tables.

use std::collections::{HashMap, HashSet};

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;

use crate::config::{Config, TargetValidation, Timeout};
use crate::error::{BuildError, TransitionError};
use crate::types::{Condition, Event, State, Target, passes, select_target};

/// Compiled per-state record.
#[derive(Debug, Clone, Default)]
pub struct StateDescriptor {
    /// Timeout armed whenever the state is entered.
    pub timeout: Option<Timeout>,
}

/// Compiled `(state, event)` entry.
#[derive(Debug, Clone)]
pub struct TransitionDescriptor {
    /// Guard checked before any target.
    pub cond: Option<Condition>,
    /// Candidates, in declaration order.
    pub targets: Vec<Target>,
}

/// The initial state plus the state and transition maps.
///
/// Never changes after [`TransitionTable::build`] returns.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    initial: State,
    states: HashMap<State, StateDescriptor>,
    transitions: HashMap<(State, Event), TransitionDescriptor>,
}

impl TransitionTable {
    /// Validates `config` and compiles it.
    ///
    /// Within one state, a later `On` entry for an event replaces an earlier
    /// one. Whether undeclared targets are rejected here depends on
    /// [`Config::target_validation`]; the initial state is never checked here
    /// and fails later, when the machine first settles into it.
    pub fn build(config: &Config) -> Result<Self, BuildError> {
        if config.initial.is_unset() {
            return Err(BuildError::InitialNotSet);
        }

        let mut states = HashMap::with_capacity(config.states.len());
        let mut transitions = HashMap::new();

        for state in &config.states {
            if state.reference.is_unset() {
                return Err(BuildError::ReservedState);
            }
            if states.contains_key(&state.reference) {
                return Err(BuildError::DuplicateState(state.reference));
            }

            for on in &state.on {
                if on.event.is_none() {
                    return Err(BuildError::EmptyEvent {
                        state: state.reference,
                    });
                }
                transitions.insert(
                    (state.reference, on.event.clone()),
                    TransitionDescriptor {
                        cond: on.cond.clone(),
                        targets: on.targets.clone(),
                    },
                );
            }

            states.insert(
                state.reference,
                StateDescriptor {
                    timeout: state.timeout.clone(),
                },
            );
        }

        let table = Self {
            initial: config.initial,
            states,
            transitions,
        };

        if config.target_validation == TargetValidation::Eager {
            table.check_targets(config)?;
        }

        Ok(table)
    }

    /// Reports the first undeclared target, in declaration order.
    fn check_targets(&self, config: &Config) -> Result<(), BuildError> {
        for state in &config.states {
            let on_targets = state.on.iter().flat_map(|on| on.targets.iter());
            let timeout_targets = state.timeout.iter().flat_map(|t| t.targets.iter());

            for target in on_targets.chain(timeout_targets) {
                if !self.states.contains_key(&target.target) {
                    return Err(BuildError::UnknownTarget {
                        from: state.reference,
                        target: target.target,
                    });
                }
            }
        }
        Ok(())
    }

    /// The state the machine settles into on spawn.
    #[must_use]
    pub fn initial(&self) -> State {
        self.initial
    }

    /// The compiled record for `state`, if declared.
    #[must_use]
    pub fn descriptor(&self, state: State) -> Option<&StateDescriptor> {
        self.states.get(&state)
    }

    /// The transition declared for `event` in `state`, if any.
    #[must_use]
    pub fn transition(&self, state: State, event: &Event) -> Option<&TransitionDescriptor> {
        self.transitions.get(&(state, event.clone()))
    }

    /// Declared states, in ascending order.
    #[must_use]
    pub fn states(&self) -> Vec<State> {
        let mut states: Vec<_> = self.states.keys().copied().collect();
        states.sort_unstable();
        states
    }

    /// Events with a transition out of `state`, in ascending order.
    #[must_use]
    pub fn events_for(&self, state: State) -> Vec<Event> {
        let mut events: Vec<_> = self
            .transitions
            .keys()
            .filter(|(from, _)| *from == state)
            .map(|(_, event)| event.clone())
            .collect();
        events.sort_unstable();
        events
    }

    /// Picks the destination for `event` in `current` without committing it.
    ///
    /// The guard is checked before any target. Both a missing entry and a
    /// guard that passes with no qualifying target yield `Noop`.
    pub fn resolve(&self, current: State, event: &Event) -> Result<State, TransitionError> {
        if event.is_none() {
            return Err(TransitionError::Noop);
        }

        let transition = self
            .transition(current, event)
            .ok_or(TransitionError::Noop)?;

        if !passes(transition.cond.as_ref()) {
            return Err(TransitionError::CondFailed);
        }

        select_target(&transition.targets).ok_or(TransitionError::Noop)
    }

    /// Declared states that no sequence of events or timeouts reaches from the
    /// initial state, in ascending order.
    #[must_use]
    pub fn unreachable_states(&self) -> Vec<State> {
        let mut graph = DiGraphMap::<State, ()>::new();
        for state in self.states.keys() {
            graph.add_node(*state);
        }
        for ((from, _), transition) in &self.transitions {
            for target in &transition.targets {
                graph.add_edge(*from, target.target, ());
            }
        }
        for (from, descriptor) in &self.states {
            for target in descriptor.timeout.iter().flat_map(|t| t.targets.iter()) {
                graph.add_edge(*from, target.target, ());
            }
        }

        let mut reached = HashSet::new();
        if graph.contains_node(self.initial) {
            let mut dfs = Dfs::new(&graph, self.initial);
            while let Some(state) = dfs.next(&graph) {
                reached.insert(state);
            }
        }

        let mut unreachable: Vec<_> = self
            .states
            .keys()
            .filter(|state| !reached.contains(*state))
            .copied()
            .collect();
        unreachable.sort_unstable();
        unreachable
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::{On, StateConfig};

    const ON: State = State(1);
    const OFF: State = State(2);
    const BROKEN: State = State(3);

    fn toggle() -> Config {
        Config::new(OFF)
            .state(StateConfig::new(ON).on(On::to("toggle", OFF)))
            .state(StateConfig::new(OFF).on(On::to("toggle", ON)))
    }

    #[test]
    fn compiles_states_and_transitions() {
        let table = TransitionTable::build(&toggle()).unwrap();
        assert_eq!(table.initial(), OFF);
        assert_eq!(table.states(), vec![ON, OFF]);
        assert_eq!(table.events_for(ON), vec![Event::from("toggle")]);
        assert!(table.descriptor(ON).unwrap().timeout.is_none());
        assert!(table.descriptor(BROKEN).is_none());
    }

    #[test]
    fn rejects_unset_initial() {
        let config = Config::new(State::UNSET).state(StateConfig::new(ON));
        assert!(matches!(
            TransitionTable::build(&config),
            Err(BuildError::InitialNotSet)
        ));
    }

    #[test]
    fn rejects_duplicate_state() {
        let config = toggle().state(StateConfig::new(ON));
        assert!(matches!(
            TransitionTable::build(&config),
            Err(BuildError::DuplicateState(state)) if state == ON
        ));
    }

    #[test]
    fn rejects_reserved_reference() {
        let config = Config::new(ON).state(StateConfig::new(State::UNSET));
        assert!(matches!(
            TransitionTable::build(&config),
            Err(BuildError::ReservedState)
        ));
    }

    #[test]
    fn rejects_empty_event() {
        let config = Config::new(ON).state(StateConfig::new(ON).on(On::to("", ON)));
        assert!(matches!(
            TransitionTable::build(&config),
            Err(BuildError::EmptyEvent { state }) if state == ON
        ));
    }

    #[test]
    fn later_declaration_replaces_earlier_one() {
        let config = Config::new(ON)
            .state(
                StateConfig::new(ON)
                    .on(On::to("toggle", ON))
                    .on(On::to("toggle", OFF)),
            )
            .state(StateConfig::new(OFF));
        let table = TransitionTable::build(&config).unwrap();
        assert_eq!(table.resolve(ON, &Event::from("toggle")), Ok(OFF));
    }

    #[test]
    fn eager_validation_rejects_unknown_targets() {
        let config = Config::new(ON).state(StateConfig::new(ON).on(On::to("break", BROKEN)));
        assert!(matches!(
            TransitionTable::build(&config),
            Err(BuildError::UnknownTarget { from, target }) if from == ON && target == BROKEN
        ));

        let config = Config::new(ON)
            .state(StateConfig::new(ON).timeout(Timeout::to(Duration::from_secs(1), BROKEN)));
        assert!(matches!(
            TransitionTable::build(&config),
            Err(BuildError::UnknownTarget { target, .. }) if target == BROKEN
        ));
    }

    #[test]
    fn lazy_validation_accepts_unknown_targets() {
        let config = Config::new(ON)
            .state(StateConfig::new(ON).on(On::to("break", BROKEN)))
            .target_validation(TargetValidation::Lazy);
        let table = TransitionTable::build(&config).unwrap();
        assert_eq!(table.resolve(ON, &Event::from("break")), Ok(BROKEN));
        assert!(table.descriptor(BROKEN).is_none());
    }

    #[test]
    fn undeclared_initial_is_not_a_build_error() {
        let config = Config::new(BROKEN).state(StateConfig::new(ON));
        let table = TransitionTable::build(&config).unwrap();
        assert!(table.descriptor(table.initial()).is_none());
    }

    #[test]
    fn resolve_outcomes() {
        let config = Config::new(ON)
            .state(
                StateConfig::new(ON)
                    .on(On::to("blocked", OFF).guard(|| false))
                    .on(On::event("nowhere").target(crate::Target::when(OFF, || false))),
            )
            .state(StateConfig::new(OFF));
        let table = TransitionTable::build(&config).unwrap();

        assert_eq!(
            table.resolve(ON, &Event::from("missing")),
            Err(TransitionError::Noop)
        );
        assert_eq!(table.resolve(ON, &Event::none()), Err(TransitionError::Noop));
        assert_eq!(
            table.resolve(ON, &Event::from("blocked")),
            Err(TransitionError::CondFailed)
        );
        assert_eq!(
            table.resolve(ON, &Event::from("nowhere")),
            Err(TransitionError::Noop)
        );
    }

    #[test]
    fn finds_unreachable_states() {
        let config = toggle()
            .state(StateConfig::new(BROKEN).on(On::to("recover", OFF)))
            .state(StateConfig::new(State(4)).timeout(Timeout::to(Duration::from_secs(1), BROKEN)));
        let table = TransitionTable::build(&config).unwrap();
        assert_eq!(table.unreachable_states(), vec![BROKEN, State(4)]);

        let table = TransitionTable::build(&toggle()).unwrap();
        assert!(table.unreachable_states().is_empty());
    }
}
