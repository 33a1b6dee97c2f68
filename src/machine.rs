//! The dispatcher: owns the current state and the pending timeout.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

use tokio_timed_fsm_core::{
    Config, Event, State, StateChanged, TransitionError, TransitionTable, select_target,
};

use crate::error::SpawnError;
use crate::handle::{MachineHandle, MachineTask, ShutdownMode};
use crate::timer::TimeoutSlot;

/// Request sent from a [`MachineHandle`] to the dispatcher.
#[derive(Debug)]
pub(crate) enum Command {
    Dispatch {
        event: Event,
        reply: oneshot::Sender<Result<(), TransitionError>>,
    },
}

/// A running state machine.
///
/// All mutation happens on one Tokio task: explicit events and timer expiry
/// are both inputs to the same loop and are applied one at a time, so a
/// transition is never observed half-applied and a superseded timer never
/// overwrites a newer state. Interact with it through the [`MachineHandle`]
/// returned by [`Machine::spawn`].
pub struct Machine {
    table: TransitionTable,
    current: State,
    /// Bumped on every committed transition; tags the armed timeout.
    generation: u64,
    timer: TimeoutSlot,
    observer: Option<StateChanged>,
    state_tx: watch::Sender<State>,
}

impl Machine {
    /// Validates `config`, settles into the initial state and starts the
    /// dispatcher task.
    ///
    /// The initial settle is processed like any other transition: the
    /// observer sees `(State::UNSET, initial)` before this returns and the
    /// initial state's timeout, if any, is armed.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(config: Config) -> Result<(MachineHandle, MachineTask), SpawnError> {
        let (machine, state_rx) = Self::settle(&config)?;

        let (command_tx, command_rx) = mpsc::channel(config.channel_size.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(None);

        let join = tokio::spawn(machine.run(command_rx, shutdown_rx));

        Ok((
            MachineHandle::new(command_tx, state_rx, Arc::new(shutdown_tx)),
            MachineTask::new(join),
        ))
    }

    /// Builds the table and processes the initial state.
    fn settle(config: &Config) -> Result<(Self, watch::Receiver<State>), SpawnError> {
        let table = TransitionTable::build(config)?;

        let unreachable = table.unreachable_states();
        if !unreachable.is_empty() {
            warn!(
                ?unreachable,
                initial = %table.initial(),
                "states unreachable from initial state"
            );
        }
        debug!(states = ?table.states(), initial = %table.initial(), "transition table built");

        let initial = table.initial();
        let (state_tx, state_rx) = watch::channel(State::UNSET);
        let mut machine = Self {
            table,
            current: State::UNSET,
            generation: 0,
            timer: TimeoutSlot::new(),
            observer: config.state_changed.clone(),
            state_tx,
        };
        machine.process(initial)?;

        Ok((machine, state_rx))
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut shutdown: watch::Receiver<Option<ShutdownMode>>,
    ) -> State {
        while self.step(&mut commands, &mut shutdown).await {}

        self.timer.cancel();
        self.current
    }

    /// Applies one input. Returns `false` once the machine should stop.
    ///
    /// A due timeout is taken before a queued event, so the event applies on
    /// top of the timeout's transition.
    async fn step(
        &mut self,
        commands: &mut mpsc::Receiver<Command>,
        shutdown: &mut watch::Receiver<Option<ShutdownMode>>,
    ) -> bool {
        tokio::select! {
            biased;

            Ok(()) = shutdown.changed() => {
                let mode = *shutdown.borrow();
                match mode {
                    Some(ShutdownMode::Immediate) => {
                        info!(state = %self.current, "machine shut down immediately");
                        false
                    }
                    Some(ShutdownMode::Graceful) => {
                        while let Ok(command) = commands.try_recv() {
                            self.handle(command);
                        }
                        info!(state = %self.current, "machine shut down gracefully");
                        false
                    }
                    None => true,
                }
            }
            generation = self.timer.expired() => {
                self.on_timeout(generation);
                true
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!(state = %self.current, "all handles dropped, stopping machine");
                    return false;
                };
                self.handle(command);
                true
            }
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Dispatch { event, reply } => {
                let result = self.dispatch(&event);
                // The sender may have stopped waiting; the transition stands.
                let _ = reply.send(result);
            }
        }
    }

    fn dispatch(&mut self, event: &Event) -> Result<(), TransitionError> {
        let next = self.table.resolve(self.current, event).inspect_err(|err| {
            trace!(
                state = %self.current,
                %event,
                %err,
                accepted = ?self.table.events_for(self.current),
                "event not applied"
            );
        })?;
        self.process(next)
    }

    /// Enters `target`: cancel the pending timeout, commit, arm the new
    /// state's timeout, notify the observer.
    ///
    /// On `StateNotFound` the current state is unchanged.
    fn process(&mut self, target: State) -> Result<(), TransitionError> {
        self.timer.cancel();

        let Some(descriptor) = self.table.descriptor(target) else {
            return Err(TransitionError::StateNotFound(target));
        };

        let previous = self.current;
        self.current = target;
        self.generation += 1;
        self.state_tx.send_replace(target);
        debug!(from = %previous, to = %target, generation = self.generation, "state changed");

        if let Some(timeout) = &descriptor.timeout {
            self.timer.arm(timeout.duration, self.generation);
            trace!(state = %target, duration = ?timeout.duration, "timeout armed");
        }

        if let Some(observer) = &self.observer {
            observer(previous, target);
        }

        Ok(())
    }

    /// Applies the current state's timeout.
    ///
    /// `process` disarms the slot before re-arming it, so a stale generation
    /// is not expected here; the check keeps a timer from a state that has
    /// been left from ever committing.
    fn on_timeout(&mut self, generation: u64) {
        if generation != self.generation {
            trace!(generation, current = self.generation, "discarding stale timeout");
            return;
        }

        let Some(timeout) = self
            .table
            .descriptor(self.current)
            .and_then(|descriptor| descriptor.timeout.as_ref())
        else {
            return;
        };

        let Some(next) = select_target(&timeout.targets) else {
            trace!(state = %self.current, "timeout fired with no qualifying target");
            return;
        };

        if let Err(err) = self.process(next) {
            warn!(state = %self.current, target = %next, %err, "timeout transition failed");
        }
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("current", &self.current)
            .field("generation", &self.generation)
            .field("timeout_armed", &self.timer.is_armed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio_timed_fsm_core::{On, StateConfig, Timeout};

    use super::*;

    const WAITING: State = State(1);
    const EXPIRED: State = State(2);
    const RETRIED: State = State(3);
    const HANDLED: State = State(4);

    fn recorded(config: Config) -> (Machine, Arc<Mutex<Vec<(State, State)>>>) {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&changes);
        let config = config.on_state_changed(move |prev, next| {
            sink.lock().unwrap().push((prev, next));
        });
        let (machine, _state_rx) = Machine::settle(&config).unwrap();
        (machine, changes)
    }

    fn expiring_config() -> Config {
        Config::new(WAITING)
            .state(
                StateConfig::new(WAITING)
                    .timeout(Timeout::to(Duration::from_secs(1), EXPIRED))
                    .on(On::to("go", HANDLED)),
            )
            .state(StateConfig::new(EXPIRED).on(On::to("go", RETRIED)))
            .state(StateConfig::new(RETRIED))
            .state(StateConfig::new(HANDLED))
    }

    #[tokio::test(start_paused = true)]
    async fn due_timeout_applies_before_queued_event() {
        let (mut machine, changes) = recorded(expiring_config());
        let (command_tx, mut commands) = mpsc::channel(8);
        let (_shutdown_tx, mut shutdown) = watch::channel(None);

        let (reply, outcome) = oneshot::channel();
        command_tx
            .try_send(Command::Dispatch {
                event: Event::from("go"),
                reply,
            })
            .unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(machine.step(&mut commands, &mut shutdown).await);
        assert_eq!(machine.current, EXPIRED);

        assert!(machine.step(&mut commands, &mut shutdown).await);
        assert_eq!(outcome.await.unwrap(), Ok(()));
        assert_eq!(
            *changes.lock().unwrap(),
            vec![
                (State::UNSET, WAITING),
                (WAITING, EXPIRED),
                (EXPIRED, RETRIED),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_is_discarded() {
        let (mut machine, changes) = recorded(expiring_config());
        let settled = machine.generation;

        machine.on_timeout(settled - 1);
        assert_eq!(machine.current, WAITING);
        assert_eq!(machine.generation, settled);

        machine.on_timeout(settled);
        assert_eq!(machine.current, EXPIRED);
        assert_eq!(
            *changes.lock().unwrap(),
            vec![(State::UNSET, WAITING), (WAITING, EXPIRED)]
        );
    }

    #[tokio::test]
    async fn step_stops_when_handles_are_gone() {
        let (mut machine, _changes) = recorded(expiring_config());
        let (command_tx, mut commands) = mpsc::channel::<Command>(1);
        let (shutdown_tx, mut shutdown) = watch::channel(None);
        drop(command_tx);
        drop(shutdown_tx);

        assert!(!machine.step(&mut commands, &mut shutdown).await);
        assert_eq!(machine.current, WAITING);
    }
}
