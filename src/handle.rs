//! Caller-facing handle and task types.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use tokio_timed_fsm_core::{Event, State};

use crate::error::{SendError, TaskError};
use crate::machine::Command;

/// Shutdown mode for the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Graceful shutdown: The dispatcher applies every event already queued
    /// before terminating. A pending timeout is dropped.
    Graceful,
    /// Immediate shutdown: The dispatcher terminates immediately, dropping
    /// queued events and any pending timeout. Senders of dropped events get
    /// [`SendError::Closed`].
    Immediate,
}

/// Cloneable handle to a running [`Machine`](crate::Machine).
///
/// The machine stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct MachineHandle {
    commands: mpsc::Sender<Command>,
    state_rx: watch::Receiver<State>,
    shutdown_tx: Arc<watch::Sender<Option<ShutdownMode>>>,
}

impl MachineHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        state_rx: watch::Receiver<State>,
        shutdown_tx: Arc<watch::Sender<Option<ShutdownMode>>>,
    ) -> Self {
        Self {
            commands,
            state_rx,
            shutdown_tx,
        }
    }

    /// Dispatches an event and waits for its outcome.
    ///
    /// On success the new state is already visible through
    /// [`state`](Self::state) and the state-changed observer has run. Events
    /// that do not apply return [`TransitionError::Noop`] or
    /// [`TransitionError::CondFailed`] wrapped in [`SendError::Transition`].
    ///
    /// [`TransitionError::Noop`]: tokio_timed_fsm_core::TransitionError::Noop
    /// [`TransitionError::CondFailed`]: tokio_timed_fsm_core::TransitionError::CondFailed
    pub async fn send(&self, event: impl Into<Event>) -> Result<(), SendError> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::Dispatch {
                event: event.into(),
                reply,
            })
            .await
            .map_err(|_| SendError::Closed)?;

        outcome.await.map_err(|_| SendError::Closed)?.map_err(SendError::from)
    }

    /// Returns the current state.
    pub fn state(&self) -> State {
        *self.state_rx.borrow()
    }

    /// Returns a receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<State> {
        self.state_rx.clone()
    }

    /// Waits for the machine to reach the specified state.
    pub async fn wait_for_state(&self, target: State) -> Result<(), watch::error::RecvError> {
        let mut rx = self.state_rx.clone();
        rx.wait_for(|state| *state == target).await.map(|_| ())
    }

    /// Returns `true` once the dispatcher has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Initiates a graceful shutdown. Applies queued events before exiting.
    pub fn shutdown_graceful(&self) {
        let _ = self.shutdown_tx.send(Some(ShutdownMode::Graceful));
    }

    /// Initiates an immediate shutdown. Drops queued events.
    pub fn shutdown_immediate(&self) {
        let _ = self.shutdown_tx.send(Some(ShutdownMode::Immediate));
    }
}

/// The dispatcher task. Resolves to the final state once the machine stops.
#[derive(Debug)]
pub struct MachineTask {
    handle: JoinHandle<State>,
}

impl MachineTask {
    pub(crate) fn new(handle: JoinHandle<State>) -> Self {
        Self { handle }
    }

    /// Aborts the dispatcher without draining queued events.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Future for MachineTask {
    type Output = Result<State, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map_err(TaskError::from)
    }
}
