//! Configuration model and transition table builder for tokio-timed-fsm.
//!
//! This crate is runtime-agnostic: it describes a machine and compiles the
//! description into a [`TransitionTable`]. The `tokio-timed-fsm` crate drives
//! that table on a Tokio task.

mod config;
mod error;
mod table;
mod types;

pub use config::{
    Config, DEFAULT_CHANNEL_SIZE, On, StateChanged, StateConfig, TargetValidation, Timeout,
};
pub use error::{BuildError, TransitionError};
pub use table::{StateDescriptor, TransitionDescriptor, TransitionTable};
pub use types::{Condition, Event, State, Target, select_target};
