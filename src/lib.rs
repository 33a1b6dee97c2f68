//! # tokio-timed-fsm
//!
//! Table-driven finite state machines running on a Tokio task, with per-state
//! timeouts that fall back to another state when no event arrives in time.
//!
//! A [`Config`] declares the states, the events each one reacts to and an
//! optional [`Timeout`]. [`Machine::spawn`] validates it, settles into the
//! initial state and returns a [`MachineHandle`] for sending events and
//! reading the current state.
//!
//! ## Example
//!
//! ```rust
//! use tokio_timed_fsm::{Config, Machine, On, State, StateConfig};
//!
//! const ON: State = State(1);
//! const OFF: State = State(2);
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = Config::new(OFF)
//!     .state(StateConfig::new(ON).on(On::to("toggle", OFF)))
//!     .state(StateConfig::new(OFF).on(On::to("toggle", ON)));
//!
//! let (handle, _task) = Machine::spawn(config).unwrap();
//! handle.send("toggle").await.unwrap();
//! assert_eq!(handle.state(), ON);
//! # }
//! ```

mod error;
mod handle;
mod machine;
mod timer;

#[doc(inline)]
pub use crate::error::{SendError, SpawnError, TaskError};
#[doc(inline)]
pub use crate::handle::{MachineHandle, MachineTask, ShutdownMode};
#[doc(inline)]
pub use crate::machine::Machine;
#[doc(inline)]
pub use tokio_timed_fsm_core::*;
