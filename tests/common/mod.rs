use std::sync::{Arc, Mutex};

use tokio_timed_fsm::{Config, State};

/// Collects every `(previous, next)` pair reported by a machine.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    changes: Arc<Mutex<Vec<(State, State)>>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn attach(&self, config: Config) -> Config {
        let changes = Arc::clone(&self.changes);
        config.on_state_changed(move |prev, next| {
            changes.lock().unwrap().push((prev, next));
        })
    }

    pub fn changes(&self) -> Vec<(State, State)> {
        self.changes.lock().unwrap().clone()
    }

    /// Destination of every change, in order.
    pub fn path(&self) -> Vec<State> {
        self.changes().into_iter().map(|(_, next)| next).collect()
    }
}
