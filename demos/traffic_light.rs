//! Example: traffic light driven purely by state timeouts.
//!
//! Run with `RUST_LOG=tokio_timed_fsm=debug` to see every transition.

use std::time::Duration;

use tokio_timed_fsm::{Config, Machine, On, State, StateConfig, Timeout};
use tracing_subscriber::EnvFilter;

const RED: State = State(1);
const YELLOW: State = State(2);
const GREEN: State = State(3);

fn name(state: State) -> &'static str {
    match state {
        RED => "red",
        YELLOW => "yellow",
        GREEN => "green",
        _ => "unknown",
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::new(RED)
        .state(
            StateConfig::new(RED)
                .timeout(Timeout::to(Duration::from_millis(500), GREEN))
                .on(On::to("toggle", GREEN)),
        )
        .state(
            StateConfig::new(YELLOW)
                .timeout(Timeout::to(Duration::from_millis(500), RED))
                .on(On::to("toggle", RED)),
        )
        .state(
            StateConfig::new(GREEN)
                .timeout(Timeout::to(Duration::from_millis(500), YELLOW))
                .on(On::to("toggle", YELLOW)),
        )
        .on_state_changed(|prev, next| println!("{} -> {}", name(prev), name(next)));

    let (handle, task) = Machine::spawn(config).expect("valid traffic light config");

    tokio::time::sleep(Duration::from_millis(1700)).await;

    // Skip the rest of the current phase.
    handle.send("toggle").await.expect("toggle applies in every state");
    tokio::time::sleep(Duration::from_millis(200)).await;

    handle.shutdown_graceful();
    let last = task.await.expect("machine task");
    println!("stopped in {}", name(last));
}
