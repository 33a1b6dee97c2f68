//! Example: peer handshake with timing-based fallbacks.
//!
//! A peer waits for a `hello`, answers, then waits for an `ack`. Each waiting
//! state falls back to `Closed` if the remote side goes silent, and the
//! established session is torn down after an idle period unless traffic
//! keeps re-entering it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio_timed_fsm::{Config, Machine, On, State, StateConfig, Target, Timeout};
use tracing_subscriber::EnvFilter;

const LISTENING: State = State(1);
const AWAITING_ACK: State = State(2);
const ESTABLISHED: State = State(3);
const CLOSED: State = State(4);

const MAX_RETRIES: u32 = 2;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let retries = Arc::new(AtomicU32::new(0));
    let attempts = Arc::clone(&retries);

    let config = Config::new(LISTENING)
        .state(
            StateConfig::new(LISTENING)
                .timeout(Timeout::to(Duration::from_secs(5), CLOSED))
                .on(On::to("hello", AWAITING_ACK)),
        )
        .state(
            StateConfig::new(AWAITING_ACK)
                .timeout(
                    Timeout::parse("300ms")
                        .expect("literal duration")
                        .target(Target::when(AWAITING_ACK, move || {
                            attempts.fetch_add(1, Ordering::SeqCst) < MAX_RETRIES
                        }))
                        .target(Target::to(CLOSED)),
                )
                .on(On::to("ack", ESTABLISHED)),
        )
        .state(
            StateConfig::new(ESTABLISHED)
                .timeout(
                    Timeout::parse("1s")
                        .expect("literal duration")
                        .target(Target::to(CLOSED)),
                )
                .on(On::to("data", ESTABLISHED))
                .on(On::to("bye", CLOSED)),
        )
        .state(StateConfig::new(CLOSED))
        .on_state_changed(|prev, next| println!("{prev} -> {next}"));

    let (handle, _task) = Machine::spawn(config).expect("valid handshake config");

    handle.send("hello").await.expect("hello accepted while listening");
    tokio::time::sleep(Duration::from_millis(450)).await;
    handle.send("ack").await.expect("ack accepted while awaiting");

    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(600)).await;
        handle.send("data").await.expect("data keeps the session alive");
    }

    handle.wait_for_state(CLOSED).await.expect("machine running");
    println!(
        "session closed after idling; ack retries used: {}",
        retries.load(Ordering::SeqCst)
    );
}
