//! Shared test helpers for link tests.

#![allow(dead_code)]

use fallguard_link::{SessionManager, SessionState};
use fallguard_types::Caregiver;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(2);

/// Installs a test log subscriber once. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn caregiver(name: &str) -> Caregiver {
    Caregiver::new(name, "+15550100", true).unwrap()
}

/// Waits until the session reports `target`.
pub async fn wait_for_state(session: &SessionManager, target: SessionState) {
    let mut rx = session.watch_state();
    tokio::time::timeout(WAIT, rx.wait_for(|state| *state == target))
        .await
        .unwrap_or_else(|_| panic!("session never reached {target:?}"))
        .unwrap();
}

/// Polls `condition` until it holds.
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never became true");
}
