//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use mikr_rs::ingest::{IngestSession, PhaseEvent};
use mikr_rs::scene::SceneApi;
use std::time::{Duration, Instant};

/// Upper bound for any wait in the integration tests
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Pump until the active phase reports, panicking after [`test_timeout`]
pub fn pump_until_event(session: &mut IngestSession, scene: &mut dyn SceneApi) -> PhaseEvent {
    let deadline = Instant::now() + test_timeout();
    loop {
        if let Some(event) = session.pump(scene).expect("pump failed") {
            return event;
        }
        assert!(Instant::now() < deadline, "no phase event within timeout");
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f32, b: f32, epsilon: f32) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
