//! Lock-free progress and cancellation shared with background tasks

use crate::error::{MikrError, Result};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Phase progress in `[0, 1]`, written by the task and read by the UI.
///
/// Stored as `f32` bits; for non-negative floats the bit patterns order the
/// same way as the values, so `fetch_max` keeps the fraction monotonic.
#[derive(Debug, Clone, Default)]
pub struct Progress(Arc<AtomicU32>);

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Back to zero at phase start
    pub fn reset(&self) {
        self.0.store(0.0f32.to_bits(), Ordering::Relaxed);
    }

    /// Record `done` of `total` items; never moves backwards
    pub fn advance(&self, done: usize, total: usize) {
        let fraction = if total == 0 {
            1.0
        } else {
            (done as f32 / total as f32).clamp(0.0, 1.0)
        };
        self.0.fetch_max(fraction.to_bits(), Ordering::Relaxed);
    }

    pub fn complete(&self) {
        self.0.store(1.0f32.to_bits(), Ordering::Relaxed);
    }
}

/// Cooperative cancellation flag checked between steps
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancelled
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MikrError::Cancelled)
        } else {
            Ok(())
        }
    }
}
