//! Co-process channel
//!
//! This module owns the data-producing subprocess and exposes its blocking
//! request/response exchanges. The [`Producer`] trait is the seam the
//! ingestion tasks talk to, so tests can swap the real process for an
//! in-memory [`Connection`].
//!
//! # Components
//!
//! - [`Producer`]: blocking catalog/payload requests plus `stop`
//! - [`Connection`]: protocol state over any reader/writer pair
//! - [`CoProcess`]: a spawned child process wrapping a `Connection`
//! - [`Launcher`]: how the start phase obtains a producer

pub mod connection;
pub mod process;

pub use connection::Connection;
pub use process::{CoProcess, ProcessLauncher};

use crate::error::Result;
use crate::protocol::RawPayload;

/// Blocking request/response interface of a data producer.
///
/// Any error leaves the producer closed; it must be replaced, never retried.
pub trait Producer: Send {
    /// Fetch the timestep names, reporting `(fetched, total)` after each.
    ///
    /// An error from `on_name` aborts the request.
    fn request_catalog_with(
        &mut self,
        on_name: &mut dyn FnMut(usize, usize) -> Result<()>,
    ) -> Result<Vec<String>>;

    /// Fetch the timestep names
    fn request_catalog(&mut self) -> Result<Vec<String>> {
        self.request_catalog_with(&mut |_, _| Ok(()))
    }

    /// Fetch the undecoded buffers of timestep `index`
    fn request_timestep_payload(&mut self, index: usize) -> Result<RawPayload>;

    /// Ask the producer to exit and close both streams. Idempotent.
    fn stop(&mut self);

    /// Whether requests can still be issued
    fn is_open(&self) -> bool;
}

/// Source of producers for the start phase
pub trait Launcher: Send + Sync {
    fn launch(&self) -> Result<Box<dyn Producer>>;
}

impl<F> Launcher for F
where
    F: Fn() -> Result<Box<dyn Producer>> + Send + Sync,
{
    fn launch(&self) -> Result<Box<dyn Producer>> {
        self()
    }
}
