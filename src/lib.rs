//! # mikr-rs: Time-Varying Volume Ingestion
//!
//! Pulls a time-varying unstructured volume dataset out of an external
//! producer process and turns it, one timestep at a time, into scene objects
//! of a host visualization application.
//!
//! ## Architecture
//!
//! - **Protocol**: Count/length-prefixed frames over the producer's stdin/stdout
//! - **Co-process**: Spawns the producer and runs blocking request/response exchanges
//! - **Ingest**: Phase state machine with background tasks and lock-free progress
//! - **Handoff**: Baton passing so scene objects are built only on the mutation thread
//! - **Playback**: Fixed-rate animation clock gated on the renderer's frames
//!
//! ## Configuration
//!
//! Settings are read from TOML in the platform-appropriate config directory
//! under `dev.mikr.mikr-rs` (see [`config`]).
//!
//! ## Example
//!
//! ```ignore
//! use mikr_rs::{config::AppConfig, ingest::{IngestSession, Phase}, scene::SceneArena};
//!
//! let config = AppConfig::load_or_default("mikr.toml");
//! let mut session = IngestSession::new(&config);
//! let mut scene = SceneArena::new();
//!
//! for phase in [Phase::Started, Phase::Loaded, Phase::Transferred, Phase::Created] {
//!     session.drive(phase, &mut scene)?;
//! }
//! session.clock_mut().play(std::time::Instant::now());
//! loop {
//!     session.pump(&mut scene)?;
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod coprocess;
pub mod error;
pub mod handoff;
pub mod ingest;
pub mod playback;
pub mod protocol;
pub mod scene;

// Re-export commonly used types
pub use catalog::{Catalog, ScalarRange, Timestep, VolumeBuffers};
pub use config::AppConfig;
pub use coprocess::{CoProcess, Launcher, Producer};
pub use error::{MikrError, Result};
pub use ingest::{IngestSession, IngestState, Phase, PhaseEvent};
pub use playback::{AnimationClock, PlaybackMode, StepCommand};
pub use scene::{SceneApi, SceneArena, WorldMode};
