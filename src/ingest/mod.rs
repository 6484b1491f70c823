//! Ingestion state machine
//!
//! Ingestion runs through `INITED → STARTED → LOADED → TRANSFERRED → CREATED`.
//! Each step is requested from the UI thread, runs as a background task while
//! the state reads `*_ACTIVE`, and settles once [`IngestSession::pump`]
//! collects the result. `STOPPED` is only reachable from `INITED`.
//!
//! # Threads
//!
//! - The session and every [`SceneApi`](crate::scene::SceneApi) call live on
//!   the mutation thread.
//! - Producer I/O happens only on the phase task threads.
//! - Progress and cancellation are the only state shared lock-free; the create
//!   phase synchronises through the [`handoff`](crate::handoff) baton.

pub mod phase;
pub mod progress;
pub mod session;
pub mod worker;

pub use phase::{IngestState, Phase};
pub use progress::{CancelToken, Progress};
pub use session::{IngestSession, PhaseEvent};
