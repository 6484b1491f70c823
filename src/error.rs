//! Error handling for mikr-rs
//!
//! This module defines the error taxonomy shared by the codec, the co-process
//! channel, the ingestion state machine and the handoff, plus a Result alias.

use crate::ingest::{IngestState, Phase};
use std::io;
use thiserror::Error;

/// Main error type for mikr-rs operations
#[derive(Error, Debug)]
pub enum MikrError {
    /// The producer process image could not be launched
    #[error("Failed to spawn producer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Malformed frame: negative count, size mismatch, out-of-order request
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The producer stream ended before a frame was complete
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// A phase was requested from a state that does not precede it
    #[error("Cannot enter {requested} from {current}")]
    PhaseSequence {
        requested: Phase,
        current: IngestState,
    },

    /// Cooperative cancellation was observed between steps
    #[error("Phase cancelled")]
    Cancelled,

    /// The other side of the handoff did not answer within the bounded wait
    #[error("Handoff timed out waiting for {0}")]
    HandoffTimeout(&'static str),

    /// The other side of the handoff went away
    #[error("Handoff aborted: {0}")]
    HandoffAborted(&'static str),

    /// A background phase task panicked instead of returning
    #[error("Background task for {0} panicked")]
    TaskPanicked(Phase),

    /// Errors reported by the scene API
    #[error("Scene error: {0}")]
    Scene(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MikrError>,
    },
}

impl MikrError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MikrError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Map an I/O error on the producer streams.
    ///
    /// End-of-stream and broken pipes mean the producer is gone.
    pub fn from_stream(err: io::Error, what: &str) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe => {
                MikrError::ChannelClosed(format!("{}: {}", what, err))
            }
            _ => MikrError::Io(err),
        }
    }

    /// Strip any context wrappers
    pub fn root(&self) -> &MikrError {
        match self {
            MikrError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error is a phase abort rather than a malfunction.
    ///
    /// A dead producer and a cancelled phase both land here.
    pub fn is_abort(&self) -> bool {
        matches!(
            self.root(),
            MikrError::ChannelClosed(_) | MikrError::Cancelled
        )
    }
}

/// Result type alias for mikr-rs operations
pub type Result<T> = std::result::Result<T, MikrError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
