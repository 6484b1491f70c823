//! Phases and the transition table

use crate::error::{MikrError, Result};
use std::fmt;

/// One stage of ingestion, in lifecycle order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Inited,
    Started,
    Loaded,
    Transferred,
    Created,
    Stopped,
}

impl Phase {
    /// Every phase, in lifecycle order
    pub const ALL: [Phase; 6] = [
        Phase::Inited,
        Phase::Started,
        Phase::Loaded,
        Phase::Transferred,
        Phase::Created,
        Phase::Stopped,
    ];

    /// Settled state a request for this phase must be made from
    pub fn prerequisite(self) -> Option<Phase> {
        match self {
            Phase::Inited => None,
            Phase::Started => Some(Phase::Inited),
            Phase::Loaded => Some(Phase::Started),
            Phase::Transferred => Some(Phase::Loaded),
            Phase::Created => Some(Phase::Transferred),
            Phase::Stopped => Some(Phase::Inited),
        }
    }

    /// Whether entering this phase runs a background task
    pub fn has_task(self) -> bool {
        matches!(
            self,
            Phase::Started | Phase::Loaded | Phase::Transferred | Phase::Created
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Inited => "INITED",
            Phase::Started => "STARTED",
            Phase::Loaded => "LOADED",
            Phase::Transferred => "TRANSFERRED",
            Phase::Created => "CREATED",
            Phase::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestState {
    /// No task running; the phase has completed
    Settled(Phase),
    /// The phase's background task is running
    Active(Phase),
}

impl Default for IngestState {
    fn default() -> Self {
        IngestState::Settled(Phase::Inited)
    }
}

impl IngestState {
    pub fn phase(self) -> Phase {
        match self {
            IngestState::Settled(phase) | IngestState::Active(phase) => phase,
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, IngestState::Active(_))
    }

    /// Accept `requested` only from the settled state preceding it
    pub fn check_transition(self, requested: Phase) -> Result<()> {
        match self {
            IngestState::Settled(current) if requested.prerequisite() == Some(current) => Ok(()),
            _ => Err(MikrError::PhaseSequence {
                requested,
                current: self,
            }),
        }
    }
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestState::Settled(phase) => write!(f, "{}", phase),
            IngestState::Active(phase) => write!(f, "{}_ACTIVE", phase),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        for current in Phase::ALL {
            for requested in Phase::ALL {
                let accepted = IngestState::Settled(current)
                    .check_transition(requested)
                    .is_ok();
                assert_eq!(
                    accepted,
                    requested.prerequisite() == Some(current),
                    "{} -> {}",
                    current,
                    requested
                );
            }
        }
    }

    #[test]
    fn test_active_state_rejects_everything() {
        for active in Phase::ALL {
            for requested in Phase::ALL {
                let err = IngestState::Active(active)
                    .check_transition(requested)
                    .unwrap_err();
                assert!(matches!(err, MikrError::PhaseSequence { .. }));
            }
        }
    }

    #[test]
    fn test_stop_only_from_inited() {
        assert!(IngestState::Settled(Phase::Inited)
            .check_transition(Phase::Stopped)
            .is_ok());
        assert!(IngestState::Settled(Phase::Created)
            .check_transition(Phase::Stopped)
            .is_err());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(IngestState::Settled(Phase::Loaded).to_string(), "LOADED");
        assert_eq!(
            IngestState::Active(Phase::Transferred).to_string(),
            "TRANSFERRED_ACTIVE"
        );
    }
}
