//! Error types for sniff sessions.

use bootsniff_proto::{ConsoleError, ControlError, TransitionError};
use std::fmt;
use thiserror::Error;

use crate::config::ConfigError;

/// Which fatal signature ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    Assertion,
    DebugMonitor,
    ErrorShutdown,
}

impl fmt::Display for FatalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalKind::Assertion => write!(f, "firmware assert"),
            FatalKind::DebugMonitor => write!(f, "debug monitor entered"),
            FatalKind::ErrorShutdown => write!(f, "error shutdown"),
        }
    }
}

/// An unrecoverable boot anomaly.
///
/// By the time one of these exists the target has been marked unknown/bad
/// and the event log has been dumped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FatalBootError {
    pub kind: FatalKind,
    pub message: String,
}

impl FatalBootError {
    pub fn new(kind: FatalKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Why a sniff session (or the check wrapping it) did not succeed.
#[derive(Debug, Error)]
pub enum SniffError {
    /// Power off could not be confirmed; never retried.
    #[error("unable to confirm power off from wait_for_standby, needs investigation, rc={rc}")]
    Confirmation { rc: i32 },

    #[error("boot sniff handler encountered a failure which needs investigation\n{0}")]
    Fatal(#[from] FatalBootError),

    #[error("reached the limit on how many errors detected during boot: \"{threshold}\"\n{evidence}")]
    BudgetExhausted { threshold: u32, evidence: String },

    /// The boot settled but the machine could not be driven to the goal state.
    #[error("boot check encountered a failure which needs investigation\n{0}")]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Console(#[from] ConsoleError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SniffError {
    /// True for boot-content failures; false for infrastructure errors that
    /// say nothing about the firmware under test.
    pub fn is_failure(&self) -> bool {
        match self {
            SniffError::Confirmation { .. }
            | SniffError::Fatal(_)
            | SniffError::BudgetExhausted { .. }
            | SniffError::Transition(_) => true,
            SniffError::Console(_) | SniffError::Control(_) | SniffError::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootsniff_proto::TargetState;

    #[test]
    fn test_failure_classification() {
        assert!(SniffError::Confirmation { rc: 1 }.is_failure());
        assert!(SniffError::from(FatalBootError::new(FatalKind::Assertion, "x")).is_failure());
        assert!(
            SniffError::BudgetExhausted {
                threshold: 3,
                evidence: String::new()
            }
            .is_failure()
        );
        assert!(SniffError::from(TransitionError::new(TargetState::Os, "x")).is_failure());
        assert!(!SniffError::from(ConsoleError::NotConnected).is_failure());
        assert!(!SniffError::from(ControlError::Unsupported("x".into())).is_failure());
    }

    #[test]
    fn test_budget_message_lists_threshold_and_evidence() {
        let err = SniffError::BudgetExhausted {
            threshold: 3,
            evidence: "Snippet #1\nboom".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"3\""));
        assert!(msg.ends_with("Snippet #1\nboom"));
    }

    #[test]
    fn test_fatal_message_carries_kind() {
        let err = SniffError::from(FatalBootError::new(FatalKind::ErrorShutdown, "value=x"));
        assert!(err.to_string().contains("error shutdown: value=x"));
    }
}
