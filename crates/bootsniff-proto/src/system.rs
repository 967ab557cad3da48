//! System control collaborator: power, state tracking and event logs.

use std::time::Duration;
use thiserror::Error;

use crate::target::{BootTarget, TargetState};

/// Errors from the power/BMC side of the system controller.
#[derive(Debug, Error)]
pub enum ControlError {
    /// A control command ran but reported failure.
    #[error("command `{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// A control command could not be started at all.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The controller has no way to perform the requested action.
    #[error("unsupported control operation: {0}")]
    Unsupported(String),
}

/// The system could not be driven into the requested state.
#[derive(Debug, Error)]
#[error("failed to reach {target}: {reason}")]
pub struct TransitionError {
    pub target: TargetState,
    pub reason: String,
}

impl TransitionError {
    pub fn new(target: TargetState, reason: impl Into<String>) -> Self {
        Self {
            target,
            reason: reason.into(),
        }
    }
}

/// Operations the sniff loop needs from the machine under test.
///
/// A session holds `&mut` access for its whole duration, so no other
/// session can drive the same machine concurrently.
pub trait SystemControl {
    /// Requests chassis power off. Does not wait for confirmation.
    fn power_off(&mut self) -> Result<(), ControlError>;

    /// Requests chassis power on.
    fn power_on(&mut self) -> Result<(), ControlError>;

    /// Blocks until the machine reports standby/off, or the timeout expires.
    ///
    /// Returns a status code: `0` means standby was confirmed.
    fn wait_for_standby(&mut self, timeout: Duration) -> Result<i32, ControlError>;

    fn set_state(&mut self, state: TargetState);

    fn get_state(&self) -> TargetState;

    /// Drives the machine toward `target`.
    fn goto_state(&mut self, target: TargetState) -> Result<(), TransitionError>;

    /// Dumps the BMC system event log for human review.
    fn dump_event_log(&mut self) -> Result<(), ControlError>;

    /// Selects which firmware path the next boot takes.
    fn set_boot_override(&mut self, target: BootTarget) -> Result<(), ControlError>;
}
