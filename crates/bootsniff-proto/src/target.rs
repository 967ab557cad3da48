//! Machine state and boot goals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Believed condition of the machine under test.
///
/// Owned by the system controller. The sniff loop only ever writes
/// `UnknownBad` and asks for transitions toward a goal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    /// Nothing is known yet.
    #[default]
    Unknown,
    /// The machine may be in a contaminated state; later checks must recover first.
    UnknownBad,
    /// Chassis power is off.
    Off,
    /// Booted to the firmware shell (petitboot).
    FirmwareShell,
    /// Booted to the host operating system.
    Os,
}

impl TargetState {
    /// Returns the snake_case name used in config files and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetState::Unknown => "unknown",
            TargetState::UnknownBad => "unknown_bad",
            TargetState::Off => "off",
            TargetState::FirmwareShell => "firmware_shell",
            TargetState::Os => "os",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a sniff session is trying to boot into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootTarget {
    /// Boot through to the host OS (no boot device override).
    Os,
    /// Stop in the firmware shell (setup boot device override).
    FirmwareShell,
}

impl BootTarget {
    /// The target state to drive toward once the boot has settled.
    pub fn goal_state(self) -> TargetState {
        match self {
            BootTarget::Os => TargetState::Os,
            BootTarget::FirmwareShell => TargetState::FirmwareShell,
        }
    }
}

impl fmt::Display for BootTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootTarget::Os => write!(f, "host OS"),
            BootTarget::FirmwareShell => write!(f, "firmware shell"),
        }
    }
}
