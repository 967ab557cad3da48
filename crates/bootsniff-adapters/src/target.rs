//! The `target:` configuration section: how to reach the machine under test.

use bootsniff_proto::{BootTarget, PatternSet, TargetState};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AdapterError;

/// Kind of management controller in front of the machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BmcType {
    #[default]
    Ipmi,
    Openbmc,
    Fsp,
    Qemu,
    Mambo,
}

impl BmcType {
    /// Simulators have no real firmware boot worth sniffing.
    pub fn is_simulated(self) -> bool {
        matches!(self, BmcType::Qemu | BmcType::Mambo)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BmcType::Ipmi => "ipmi",
            BmcType::Openbmc => "openbmc",
            BmcType::Fsp => "fsp",
            BmcType::Qemu => "qemu",
            BmcType::Mambo => "mambo",
        }
    }
}

/// Program attached to the serial-over-LAN console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ConsoleCommand {
    fn default() -> Self {
        Self {
            program: "ipmitool".to_string(),
            args: ["-I", "lanplus", "sol", "activate"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Shell commands for chassis power.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerCommands {
    pub off: String,
    pub on: String,
    pub status: String,
    /// Regex the `status` output must match for the chassis to count as off.
    pub standby_pattern: String,
    pub poll_interval_secs: u64,
}

impl Default for PowerCommands {
    fn default() -> Self {
        Self {
            off: "ipmitool -I lanplus chassis power off".to_string(),
            on: "ipmitool -I lanplus chassis power on".to_string(),
            status: "ipmitool -I lanplus chassis power status".to_string(),
            standby_pattern: "Chassis Power is off".to_string(),
            poll_interval_secs: 5,
        }
    }
}

impl PowerCommands {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Shell commands selecting the next boot path. An empty command is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootOverrideCommands {
    /// Clears any override so the machine boots through to the host OS.
    pub none: String,
    /// Stops the boot in the firmware shell.
    pub setup: String,
}

impl Default for BootOverrideCommands {
    fn default() -> Self {
        Self {
            none: "ipmitool -I lanplus chassis bootdev none".to_string(),
            setup: "ipmitool -I lanplus chassis bootdev bios".to_string(),
        }
    }
}

impl BootOverrideCommands {
    pub fn for_target(&self, target: BootTarget) -> &str {
        match target {
            BootTarget::Os => &self.none,
            BootTarget::FirmwareShell => &self.setup,
        }
    }
}

/// Prompts proving the machine reached a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub os: String,
    pub firmware_shell: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            os: "login: ".to_string(),
            firmware_shell: "Petitboot|/ # ".to_string(),
        }
    }
}

impl Prompts {
    pub fn for_state(&self, state: TargetState) -> Option<&str> {
        match state {
            TargetState::Os => Some(&self.os),
            TargetState::FirmwareShell => Some(&self.firmware_shell),
            _ => None,
        }
    }
}

/// The `target:` section of `bootsniff.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub bmc_type: BmcType,
    pub console: ConsoleCommand,
    pub power: PowerCommands,
    /// Dumps the BMC system event log. Empty to skip.
    pub event_log: String,
    pub boot_override: BootOverrideCommands,
    pub prompts: Prompts,
    pub goto_timeout_secs: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            bmc_type: BmcType::default(),
            console: ConsoleCommand::default(),
            power: PowerCommands::default(),
            event_log: "ipmitool -I lanplus sel elist".to_string(),
            boot_override: BootOverrideCommands::default(),
            prompts: Prompts::default(),
            goto_timeout_secs: 600,
        }
    }
}

impl TargetConfig {
    pub fn goto_timeout(&self) -> Duration {
        Duration::from_secs(self.goto_timeout_secs)
    }

    /// Checks that commands are present and patterns compile.
    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.console.program.trim().is_empty() {
            return Err(AdapterError::Invalid(
                "target.console.program must not be empty".to_string(),
            ));
        }
        for (field, command) in [
            ("power.off", &self.power.off),
            ("power.on", &self.power.on),
            ("power.status", &self.power.status),
        ] {
            if command.trim().is_empty() {
                return Err(AdapterError::Invalid(format!(
                    "target.{field} must not be empty"
                )));
            }
        }

        Regex::new(&self.power.standby_pattern).map_err(|source| AdapterError::Pattern {
            field: "power.standby_pattern",
            source,
        })?;
        self.prompt_set(TargetState::Os)?;
        self.prompt_set(TargetState::FirmwareShell)?;
        Ok(())
    }

    /// Pattern set waiting for the prompt of `state`, if the state has one.
    pub fn prompt_set(&self, state: TargetState) -> Result<Option<PatternSet>, AdapterError> {
        let Some(prompt) = self.prompts.for_state(state) else {
            return Ok(None);
        };
        let field = match state {
            TargetState::FirmwareShell => "prompts.firmware_shell",
            _ => "prompts.os",
        };
        PatternSet::new([prompt])
            .map(Some)
            .map_err(|source| AdapterError::Pattern { field, source })
    }
}
