//! `SystemControl` driven by shell commands against the BMC.

use bootsniff_proto::{
    BootTarget, Console, ControlError, MatchIndex, SystemControl, TargetState, TransitionError,
};
use regex::Regex;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::AdapterError;
use crate::target::TargetConfig;

/// Status returned by `wait_for_standby` when the chassis never reported off.
const STANDBY_TIMEOUT_RC: i32 = 1;

/// Runs the commands from a `TargetConfig` and tracks the target state.
///
/// The state is bookkeeping only: it records what the caller last learned
/// about the machine, nothing here queries it back from the BMC.
pub struct CommandSystem {
    config: TargetConfig,
    standby: Regex,
    state: TargetState,
    console: Box<dyn Console>,
}

impl CommandSystem {
    /// `console` is used by `goto_state` to watch for state prompts.
    pub fn new(config: TargetConfig, console: Box<dyn Console>) -> Result<Self, AdapterError> {
        config.validate()?;
        let standby =
            Regex::new(&config.power.standby_pattern).map_err(|source| AdapterError::Pattern {
                field: "power.standby_pattern",
                source,
            })?;
        Ok(Self {
            config,
            standby,
            state: TargetState::Unknown,
            console,
        })
    }

    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    fn run(command: &str) -> Result<String, ControlError> {
        debug!(command, "Running target command");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .map_err(|source| ControlError::Spawn {
                command: command.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ControlError::CommandFailed {
                command: command.to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn chassis_off(&self) -> Result<bool, ControlError> {
        match Self::run(&self.config.power.status) {
            Ok(status) => Ok(self.standby.is_match(&status)),
            // BMCs drop status queries while the chassis is switching.
            Err(ControlError::CommandFailed { status, stderr, .. }) => {
                debug!(status, stderr = %stderr, "Power status query failed, retrying");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn wait_for_prompt(&mut self, target: TargetState) -> Result<(), TransitionError> {
        let prompts = self
            .config
            .prompt_set(target)
            .map_err(|e| TransitionError::new(target, e.to_string()))?
            .ok_or_else(|| TransitionError::new(target, "no prompt is known for this state"))?;

        let mut stream = self
            .console
            .connect()
            .map_err(|e| TransitionError::new(target, e.to_string()))?;
        // Nudge the console so a prompt printed before we attached shows again.
        stream
            .send_line("")
            .map_err(|e| TransitionError::new(target, e.to_string()))?;

        let found = stream
            .await_match(&prompts, self.config.goto_timeout())
            .map_err(|e| TransitionError::new(target, e.to_string()))?;

        match found.index {
            MatchIndex::Pattern(_) => {
                info!(state = %target, "Prompt seen");
                self.state = target;
                Ok(())
            }
            MatchIndex::Timeout => Err(TransitionError::new(
                target,
                format!(
                    "no prompt within {}s",
                    self.config.goto_timeout().as_secs()
                ),
            )),
            MatchIndex::Eof => Err(TransitionError::new(target, "console closed")),
        }
    }
}

impl SystemControl for CommandSystem {
    fn power_off(&mut self) -> Result<(), ControlError> {
        Self::run(&self.config.power.off)?;
        Ok(())
    }

    fn power_on(&mut self) -> Result<(), ControlError> {
        Self::run(&self.config.power.on)?;
        Ok(())
    }

    fn wait_for_standby(&mut self, timeout: Duration) -> Result<i32, ControlError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.chassis_off()? {
                info!("Chassis reports standby");
                return Ok(0);
            }
            let now = Instant::now();
            if now >= deadline {
                warn!(timeout_secs = timeout.as_secs(), "Chassis never reported standby");
                return Ok(STANDBY_TIMEOUT_RC);
            }
            thread::sleep(self.config.power.poll_interval().min(deadline - now));
        }
    }

    fn set_state(&mut self, state: TargetState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "Target state");
        }
        self.state = state;
    }

    fn get_state(&self) -> TargetState {
        self.state
    }

    fn goto_state(&mut self, target: TargetState) -> Result<(), TransitionError> {
        if self.state == target {
            return Ok(());
        }
        info!(from = %self.state, to = %target, "Moving target");

        match target {
            TargetState::Off => {
                self.power_off()
                    .map_err(|e| TransitionError::new(target, e.to_string()))?;
                let rc = self
                    .wait_for_standby(self.config.goto_timeout())
                    .map_err(|e| TransitionError::new(target, e.to_string()))?;
                if rc != 0 {
                    return Err(TransitionError::new(target, "chassis never reported off"));
                }
                self.state = TargetState::Off;
                Ok(())
            }
            TargetState::Os | TargetState::FirmwareShell => self.wait_for_prompt(target),
            TargetState::Unknown | TargetState::UnknownBad => Err(TransitionError::new(
                target,
                "not a state the machine can be driven to",
            )),
        }
    }

    fn dump_event_log(&mut self) -> Result<(), ControlError> {
        if self.config.event_log.trim().is_empty() {
            debug!("No event log command configured");
            return Ok(());
        }
        let log = Self::run(&self.config.event_log)?;
        info!(entries = log.lines().count(), "BMC event log");
        for line in log.lines() {
            info!("sel: {line}");
        }
        Ok(())
    }

    fn set_boot_override(&mut self, target: BootTarget) -> Result<(), ControlError> {
        let command = self.config.boot_override.for_target(target);
        if command.trim().is_empty() {
            debug!(target = %target, "No boot override command configured");
            return Ok(());
        }
        info!(target = %target, "Setting boot override");
        Self::run(command)?;
        Ok(())
    }
}
