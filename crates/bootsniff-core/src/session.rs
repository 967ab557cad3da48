//! Boot checks: a sniff session plus the post-boot goal state.

use bootsniff_proto::{BootTarget, Console, SystemControl};
use tracing::{debug, info};

use crate::config::SniffConfig;
use crate::error::SniffError;
use crate::signature::SignatureTable;
use crate::sniff_loop::{SniffLoop, Verdict};

/// Runs sniff sessions and drives the machine to the goal state afterwards.
///
/// A failed check leaves the machine marked unknown/bad so that later checks
/// in the same suite recover it before trusting it.
#[derive(Debug)]
pub struct BootCheck {
    sniff: SniffLoop,
}

impl BootCheck {
    /// Creates a check using the default platform signature table.
    pub fn new(config: SniffConfig) -> Result<Self, SniffError> {
        Self::with_table(config, SignatureTable::boot_defaults()?)
    }

    pub fn with_table(config: SniffConfig, table: SignatureTable) -> Result<Self, SniffError> {
        config.validate()?;
        Ok(Self {
            sniff: SniffLoop::new(config, table),
        })
    }

    pub fn sniff(&self) -> &SniffLoop {
        &self.sniff
    }

    /// Sniffs a boot to the host OS, then drives the system to the OS state.
    pub fn host_checks(
        &mut self,
        system: &mut dyn SystemControl,
        console: &mut dyn Console,
    ) -> Result<(), SniffError> {
        self.check(BootTarget::Os, system, console)
    }

    /// Sniffs a boot to the firmware shell, then drives the system there.
    pub fn firmware_shell_checks(
        &mut self,
        system: &mut dyn SystemControl,
        console: &mut dyn Console,
    ) -> Result<(), SniffError> {
        self.check(BootTarget::FirmwareShell, system, console)
    }

    pub fn check(
        &mut self,
        target: BootTarget,
        system: &mut dyn SystemControl,
        console: &mut dyn Console,
    ) -> Result<(), SniffError> {
        info!(target = %target, "Starting boot sniff checks");

        match self.sniff.run(target, system, console)? {
            Verdict::Success => {
                let goal = target.goal_state();
                debug!(goal = %goal, "Boot sniff succeeded, moving to goal state");
                system.goto_state(goal)?;
                info!(goal = %goal, "Boot sniff check passed");
                Ok(())
            }
            Verdict::BudgetExhausted => Err(SniffError::BudgetExhausted {
                threshold: self.sniff.config().threshold_attempts,
                evidence: self.sniff.snippets().evidence(),
            }),
        }
    }
}
