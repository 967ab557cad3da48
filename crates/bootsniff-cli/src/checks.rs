//! Checks, suites and their results.

use bootsniff_adapters::BmcType;
use bootsniff_core::{BootCheck, SniffConfig};
use bootsniff_proto::{BootTarget, Console, SystemControl};
use clap::ValueEnum;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const SIMULATED_SKIP_REASON: &str = "simulated target, skipping boot sniff";

/// A single boot sniff check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CheckKind {
    /// Boot to the firmware shell
    FirmwareShell,
    /// Boot to the host OS
    Host,
}

impl CheckKind {
    pub fn id(self) -> &'static str {
        match self {
            CheckKind::FirmwareShell => "firmware-shell",
            CheckKind::Host => "host",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CheckKind::FirmwareShell => "Sniff boot to the firmware shell for errors",
            CheckKind::Host => "Sniff boot to the host OS for errors",
        }
    }

    pub fn target(self) -> BootTarget {
        match self {
            CheckKind::FirmwareShell => BootTarget::FirmwareShell,
            CheckKind::Host => BootTarget::Os,
        }
    }
}

/// A named list of checks run in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Suite {
    Host,
    HostFull,
    Skiroot,
    SkirootFull,
}

impl Suite {
    pub fn checks(self) -> &'static [CheckKind] {
        match self {
            Suite::Host | Suite::HostFull => &[CheckKind::Host],
            Suite::Skiroot | Suite::SkirootFull => &[CheckKind::FirmwareShell],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    /// The machine misbehaved while booting.
    Failed,
    /// The check could not run properly (console, BMC or config trouble).
    Errored,
    Skipped,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckStatus::Passed => "PASS",
            CheckStatus::Failed => "FAIL",
            CheckStatus::Errored => "ERROR",
            CheckStatus::Skipped => "SKIP",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub check_id: String,
    pub description: String,
    pub status: CheckStatus,
    pub message: String,
    #[serde(rename = "duration_secs", serialize_with = "secs")]
    pub duration: Duration,
}

impl CheckResult {
    fn new(check: CheckKind, status: CheckStatus, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            check_id: check.id().to_string(),
            description: check.description().to_string(),
            status,
            message: message.into(),
            duration,
        }
    }

    pub fn is_bad(&self) -> bool {
        matches!(self.status, CheckStatus::Failed | CheckStatus::Errored)
    }
}

fn secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Why checks cannot run against this kind of target, if they cannot.
pub fn skip_reason(bmc_type: BmcType) -> Option<&'static str> {
    bmc_type.is_simulated().then_some(SIMULATED_SKIP_REASON)
}

pub fn skip_all(checks: &[CheckKind], reason: &str) -> Vec<CheckResult> {
    checks
        .iter()
        .map(|&check| {
            info!(check = check.id(), reason, "Skipping check");
            CheckResult::new(check, CheckStatus::Skipped, reason, Duration::ZERO)
        })
        .collect()
}

/// Runs `checks` in order. A failing check does not stop the ones after it.
pub fn run_checks(
    checks: &[CheckKind],
    sniff: &SniffConfig,
    system: &mut dyn SystemControl,
    console: &mut dyn Console,
) -> Vec<CheckResult> {
    checks
        .iter()
        .map(|&check| run_check(check, sniff, system, console))
        .collect()
}

fn run_check(
    check: CheckKind,
    sniff: &SniffConfig,
    system: &mut dyn SystemControl,
    console: &mut dyn Console,
) -> CheckResult {
    info!(check = check.id(), "Running check");
    let start = Instant::now();

    let outcome = BootCheck::new(sniff.clone())
        .and_then(|mut boot| boot.check(check.target(), system, console));

    let elapsed = start.elapsed();
    match outcome {
        Ok(()) => CheckResult::new(
            check,
            CheckStatus::Passed,
            format!("boot settled and reached the {}", check.target()),
            elapsed,
        ),
        Err(e) if e.is_failure() => {
            warn!(check = check.id(), error = %e, "Check failed");
            CheckResult::new(check, CheckStatus::Failed, e.to_string(), elapsed)
        }
        Err(e) => {
            warn!(check = check.id(), error = %e, "Check errored");
            CheckResult::new(check, CheckStatus::Errored, e.to_string(), elapsed)
        }
    }
}
