//! The sniff loop: retry budget, idle watermark and power-cycle recovery.
//!
//! ```text
//! Init -> PoweredOff -> Booting -> Round* -> Success | Failure
//! ```
//!
//! Each round waits once on the classifier and dispatches the result:
//! - quiet rounds (timeout, EOF, progress markers) raise the idle watermark
//!   and succeed once it is exceeded,
//! - soft errors cost one attempt and power-cycle the machine,
//! - fatal outcomes end the session immediately.

use bootsniff_proto::{BootTarget, Console, ConsoleStream, SystemControl, TargetState};
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::config::SniffConfig;
use crate::dispatch::{DispatchContext, HandlerOutcome, dispatch};
use crate::error::SniffError;
use crate::signature::SignatureTable;
use crate::snippet::SnippetLog;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffPhase {
    Init,
    PoweredOff,
    Booting,
    Round,
    Success,
    Failure,
}

/// Counters driving loop termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SniffCounters {
    /// Soft errors still tolerated.
    pub attempts_left: u32,
    /// Rounds without a soft error.
    pub idle_rounds: u32,
    /// Rounds evaluated so far.
    pub rounds: u32,
}

/// How a session that did not hit a fatal error ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The idle watermark was exceeded: the boot settled.
    Success,
    /// Every attempt was spent on soft errors.
    BudgetExhausted,
}

/// Drives one boot sniff session.
#[derive(Debug)]
pub struct SniffLoop {
    config: SniffConfig,
    classifier: Classifier,
    phase: SniffPhase,
    counters: SniffCounters,
    snippets: SnippetLog,
}

impl SniffLoop {
    pub fn new(config: SniffConfig, table: SignatureTable) -> Self {
        let counters = Self::initial_counters(&config);
        Self {
            config,
            classifier: Classifier::new(table),
            phase: SniffPhase::Init,
            counters,
            snippets: SnippetLog::new(),
        }
    }

    fn initial_counters(config: &SniffConfig) -> SniffCounters {
        SniffCounters {
            attempts_left: config.threshold_attempts,
            idle_rounds: 0,
            rounds: 0,
        }
    }

    pub fn config(&self) -> &SniffConfig {
        &self.config
    }

    pub fn phase(&self) -> SniffPhase {
        self.phase
    }

    pub fn counters(&self) -> SniffCounters {
        self.counters
    }

    pub fn snippets(&self) -> &SnippetLog {
        &self.snippets
    }

    /// Power-cycles the machine toward `target` and watches it boot.
    ///
    /// Returns `Ok` with a verdict when the loop ran to one of its bounds.
    /// Confirmation failures, fatal signatures and collaborator errors end
    /// the session with `Err`.
    pub fn run(
        &mut self,
        target: BootTarget,
        system: &mut dyn SystemControl,
        console: &mut dyn Console,
    ) -> Result<Verdict, SniffError> {
        self.phase = SniffPhase::Init;
        self.counters = Self::initial_counters(&self.config);
        self.snippets = SnippetLog::new();

        info!(
            target = %target,
            threshold_attempts = self.config.threshold_attempts,
            good_watermark = self.config.good_watermark,
            "Starting boot sniff"
        );

        let mut stream = self.power_cycle(target, system, console)?;

        while self.counters.attempts_left > 0 {
            self.enter(SniffPhase::Round);
            self.counters.rounds += 1;

            let outcome = match self.round(system, &mut *stream) {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.enter(SniffPhase::Failure);
                    return Err(e);
                }
            };

            match outcome {
                HandlerOutcome::Fatal(fatal) => {
                    warn!(round = self.counters.rounds, error = %fatal, "Fatal boot signature");
                    self.enter(SniffPhase::Failure);
                    return Err(fatal.into());
                }
                HandlerOutcome::SoftError => {
                    self.counters.attempts_left -= 1;
                    info!(
                        round = self.counters.rounds,
                        attempts_left = self.counters.attempts_left,
                        "Soft boot error, power cycling"
                    );
                    drop(stream);
                    stream = self.power_cycle(target, system, console)?;
                }
                HandlerOutcome::Observe => {
                    self.counters.idle_rounds += 1;
                    debug!(
                        idle_rounds = self.counters.idle_rounds,
                        good_watermark = self.config.good_watermark,
                        "Quiet round"
                    );
                    if self.counters.idle_rounds > self.config.good_watermark {
                        info!(
                            idle_rounds = self.counters.idle_rounds,
                            state = %system.get_state(),
                            "Watermark reached, boot settled"
                        );
                        self.enter(SniffPhase::Success);
                        return Ok(Verdict::Success);
                    }
                }
            }
        }

        warn!(
            snippets = self.snippets.len(),
            state = %system.get_state(),
            "Attempt budget exhausted"
        );
        system.set_state(TargetState::UnknownBad);
        self.enter(SniffPhase::Failure);
        Ok(Verdict::BudgetExhausted)
    }

    fn round(
        &mut self,
        system: &mut dyn SystemControl,
        stream: &mut dyn ConsoleStream,
    ) -> Result<HandlerOutcome, SniffError> {
        let event = self
            .classifier
            .evaluate(&mut *stream, self.config.round_timeout())?;
        debug!(round = self.counters.rounds, hit = ?event.hit, "Round evaluated");

        let mut ctx = DispatchContext {
            system,
            stream,
            snippets: &mut self.snippets,
            monitor: &self.config.monitor,
        };
        dispatch(&event, &mut ctx)
    }

    /// Override, power off, confirm standby, power on, attach a fresh console.
    fn power_cycle(
        &mut self,
        target: BootTarget,
        system: &mut dyn SystemControl,
        console: &mut dyn Console,
    ) -> Result<Box<dyn ConsoleStream>, SniffError> {
        system.set_boot_override(target)?;

        info!("Powering off");
        system.power_off()?;
        system.set_state(TargetState::UnknownBad);

        let rc = system.wait_for_standby(self.config.standby_timeout())?;
        if rc != 0 {
            warn!(rc, "Unable to confirm power off, needs investigation");
            self.enter(SniffPhase::Failure);
            return Err(SniffError::Confirmation { rc });
        }
        self.enter(SniffPhase::PoweredOff);

        info!("Powering on");
        system.power_on()?;
        let stream = console.connect()?;
        self.enter(SniffPhase::Booting);
        Ok(stream)
    }

    fn enter(&mut self, phase: SniffPhase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "Sniff phase transition");
        }
        self.phase = phase;
    }
}
