//! Fakes for the system and console collaborators.

use bootsniff_proto::{
    BootTarget, Console, ConsoleError, ConsoleStream, ControlError, MatchIndex, PatternSet,
    StreamMatch, SystemControl, TargetState, TransitionError,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::config::{MonitorConfig, MonitorStep, SniffConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemCall {
    PowerOff,
    PowerOn,
    WaitForStandby,
    SetState(TargetState),
    GotoState(TargetState),
    DumpEventLog,
    SetBootOverride(BootTarget),
}

/// Everything the fakes saw, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trace {
    System(SystemCall),
    Connect,
    Await,
    Send(String),
}

pub type Journal = Rc<RefCell<Vec<Trace>>>;

pub struct FakeSystem {
    journal: Journal,
    state: TargetState,
    /// Status codes returned by successive `wait_for_standby` calls; 0 once drained.
    pub standby_rcs: VecDeque<i32>,
    pub fail_event_log: bool,
    pub fail_goto: bool,
}

impl FakeSystem {
    pub fn new() -> Self {
        Self::with_journal(Journal::default())
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            state: TargetState::Unknown,
            standby_rcs: VecDeque::new(),
            fail_event_log: false,
            fail_goto: false,
        }
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    pub fn calls(&self) -> Vec<SystemCall> {
        self.journal
            .borrow()
            .iter()
            .filter_map(|t| match t {
                Trace::System(call) => Some(call.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &SystemCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: SystemCall) {
        self.journal.borrow_mut().push(Trace::System(call));
    }
}

impl SystemControl for FakeSystem {
    fn power_off(&mut self) -> Result<(), ControlError> {
        self.record(SystemCall::PowerOff);
        Ok(())
    }

    fn power_on(&mut self) -> Result<(), ControlError> {
        self.record(SystemCall::PowerOn);
        Ok(())
    }

    fn wait_for_standby(&mut self, _timeout: Duration) -> Result<i32, ControlError> {
        self.record(SystemCall::WaitForStandby);
        Ok(self.standby_rcs.pop_front().unwrap_or(0))
    }

    fn set_state(&mut self, state: TargetState) {
        self.record(SystemCall::SetState(state));
        self.state = state;
    }

    fn get_state(&self) -> TargetState {
        self.state
    }

    fn goto_state(&mut self, target: TargetState) -> Result<(), TransitionError> {
        self.record(SystemCall::GotoState(target));
        if self.fail_goto {
            return Err(TransitionError::new(target, "prompt never appeared"));
        }
        self.state = target;
        Ok(())
    }

    fn dump_event_log(&mut self) -> Result<(), ControlError> {
        self.record(SystemCall::DumpEventLog);
        if self.fail_event_log {
            return Err(ControlError::CommandFailed {
                command: "sel elist".to_string(),
                status: 1,
                stderr: "BMC unreachable".to_string(),
            });
        }
        Ok(())
    }

    fn set_boot_override(&mut self, target: BootTarget) -> Result<(), ControlError> {
        self.record(SystemCall::SetBootOverride(target));
        Ok(())
    }
}

type Script = Rc<RefCell<VecDeque<StreamMatch>>>;

/// Stream replaying scripted results, or matching against fixed text.
///
/// Scripted mode returns a timeout once the script runs dry. Text mode runs
/// the real pattern set over the text and reports EOF when nothing is left.
pub struct ScriptedStream {
    script: Script,
    text: Option<String>,
    sent: Rc<RefCell<Vec<String>>>,
    journal: Journal,
}

impl ScriptedStream {
    pub fn new(script: Vec<StreamMatch>) -> Self {
        Self {
            script: Rc::new(RefCell::new(script.into())),
            text: None,
            sent: Rc::default(),
            journal: Journal::default(),
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// Lines sent to the stream so far.
    pub fn sent(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.sent)
    }
}

impl ConsoleStream for ScriptedStream {
    fn await_match(
        &mut self,
        patterns: &PatternSet,
        _timeout: Duration,
    ) -> Result<StreamMatch, ConsoleError> {
        self.journal.borrow_mut().push(Trace::Await);

        if let Some(text) = self.text.as_mut() {
            return Ok(match patterns.find(text) {
                Some(hit) => {
                    let before = text[..hit.start].to_string();
                    let after = text[hit.start..hit.end].to_string();
                    text.drain(..hit.end);
                    StreamMatch {
                        index: MatchIndex::Pattern(hit.index),
                        before,
                        after,
                    }
                }
                None => StreamMatch::eof(std::mem::take(text)),
            });
        }

        Ok(self
            .script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| StreamMatch::timeout("")))
    }

    fn send_line(&mut self, line: &str) -> Result<(), ConsoleError> {
        self.journal.borrow_mut().push(Trace::Send(line.to_string()));
        self.sent.borrow_mut().push(line.to_string());
        Ok(())
    }
}

/// Console whose connections all draw from one shared script.
pub struct ScriptedConsole {
    script: Script,
    journal: Journal,
    pub fail_connect: bool,
}

impl ScriptedConsole {
    pub fn new(script: Vec<StreamMatch>, journal: Journal) -> Self {
        Self {
            script: Rc::new(RefCell::new(script.into())),
            journal,
            fail_connect: false,
        }
    }

    pub fn connects(&self) -> usize {
        self.journal
            .borrow()
            .iter()
            .filter(|t| **t == Trace::Connect)
            .count()
    }
}

impl Console for ScriptedConsole {
    fn connect(&mut self) -> Result<Box<dyn ConsoleStream>, ConsoleError> {
        self.journal.borrow_mut().push(Trace::Connect);
        if self.fail_connect {
            return Err(ConsoleError::Connect("SOL session in use".to_string()));
        }
        Ok(Box::new(ScriptedStream {
            script: Rc::clone(&self.script),
            text: None,
            sent: Rc::default(),
            journal: Rc::clone(&self.journal),
        }))
    }
}

/// A system and console sharing one journal.
pub fn journaled(script: Vec<StreamMatch>) -> (FakeSystem, ScriptedConsole, Journal) {
    let journal = Journal::default();
    (
        FakeSystem::with_journal(Rc::clone(&journal)),
        ScriptedConsole::new(script, Rc::clone(&journal)),
        journal,
    )
}

/// Monitor config with every delay zeroed.
pub fn fast_monitor() -> MonitorConfig {
    MonitorConfig {
        entry_delay_ms: 0,
        steps: MonitorConfig::default()
            .steps
            .into_iter()
            .map(|s| MonitorStep { settle_ms: 0, ..s })
            .collect(),
        ..MonitorConfig::default()
    }
}

/// Default sniff config with no sleeps.
pub fn fast_config() -> SniffConfig {
    SniffConfig {
        monitor: fast_monitor(),
        ..SniffConfig::default()
    }
}

/// A scripted result for the signature at `index` of the default table.
pub fn hit(index: usize, before: &str, after: &str) -> StreamMatch {
    StreamMatch {
        index: MatchIndex::Pattern(index),
        before: before.to_string(),
        after: after.to_string(),
    }
}
