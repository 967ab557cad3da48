//! Crash-dump capture from the kernel debug monitor (xmon).
//!
//! Once the monitor prompt shows up on the console the machine is stopped.
//! We walk a fixed list of monitor commands (backtrace, registers, special
//! registers, exception registers), record whatever comes back, and hand the
//! result to the fatal handler. Each step waits for the prompt on its own;
//! a step that times out still records its partial output and the sequence
//! carries on.

use bootsniff_proto::{ConsoleStream, MatchIndex, PatternSet};
use std::thread;
use tracing::{debug, warn};

use crate::classifier::normalize_console_text;
use crate::config::MonitorConfig;
use crate::error::SniffError;

/// Output captured for one monitor command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorBlock {
    pub name: String,
    pub text: String,
    /// Whether the monitor prompt came back within the timeout.
    pub prompt_seen: bool,
}

/// Everything captured from one pass through the monitor steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorCapture {
    pub blocks: Vec<MonitorBlock>,
}

impl MonitorCapture {
    /// Builds the failure message naming the triggering value and every block.
    pub fn failure_message(&self, value: &str) -> String {
        let mut message = format!("debug monitor hit with \"{value}\"");
        for block in &self.blocks {
            message.push_str(&format!(" {}=\n{}\n", block.name, block.text));
        }
        message
    }
}

/// Runs the scripted monitor interaction over `stream`.
///
/// Timeouts and end-of-stream are recorded, never raised. Console I/O errors
/// propagate.
pub fn capture(
    config: &MonitorConfig,
    stream: &mut dyn ConsoleStream,
) -> Result<MonitorCapture, SniffError> {
    let prompt: PatternSet = config.prompt_set()?;
    let mut capture = MonitorCapture::default();

    thread::sleep(config.entry_delay());

    for step in &config.steps {
        stream.send_line(&step.command)?;
        thread::sleep(step.settle());

        let reply = stream.await_match(&prompt, config.prompt_timeout())?;
        let prompt_seen = matches!(reply.index, MatchIndex::Pattern(_));
        if prompt_seen {
            debug!(step = %step.name, "Debug monitor prompt returned");
        } else {
            warn!(
                step = %step.name,
                index = ?reply.index,
                "Debug monitor prompt not seen, keeping partial output"
            );
        }

        capture.blocks.push(MonitorBlock {
            name: step.name.clone(),
            text: normalize_console_text(&format!("{}{}", reply.before, reply.after)),
            prompt_seen,
        });
    }

    Ok(capture)
}
