//! Handler dispatch for matched signatures.

use bootsniff_proto::{ConsoleStream, SystemControl, TargetState};
use tracing::{debug, info, warn};

use crate::classifier::MatchEvent;
use crate::config::MonitorConfig;
use crate::error::{FatalBootError, FatalKind, SniffError};
use crate::monitor;
use crate::signature::Handler;
use crate::snippet::SnippetLog;

/// Result of running one round's handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Nothing to do; the round counts as quiet.
    Observe,
    /// A snippet was recorded and the machine needs a recovery power-cycle.
    SoftError,
    /// The session must end. Target already marked bad and event log dumped.
    Fatal(FatalBootError),
}

/// Collaborators a handler may touch.
pub struct DispatchContext<'a> {
    pub system: &'a mut dyn SystemControl,
    pub stream: &'a mut dyn ConsoleStream,
    pub snippets: &'a mut SnippetLog,
    pub monitor: &'a MonitorConfig,
}

/// Runs the handler bound to the event's signature.
///
/// Timeouts and end-of-stream are `Observe`. Errors from collaborators are
/// returned as-is and are never turned into soft errors.
pub fn dispatch(
    event: &MatchEvent<'_>,
    ctx: &mut DispatchContext<'_>,
) -> Result<HandlerOutcome, SniffError> {
    let Some(signature) = event.signature() else {
        return Ok(HandlerOutcome::Observe);
    };
    let value = signature.pattern();

    match signature.handler() {
        Handler::Marker => {
            debug!(label = signature.label(), "Boot progress marker");
            Ok(HandlerOutcome::Observe)
        }

        Handler::FirmwareError => {
            let snippet = ctx.snippets.record(&event.before, &event.after);
            warn!(
                snippet = snippet.number,
                lines = snippet.lines.len(),
                "Firmware error reported during boot"
            );
            Ok(HandlerOutcome::SoftError)
        }

        Handler::Assertion => {
            mark_bad_and_dump(ctx)?;
            Ok(HandlerOutcome::Fatal(FatalBootError::new(
                FatalKind::Assertion,
                format!("firmware assert hit value={value}"),
            )))
        }

        Handler::DebugMonitor => {
            info!("Debug monitor entered, capturing crash state");
            ctx.system.set_state(TargetState::UnknownBad);
            let capture = monitor::capture(ctx.monitor, &mut *ctx.stream)?;
            ctx.system.dump_event_log()?;
            Ok(HandlerOutcome::Fatal(FatalBootError::new(
                FatalKind::DebugMonitor,
                capture.failure_message(value),
            )))
        }

        Handler::ErrorShutdown => {
            ctx.snippets.record(&event.before, &event.after);
            mark_bad_and_dump(ctx)?;
            Ok(HandlerOutcome::Fatal(FatalBootError::new(
                FatalKind::ErrorShutdown,
                format!("error shutdown hit value={value}\n{}", ctx.snippets.evidence()),
            )))
        }
    }
}

fn mark_bad_and_dump(ctx: &mut DispatchContext<'_>) -> Result<(), SniffError> {
    ctx.system.set_state(TargetState::UnknownBad);
    ctx.system.dump_event_log()?;
    Ok(())
}
