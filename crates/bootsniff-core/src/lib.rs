//! # bootsniff-core
//!
//! Boot sniffing for the bootsniff test tool.
//!
//! This crate provides:
//! - The signature table of known firmware error and progress patterns
//! - The classifier that waits on the console for the next signature
//! - Handler dispatch, including the debug monitor capture protocol
//! - The sniff loop with its attempt budget and idle watermark
//! - `BootCheck`, which wraps a sniff session with its goal state

mod classifier;
mod config;
mod dispatch;
mod error;
mod monitor;
mod session;
mod signature;
mod sniff_loop;
mod snippet;
#[cfg(test)]
mod test_support;

pub use classifier::{Classifier, Hit, MatchEvent, normalize_console_text};
pub use config::{ConfigError, MonitorConfig, MonitorStep, SniffConfig};
pub use dispatch::{DispatchContext, HandlerOutcome, dispatch};
pub use error::{FatalBootError, FatalKind, SniffError};
pub use monitor::{MonitorBlock, MonitorCapture};
pub use session::BootCheck;
pub use signature::{Handler, OutcomeKind, Signature, SignatureTable};
pub use sniff_loop::{SniffCounters, SniffLoop, SniffPhase, Verdict};
pub use snippet::{Snippet, SnippetLog};
