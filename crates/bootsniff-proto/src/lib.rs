//! # bootsniff-proto
//!
//! Shared types and collaborator traits for bootsniff.
//!
//! This crate provides:
//! - The `TargetState` and `BootTarget` enumerations describing the machine
//! - The `SystemControl` trait for power, state and event-log operations
//! - The `Console` and `ConsoleStream` traits for the console byte stream
//! - `PatternSet`, the combined first-match-wins pattern alternation

mod console;
mod system;
mod target;

pub use console::{Console, ConsoleError, ConsoleStream, MatchIndex, PatternHit, PatternSet, StreamMatch};
pub use system::{ControlError, SystemControl, TransitionError};
pub use target::{BootTarget, TargetState};
