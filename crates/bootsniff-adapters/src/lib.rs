//! # bootsniff-adapters
//!
//! Concrete collaborators for the bootsniff sniff loop.
//!
//! This crate provides:
//! - `ExpectStream`, an expect-style buffered console stream over any `ChunkSource`
//! - `PtyConsole`, which runs the configured console command under a pseudo-terminal
//! - `CommandSystem`, a `SystemControl` that drives the BMC through shell commands
//! - `TargetConfig`, the `target:` section of the configuration file

mod error;
mod expect;
mod pty;
mod system;
mod target;

pub use error::AdapterError;
pub use expect::{Chunk, ChunkSource, ExpectStream};
pub use pty::PtyConsole;
pub use system::CommandSystem;
pub use target::{BmcType, BootOverrideCommands, ConsoleCommand, PowerCommands, Prompts, TargetConfig};
