//! Console attached through a pseudo-terminal.
//!
//! The console program (typically `ipmitool ... sol activate`) runs under a
//! PTY. A reader thread forwards its output over a channel so reads can time
//! out without blocking on the PTY itself.

use bootsniff_proto::{Console, ConsoleError, ConsoleStream};
use portable_pty::{Child, ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};
use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::expect::{Chunk, ChunkSource, ExpectStream};
use crate::target::ConsoleCommand;

const READ_BUFFER_SIZE: usize = 4096;

/// Spawns a fresh console program for every `connect`.
///
/// Connecting again tears down the previous program first; most BMCs allow a
/// single serial-over-LAN session at a time.
pub struct PtyConsole {
    command: ConsoleCommand,
    killer: Option<Box<dyn ChildKiller + Send + Sync>>,
}

impl PtyConsole {
    pub fn new(command: ConsoleCommand) -> Self {
        Self {
            command,
            killer: None,
        }
    }

    /// Kills the program behind the last connection, if any.
    pub fn disconnect(&mut self) {
        if let Some(mut killer) = self.killer.take() {
            // Already-exited children report an error here.
            if let Err(e) = killer.kill() {
                debug!(error = %e, "Previous console already gone");
            }
        }
    }

    fn spawn(&mut self) -> Result<PtySource, ConsoleError> {
        let pair = native_pty_system()
            .openpty(PtySize {
                rows: 24,
                cols: 200,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| ConsoleError::Connect(format!("failed to open pty: {e}")))?;

        let mut cmd = CommandBuilder::new(&self.command.program);
        cmd.args(&self.command.args);

        let child = pair.slave.spawn_command(cmd).map_err(|e| {
            ConsoleError::Connect(format!("failed to spawn {}: {e}", self.command.program))
        })?;
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| ConsoleError::Connect(format!("failed to clone pty reader: {e}")))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| ConsoleError::Connect(format!("failed to take pty writer: {e}")))?;

        self.killer = Some(child.clone_killer());
        info!(
            program = %self.command.program,
            pid = child.process_id().unwrap_or(0),
            "Console attached"
        );

        Ok(PtySource {
            output: spawn_reader(reader),
            writer,
            child,
            _master: pair.master,
        })
    }
}

impl Console for PtyConsole {
    fn connect(&mut self) -> Result<Box<dyn ConsoleStream>, ConsoleError> {
        self.disconnect();
        let source = self.spawn()?;
        Ok(Box::new(ExpectStream::new(source)))
    }
}

impl Drop for PtyConsole {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn spawn_reader(mut reader: Box<dyn Read + Send>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                // EIO is how Linux reports the slave side closing.
                Err(e) => {
                    debug!(error = %e, "Console reader stopped");
                    break;
                }
            }
        }
    });
    rx
}

/// One running console program.
struct PtySource {
    output: Receiver<Vec<u8>>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
    _master: Box<dyn MasterPty + Send>,
}

impl ChunkSource for PtySource {
    fn read_chunk(&mut self, timeout: Duration) -> io::Result<Chunk> {
        match self.output.recv_timeout(timeout) {
            Ok(bytes) => Ok(Chunk::Data(bytes)),
            Err(RecvTimeoutError::Timeout) => Ok(Chunk::Timeout),
            Err(RecvTimeoutError::Disconnected) => Ok(Chunk::Eof),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)?;
        self.writer.flush()
    }
}

impl Drop for PtySource {
    fn drop(&mut self) {
        if let Ok(Some(status)) = self.child.try_wait() {
            debug!(?status, "Console program exited");
            return;
        }
        if let Err(e) = self.child.kill() {
            warn!(error = %e, "Failed to stop console program");
            return;
        }
        let _ = self.child.wait();
    }
}
