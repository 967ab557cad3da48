//! Expect-style matching over a chunked byte source.

use bootsniff_proto::{ConsoleError, ConsoleStream, MatchIndex, PatternSet, StreamMatch};
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Most text kept unconsumed in the buffer. Older output is dropped.
pub const DEFAULT_MAX_BUFFER: usize = 64 * 1024;

/// One read from a console source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Data(Vec<u8>),
    /// Nothing arrived within the requested time.
    Timeout,
    /// The source closed.
    Eof,
}

/// Raw byte transport behind an `ExpectStream`.
pub trait ChunkSource {
    /// Waits at most `timeout` for the next chunk of output.
    fn read_chunk(&mut self, timeout: Duration) -> io::Result<Chunk>;

    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;
}

/// Buffers console output and hands out matches one at a time.
///
/// After a match the buffer keeps whatever followed the matched text, so the
/// next call sees it first. A timeout reports the buffer but keeps it. End of
/// stream drains the buffer, and every later call reports end of stream
/// immediately.
///
/// The buffer holds at most `max_buffer` bytes. When output piles up without
/// matching, the oldest text is discarded so each read scans a bounded window.
pub struct ExpectStream<S> {
    source: S,
    buffer: String,
    max_buffer: usize,
    /// Trailing bytes of a UTF-8 sequence split across chunks.
    partial: Vec<u8>,
    closed: bool,
}

impl<S: ChunkSource> ExpectStream<S> {
    pub fn new(source: S) -> Self {
        Self::with_max_buffer(source, DEFAULT_MAX_BUFFER)
    }

    pub fn with_max_buffer(source: S, max_buffer: usize) -> Self {
        Self {
            source,
            buffer: String::new(),
            max_buffer: max_buffer.max(1),
            partial: Vec::new(),
            closed: false,
        }
    }

    /// Text received but not yet consumed by a match.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    fn take_match(&mut self, patterns: &PatternSet) -> Option<StreamMatch> {
        let hit = patterns.find(&self.buffer)?;
        let before = self.buffer[..hit.start].to_string();
        let after = self.buffer[hit.start..hit.end].to_string();
        self.buffer.drain(..hit.end);
        Some(StreamMatch {
            index: MatchIndex::Pattern(hit.index),
            before,
            after,
        })
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        self.partial.extend_from_slice(bytes);
        loop {
            match std::str::from_utf8(&self.partial) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.partial.clear();
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    self.buffer
                        .push_str(std::str::from_utf8(&self.partial[..valid]).unwrap_or_default());
                    match err.error_len() {
                        // Incomplete sequence at the end: wait for the rest.
                        None => {
                            self.partial.drain(..valid);
                            break;
                        }
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.partial.drain(..valid + len);
                        }
                    }
                }
            }
        }
        self.trim_to_window();
    }

    fn trim_to_window(&mut self) {
        if self.buffer.len() <= self.max_buffer {
            return;
        }
        let mut cut = self.buffer.len() - self.max_buffer;
        while !self.buffer.is_char_boundary(cut) {
            cut += 1;
        }
        debug!(dropped = cut, kept = self.buffer.len() - cut, "Console buffer full, dropping oldest output");
        self.buffer.drain(..cut);
    }

    fn close(&mut self) -> StreamMatch {
        self.closed = true;
        if !self.partial.is_empty() {
            let rest = std::mem::take(&mut self.partial);
            self.buffer.push_str(&String::from_utf8_lossy(&rest));
        }
        StreamMatch::eof(std::mem::take(&mut self.buffer))
    }
}

impl<S: ChunkSource> ConsoleStream for ExpectStream<S> {
    fn await_match(
        &mut self,
        patterns: &PatternSet,
        timeout: Duration,
    ) -> Result<StreamMatch, ConsoleError> {
        if self.closed {
            return Ok(self.close());
        }

        let deadline = Instant::now() + timeout;
        // Every call reads at least once, even with a zero timeout.
        let mut polled = false;
        loop {
            if let Some(found) = self.take_match(patterns) {
                return Ok(found);
            }
            if polled && Instant::now() >= deadline {
                return Ok(StreamMatch::timeout(self.buffer.clone()));
            }
            polled = true;

            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.source.read_chunk(remaining)? {
                Chunk::Data(bytes) => {
                    trace!(bytes = bytes.len(), "Console output");
                    self.push_bytes(&bytes);
                }
                Chunk::Timeout => {}
                Chunk::Eof => return Ok(self.close()),
            }
        }
    }

    fn send_line(&mut self, line: &str) -> Result<(), ConsoleError> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.source.write_all(&data)?;
        Ok(())
    }
}
