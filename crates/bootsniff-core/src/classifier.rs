//! Signature classification of console output.

use bootsniff_proto::{ConsoleError, ConsoleStream, MatchIndex, StreamMatch};
use std::time::Duration;
use tracing::debug;

use crate::signature::{Signature, SignatureTable};

/// Collapses the `\r\r\n` line endings BMC consoles emit into `\n`.
///
/// Only applied to text shown to handlers and logs; matching always runs on
/// the raw stream.
pub fn normalize_console_text(text: &str) -> String {
    text.replace("\r\r\n", "\n")
}

/// What ended one classification round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit<'a> {
    Signature { index: usize, signature: &'a Signature },
    Timeout,
    Eof,
}

/// One round's classification result. Raw text is kept as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEvent<'a> {
    pub hit: Hit<'a>,
    pub before: String,
    pub after: String,
}

impl<'a> MatchEvent<'a> {
    pub fn signature(&self) -> Option<&'a Signature> {
        match self.hit {
            Hit::Signature { signature, .. } => Some(signature),
            Hit::Timeout | Hit::Eof => None,
        }
    }

    /// Before and after text joined and normalized for presentation.
    pub fn combined_text(&self) -> String {
        normalize_console_text(&format!("{}{}", self.before, self.after))
    }
}

/// Evaluates console output against a signature table.
#[derive(Debug, Clone)]
pub struct Classifier {
    table: SignatureTable,
}

impl Classifier {
    pub fn new(table: SignatureTable) -> Self {
        Self { table }
    }

    /// Waits for the next signature, timeout, or end of stream.
    pub fn evaluate(
        &self,
        stream: &mut dyn ConsoleStream,
        timeout: Duration,
    ) -> Result<MatchEvent<'_>, ConsoleError> {
        let StreamMatch {
            index,
            before,
            after,
        } = stream.await_match(self.table.patterns(), timeout)?;

        let hit = match index {
            MatchIndex::Timeout => Hit::Timeout,
            MatchIndex::Eof => Hit::Eof,
            MatchIndex::Pattern(index) => match self.table.get(index) {
                Some(signature) => Hit::Signature { index, signature },
                None => {
                    return Err(ConsoleError::UnknownPattern {
                        index,
                        count: self.table.len(),
                    });
                }
            },
        };

        debug!(
            hit = ?hit,
            before = %normalize_console_text(&before),
            after = %normalize_console_text(&after),
            "Classified console output"
        );

        Ok(MatchEvent { hit, before, after })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedStream, hit};

    #[test]
    fn test_normalize_collapses_bmc_line_endings() {
        assert_eq!(normalize_console_text("a\r\r\nb\r\r\n"), "a\nb\n");
        assert_eq!(normalize_console_text("a\r\nb"), "a\r\nb");
    }

    #[test]
    fn test_evaluate_maps_pattern_index_to_signature() {
        let classifier = Classifier::new(SignatureTable::boot_defaults().unwrap());
        let mut stream = ScriptedStream::from_text("boot...\r\r\nAborting!\r\r\n");

        let event = classifier
            .evaluate(&mut stream, Duration::from_secs(1))
            .unwrap();
        let signature = event.signature().unwrap();
        assert_eq!(signature.pattern(), "Aborting!");
        assert_eq!(event.before, "boot...\r\r\n");
        assert_eq!(event.after, "Aborting!");
        assert_eq!(event.combined_text(), "boot...\nAborting!");
    }

    #[test]
    fn test_unknown_pattern_index_is_an_error() {
        let classifier = Classifier::new(SignatureTable::boot_defaults().unwrap());
        let mut stream = ScriptedStream::new(vec![hit(99, "", "")]);

        let err = classifier
            .evaluate(&mut stream, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, ConsoleError::UnknownPattern { index: 99, .. }));
    }

    #[test]
    fn test_evaluate_reports_timeout_and_eof() {
        let classifier = Classifier::new(SignatureTable::boot_defaults().unwrap());
        let mut stream = ScriptedStream::new(vec![
            StreamMatch::timeout(""),
            StreamMatch::eof("tail"),
        ]);

        let first = classifier
            .evaluate(&mut stream, Duration::from_secs(1))
            .unwrap();
        assert_eq!(first.hit, Hit::Timeout);
        assert!(first.signature().is_none());

        let second = classifier
            .evaluate(&mut stream, Duration::from_secs(1))
            .unwrap();
        assert_eq!(second.hit, Hit::Eof);
        assert_eq!(second.before, "tail");
    }

    #[test]
    fn test_classification_is_idempotent() {
        let classifier = Classifier::new(SignatureTable::boot_defaults().unwrap());
        let text = "SBE starting hostboot\r\r\nError reported by hwsv PLID 0x1 ===\r\r\n";

        let mut indexes = Vec::new();
        for _ in 0..3 {
            let mut stream = ScriptedStream::from_text(text);
            let event = classifier
                .evaluate(&mut stream, Duration::from_secs(1))
                .unwrap();
            if let Hit::Signature { index, .. } = event.hit {
                indexes.push(index);
            }
        }
        assert_eq!(indexes, vec![1, 1, 1]);
    }

    #[test]
    fn test_matching_sees_raw_carriage_returns() {
        let classifier = Classifier::new(
            SignatureTable::new(vec![crate::signature::Signature::new(
                "crlf",
                "ready\r\r\n",
                crate::signature::Handler::Marker,
            )])
            .unwrap(),
        );
        let mut stream = ScriptedStream::from_text("system ready\r\r\n");
        let event = classifier
            .evaluate(&mut stream, Duration::from_secs(1))
            .unwrap();
        assert!(event.signature().is_some());
    }
}
