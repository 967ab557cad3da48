//! Console collaborator: a byte stream with an expect-style wait primitive.

use regex::Regex;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a console connection.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("failed to connect console: {0}")]
    Connect(String),

    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("console is not connected")]
    NotConnected,

    /// The stream reported a pattern index it was never given.
    #[error("console reported pattern {index} but only {count} patterns were given")]
    UnknownPattern { index: usize, count: usize },
}

/// Which alternative ended an `await_match` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchIndex {
    /// The timeout elapsed with no pattern matching.
    Timeout,
    /// The stream ended.
    Eof,
    /// The pattern at this index in the `PatternSet` matched.
    Pattern(usize),
}

/// Result of one `await_match` call.
///
/// `before` and `after` hold raw console text; nothing has been normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMatch {
    pub index: MatchIndex,
    /// Text consumed up to the start of the match (or the pending buffer on timeout/EOF).
    pub before: String,
    /// The matched text itself; empty on timeout/EOF.
    pub after: String,
}

impl StreamMatch {
    pub fn timeout(before: impl Into<String>) -> Self {
        Self {
            index: MatchIndex::Timeout,
            before: before.into(),
            after: String::new(),
        }
    }

    pub fn eof(before: impl Into<String>) -> Self {
        Self {
            index: MatchIndex::Eof,
            before: before.into(),
            after: String::new(),
        }
    }
}

/// A located pattern match inside a haystack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternHit {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

const GROUP_PREFIX: &str = "__sig";

/// Ordered patterns compiled into a single alternation.
///
/// `find` returns the match that starts earliest in the haystack; when two
/// patterns match at the same position the one registered first wins. This
/// is the leftmost-first semantics of the underlying regex engine, so the
/// whole set is evaluated in one scan.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    combined: Option<Regex>,
}

impl PatternSet {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();

        // Compile individually first so a bad pattern is reported on its own.
        for pattern in &patterns {
            Regex::new(pattern)?;
        }

        let combined = if patterns.is_empty() {
            None
        } else {
            let alternation = patterns
                .iter()
                .enumerate()
                .map(|(i, p)| format!("(?P<{GROUP_PREFIX}{i}>{p})"))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&alternation)?)
        };

        Ok(Self { patterns, combined })
    }

    /// Finds the earliest match of any pattern in `haystack`.
    pub fn find(&self, haystack: &str) -> Option<PatternHit> {
        let caps = self.combined.as_ref()?.captures(haystack)?;
        (0..self.patterns.len()).find_map(|index| {
            caps.name(&format!("{GROUP_PREFIX}{index}"))
                .map(|m| PatternHit {
                    index,
                    start: m.start(),
                    end: m.end(),
                })
        })
    }

    pub fn pattern(&self, index: usize) -> Option<&str> {
        self.patterns.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// An attached console stream.
pub trait ConsoleStream {
    /// Blocks until a pattern in `patterns` matches, `timeout` elapses, or
    /// the stream ends.
    fn await_match(
        &mut self,
        patterns: &PatternSet,
        timeout: Duration,
    ) -> Result<StreamMatch, ConsoleError>;

    /// Sends `line` followed by a line terminator.
    fn send_line(&mut self, line: &str) -> Result<(), ConsoleError>;
}

/// Factory for console streams.
pub trait Console {
    /// Attaches to the console, discarding any stale buffered output from a
    /// previous connection.
    fn connect(&mut self) -> Result<Box<dyn ConsoleStream>, ConsoleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_prefers_earliest_position() {
        let set = PatternSet::new(["OPAL skiboot", "SBE starting hostboot"]).unwrap();
        let text = "junk SBE starting hostboot ... OPAL skiboot";
        let hit = set.find(text).unwrap();
        assert_eq!(hit.index, 1);
        assert_eq!(&text[hit.start..hit.end], "SBE starting hostboot");
    }

    #[test]
    fn test_find_ties_go_to_first_registered() {
        let set = PatternSet::new(["mon", "mon> "]).unwrap();
        let hit = set.find("0:mon> ").unwrap();
        assert_eq!(hit.index, 0);
        assert_eq!(hit.start, 2);
    }

    #[test]
    fn test_find_none_when_nothing_matches() {
        let set = PatternSet::new(["Aborting!"]).unwrap();
        assert!(set.find("all quiet").is_none());
    }

    #[test]
    fn test_empty_set_never_matches() {
        let set = PatternSet::new(Vec::<String>::new()).unwrap();
        assert!(set.is_empty());
        assert!(set.find("anything").is_none());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(PatternSet::new(["(unclosed"]).is_err());
    }

    #[test]
    fn test_patterns_with_inner_groups() {
        let set = PatternSet::new(["status (\\d+)", "Error reported by .* PLID .*==="]).unwrap();
        let text = "Error reported by hwsv PLID 0x90000 ===";
        let hit = set.find(text).unwrap();
        assert_eq!(hit.index, 1);
        assert_eq!(set.pattern(1), Some("Error reported by .* PLID .*==="));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let set = PatternSet::new(["Aborting!"]).unwrap();
        assert!(set.find("aborting!").is_none());
    }
}
