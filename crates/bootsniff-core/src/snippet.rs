//! Evidence captured from the console during a session.

use crate::classifier::normalize_console_text;

/// One captured piece of console output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub number: usize,
    pub lines: Vec<String>,
}

impl Snippet {
    pub fn header(&self) -> String {
        format!("Snippet #{}", self.number)
    }
}

/// Append-only log of snippets for one session.
///
/// Snippets are numbered from 1 in capture order. There is no way to edit
/// or remove an entry once recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetLog {
    snippets: Vec<Snippet>,
}

impl SnippetLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the text around a match, normalized and split into lines.
    pub fn record(&mut self, before: &str, after: &str) -> &Snippet {
        let text = normalize_console_text(&format!("{before}{after}"));
        let snippet = Snippet {
            number: self.snippets.len() + 1,
            lines: text.lines().map(str::to_string).collect(),
        };
        self.snippets.push(snippet);
        &self.snippets[self.snippets.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Flattened entries: each header followed by its lines.
    pub fn entries(&self) -> Vec<String> {
        self.snippets
            .iter()
            .flat_map(|s| std::iter::once(s.header()).chain(s.lines.iter().cloned()))
            .collect()
    }

    /// Non-empty entries joined as multi-line evidence for a failure report.
    pub fn evidence(&self) -> String {
        self.entries()
            .into_iter()
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
