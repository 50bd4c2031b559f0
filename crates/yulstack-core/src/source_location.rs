use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Byte range inside a named source. `-1` marks an unknown position, which is how
/// backends tag items that have no origin in user code.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub start: i32,
    pub end: i32,
    pub source_name: Option<Arc<str>>,
}

impl SourceLocation {
    pub fn new(start: i32, end: i32, source_name: Option<Arc<str>>) -> Self {
        Self {
            start,
            end,
            source_name,
        }
    }

    pub fn unknown() -> Self {
        Self {
            start: -1,
            end: -1,
            source_name: None,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.start >= 0 && self.end >= self.start
    }

    #[inline]
    pub fn len(&self) -> Option<i32> {
        self.is_valid().then(|| self.end - self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len().map_or(true, |len| len == 0)
    }

    pub fn contains(&self, other: &SourceLocation) -> bool {
        self.is_valid()
            && other.is_valid()
            && self.source_name == other.source_name
            && other.start >= self.start
            && other.end <= self.end
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.source_name.as_deref().unwrap_or("");
        write!(f, "{}[{},{})", name, self.start, self.end)
    }
}

/// Source text of one compilation job together with its name and a line index.
#[derive(Debug, Clone)]
pub struct CharStream {
    name: Arc<str>,
    source: String,
    line_starts: Vec<usize>,
}

impl CharStream {
    pub fn new(source: impl Into<String>, name: impl Into<String>) -> Self {
        let source = source.into();
        let line_starts = compute_line_starts(&source);
        Self {
            name: Arc::from(name.into()),
            source,
            line_starts,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn location(&self, start: usize, end: usize) -> SourceLocation {
        SourceLocation::new(
            i32::try_from(start).unwrap_or(i32::MAX),
            i32::try_from(end).unwrap_or(i32::MAX),
            Some(self.shared_name()),
        )
    }

    /// One-based line and column of a byte offset. Columns count characters, not bytes.
    pub fn line_column(&self, position: usize) -> (usize, usize) {
        let position = position.min(self.source.len());
        let line_idx = self
            .line_starts
            .partition_point(|&start| start <= position)
            .saturating_sub(1);
        let line_start = self.line_starts[line_idx];
        let column = self
            .source
            .get(line_start..position)
            .map_or(0, |prefix| prefix.chars().count());
        (line_idx + 1, column + 1)
    }

    pub fn line_text(&self, line: usize) -> Option<&str> {
        if line == 0 || line > self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[line - 1];
        let end = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(self.source.len());
        self.source
            .get(start..end)
            .map(|text| text.trim_end_matches(['\n', '\r']))
    }

    pub fn snippet(&self, location: &SourceLocation, context_lines: usize) -> Option<String> {
        if !location.is_valid() {
            return None;
        }
        let (line, _) = self.line_column(location.start as usize);
        let first = line.saturating_sub(context_lines).max(1);
        let last = line.saturating_add(context_lines);

        let mut snippet = String::new();
        for line_no in first..=last {
            if let Some(text) = self.line_text(line_no) {
                snippet.push_str(&format!("{:4} | {}\n", line_no, text));
            }
        }
        Some(snippet)
    }
}

fn compute_line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(
        text.bytes()
            .enumerate()
            .filter(|(_, byte)| *byte == b'\n')
            .map(|(idx, _)| idx + 1),
    );
    starts
}
