//! Overlapping line-window chunking.

use crate::error::{IndexError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Lines per window.
    pub chunk_lines: usize,
    /// Lines shared by consecutive windows.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_lines: 40,
            chunk_overlap: 10,
        }
    }
}

impl ChunkerConfig {
    /// Distance between window starts, never below 1.
    #[must_use]
    pub fn step(&self) -> usize {
        self.chunk_lines.saturating_sub(self.chunk_overlap).max(1)
    }

    /// Reject windows that are empty or that would not advance past their overlap.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidArgument`] when `chunk_lines` is zero or
    /// `chunk_overlap >= chunk_lines`.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_lines == 0 {
            return Err(IndexError::InvalidArgument(
                "chunk_lines must be greater than zero.".into(),
            ));
        }
        if self.chunk_overlap >= self.chunk_lines {
            return Err(IndexError::InvalidArgument(format!(
                "chunk_overlap ({}) must be smaller than chunk_lines ({}).",
                self.chunk_overlap, self.chunk_lines
            )));
        }
        Ok(())
    }
}

/// One window of trimmed text with its 1-based inclusive line range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChunk {
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// Iterator over the non-empty windows of a text.
#[derive(Debug)]
pub struct LineWindows<'a> {
    lines: Vec<&'a str>,
    chunk_lines: usize,
    step: usize,
    start: usize,
}

impl Iterator for LineWindows<'_> {
    type Item = LineChunk;

    fn next(&mut self) -> Option<LineChunk> {
        while self.start < self.lines.len() {
            let start = self.start;
            let end = self.lines.len().min(start + self.chunk_lines);
            self.start += self.step;

            let text = self.lines[start..end].join("\n");
            let text = text.trim();
            if !text.is_empty() {
                return Some(LineChunk {
                    text: text.to_owned(),
                    start_line: start + 1,
                    end_line: end,
                });
            }
        }
        None
    }
}

/// Split `text` into windows of `chunk_lines` lines starting every
/// [`ChunkerConfig::step`] lines. Windows that trim to nothing are skipped but
/// still advance the position.
#[must_use]
pub fn chunk_lines<'a>(text: &'a str, config: &ChunkerConfig) -> LineWindows<'a> {
    LineWindows {
        lines: split_lines(text),
        chunk_lines: config.chunk_lines,
        step: config.step(),
        start: 0,
    }
}

/// Split on every Unicode line boundary: `\n`, `\r\n`, lone `\r`, vertical
/// tab, form feed, the file/group/record separators, NEL, and U+2028/U+2029.
/// A trailing terminator does not start an empty line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' && chars.next_if(|&(_, next)| next == '\n').is_some() {
            start += 1;
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}
