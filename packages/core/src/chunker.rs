// ABOUTME: Deterministic line-window chunker for splitting large text into overlapping slices
// ABOUTME: Produces half-open line ranges so chunk summaries can be traced back to source lines

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkerError {
    #[error("Window size must be at least one line")]
    InvalidWindow,

    #[error("Overlap ({overlap}) must be smaller than the window size ({window})")]
    InvalidOverlap { window: usize, overlap: usize },
}

/// A contiguous slice of a larger text, addressed by line numbers.
///
/// `start_line` is inclusive and `end_line` exclusive, both zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl TextChunk {
    /// Human-readable location such as `src/lib.rs:1-200` (one-based, inclusive).
    pub fn location(&self) -> String {
        let source = self.source.as_deref().unwrap_or("<inline>");
        format!("{}:{}-{}", source, self.start_line + 1, self.end_line)
    }

    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line
    }
}

/// Splits text into windows of `window` lines where consecutive windows share
/// `overlap` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    window: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(window: usize, overlap: usize) -> Result<Self, ChunkerError> {
        if window == 0 {
            return Err(ChunkerError::InvalidWindow);
        }
        if overlap >= window {
            return Err(ChunkerError::InvalidOverlap { window, overlap });
        }
        Ok(Self { window, overlap })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance in lines between the starts of two consecutive chunks
    pub fn step(&self) -> usize {
        self.window - self.overlap
    }

    /// Lazily iterate the windows of `text`. Calling this again restarts from line zero.
    pub fn windows<'a>(&self, text: &'a str) -> LineWindows<'a> {
        LineWindows {
            lines: split_lines(text),
            window: self.window,
            step: self.step(),
            next_start: 0,
            done: false,
        }
    }

    /// Collect every window of `text`, tagging each chunk with `source`.
    pub fn chunk(&self, text: &str, source: Option<&str>) -> Vec<TextChunk> {
        self.windows(text)
            .map(|mut chunk| {
                chunk.source = source.map(str::to_string);
                chunk
            })
            .collect()
    }
}

/// Iterator over the line windows of a single text.
#[derive(Debug, Clone)]
pub struct LineWindows<'a> {
    lines: Vec<&'a str>,
    window: usize,
    step: usize,
    next_start: usize,
    done: bool,
}

impl Iterator for LineWindows<'_> {
    type Item = TextChunk;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.lines.len();
        if self.done || total == 0 {
            return None;
        }

        let start = self.next_start;
        let end = (start + self.window).min(total);

        if end == total {
            self.done = true;
        } else {
            self.next_start += self.step;
        }

        Some(TextChunk {
            content: self.lines[start..end].join("\n"),
            start_line: start,
            end_line: end,
            source: None,
        })
    }
}

/// Split on `\n`, treating a single trailing newline as a terminator rather
/// than the start of an empty final line.
fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<&str> = text.split('\n').collect();
    if text.ends_with('\n') {
        lines.pop();
    }
    lines
}
