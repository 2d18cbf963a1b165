//! Byte offset to line/column mapping.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A 1-based line and 1-based byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

/// Line start offsets of a text.
///
/// `\n`, `\r\n` and a lone `\r` each terminate a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMap {
    starts: Vec<usize>,
}

impl LineMap {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut starts = vec![0];
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' => {
                    if bytes.get(i + 1) == Some(&b'\n') {
                        i += 1;
                    }
                    starts.push(i + 1);
                }
                b'\n' => starts.push(i + 1),
                _ => {}
            }
            i += 1;
        }
        Self { starts }
    }

    /// Number of lines in the mapped text.
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Line and column of a byte offset. Offsets past the end map onto the last line.
    pub fn line_col(&self, offset: usize) -> LineCol {
        // Index of the greatest line start <= offset.
        let idx = self.starts.partition_point(|&s| s <= offset).saturating_sub(1);
        LineCol {
            line: idx + 1,
            column: offset - self.starts[idx] + 1,
        }
    }

    /// `{"start": {line, column}, "end": {line, column}}` for a byte range.
    pub fn position(&self, start: usize, end: usize) -> Value {
        json!({
            "start": self.line_col(start),
            "end": self.line_col(end),
        })
    }
}

/// One-shot helper for a single range.
pub fn position_for_range(text: &str, start: usize, end: usize) -> Value {
    LineMap::new(text).position(start, end)
}
