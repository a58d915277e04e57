//! Fixed-size text splitting with overlap.
//!
//! Splitting operates on characters, never raw bytes, so multi-byte input
//! cannot be cut mid-codepoint. Chunk boundaries prefer to land just after
//! the last newline inside a window, which keeps `key: value` lines of
//! flattened documents intact.

use crate::types::RetrievalError;

/// Splits a single text into overlapping windows of at most `max_len`
/// characters.
///
/// Consecutive chunks share `overlap` characters: removing the first
/// `overlap` characters of every chunk after the first and concatenating
/// the rest reproduces the input exactly.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    max_len: usize,
    overlap: usize,
}

impl TextSplitter {
    /// Creates a splitter. `overlap` must be strictly smaller than
    /// `max_len`; anything else cannot terminate and is rejected up front.
    pub fn new(max_len: usize, overlap: usize) -> Result<Self, RetrievalError> {
        if max_len == 0 || overlap >= max_len {
            return Err(RetrievalError::Config(format!(
                "invalid splitter bounds: max_len={max_len}, overlap={overlap}"
            )));
        }
        Ok(Self { max_len, overlap })
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Splits `text` into ordered chunks.
    ///
    /// Inputs no longer than `max_len` characters pass through as a single
    /// chunk. A window whose right edge is not at the end of the text
    /// shrinks to end just after its last newline, but only when the shrunk
    /// window stays longer than `overlap`; that guard keeps the cursor
    /// advancing and preserves the overlap-removal reconstruction identity.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.max_len {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;
        while start < chars.len() {
            let mut end = (start + self.max_len).min(chars.len());
            if end < chars.len() {
                if let Some(pos) = chars[start..end].iter().rposition(|&c| c == '\n') {
                    let after_newline = start + pos + 1;
                    if after_newline - start > self.overlap {
                        end = after_newline;
                    }
                }
            }

            chunks.push(chars[start..end].iter().collect());
            if end >= chars.len() {
                break;
            }
            start = end - self.overlap;
        }

        chunks
    }
}
