//! Fixed-size overlapping window chunker.
//!
//! Splits extracted document text into windows of `chunk_chars` characters
//! whose start offsets are `chunk_chars - overlap_chars` apart. The final
//! window may be shorter. Windows whose trimmed content is shorter than
//! `min_chars` are dropped before they reach the embedder, which keeps
//! trailing whitespace fragments out of the index.
//!
//! Lengths are counted in `char`s, so a window never splits a UTF-8 code
//! point. The iterator is lazy and `Clone`; calling [`Chunker::chunks`]
//! again on the same text restarts the sequence.
//!
//! # Example
//!
//! ```rust
//! use ragdesk_core::chunk::Chunker;
//!
//! let chunker = Chunker::new(1000, 200).unwrap();
//! let text = "x".repeat(2500);
//! let starts: Vec<usize> = chunker.windows(&text).map(|w| w.char_offset).collect();
//! assert_eq!(starts, vec![0, 800, 1600, 2400]);
//! ```

use serde_json::json;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

pub const DEFAULT_CHUNK_CHARS: usize = 1000;
pub const DEFAULT_OVERLAP_CHARS: usize = 200;
pub const DEFAULT_MIN_CHARS: usize = 10;

/// Window policy. Cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_chars: usize,
    overlap_chars: usize,
    min_chars: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_chars: DEFAULT_CHUNK_CHARS,
            overlap_chars: DEFAULT_OVERLAP_CHARS,
            min_chars: DEFAULT_MIN_CHARS,
        }
    }
}

impl Chunker {
    /// Build a chunker. Rejects `chunk_chars == 0` and `overlap_chars >= chunk_chars`,
    /// either of which would make the window never advance.
    pub fn new(chunk_chars: usize, overlap_chars: usize) -> Result<Self> {
        if chunk_chars == 0 {
            return Err(Error::InvalidRequest(
                "chunk length must be greater than zero".to_string(),
            ));
        }
        if overlap_chars >= chunk_chars {
            return Err(Error::InvalidRequest(format!(
                "overlap ({}) must be smaller than chunk length ({})",
                overlap_chars, chunk_chars
            )));
        }
        Ok(Self {
            chunk_chars,
            overlap_chars,
            min_chars: DEFAULT_MIN_CHARS,
        })
    }

    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    pub fn chunk_chars(&self) -> usize {
        self.chunk_chars
    }

    pub fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    /// Distance between consecutive window starts.
    pub fn step(&self) -> usize {
        self.chunk_chars - self.overlap_chars
    }

    /// Every window, before the minimum-length filter.
    pub fn windows<'a>(&self, text: &'a str) -> Windows<'a> {
        Windows {
            text,
            byte_pos: 0,
            char_pos: 0,
            index: 0,
            size: self.chunk_chars,
            step: self.step(),
        }
    }

    /// Windows that survive the minimum-length filter. These are the
    /// chunks that get embedded and persisted.
    pub fn chunks<'a>(&self, text: &'a str) -> impl Iterator<Item = Window<'a>> + Clone + 'a {
        let min_chars = self.min_chars;
        self.windows(text)
            .filter(move |w| w.text.trim().chars().count() >= min_chars)
    }
}

/// One contiguous slice of the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window<'a> {
    /// Position in the unfiltered window sequence.
    pub index: usize,
    /// Start offset in chars from the beginning of the text.
    pub char_offset: usize,
    pub text: &'a str,
}

impl Window<'_> {
    /// Chunk metadata persisted alongside the content.
    pub fn metadata(&self) -> serde_json::Value {
        json!({
            "window": self.index,
            "char_offset": self.char_offset,
            "chars": self.text.chars().count(),
            "sha256": content_hash(self.text),
        })
    }
}

/// Lazy iterator over overlapping windows. See [`Chunker::windows`].
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    text: &'a str,
    byte_pos: usize,
    char_pos: usize,
    index: usize,
    size: usize,
    step: usize,
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Window<'a>> {
        if self.byte_pos >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.byte_pos..];
        let end = byte_offset(rest, self.size);
        let advance = byte_offset(rest, self.step);

        let window = Window {
            index: self.index,
            char_offset: self.char_pos,
            text: &rest[..end],
        };

        self.byte_pos += advance;
        self.char_pos += self.step;
        self.index += 1;
        Some(window)
    }
}

impl std::iter::FusedIterator for Windows<'_> {}

/// Byte offset of the `n`th char of `s`, or `s.len()` if `s` is shorter.
fn byte_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

/// SHA-256 of the chunk text, hex encoded.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
