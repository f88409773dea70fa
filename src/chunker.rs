//! Outgoing message line breaking.
//!
//! Text is split at whitespace first. A word that cannot fit on a line by
//! itself is split at grapheme cluster boundaries, and a grapheme cluster
//! that still does not fit is split between codepoints. Each fallback can be
//! switched off, in which case the corresponding [`ChunkError`] is returned.
//!
//! Concatenating `text + dropped` over all chunks reproduces the input.

use unicode_segmentation::UnicodeSegmentation;

use crate::error::ChunkError;

/// Default byte budget for a message body.
pub const DEFAULT_MAX_BYTES: usize = 350;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkerConfig {
    /// Maximum size of a chunk's `text` in bytes.
    pub max_bytes: usize,
    pub allow_grapheme_split: bool,
    pub allow_codepoint_split: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        ChunkerConfig {
            max_bytes: DEFAULT_MAX_BYTES,
            allow_grapheme_split: true,
            allow_codepoint_split: true,
        }
    }
}

impl ChunkerConfig {
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        ChunkerConfig {
            max_bytes,
            ..Self::default()
        }
    }
}

/// One outgoing line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chunk {
    /// Text to send; never empty and never longer than the budget.
    pub text: String,
    /// Whitespace removed at the break after this chunk.
    pub dropped: String,
}

/// Split text into `(word, trailing whitespace)` pairs. Leading whitespace
/// yields a pair with an empty word.
fn tokenize(text: &str) -> Vec<(&str, &str)> {
    let mut tokens = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (word, after) = rest.split_at(word_end);
        let ws_end = after
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(after.len());
        let (ws, next) = after.split_at(ws_end);
        tokens.push((word, ws));
        rest = next;
    }
    tokens
}

struct Builder<'c> {
    config: &'c ChunkerConfig,
    chunks: Vec<Chunk>,
    current: String,
}

impl<'c> Builder<'c> {
    fn fits(&self, piece: &str) -> bool {
        self.current.len() + piece.len() <= self.config.max_bytes
    }

    fn flush(&mut self, dropped: &str) {
        if !self.current.is_empty() {
            self.chunks.push(Chunk {
                text: std::mem::take(&mut self.current),
                dropped: dropped.to_string(),
            });
        }
    }

    /// Append `unit` to the current line, starting a new one if needed.
    fn push_unit(&mut self, unit: &str) {
        if !self.fits(unit) {
            self.flush("");
        }
        self.current.push_str(unit);
    }

    fn push_word(&mut self, word: &str) -> Result<(), ChunkError> {
        let budget = self.config.max_bytes;
        if self.fits(word) {
            self.current.push_str(word);
            return Ok(());
        }
        if word.len() <= budget {
            self.flush("");
            self.current.push_str(word);
            return Ok(());
        }
        if !self.config.allow_grapheme_split {
            return Err(ChunkError::WordTooLarge {
                len: word.len(),
                budget,
            });
        }
        for grapheme in word.graphemes(true) {
            if grapheme.len() <= budget {
                self.push_unit(grapheme);
                continue;
            }
            if !self.config.allow_codepoint_split {
                return Err(ChunkError::GraphemeTooLarge {
                    len: grapheme.len(),
                    budget,
                });
            }
            for (i, c) in grapheme.char_indices() {
                let codepoint = &grapheme[i..i + c.len_utf8()];
                if codepoint.len() > budget {
                    return Err(ChunkError::CodepointTooLarge {
                        len: codepoint.len(),
                        budget,
                    });
                }
                self.push_unit(codepoint);
            }
        }
        Ok(())
    }

    fn push_whitespace(&mut self, ws: &str) -> Result<(), ChunkError> {
        if ws.is_empty() {
            return Ok(());
        }
        if self.fits(ws) {
            self.current.push_str(ws);
        } else if !self.current.is_empty() {
            self.flush(ws);
        } else if let Some(last) = self.chunks.last_mut() {
            last.dropped.push_str(ws);
        } else {
            // Oversized leading whitespace has nothing to trail; send it.
            self.push_word(ws)?;
        }
        Ok(())
    }
}

/// Break `text` into chunks of at most `config.max_bytes` bytes.
pub fn split_message(text: &str, config: &ChunkerConfig) -> Result<Vec<Chunk>, ChunkError> {
    let mut builder = Builder {
        config,
        chunks: Vec::new(),
        current: String::new(),
    };
    for (word, ws) in tokenize(text) {
        if !word.is_empty() {
            builder.push_word(word)?;
        }
        builder.push_whitespace(ws)?;
    }
    builder.flush("");
    Ok(builder.chunks)
}
