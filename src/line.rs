//! Line framing for the IRC byte stream.
//!
//! [`LineFramer`] is the sans-IO framer: feed it arbitrary chunks and it
//! hands back complete lines. [`LineCodec`] wraps the same scan as a
//! `tokio_util` codec and adds text decoding through `encoding_rs`.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use encoding::Encoding;
use tracing::warn;

use crate::error::{ProtocolError, Result};
use crate::validation::check_line;

/// Default maximum size of an unterminated line buffer.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1024;

/// ASCII probe used to validate an encoding before switching to it.
const ENCODING_PROBE: &str = "PRIVMSG #test :ascii probe 0123456789 ~!@";

/// Terminator search and overflow bookkeeping shared by both framers.
#[derive(Debug, Clone)]
struct LineScanner {
    terminator: Vec<u8>,
    max_buffer_size: usize,
    poisoned: bool,
}

impl LineScanner {
    fn new(max_buffer_size: usize) -> Self {
        LineScanner {
            terminator: b"\n".to_vec(),
            max_buffer_size,
            poisoned: false,
        }
    }

    fn find_terminator(&self, buf: &[u8]) -> Option<usize> {
        match self.terminator.as_slice() {
            [single] => buf.iter().position(|b| b == single),
            term => buf.windows(term.len()).position(|w| w == term),
        }
    }

    /// Pull the next complete line out of `buf`.
    fn next_line(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>> {
        if self.poisoned {
            buf.clear();
            return Ok(None);
        }
        if let Some(pos) = self.find_terminator(buf) {
            let line = buf.split_to(pos).freeze();
            buf.advance(self.terminator.len());
            return Ok(Some(line));
        }
        if buf.len() > self.max_buffer_size {
            warn!(
                bytes = buf.len(),
                limit = self.max_buffer_size,
                "discarding unterminated line buffer"
            );
            buf.clear();
            self.poisoned = true;
            return Err(ProtocolError::BufferOverflow {
                limit: self.max_buffer_size,
            });
        }
        Ok(None)
    }
}

/// Lines completed by one [`LineFramer::push`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Frames {
    /// Complete lines in arrival order, without terminators.
    pub lines: Vec<Bytes>,
    /// The unterminated tail grew past the limit during this push.
    pub overflow: bool,
}

impl Frames {
    /// The overflow as an error, for callers that stop on it.
    pub fn overflow_error(&self, limit: usize) -> Option<ProtocolError> {
        self.overflow.then_some(ProtocolError::BufferOverflow { limit })
    }
}

/// Incremental line splitter over arbitrary byte chunks.
///
/// Once the unterminated tail grows past the limit the framer reports
/// `overflow` a single time and then yields nothing until
/// [`reset`](Self::reset). Lines completed before the oversized tail are
/// still returned.
#[derive(Debug, Clone)]
pub struct LineFramer {
    buf: BytesMut,
    scanner: LineScanner,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFER_SIZE)
    }
}

impl LineFramer {
    pub fn new(max_buffer_size: usize) -> Self {
        LineFramer {
            buf: BytesMut::new(),
            scanner: LineScanner::new(max_buffer_size),
        }
    }

    /// Use a different line terminator. An empty terminator is ignored.
    pub fn with_terminator(mut self, terminator: &[u8]) -> Self {
        if !terminator.is_empty() {
            self.scanner.terminator = terminator.to_vec();
        }
        self
    }

    /// Append a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Frames {
        let mut frames = Frames::default();
        if self.scanner.poisoned {
            return frames;
        }
        self.buf.extend_from_slice(chunk);
        loop {
            match self.scanner.next_line(&mut self.buf) {
                Ok(Some(line)) => frames.lines.push(line),
                Ok(None) => break,
                Err(_) => {
                    frames.overflow = true;
                    break;
                }
            }
        }
        frames
    }

    pub fn max_buffer_size(&self) -> usize {
        self.scanner.max_buffer_size
    }

    /// Bytes held back waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn is_poisoned(&self) -> bool {
        self.scanner.poisoned
    }

    /// Drop buffered bytes and clear the overflow state.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.scanner.poisoned = false;
    }
}

/// Look up an encoding and check that it is ASCII-transparent.
///
/// The probe string must encode to identical bytes and decode back
/// unchanged; encodings that fail this cannot carry IRC framing.
pub fn resolve_encoding(label: &str) -> Option<&'static Encoding> {
    let encoding = Encoding::for_label(label.trim().as_bytes())?;
    let (encoded, _, had_errors) = encoding.encode(ENCODING_PROBE);
    if had_errors || encoded.as_ref() != ENCODING_PROBE.as_bytes() {
        return None;
    }
    let (decoded, had_errors) = encoding.decode_without_bom_handling(&encoded);
    if had_errors || decoded != ENCODING_PROBE {
        return None;
    }
    Some(encoding)
}

/// Line codec with a configurable text encoding.
#[derive(Debug, Clone)]
pub struct LineCodec {
    scanner: LineScanner,
    encoding: &'static Encoding,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFER_SIZE)
    }
}

impl LineCodec {
    pub fn new(max_buffer_size: usize) -> Self {
        LineCodec {
            scanner: LineScanner::new(max_buffer_size),
            encoding: encoding::UTF_8,
        }
    }

    /// Switch the text encoding. Returns `false` and keeps the current
    /// encoding when `label` is unknown or not ASCII-transparent.
    pub fn set_encoding(&mut self, label: &str) -> bool {
        match resolve_encoding(label) {
            Some(encoding) => {
                self.encoding = encoding;
                true
            }
            None => {
                warn!(label, "rejecting unusable encoding");
                false
            }
        }
    }

    pub fn encoding(&self) -> &'static str {
        self.encoding.name()
    }

    /// Decode one framed line, dropping any trailing CR.
    pub fn decode_line(&self, line: &[u8]) -> String {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let (text, _) = self.encoding.decode_without_bom_handling(line);
        text.into_owned()
    }

    /// Encode one line and append CRLF. A line holding NUL, CR or LF is
    /// refused and nothing is written.
    pub fn encode_line(&self, line: &str, dst: &mut BytesMut) -> Result<()> {
        check_line(line)?;
        let (bytes, _, _) = self.encoding.encode(line);
        dst.reserve(bytes.len() + 2);
        dst.put_slice(&bytes);
        dst.put_slice(b"\r\n");
        Ok(())
    }

    pub fn reset(&mut self) {
        self.scanner.poisoned = false;
    }
}

#[cfg(feature = "tokio")]
impl tokio_util::codec::Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self
            .scanner
            .next_line(src)?
            .map(|line| self.decode_line(&line)))
    }
}

#[cfg(feature = "tokio")]
impl tokio_util::codec::Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode_line(&item, dst)
    }
}
