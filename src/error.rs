//! Error types for the IRC client engine.
//!
//! This module defines error types for wire-level failures, message
//! parsing, outgoing message chunking and the connection driver.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Wire-level errors raised while reading from or writing to a server.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer sent more than `limit` bytes without a line terminator.
    #[error("line buffer overflow: more than {limit} bytes without a terminator")]
    BufferOverflow {
        /// The configured maximum unterminated buffer size.
        limit: usize,
    },

    /// An outgoing line holds NUL, CR or LF and would break framing.
    #[error("illegal control character {ch:?} at byte {position}")]
    IllegalControlChar {
        /// The offending character.
        ch: char,
        /// Byte offset in the line.
        position: usize,
    },

    /// Failed to parse an IRC message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The raw message string.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors encountered when parsing IRC messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Message was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Command was invalid or missing.
    #[error("invalid command")]
    InvalidCommand,

    /// Bytes were left over after the grammar finished.
    #[error("unexpected input at position {position}")]
    TrailingInput {
        /// Byte offset of the first unconsumed character.
        position: usize,
    },
}

/// Errors raised by the outgoing message chunker.
///
/// Each variant names the fallback level that would have been needed to
/// keep a chunk inside the byte budget.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChunkError {
    /// A single word exceeds the budget and grapheme splitting is disabled.
    #[error("word of {len} bytes exceeds the {budget} byte budget")]
    WordTooLarge {
        /// Size of the offending word in bytes.
        len: usize,
        /// The configured budget.
        budget: usize,
    },

    /// A single grapheme cluster exceeds the budget and codepoint splitting is disabled.
    #[error("grapheme cluster of {len} bytes exceeds the {budget} byte budget")]
    GraphemeTooLarge {
        /// Size of the offending grapheme cluster in bytes.
        len: usize,
        /// The configured budget.
        budget: usize,
    },

    /// A single codepoint exceeds the budget.
    #[error("codepoint of {len} bytes exceeds the {budget} byte budget")]
    CodepointTooLarge {
        /// Size of the offending codepoint in bytes.
        len: usize,
        /// The configured budget.
        budget: usize,
    },
}

/// Errors surfaced by the connection driver.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The transport failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Outgoing text could not be split into protocol-legal chunks.
    #[error(transparent)]
    Chunk(#[from] ChunkError),

    /// TLS configuration or handshake failure.
    #[error("tls error: {0}")]
    Tls(String),

    /// SOCKS proxy negotiation failed.
    #[error("socks error: {0}")]
    Socks(String),

    /// The client task is gone.
    #[error("client is no longer running")]
    Closed,
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Protocol(ProtocolError::Io(err))
    }
}
