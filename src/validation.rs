//! Control character checks for outgoing lines.
//!
//! NUL, CR and LF can never appear inside a protocol line. CR and LF end
//! the line early, so anything after them reaches the server as a separate
//! command, and NUL truncates the line on many servers.

use crate::error::{ProtocolError, Result};

/// Characters that are never valid inside a line.
pub const PROTOCOL_CONTROL_CHARS: &[char] = &['\0', '\r', '\n'];

#[inline]
pub fn is_protocol_control_char(c: char) -> bool {
    PROTOCOL_CONTROL_CHARS.contains(&c)
}

/// Check that `line` can be sent as a single protocol line.
///
/// ```
/// use slirc_client::validation::check_line;
///
/// assert!(check_line("PRIVMSG #rust :hello").is_ok());
/// assert!(check_line("PRIVMSG #rust :hi\rQUIT").is_err());
/// ```
pub fn check_line(line: &str) -> Result<()> {
    match line.char_indices().find(|&(_, c)| is_protocol_control_char(c)) {
        Some((position, ch)) => Err(ProtocolError::IllegalControlChar { ch, position }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_lines_pass() {
        assert!(check_line("").is_ok());
        assert!(check_line("PRIVMSG #c :\x02bold\x02 and \x01ACTION\x01").is_ok());
        assert!(check_line("PRIVMSG #c :café ☕").is_ok());
    }

    #[test]
    fn test_reports_first_offender() {
        assert!(matches!(
            check_line("JOIN #a\r\nPART #b"),
            Err(ProtocolError::IllegalControlChar { ch: '\r', position: 7 })
        ));
        assert!(matches!(
            check_line("NICK é\nx"),
            Err(ProtocolError::IllegalControlChar { ch: '\n', position: 7 })
        ));
        assert!(matches!(
            check_line("\0"),
            Err(ProtocolError::IllegalControlChar { ch: '\0', position: 0 })
        ));
    }
}
