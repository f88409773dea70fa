//! Client-To-Client Protocol framing.
//!
//! A CTCP message is a PRIVMSG or NOTICE body wrapped in `\x01`:
//! `\x01TYPE args\x01`. The closing delimiter is optional on the wire.

const DELIM: char = '\x01';

/// A decoded CTCP payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// Upper-cased command, e.g. `VERSION` or `ACTION`.
    pub kind: String,
    /// Everything after the first space, possibly empty.
    pub args: &'a str,
}

impl<'a> Ctcp<'a> {
    /// Decode a message body, returning `None` when it is not CTCP.
    pub fn parse(body: &'a str) -> Option<Self> {
        let inner = body.strip_prefix(DELIM)?;
        let inner = inner.strip_suffix(DELIM).unwrap_or(inner);
        let (kind, args) = inner.split_once(' ').unwrap_or((inner, ""));
        if kind.is_empty() {
            return None;
        }
        Some(Ctcp {
            kind: kind.to_ascii_uppercase(),
            args,
        })
    }
}

/// Wrap a CTCP command and its arguments.
pub fn encode(kind: &str, args: &str) -> String {
    if args.is_empty() {
        format!("{DELIM}{kind}{DELIM}")
    } else {
        format!("{DELIM}{kind} {args}{DELIM}")
    }
}

/// Bytes [`encode`] adds around non-empty arguments.
pub fn framing_len(kind: &str) -> usize {
    kind.len() + 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing_len() {
        assert_eq!(encode("ACTION", "x").len(), framing_len("ACTION") + 1);
    }

    #[test]
    fn test_parse_action() {
        let ctcp = Ctcp::parse("\x01ACTION waves hello\x01").unwrap();
        assert_eq!(ctcp.kind, "ACTION");
        assert_eq!(ctcp.args, "waves hello");
    }

    #[test]
    fn test_parse_without_closing_delim() {
        let ctcp = Ctcp::parse("\x01version").unwrap();
        assert_eq!(ctcp.kind, "VERSION");
        assert_eq!(ctcp.args, "");
    }

    #[test]
    fn test_not_ctcp() {
        assert!(Ctcp::parse("hello").is_none());
        assert!(Ctcp::parse("\x01\x01").is_none());
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("VERSION", ""), "\x01VERSION\x01");
        assert_eq!(encode("ACTION", "dances"), "\x01ACTION dances\x01");
    }
}
