//! The owned [`Message`] type.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::parse::RawMessage;
use super::tags::{self, TagValue, Tags};
use crate::error::MessageParseError;
use crate::prefix::PrefixParts;

/// A single IRC protocol line in structured form.
///
/// `command` is upper-cased on parse. The trailing parameter, if any, is the
/// last element of `params` and is never split again.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub tags: Tags,
    /// Raw prefix without the leading `:`, empty when absent.
    pub prefix: String,
    pub nick: String,
    pub ident: String,
    pub hostname: String,
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    /// Build an outgoing message from a command and its parameters.
    pub fn new<I, S>(command: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Message {
            command: command.to_ascii_uppercase(),
            params: params.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Add a tag, builder style.
    pub fn with_tag(mut self, key: &str, value: Option<&str>) -> Self {
        let value = match value {
            Some(v) => TagValue::Text(v.to_string()),
            None => TagValue::Flag,
        };
        self.tags.insert(key, value);
        self
    }

    /// Parse one protocol line, returning `None` when it is malformed.
    ///
    /// Carriage returns and a trailing line feed are removed first.
    pub fn parse_line(line: &str) -> Option<Message> {
        line.parse().ok()
    }

    /// The parameter at `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// The last parameter, usually the trailing one.
    pub fn last_param(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Text value of a tag.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.value(key)
    }

    /// Timestamp from the `server-time` tag, when present and valid.
    pub fn server_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.tag("time")?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Whether the message came from a server rather than a user.
    pub fn from_server(&self) -> bool {
        !self.prefix.is_empty() && self.ident.is_empty() && self.nick == self.hostname
    }

    fn from_raw(raw: RawMessage<'_>) -> Self {
        let prefix = raw.prefix.unwrap_or("");
        let parts = PrefixParts::parse(prefix);
        Message {
            tags: raw.tags.map(tags::decode).unwrap_or_default(),
            prefix: prefix.to_string(),
            nick: parts.nick.to_string(),
            ident: parts.ident.to_string(),
            hostname: parts.hostname.to_string(),
            command: raw.command.to_ascii_uppercase(),
            params: raw.params.into_iter().map(str::to_string).collect(),
        }
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.strip_suffix('\n').unwrap_or(s);
        if line.contains('\r') {
            let cleaned = line.replace('\r', "");
            RawMessage::parse(&cleaned).map(Message::from_raw)
        } else {
            RawMessage::parse(line).map(Message::from_raw)
        }
    }
}

fn needs_colon(param: &str) -> bool {
    param.is_empty() || param.starts_with(':') || param.contains(' ')
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.tags.is_empty() {
            write!(f, "@{} ", tags::encode(&self.tags, ";"))?;
        }
        if !self.prefix.is_empty() {
            write!(f, ":{} ", self.prefix)?;
        }
        f.write_str(&self.command)?;
        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                write!(f, " {}", param)?;
            }
            if needs_colon(last) {
                write!(f, " :{}", last)?;
            } else {
                write!(f, " {}", last)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_privmsg_derives_prefix_parts() {
        let msg: Message = ":nick!ident@host.example PRIVMSG #chan :hello world"
            .parse()
            .unwrap();
        assert_eq!(msg.nick, "nick");
        assert_eq!(msg.ident, "ident");
        assert_eq!(msg.hostname, "host.example");
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#chan", "hello world"]);
        assert!(!msg.from_server());
    }

    #[test]
    fn test_command_is_uppercased() {
        let msg = Message::parse_line("privmsg #c :x").unwrap();
        assert_eq!(msg.command, "PRIVMSG");
    }

    #[test]
    fn test_crlf_stripped() {
        let msg = Message::parse_line("PING :server\r\n").unwrap();
        assert_eq!(msg.params, vec!["server"]);
    }

    #[test]
    fn test_malformed_line_is_none() {
        assert!(Message::parse_line("").is_none());
        assert!(Message::parse_line("@only=tags").is_none());
        assert!(Message::parse_line(":prefix.only").is_none());
    }

    #[test]
    fn test_server_time() {
        let msg =
            Message::parse_line("@time=2023-01-01T12:00:00.000Z :n!u@h PRIVMSG #c :x").unwrap();
        let time = msg.server_time().unwrap();
        assert_eq!(time.to_rfc3339(), "2023-01-01T12:00:00+00:00");
    }

    #[test]
    fn test_display_roundtrip() {
        let msg = Message::new("PRIVMSG", ["#chan", "hello world"]).with_tag("+typing", None);
        assert_eq!(msg.to_string(), "@+typing PRIVMSG #chan :hello world");

        let msg = Message::new("NICK", ["alice"]);
        assert_eq!(msg.to_string(), "NICK alice");

        let msg = Message::new("PRIVMSG", ["#c", ":)"]);
        assert_eq!(msg.to_string(), "PRIVMSG #c ::)");
        let reparsed = Message::parse_line(&msg.to_string()).unwrap();
        assert_eq!(reparsed.params, vec!["#c", ":)"]);
    }

    #[test]
    fn test_display_empty_trailing() {
        let msg = Message::new("TOPIC", ["#c", ""]);
        assert_eq!(msg.to_string(), "TOPIC #c :");
    }
}
