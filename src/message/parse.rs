//! Nom-based IRC line grammar.
//!
//! ```text
//! [@tags SP] [:prefix SP] command [SP middle]* [SP :trailing]
//! ```
//!
//! `command` is either a run of ASCII letters or exactly three digits.
//! Middle parameters never start with `:` and never contain a space; the
//! trailing parameter may contain spaces and is always last.

use nom::{
    branch::alt,
    bytes::complete::{take_till1, take_while1},
    character::complete::char,
    combinator::{opt, verify},
    sequence::{preceded, terminated},
    IResult,
};

use crate::error::MessageParseError;

type ParseResult<'a, O> = IResult<&'a str, O>;

/// A line split into its grammar components, borrowing from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage<'a> {
    /// Raw tag block without the leading `@`.
    pub tags: Option<&'a str>,
    /// Raw prefix without the leading `:`.
    pub prefix: Option<&'a str>,
    /// Command verb or numeric, as sent.
    pub command: &'a str,
    /// Middle parameters followed by the trailing parameter, if any.
    pub params: Vec<&'a str>,
}

fn spaces(input: &str) -> ParseResult<'_, &str> {
    take_while1(|c: char| c == ' ')(input)
}

fn tags(input: &str) -> ParseResult<'_, &str> {
    terminated(preceded(char('@'), take_till1(|c: char| c == ' ')), spaces)(input)
}

fn prefix(input: &str) -> ParseResult<'_, &str> {
    terminated(preceded(char(':'), take_till1(|c: char| c == ' ')), spaces)(input)
}

fn command(input: &str) -> ParseResult<'_, &str> {
    alt((
        take_while1(|c: char| c.is_ascii_alphabetic()),
        verify(take_while1(|c: char| c.is_ascii_digit()), |s: &str| {
            s.len() == 3
        }),
    ))(input)
}

fn params(mut input: &str) -> ParseResult<'_, Vec<&str>> {
    let mut params = Vec::new();
    loop {
        let rest = match spaces(input) {
            Ok((rest, _)) => rest,
            Err(_) => return Ok((input, params)),
        };
        if rest.is_empty() {
            return Ok((rest, params));
        }
        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing);
            return Ok(("", params));
        }
        let (rest, middle) = take_till1(|c: char| c == ' ')(rest)?;
        params.push(middle);
        input = rest;
    }
}

fn raw_message(input: &str) -> ParseResult<'_, RawMessage<'_>> {
    let (input, tags) = opt(tags)(input)?;
    let (input, prefix) = opt(prefix)(input)?;
    let (input, command) = command(input)?;
    let (input, params) = params(input)?;
    Ok((
        input,
        RawMessage {
            tags,
            prefix,
            command,
            params,
        },
    ))
}

impl<'a> RawMessage<'a> {
    /// Split a single line (already stripped of CR/LF) into its components.
    pub fn parse(line: &'a str) -> Result<Self, MessageParseError> {
        if line.is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }
        match raw_message(line) {
            Ok(("", msg)) => Ok(msg),
            Ok((rest, _)) => Err(MessageParseError::TrailingInput {
                position: line.len() - rest.len(),
            }),
            Err(_) => Err(MessageParseError::InvalidCommand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_command() {
        let msg = RawMessage::parse("PING").unwrap();
        assert_eq!(msg.command, "PING");
        assert!(msg.tags.is_none());
        assert!(msg.prefix.is_none());
        assert!(msg.params.is_empty());
    }

    #[test]
    fn test_parse_with_prefix_and_trailing() {
        let msg = RawMessage::parse(":nick!user@host PRIVMSG #channel :Hello, world!").unwrap();
        assert_eq!(msg.prefix, Some("nick!user@host"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#channel", "Hello, world!"]);
    }

    #[test]
    fn test_parse_with_tags() {
        let msg = RawMessage::parse("@time=2023-01-01T00:00:00Z :nick PRIVMSG #ch :Hi").unwrap();
        assert_eq!(msg.tags, Some("time=2023-01-01T00:00:00Z"));
        assert_eq!(msg.prefix, Some("nick"));
    }

    #[test]
    fn test_parse_numeric_must_be_three_digits() {
        assert!(RawMessage::parse(":server 001 nick :Welcome").is_ok());
        assert!(RawMessage::parse(":server 01 nick :Welcome").is_err());
        assert!(RawMessage::parse(":server 0001 nick :Welcome").is_err());
    }

    #[test]
    fn test_parse_empty_trailing() {
        let msg = RawMessage::parse("PRIVMSG #channel :").unwrap();
        assert_eq!(msg.params, vec!["#channel", ""]);
    }

    #[test]
    fn test_parse_trailing_keeps_colons_and_spaces() {
        let msg = RawMessage::parse("PRIVMSG #c :a :b  c ").unwrap();
        assert_eq!(msg.params, vec!["#c", "a :b  c "]);
    }

    #[test]
    fn test_parse_tolerates_repeated_spaces() {
        let msg = RawMessage::parse(":srv  MODE   #c +o  nick ").unwrap();
        assert_eq!(msg.params, vec!["#c", "+o", "nick"]);
    }

    #[test]
    fn test_tag_only_line_is_malformed() {
        assert_eq!(
            RawMessage::parse("@a=b"),
            Err(MessageParseError::InvalidCommand)
        );
        assert_eq!(
            RawMessage::parse("@a=b "),
            Err(MessageParseError::InvalidCommand)
        );
    }

    #[test]
    fn test_garbage_after_command_is_malformed() {
        assert_eq!(
            RawMessage::parse("PRIVMSG#chan"),
            Err(MessageParseError::TrailingInput { position: 7 })
        );
    }
}
