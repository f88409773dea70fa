//! IRCv3 message tag codec.
//!
//! Tags travel as `key=value` pairs separated by `;`, with values escaped
//! so that they never contain a raw `;`, space, CR, LF or backslash.

use std::fmt::{Result as FmtResult, Write};

/// Value of a single message tag.
///
/// A tag without `=` on the wire is a flag and carries the boolean `true`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TagValue {
    /// Key present without a value.
    Flag,
    /// Key with an (unescaped) text value, possibly empty.
    Text(String),
}

impl TagValue {
    /// The text value, or `None` for flags.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Flag => None,
            Self::Text(s) => Some(s),
        }
    }
}

/// Ordered tag mapping with case-insensitive, de-duplicated keys.
///
/// Keys are stored lower-cased. Inserting an existing key replaces its
/// value in place (last write wins) and keeps the original position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tags {
    entries: Vec<(String, TagValue)>,
}

impl Tags {
    /// Create an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tag.
    pub fn insert(&mut self, key: &str, value: TagValue) {
        let key = key.to_ascii_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Look up a tag by key, ignoring ASCII case.
    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// Text value of a tag, `None` for missing tags and flags.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(TagValue::as_str)
    }

    /// Whether the tag is present at all.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove a tag, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<TagValue> {
        let pos = self
            .entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))?;
        Some(self.entries.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: AsRef<str>> FromIterator<(K, TagValue)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, TagValue)>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for (k, v) in iter {
            tags.insert(k.as_ref(), v);
        }
        tags
    }
}

/// Escape a tag value for serialization.
///
/// Escapes special characters according to the IRCv3 message-tags spec.
pub fn escape_tag_value(f: &mut dyn Write, value: &str) -> FmtResult {
    for c in value.chars() {
        match c {
            ';' => f.write_str("\\:")?,
            ' ' => f.write_str("\\s")?,
            '\\' => f.write_str("\\\\")?,
            '\r' => f.write_str("\\r")?,
            '\n' => f.write_str("\\n")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

/// Unescape a tag value from wire format.
///
/// A backslash that does not start a recognised escape is removed, as is a
/// trailing lone backslash.
pub fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        let r = if c == '\\' {
            match iter.next() {
                Some(':') => ';',
                Some('s') => ' ',
                Some('\\') => '\\',
                Some('r') => '\r',
                Some('n') => '\n',
                Some(c) => c,
                None => break,
            }
        } else {
            c
        };
        unescaped.push(r);
    }
    unescaped
}

/// Decode a raw tag block (without the leading `@`).
///
/// Empty segments are skipped. Keys are lower-cased; duplicates keep the
/// last value.
pub fn decode(raw: &str) -> Tags {
    let mut tags = Tags::new();
    for segment in raw.split(';') {
        if segment.is_empty() {
            continue;
        }
        match segment.split_once('=') {
            Some((key, value)) => tags.insert(key, TagValue::Text(unescape_tag_value(value))),
            None => tags.insert(segment, TagValue::Flag),
        }
    }
    tags
}

/// Encode a tag mapping, joining entries with `separator`.
///
/// Flags are written as a bare key.
pub fn encode(tags: &Tags, separator: &str) -> String {
    let mut out = String::new();
    for (i, (key, value)) in tags.iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        out.push_str(key);
        if let TagValue::Text(text) = value {
            out.push('=');
            // Writing into a String cannot fail.
            let _ = escape_tag_value(&mut out, text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_semicolon() {
        assert_eq!(unescape_tag_value("a\\:b"), "a;b");
    }

    #[test]
    fn test_unescape_space() {
        assert_eq!(unescape_tag_value("hello\\sworld"), "hello world");
    }

    #[test]
    fn test_unescape_combined() {
        let input = "a\\:b\\sc\\\\d\\re\\nf";
        let expected = "a;b c\\d\re\nf";
        assert_eq!(unescape_tag_value(input), expected);
    }

    #[test]
    fn test_unescape_trailing_backslash() {
        assert_eq!(unescape_tag_value("test\\"), "test");
    }

    #[test]
    fn test_unescape_unknown_escape() {
        // \x becomes x
        assert_eq!(unescape_tag_value("a\\xb"), "axb");
    }

    #[test]
    fn test_decode_flags_and_values() {
        let tags = decode("Account=alice;+draft/typing;time=2023-01-01T00:00:00Z");
        assert_eq!(tags.len(), 3);
        assert_eq!(tags.value("account"), Some("alice"));
        assert_eq!(tags.get("+draft/typing"), Some(&TagValue::Flag));
        assert_eq!(tags.value("TIME"), Some("2023-01-01T00:00:00Z"));
    }

    #[test]
    fn test_decode_last_write_wins() {
        let tags = decode("a=1;B=2;A=3");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.value("a"), Some("3"));
        let keys: Vec<_> = tags.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_decode_empty_value_is_text() {
        let tags = decode("key=");
        assert_eq!(tags.get("key"), Some(&TagValue::Text(String::new())));
    }

    #[test]
    fn test_encode_omits_flag_values() {
        let tags: Tags = vec![
            ("msgid", TagValue::Text("a b;c".to_string())),
            ("+typing", TagValue::Flag),
        ]
        .into_iter()
        .collect();
        assert_eq!(encode(&tags, ";"), "msgid=a\\sb\\:c;+typing");
        assert_eq!(encode(&tags, " "), "msgid=a\\sb\\:c +typing");
    }

    #[test]
    fn test_escape_roundtrip() {
        let test_values = vec![
            "simple",
            "with space",
            "with;semicolon",
            "with\\backslash",
            "with\nnewline",
            "with\rcarriage",
            "complex; \\ \n \r all",
        ];

        for original in test_values {
            let mut escaped = String::new();
            escape_tag_value(&mut escaped, original).unwrap();
            let unescaped = unescape_tag_value(&escaped);
            assert_eq!(
                unescaped, original,
                "Roundtrip failed: '{}' -> '{}' -> '{}'",
                original, escaped, unescaped
            );
        }
    }
}
