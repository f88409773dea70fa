//! Server feature advertisement (`RPL_ISUPPORT`, numeric 005).
//!
//! A server may send many 005 lines; [`NetworkInfo::apply_isupport`] folds
//! each one into the running state. A `-TOKEN` parameter withdraws a
//! previously advertised token and restores its default.

use std::collections::HashMap;

use crate::casemap::CaseMapping;

/// Value of an advertised ISUPPORT token.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OptionValue {
    /// Token advertised without `=`.
    Flag,
    /// Single value.
    Text(String),
    /// Comma-separated value.
    List(Vec<String>),
}

impl OptionValue {
    fn parse(raw: &str) -> Self {
        let value = unescape_value(raw);
        if value.contains(',') {
            OptionValue::List(value.split(',').map(str::to_string).collect())
        } else {
            OptionValue::Text(value)
        }
    }

    /// The value as a single string; lists are re-joined with `,`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            OptionValue::Flag => None,
            OptionValue::Text(s) => Some(s.clone()),
            OptionValue::List(items) => Some(items.join(",")),
        }
    }
}

/// Decode the `\xHH` escapes servers use inside token values.
fn unescape_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find("\\x") {
        out.push_str(&rest[..pos]);
        let hex = rest.get(pos + 2..pos + 4);
        match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
            Some(byte) if byte.is_ascii() => {
                out.push(byte as char);
                rest = &rest[pos + 4..];
            }
            _ => {
                out.push_str("\\x");
                rest = &rest[pos + 2..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// One entry of the `PREFIX` table, ordered from highest rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrefixMode {
    /// Nick prefix symbol, e.g. `@`.
    pub symbol: char,
    /// Channel mode letter, e.g. `o`.
    pub mode: char,
}

/// `CHANMODES` groups A to D.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChanModes {
    /// List modes; always take a parameter.
    pub a: String,
    /// Always take a parameter.
    pub b: String,
    /// Take a parameter only when set.
    pub c: String,
    /// Never take a parameter.
    pub d: String,
}

impl ChanModes {
    /// Parse `A,B,C,D`. Missing trailing groups are empty; extra groups are
    /// ignored.
    pub fn parse(s: &str) -> Self {
        let mut parts = s.split(',');
        let mut next = || parts.next().unwrap_or("").to_string();
        ChanModes {
            a: next(),
            b: next(),
            c: next(),
            d: next(),
        }
    }
}

impl Default for ChanModes {
    fn default() -> Self {
        ChanModes::parse("beI,k,l,imnpst")
    }
}

/// Parse `(modes)symbols`. Returns `None` unless both halves are present and
/// of equal length.
pub fn parse_prefix(s: &str) -> Option<Vec<PrefixMode>> {
    let inner = s.strip_prefix('(')?;
    let (modes, symbols) = inner.split_once(')')?;
    if modes.chars().count() != symbols.chars().count() {
        return None;
    }
    Some(
        modes
            .chars()
            .zip(symbols.chars())
            .map(|(mode, symbol)| PrefixMode { symbol, mode })
            .collect(),
    )
}

fn default_prefix() -> Vec<PrefixMode> {
    parse_prefix("(qaohv)~&@%+").unwrap_or_default()
}

const DEFAULT_CHANTYPES: &str = "#&";

/// Per-connection view of what the server supports.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkInfo {
    /// Server name from the 001/004/005 prefix.
    pub server: String,
    /// `NETWORK` token.
    pub name: String,
    options: HashMap<String, OptionValue>,
    pub prefix: Vec<PrefixMode>,
    pub chanmodes: ChanModes,
    pub chantypes: String,
    pub casemapping: CaseMapping,
    client_tag_deny: Vec<String>,
}

impl Default for NetworkInfo {
    fn default() -> Self {
        NetworkInfo {
            server: String::new(),
            name: String::new(),
            options: HashMap::new(),
            prefix: default_prefix(),
            chanmodes: ChanModes::default(),
            chantypes: DEFAULT_CHANTYPES.to_string(),
            casemapping: CaseMapping::default(),
            client_tag_deny: Vec::new(),
        }
    }
}

impl NetworkInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one 005 reply into this state.
    ///
    /// `params` are the message parameters: the client's nick first, the
    /// human-readable trailer last.
    pub fn apply_isupport(&mut self, params: &[String]) {
        let mut tokens = params.get(1..).unwrap_or(&[]);
        if let Some(last) = tokens.last() {
            if last.contains(' ') {
                tokens = &tokens[..tokens.len() - 1];
            }
        }
        for token in tokens {
            self.apply_token(token);
        }
    }

    fn apply_token(&mut self, token: &str) {
        if token.is_empty() {
            return;
        }
        if let Some(name) = token.strip_prefix('-') {
            let name = name.to_ascii_uppercase();
            self.options.remove(&name);
            self.reset_special(&name);
            return;
        }

        let (name, value) = match token.split_once('=') {
            Some((k, v)) => (k.to_ascii_uppercase(), OptionValue::parse(v)),
            None => (token.to_ascii_uppercase(), OptionValue::Flag),
        };
        let text = value.as_text().unwrap_or_default();

        match name.as_str() {
            "PREFIX" => match parse_prefix(&text) {
                Some(table) => self.prefix = table,
                None if text.is_empty() => self.prefix.clear(),
                None => {}
            },
            "CHANMODES" => self.chanmodes = ChanModes::parse(&text),
            "CHANTYPES" => self.chantypes = text.clone(),
            "CASEMAPPING" => self.casemapping = CaseMapping::from_token(&text),
            "NETWORK" => self.name = text.clone(),
            "CLIENTTAGDENY" => {
                self.client_tag_deny = text
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {}
        }
        self.options.insert(name, value);
    }

    fn reset_special(&mut self, name: &str) {
        match name {
            "PREFIX" => self.prefix = default_prefix(),
            "CHANMODES" => self.chanmodes = ChanModes::default(),
            "CHANTYPES" => self.chantypes = DEFAULT_CHANTYPES.to_string(),
            "CASEMAPPING" => self.casemapping = CaseMapping::default(),
            "NETWORK" => self.name.clear(),
            "CLIENTTAGDENY" => self.client_tag_deny.clear(),
            _ => {}
        }
    }

    /// Raw value of a token, if advertised.
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(&name.to_ascii_uppercase())
    }

    /// Whether a token is currently advertised.
    pub fn supports(&self, name: &str) -> bool {
        self.option(name).is_some()
    }

    /// All advertised tokens.
    pub fn options(&self) -> &HashMap<String, OptionValue> {
        &self.options
    }

    /// Whether `target` names a channel under `CHANTYPES`.
    pub fn is_channel(&self, target: &str) -> bool {
        target
            .chars()
            .next()
            .map_or(false, |c| self.chantypes.contains(c))
    }

    /// Fold a nick or channel name with the server's case mapping.
    pub fn fold(&self, name: &str) -> String {
        self.casemapping.fold(name)
    }

    /// Mode letter for a nick prefix symbol.
    pub fn mode_for_symbol(&self, symbol: char) -> Option<char> {
        self.prefix.iter().find(|p| p.symbol == symbol).map(|p| p.mode)
    }

    /// Whether `mode` is a prefix (membership) mode.
    pub fn is_prefix_mode(&self, mode: char) -> bool {
        self.prefix.iter().any(|p| p.mode == mode)
    }

    /// Strip leading prefix symbols from a NAMES entry, returning the mode
    /// letters and the remainder.
    pub fn split_user_prefixes<'a>(&self, entry: &'a str) -> (Vec<char>, &'a str) {
        let mut modes = Vec::new();
        let mut rest = entry;
        while let Some(c) = rest.chars().next() {
            match self.mode_for_symbol(c) {
                Some(mode) => {
                    modes.push(mode);
                    rest = &rest[c.len_utf8()..];
                }
                None => break,
            }
        }
        (modes, rest)
    }

    /// Whether the server accepts the given client-only tag.
    ///
    /// `CLIENTTAGDENY=*,-a` denies everything except `a`; a plain list denies
    /// only the listed names.
    pub fn client_tag_allowed(&self, tag: &str) -> bool {
        let name = tag.strip_prefix('+').unwrap_or(tag);
        let deny = &self.client_tag_deny;
        if deny.iter().any(|d| d == "*") {
            deny.iter().any(|d| d.strip_prefix('-') == Some(name))
        } else {
            !deny.iter().any(|d| d == name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(line: &str) -> Vec<String> {
        let mut p: Vec<String> = std::iter::once("me".to_string())
            .chain(line.split(' ').map(str::to_string))
            .collect();
        p.push("are supported by this server".to_string());
        p
    }

    #[test]
    fn test_defaults() {
        let info = NetworkInfo::new();
        assert_eq!(info.chantypes, "#&");
        assert_eq!(info.chanmodes.a, "beI");
        assert_eq!(info.prefix.len(), 5);
        assert_eq!(info.casemapping, CaseMapping::Rfc1459);
    }

    #[test]
    fn test_apply_tokens() {
        let mut info = NetworkInfo::new();
        info.apply_isupport(&params(
            "PREFIX=(ov)@+ CHANMODES=b,k,l,mnt CHANTYPES=# NETWORK=Example CASEMAPPING=ascii EXCEPTS",
        ));
        assert_eq!(
            info.prefix,
            vec![
                PrefixMode { symbol: '@', mode: 'o' },
                PrefixMode { symbol: '+', mode: 'v' }
            ]
        );
        assert_eq!(info.chanmodes.d, "mnt");
        assert_eq!(info.name, "Example");
        assert_eq!(info.casemapping, CaseMapping::Ascii);
        assert_eq!(info.option("excepts"), Some(&OptionValue::Flag));
        assert!(info.is_channel("#rust"));
        assert!(!info.is_channel("&local"));
    }

    #[test]
    fn test_incremental_and_removal() {
        let mut info = NetworkInfo::new();
        info.apply_isupport(&params("NETWORK=One MODES=4"));
        info.apply_isupport(&params("CHANTYPES=#"));
        assert!(info.supports("MODES"));
        assert_eq!(info.chantypes, "#");

        info.apply_isupport(&params("-MODES -CHANTYPES"));
        assert!(!info.supports("MODES"));
        assert_eq!(info.chantypes, "#&");
        assert_eq!(info.name, "One");
    }

    #[test]
    fn test_list_values_and_escapes() {
        let mut info = NetworkInfo::new();
        info.apply_isupport(&params("TARGMAX=PRIVMSG:4,NOTICE:4 NETWORK=Some\\x20Net"));
        assert_eq!(
            info.option("TARGMAX"),
            Some(&OptionValue::List(vec![
                "PRIVMSG:4".to_string(),
                "NOTICE:4".to_string()
            ]))
        );
        assert_eq!(info.name, "Some Net");
    }

    #[test]
    fn test_split_user_prefixes() {
        let info = NetworkInfo::new();
        let (modes, nick) = info.split_user_prefixes("@+alice");
        assert_eq!(modes, vec!['o', 'v']);
        assert_eq!(nick, "alice");
    }

    #[test]
    fn test_client_tag_deny() {
        let mut info = NetworkInfo::new();
        assert!(info.client_tag_allowed("+typing"));

        info.apply_isupport(&params("CLIENTTAGDENY=*,-draft/react"));
        assert!(!info.client_tag_allowed("+typing"));
        assert!(info.client_tag_allowed("+draft/react"));

        info.apply_isupport(&params("CLIENTTAGDENY=typing"));
        assert!(!info.client_tag_allowed("+typing"));
        assert!(info.client_tag_allowed("+draft/react"));
    }
}
