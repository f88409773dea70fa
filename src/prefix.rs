//! IRC message prefix (source) splitting.

/// The source of a message split into its parts.
///
/// A prefix is either `nick[!ident]@host` for users or a bare name. Bare
/// names are servers: both `nick` and `hostname` are set to the name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrefixParts<'a> {
    pub nick: &'a str,
    pub ident: &'a str,
    pub hostname: &'a str,
}

impl<'a> PrefixParts<'a> {
    /// Split a raw prefix (without the leading `:`).
    pub fn parse(raw: &'a str) -> Self {
        match raw.split_once('@') {
            Some((user, hostname)) => {
                let (nick, ident) = user.split_once('!').unwrap_or((user, ""));
                PrefixParts {
                    nick,
                    ident,
                    hostname,
                }
            }
            None => match raw.split_once('!') {
                // `nick!ident` without a host is unusual but seen from some bouncers.
                Some((nick, ident)) => PrefixParts {
                    nick,
                    ident,
                    hostname: "",
                },
                None => PrefixParts {
                    nick: raw,
                    ident: "",
                    hostname: raw,
                },
            },
        }
    }

    /// Whether the prefix names a server rather than a user.
    pub fn is_server(&self) -> bool {
        self.ident.is_empty() && self.nick == self.hostname
    }
}
