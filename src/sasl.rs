//! SASL authentication helpers for IRC.
//!
//! Only the PLAIN mechanism is driven by the client. Mechanism lists from
//! `CAP LS` (`sasl=PLAIN,EXTERNAL`) and `RPL_SASLMECHS` are parsed so the
//! negotiator can tell whether PLAIN is on offer.
//!
//! # Reference
//! - IRCv3 SASL: <https://ircv3.net/specs/extensions/sasl-3.2>
//! - RFC 4616 (PLAIN): <https://tools.ietf.org/html/rfc4616>

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Maximum length of a single SASL message chunk (400 bytes).
///
/// SASL responses that exceed this length must be split into multiple
/// AUTHENTICATE commands.
pub const SASL_CHUNK_SIZE: usize = 400;

/// Account name and password used for SASL PLAIN.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SaslCredentials {
    pub account: String,
    pub password: String,
}

impl SaslCredentials {
    pub fn new(account: impl Into<String>, password: impl Into<String>) -> Self {
        SaslCredentials {
            account: account.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for SaslCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaslCredentials")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// SASL authentication mechanisms.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SaslMechanism {
    /// PLAIN mechanism (RFC 4616) - simple username/password.
    Plain,
    /// EXTERNAL mechanism - uses TLS client certificate.
    External,
    /// Anything else.
    Unknown(String),
}

impl SaslMechanism {
    /// Parse a mechanism name string.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "PLAIN" => Self::Plain,
            "EXTERNAL" => Self::External,
            _ => Self::Unknown(name.to_owned()),
        }
    }

    /// Returns the canonical name of this mechanism.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain => "PLAIN",
            Self::External => "EXTERNAL",
            Self::Unknown(s) => s,
        }
    }
}

impl std::fmt::Display for SaslMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a comma-separated mechanism list.
pub fn parse_mechanisms(list: &str) -> Vec<SaslMechanism> {
    list.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(SaslMechanism::parse)
        .collect()
}

/// Encode credentials for the PLAIN mechanism.
///
/// The account is sent as both the authorization and authentication
/// identity: `account NUL account NUL password`.
pub fn encode_plain(account: &str, password: &str) -> String {
    let payload = format!("{}\0{}\0{}", account, account, password);
    BASE64.encode(payload.as_bytes())
}

/// Split an encoded SASL response into `AUTHENTICATE` arguments.
///
/// A payload whose length is an exact multiple of [`SASL_CHUNK_SIZE`]
/// (including the empty payload) is terminated by a bare `+`.
pub fn authenticate_chunks(encoded: &str) -> Vec<String> {
    // base64 output is ASCII, so byte chunks are valid str boundaries
    let mut chunks: Vec<String> = encoded
        .as_bytes()
        .chunks(SASL_CHUNK_SIZE)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();
    if encoded.len() % SASL_CHUNK_SIZE == 0 {
        chunks.push("+".to_owned());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_plain() {
        let encoded = encode_plain("alice", "secret");
        let decoded = BASE64.decode(encoded).unwrap();
        assert_eq!(decoded, b"alice\0alice\0secret");
    }

    #[test]
    fn test_short_payload_single_chunk() {
        let chunks = authenticate_chunks("YWJj");
        assert_eq!(chunks, vec!["YWJj"]);
    }

    #[test]
    fn test_exact_multiple_gets_plus() {
        let payload = "A".repeat(SASL_CHUNK_SIZE * 2);
        let chunks = authenticate_chunks(&payload);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 400);
        assert_eq!(chunks[1].len(), 400);
        assert_eq!(chunks[2], "+");
    }

    #[test]
    fn test_long_payload_remainder() {
        let payload = "B".repeat(SASL_CHUNK_SIZE + 10);
        let chunks = authenticate_chunks(&payload);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].len(), 10);
    }

    #[test]
    fn test_parse_mechanisms() {
        let mechs = parse_mechanisms("PLAIN, external,SCRAM-SHA-256");
        assert_eq!(mechs[0], SaslMechanism::Plain);
        assert_eq!(mechs[1], SaslMechanism::External);
        assert_eq!(mechs[2].as_str(), "SCRAM-SHA-256");
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = SaslCredentials::new("alice", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }
}
