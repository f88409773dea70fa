//! IRCv3 capability negotiation.
//!
//! [`CapNegotiator`] is a sans-IO state machine: it is fed the parameters
//! of `CAP`, `AUTHENTICATE` and the SASL numerics, and returns the raw lines
//! to send in response.
//!
//! # Reference
//! - IRCv3 Capability Negotiation: <https://ircv3.net/specs/extensions/capability-negotiation>
//! - Individual capability specifications: <https://ircv3.net/irc/>

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::sasl::{self, SaslCredentials, SaslMechanism};

/// Capabilities the client always asks for when the server offers them.
pub const CORE_CAPS: &[&str] = &[
    "multi-prefix",
    "message-tags",
    "server-time",
    "batch",
    "cap-notify",
    "invite-notify",
    "away-notify",
    "account-notify",
    "account-tag",
    "extended-join",
    "userhost-in-names",
    "setname",
];

/// Capability bookkeeping for one connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapState {
    /// Advertised capabilities and their values (empty when none given).
    pub available: HashMap<String, String>,
    /// Requested but not yet answered.
    pub requested: HashSet<String>,
    /// Acknowledged by the server.
    pub enabled: HashSet<String>,
    /// Whether `CAP END` is still pending.
    pub negotiating: bool,
}

impl CapState {
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains(name)
    }
}

/// Drives `CAP LS 302` through `CAP END`, including SASL PLAIN.
#[derive(Clone, Debug)]
pub struct CapNegotiator {
    state: CapState,
    wanted: Vec<String>,
    credentials: Option<SaslCredentials>,
    sasl_active: bool,
}

fn parse_cap_list(list: &str) -> impl Iterator<Item = (&str, &str)> {
    list.split(' ')
        .filter(|s| !s.is_empty())
        .map(|token| token.split_once('=').unwrap_or((token, "")))
}

impl CapNegotiator {
    /// `wanted` lists capabilities in request order. `sasl` is only ever
    /// requested when credentials are present.
    pub fn new(wanted: Vec<String>, credentials: Option<SaslCredentials>) -> Self {
        let mut wanted: Vec<String> = wanted.into_iter().filter(|c| c != "sasl").collect();
        if credentials.is_some() {
            wanted.push("sasl".to_string());
        }
        CapNegotiator {
            state: CapState::default(),
            wanted,
            credentials,
            sasl_active: false,
        }
    }

    pub fn state(&self) -> &CapState {
        &self.state
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.state.is_enabled(name)
    }

    pub fn is_negotiating(&self) -> bool {
        self.state.negotiating
    }

    /// Reset for a fresh connection and return the opening request.
    pub fn begin(&mut self) -> String {
        self.state = CapState {
            negotiating: true,
            ..CapState::default()
        };
        self.sasl_active = false;
        "CAP LS 302".to_string()
    }

    fn sasl_offers_plain(&self) -> bool {
        match self.state.available.get("sasl") {
            None => false,
            Some(value) if value.is_empty() => true,
            Some(value) => sasl::parse_mechanisms(value).contains(&SaslMechanism::Plain),
        }
    }

    fn is_requestable(&self, cap: &str) -> bool {
        if !self.state.available.contains_key(cap) || self.state.enabled.contains(cap) {
            return false;
        }
        cap != "sasl" || self.sasl_offers_plain()
    }

    /// Capabilities to request right now, in wanted order.
    pub fn compute_request(&self) -> Vec<String> {
        self.wanted
            .iter()
            .filter(|cap| self.is_requestable(cap))
            .cloned()
            .collect()
    }

    fn end(&mut self) -> Option<String> {
        if self.state.negotiating {
            self.state.negotiating = false;
            debug!("capability negotiation finished");
            Some("CAP END".to_string())
        } else {
            None
        }
    }

    fn request(&mut self, caps: Vec<String>) -> String {
        for cap in &caps {
            self.state.requested.insert(cap.clone());
        }
        format!("CAP REQ :{}", caps.join(" "))
    }

    /// Handle a `CAP` message; `params` start with the target nick.
    pub fn handle_cap(&mut self, params: &[String]) -> Vec<String> {
        let mut out = Vec::new();
        let Some(sub) = params.get(1) else {
            return out;
        };
        let list = params.last().map(String::as_str).unwrap_or("");
        let continued = params.len() > 3 && params[2] == "*";

        match sub.to_ascii_uppercase().as_str() {
            "LS" => {
                for (name, value) in parse_cap_list(list) {
                    self.state
                        .available
                        .insert(name.to_string(), value.to_string());
                }
                if continued || !self.state.negotiating {
                    return out;
                }
                let caps = self.compute_request();
                if caps.is_empty() {
                    out.extend(self.end());
                } else {
                    out.push(self.request(caps));
                }
            }
            "ACK" => {
                let mut start_sasl = false;
                for (name, _) in parse_cap_list(list) {
                    match name.strip_prefix('-') {
                        Some(removed) => {
                            self.state.enabled.remove(removed);
                            self.state.requested.remove(removed);
                        }
                        None => {
                            self.state.requested.remove(name);
                            self.state.enabled.insert(name.to_string());
                            if name == "sasl" && self.credentials.is_some() {
                                start_sasl = true;
                            }
                        }
                    }
                }
                if start_sasl {
                    self.sasl_active = true;
                    out.push("AUTHENTICATE PLAIN".to_string());
                } else if self.state.requested.is_empty() && !self.sasl_active {
                    out.extend(self.end());
                }
            }
            "NAK" => {
                for (name, _) in parse_cap_list(list) {
                    self.state.requested.remove(name.trim_start_matches('-'));
                }
                if self.state.requested.is_empty() && !self.sasl_active {
                    out.extend(self.end());
                }
            }
            "NEW" => {
                for (name, value) in parse_cap_list(list) {
                    self.state
                        .available
                        .insert(name.to_string(), value.to_string());
                }
                let caps: Vec<String> = self
                    .compute_request()
                    .into_iter()
                    .filter(|c| !self.state.requested.contains(c))
                    .collect();
                if !caps.is_empty() {
                    out.push(self.request(caps));
                }
            }
            "DEL" => {
                for (name, _) in parse_cap_list(list) {
                    self.state.available.remove(name);
                    self.state.enabled.remove(name);
                }
            }
            _ => {}
        }
        out
    }

    /// Handle `AUTHENTICATE`; a bare `+` is the server's go-ahead.
    pub fn handle_authenticate(&mut self, params: &[String]) -> Vec<String> {
        if !self.sasl_active || params.first().map(String::as_str) != Some("+") {
            return Vec::new();
        }
        let Some(creds) = &self.credentials else {
            return Vec::new();
        };
        let payload = sasl::encode_plain(&creds.account, &creds.password);
        sasl::authenticate_chunks(&payload)
            .into_iter()
            .map(|chunk| format!("AUTHENTICATE {}", chunk))
            .collect()
    }

    /// SASL succeeded (903) or failed (902, 904 to 907). Either way the
    /// exchange is over.
    pub fn sasl_finished(&mut self) -> Option<String> {
        self.sasl_active = false;
        self.end()
    }

    /// Registration completed (001); any negotiation still pending is moot.
    pub fn registered(&mut self) {
        self.state.negotiating = false;
        self.sasl_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn wanted() -> Vec<String> {
        p(&["multi-prefix", "server-time"])
    }

    #[test]
    fn test_begin_resets() {
        let mut neg = CapNegotiator::new(wanted(), None);
        assert_eq!(neg.begin(), "CAP LS 302");
        assert!(neg.is_negotiating());
    }

    #[test]
    fn test_request_without_credentials() {
        let mut neg = CapNegotiator::new(wanted(), None);
        neg.begin();
        let out = neg.handle_cap(&p(&["*", "LS", "multi-prefix sasl"]));
        assert_eq!(out, vec!["CAP REQ :multi-prefix"]);
    }

    #[test]
    fn test_request_with_credentials() {
        let mut neg = CapNegotiator::new(wanted(), Some(SaslCredentials::new("a", "b")));
        neg.begin();
        let out = neg.handle_cap(&p(&["*", "LS", "multi-prefix sasl"]));
        assert_eq!(out, vec!["CAP REQ :multi-prefix sasl"]);
    }

    #[test]
    fn test_sasl_without_plain_not_requested() {
        let mut neg = CapNegotiator::new(wanted(), Some(SaslCredentials::new("a", "b")));
        neg.begin();
        let out = neg.handle_cap(&p(&["*", "LS", "sasl=EXTERNAL multi-prefix"]));
        assert_eq!(out, vec!["CAP REQ :multi-prefix"]);
    }

    #[test]
    fn test_multiline_ls() {
        let mut neg = CapNegotiator::new(wanted(), None);
        neg.begin();
        assert!(neg
            .handle_cap(&p(&["*", "LS", "*", "multi-prefix"]))
            .is_empty());
        let out = neg.handle_cap(&p(&["*", "LS", "server-time"]));
        assert_eq!(out, vec!["CAP REQ :multi-prefix server-time"]);
    }

    #[test]
    fn test_empty_intersection_ends() {
        let mut neg = CapNegotiator::new(wanted(), None);
        neg.begin();
        let out = neg.handle_cap(&p(&["*", "LS", "znc.in/playback"]));
        assert_eq!(out, vec!["CAP END"]);
        assert!(!neg.is_negotiating());
    }

    #[test]
    fn test_ack_then_end() {
        let mut neg = CapNegotiator::new(wanted(), None);
        neg.begin();
        neg.handle_cap(&p(&["*", "LS", "multi-prefix server-time"]));
        let out = neg.handle_cap(&p(&["*", "ACK", "multi-prefix server-time"]));
        assert_eq!(out, vec!["CAP END"]);
        assert!(neg.is_enabled("server-time"));
        assert!(neg.state().requested.is_empty());
    }

    #[test]
    fn test_nak_ends_once_nothing_outstanding() {
        let mut neg = CapNegotiator::new(wanted(), None);
        neg.begin();
        neg.handle_cap(&p(&["*", "LS", "multi-prefix server-time"]));
        let out = neg.handle_cap(&p(&["*", "NAK", "multi-prefix server-time"]));
        assert_eq!(out, vec!["CAP END"]);
        assert!(neg.state().enabled.is_empty());
    }

    #[test]
    fn test_sasl_flow() {
        let mut neg = CapNegotiator::new(wanted(), Some(SaslCredentials::new("alice", "pw")));
        neg.begin();
        neg.handle_cap(&p(&["*", "LS", "sasl=PLAIN,EXTERNAL"]));
        let out = neg.handle_cap(&p(&["*", "ACK", "sasl"]));
        assert_eq!(out, vec!["AUTHENTICATE PLAIN"]);

        let out = neg.handle_authenticate(&p(&["+"]));
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("AUTHENTICATE "));
        assert_ne!(out[0], "AUTHENTICATE +");

        assert_eq!(neg.sasl_finished(), Some("CAP END".to_string()));
        assert!(!neg.is_negotiating());
        assert_eq!(neg.sasl_finished(), None);
    }

    #[test]
    fn test_new_and_del() {
        let mut neg = CapNegotiator::new(wanted(), None);
        neg.begin();
        neg.handle_cap(&p(&["*", "LS", "multi-prefix"]));
        neg.handle_cap(&p(&["*", "ACK", "multi-prefix"]));

        let out = neg.handle_cap(&p(&["*", "NEW", "server-time"]));
        assert_eq!(out, vec!["CAP REQ :server-time"]);
        neg.handle_cap(&p(&["*", "ACK", "server-time"]));
        assert!(neg.is_enabled("server-time"));

        neg.handle_cap(&p(&["*", "DEL", "server-time"]));
        assert!(!neg.is_enabled("server-time"));
        assert!(!neg.state().available.contains_key("server-time"));
    }

    #[test]
    fn test_ack_removal() {
        let mut neg = CapNegotiator::new(wanted(), None);
        neg.begin();
        neg.handle_cap(&p(&["*", "LS", "multi-prefix"]));
        neg.handle_cap(&p(&["*", "ACK", "multi-prefix"]));
        neg.handle_cap(&p(&["*", "ACK", "-multi-prefix"]));
        assert!(!neg.is_enabled("multi-prefix"));
    }
}
