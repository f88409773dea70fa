//! Per-connection state.
//!
//! A [`Session`] is created for every connection attempt and thrown away
//! when the socket closes, so nothing negotiated with one server leaks into
//! the next.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::caps::CapNegotiator;
use crate::config::ClientConfig;
use crate::dispatch::accumulator::Pending;
use crate::isupport::NetworkInfo;
use crate::message::Message;

static CONNECTION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process-unique connection identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        ConnectionId(CONNECTION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of the underlying connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    /// Socket open, registration in progress.
    Connected,
    /// 001 received.
    Registered,
}

/// Everything the dispatcher knows about the current connection.
#[derive(Debug)]
pub struct Session {
    pub id: ConnectionId,
    pub state: ConnectionState,
    pub network: NetworkInfo,
    pub caps: CapNegotiator,
    /// Our current nick, as last confirmed or attempted.
    pub nick: String,
    /// CTCP VERSION reply, if any.
    pub version: Option<String>,
    pub(crate) pending: Pending,
}

impl Session {
    pub fn new(config: &ClientConfig) -> Self {
        Session {
            id: ConnectionId::next(),
            state: ConnectionState::Disconnected,
            network: NetworkInfo::new(),
            caps: CapNegotiator::new(config.wanted_caps(), config.sasl_credentials()),
            nick: config.nick.clone(),
            version: config.version.clone(),
            pending: Pending::default(),
        }
    }

    pub fn transition(&mut self, to: ConnectionState) {
        if self.state != to {
            debug!(conn = %self.id, from = ?self.state, ?to, "connection state change");
            self.state = to;
        }
    }

    pub fn is_registered(&self) -> bool {
        self.state == ConnectionState::Registered
    }

    /// Whether `nick` is us, under the server's case mapping.
    pub fn is_me(&self, nick: &str) -> bool {
        self.network.casemapping.eq(nick, &self.nick)
    }

    /// Lines that open a connection: WEBIRC, CAP LS, PASS, NICK, USER.
    ///
    /// Registration goes out without waiting for CAP to finish; the server
    /// holds it until `CAP END`.
    pub fn registration_lines(&mut self, config: &ClientConfig) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(webirc) = &config.webirc {
            let mut params = vec![
                webirc.password.clone(),
                webirc.gateway.clone(),
                webirc.hostname.clone(),
                webirc.address.clone(),
            ];
            if !webirc.options.is_empty() {
                params.push(webirc.options.join(" "));
            }
            lines.push(Message::new("WEBIRC", params).to_string());
        }
        lines.push(self.caps.begin());
        if let Some(password) = config.server_password() {
            lines.push(Message::new("PASS", [password]).to_string());
        }
        lines.push(Message::new("NICK", [self.nick.as_str()]).to_string());
        lines.push(format!("USER {} 0 * :{}", config.username, config.gecos));
        lines
    }
}
