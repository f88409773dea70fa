//! Client configuration.

use std::net::IpAddr;
use std::time::Duration;

use crate::caps::CORE_CAPS;
use crate::chunker::{ChunkerConfig, DEFAULT_MAX_BYTES};
use crate::line::DEFAULT_MAX_BUFFER_SIZE;
use crate::reconnect::ReconnectPolicy;
use crate::sasl::SaslCredentials;
use crate::scheduler::DEFAULT_LINES_PER_SECOND;

/// WEBIRC gateway parameters, sent before anything else.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WebircConfig {
    pub password: String,
    pub gateway: String,
    pub hostname: String,
    pub address: String,
    /// Extra `key` or `key=value` flags, e.g. `secure`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub options: Vec<String>,
}

/// SOCKS5 proxy to connect through.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SocksConfig {
    pub host: String,
    #[cfg_attr(feature = "serde", serde(default = "default_socks_port"))]
    pub port: u16,
    #[cfg_attr(feature = "serde", serde(default))]
    pub user: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pass: Option<String>,
}

#[cfg(feature = "serde")]
fn default_socks_port() -> u16 {
    1080
}

/// Everything needed to open and register a connection.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    /// Verify the server certificate. Turning this off accepts anything.
    pub reject_unauthorized: bool,
    /// Text encoding label, e.g. `utf-8` or `latin1`.
    pub encoding: String,

    pub auto_reconnect: bool,
    pub auto_reconnect_wait: Duration,
    pub auto_reconnect_max_retries: u32,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,

    /// Server password (PASS), or the SASL password with `enable_sasl`.
    pub password: Option<String>,
    pub nick: String,
    pub username: String,
    pub gecos: String,
    /// Explicit SASL account.
    pub account: Option<SaslCredentials>,
    pub webirc: Option<WebircConfig>,
    pub socks: Option<SocksConfig>,
    pub local_address: Option<IpAddr>,

    /// Use `nick` and `password` for SASL when no `account` is given.
    pub enable_sasl: bool,
    pub enable_chghost: bool,
    pub enable_echomessage: bool,
    pub extra_caps: Vec<String>,

    pub flood_control: bool,
    pub lines_per_second: u32,
    /// Byte budget for a single outgoing message body.
    pub message_max_length: usize,
    /// Limit on buffered bytes without a line terminator.
    pub max_buffer_size: usize,
    /// Reply to CTCP VERSION with this string.
    pub version: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: String::new(),
            port: 6667,
            tls: false,
            reject_unauthorized: true,
            encoding: "utf-8".to_string(),
            auto_reconnect: true,
            auto_reconnect_wait: Duration::from_secs(4),
            auto_reconnect_max_retries: 3,
            ping_interval: Duration::from_secs(30),
            ping_timeout: Duration::from_secs(120),
            password: None,
            nick: "slirc".to_string(),
            username: "slirc".to_string(),
            gecos: "slirc".to_string(),
            account: None,
            webirc: None,
            socks: None,
            local_address: None,
            enable_sasl: false,
            enable_chghost: false,
            enable_echomessage: false,
            extra_caps: Vec::new(),
            flood_control: true,
            lines_per_second: DEFAULT_LINES_PER_SECOND,
            message_max_length: DEFAULT_MAX_BYTES,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            version: None,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16, nick: impl Into<String>) -> Self {
        let nick = nick.into();
        ClientConfig {
            host: host.into(),
            port,
            username: nick.clone(),
            nick,
            ..Default::default()
        }
    }

    /// SASL credentials: the explicit account, else nick and password when
    /// `enable_sasl` is on.
    pub fn sasl_credentials(&self) -> Option<SaslCredentials> {
        if let Some(account) = &self.account {
            return Some(account.clone());
        }
        match (&self.password, self.enable_sasl) {
            (Some(password), true) => Some(SaslCredentials::new(self.nick.clone(), password.clone())),
            _ => None,
        }
    }

    /// Password to send with PASS. Withheld when it doubles as the SASL
    /// password.
    pub fn server_password(&self) -> Option<&str> {
        if self.enable_sasl && self.account.is_none() {
            None
        } else {
            self.password.as_deref()
        }
    }

    /// Capabilities to request, in order, without duplicates.
    pub fn wanted_caps(&self) -> Vec<String> {
        let mut caps: Vec<String> = CORE_CAPS.iter().map(|c| c.to_string()).collect();
        if self.enable_chghost {
            caps.push("chghost".to_string());
        }
        if self.enable_echomessage {
            caps.push("echo-message".to_string());
        }
        for extra in &self.extra_caps {
            if !caps.contains(extra) {
                caps.push(extra.clone());
            }
        }
        caps
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            enabled: self.auto_reconnect,
            max_retries: self.auto_reconnect_max_retries,
            wait: self.auto_reconnect_wait,
            ..ReconnectPolicy::default()
        }
    }

    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig::with_max_bytes(self.message_max_length)
    }

    /// Send rate for the write scheduler; `None` disables flood control.
    pub fn lines_per_second(&self) -> Option<u32> {
        self.flood_control.then_some(self.lines_per_second)
    }
}
