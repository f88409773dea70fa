//! Semantic events produced by the dispatcher and the connection driver.
//!
//! Every event is a variant of [`Event`]. [`EventBus`] fans an event out to
//! listeners registered for its [`EventKind`] and to catch-all listeners.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::isupport::NetworkInfo;
use crate::message::Tags;
use crate::mode::ModeChange;

/// A PRIVMSG, NOTICE, ACTION or WALLOPS.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub nick: String,
    pub ident: String,
    pub hostname: String,
    pub target: String,
    pub message: String,
    pub tags: Tags,
    /// From the `server-time` tag, falling back to local receipt time.
    pub time: DateTime<Utc>,
    pub account: Option<String>,
    /// True when the prefix names a server, not a user.
    pub from_server: bool,
}

/// A CTCP request or reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CtcpEvent {
    pub nick: String,
    pub ident: String,
    pub hostname: String,
    pub target: String,
    /// Upper-cased CTCP command.
    pub kind: String,
    pub args: String,
}

/// A member entry from a NAMES reply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelUser {
    pub nick: String,
    pub ident: String,
    pub hostname: String,
    /// Membership mode letters, highest first.
    pub modes: Vec<char>,
}

/// A WHO reply entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WhoUser {
    pub nick: String,
    pub ident: String,
    pub hostname: String,
    pub server: String,
    pub real_name: String,
    pub channel: String,
    pub away: bool,
    pub operator: bool,
    pub channel_modes: Vec<char>,
    pub hops: u32,
}

/// Aggregated WHOIS reply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WhoisInfo {
    pub nick: String,
    pub ident: Option<String>,
    pub hostname: Option<String>,
    pub real_name: Option<String>,
    pub server: Option<String>,
    pub server_info: Option<String>,
    pub operator: Option<String>,
    pub idle: Option<u64>,
    pub logon: Option<DateTime<Utc>>,
    pub channels: Vec<String>,
    pub account: Option<String>,
    pub away: Option<String>,
    pub secure: bool,
    pub certfp: Option<String>,
    pub actual_host: Option<String>,
    pub actual_ip: Option<String>,
    pub bot: bool,
    pub registered_nick: bool,
    pub modes: Option<String>,
    pub special: Vec<String>,
    /// No `RPL_WHOISUSER` arrived before the end of the reply.
    pub not_found: bool,
}

/// A ban list entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BanEntry {
    pub channel: String,
    pub mask: String,
    pub banned_by: Option<String>,
    pub banned_at: Option<i64>,
}

/// A LIST reply entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelListEntry {
    pub channel: String,
    pub num_users: u32,
    pub topic: String,
}

/// A LINKS reply entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerLink {
    pub address: String,
    pub access_via: String,
    pub hops: u32,
    pub description: String,
}

/// Everything the client can report.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Event {
    Registered { nick: String },
    Join {
        channel: String,
        nick: String,
        ident: String,
        hostname: String,
        /// From extended-join; `None` when logged out or unknown.
        account: Option<String>,
        gecos: Option<String>,
    },
    Part {
        channel: String,
        nick: String,
        ident: String,
        hostname: String,
        message: String,
    },
    Kick {
        channel: String,
        kicked: String,
        nick: String,
        message: String,
    },
    Quit {
        nick: String,
        ident: String,
        hostname: String,
        message: String,
    },
    Nick { nick: String, new_nick: String },
    Topic {
        channel: String,
        topic: String,
        /// Who changed it; `None` for the join-time 332 reply.
        nick: Option<String>,
    },
    TopicSetBy {
        channel: String,
        nick: String,
        when: Option<i64>,
    },
    Mode {
        target: String,
        nick: String,
        modes: Vec<ModeChange>,
    },
    ChannelInfo {
        channel: String,
        modes: Vec<ModeChange>,
        created_at: Option<i64>,
    },
    Privmsg(MessageEvent),
    Notice(MessageEvent),
    Action(MessageEvent),
    CtcpRequest(CtcpEvent),
    CtcpResponse(CtcpEvent),
    Wallops(MessageEvent),
    Tagmsg {
        nick: String,
        target: String,
        tags: Tags,
    },
    Invite {
        nick: String,
        invited: String,
        channel: String,
    },
    Away { nick: String, message: String },
    Back { nick: String, message: String },
    Account {
        nick: String,
        account: Option<String>,
    },
    Chghost {
        nick: String,
        ident: String,
        hostname: String,
        new_ident: String,
        new_hostname: String,
    },
    Setname { nick: String, gecos: String },
    Userlist {
        channel: String,
        users: Vec<ChannelUser>,
    },
    Wholist {
        target: String,
        users: Vec<WhoUser>,
    },
    Whois(WhoisInfo),
    Banlist {
        channel: String,
        bans: Vec<BanEntry>,
    },
    ChannelListStart,
    ChannelList(Vec<ChannelListEntry>),
    ChannelListEnd,
    Motd {
        motd: String,
        error: Option<String>,
    },
    ServerLinks(Vec<ServerLink>),
    ServerOptions(Box<NetworkInfo>),
    Loggedin {
        nick: String,
        account: String,
        message: String,
    },
    Loggedout { nick: String, message: String },
    SaslFailed { reason: String, message: String },
    NickInUse { nick: String, reason: String },
    NickInvalid { nick: String, reason: String },
    Ping { message: String },
    Pong { message: String },
    IrcError {
        error: String,
        channel: Option<String>,
        nick: Option<String>,
        reason: String,
    },
    Unknown {
        command: String,
        params: Vec<String>,
    },
    /// A raw protocol line, inbound or outbound.
    Raw { line: String, from_server: bool },
    SocketConnected,
    SocketClose { had_error: bool },
    Reconnecting { attempt: u32, wait: Duration },
    PingTimeout,
    /// The client gave up or was told to quit; nothing more will follow.
    Close,
}

/// Discriminant of an [`Event`], used as a subscription key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EventKind {
    Registered,
    Join,
    Part,
    Kick,
    Quit,
    Nick,
    Topic,
    TopicSetBy,
    Mode,
    ChannelInfo,
    Privmsg,
    Notice,
    Action,
    CtcpRequest,
    CtcpResponse,
    Wallops,
    Tagmsg,
    Invite,
    Away,
    Back,
    Account,
    Chghost,
    Setname,
    Userlist,
    Wholist,
    Whois,
    Banlist,
    ChannelListStart,
    ChannelList,
    ChannelListEnd,
    Motd,
    ServerLinks,
    ServerOptions,
    Loggedin,
    Loggedout,
    SaslFailed,
    NickInUse,
    NickInvalid,
    Ping,
    Pong,
    IrcError,
    Unknown,
    Raw,
    SocketConnected,
    SocketClose,
    Reconnecting,
    PingTimeout,
    Close,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Registered { .. } => EventKind::Registered,
            Event::Join { .. } => EventKind::Join,
            Event::Part { .. } => EventKind::Part,
            Event::Kick { .. } => EventKind::Kick,
            Event::Quit { .. } => EventKind::Quit,
            Event::Nick { .. } => EventKind::Nick,
            Event::Topic { .. } => EventKind::Topic,
            Event::TopicSetBy { .. } => EventKind::TopicSetBy,
            Event::Mode { .. } => EventKind::Mode,
            Event::ChannelInfo { .. } => EventKind::ChannelInfo,
            Event::Privmsg(_) => EventKind::Privmsg,
            Event::Notice(_) => EventKind::Notice,
            Event::Action(_) => EventKind::Action,
            Event::CtcpRequest(_) => EventKind::CtcpRequest,
            Event::CtcpResponse(_) => EventKind::CtcpResponse,
            Event::Wallops(_) => EventKind::Wallops,
            Event::Tagmsg { .. } => EventKind::Tagmsg,
            Event::Invite { .. } => EventKind::Invite,
            Event::Away { .. } => EventKind::Away,
            Event::Back { .. } => EventKind::Back,
            Event::Account { .. } => EventKind::Account,
            Event::Chghost { .. } => EventKind::Chghost,
            Event::Setname { .. } => EventKind::Setname,
            Event::Userlist { .. } => EventKind::Userlist,
            Event::Wholist { .. } => EventKind::Wholist,
            Event::Whois(_) => EventKind::Whois,
            Event::Banlist { .. } => EventKind::Banlist,
            Event::ChannelListStart => EventKind::ChannelListStart,
            Event::ChannelList(_) => EventKind::ChannelList,
            Event::ChannelListEnd => EventKind::ChannelListEnd,
            Event::Motd { .. } => EventKind::Motd,
            Event::ServerLinks(_) => EventKind::ServerLinks,
            Event::ServerOptions(_) => EventKind::ServerOptions,
            Event::Loggedin { .. } => EventKind::Loggedin,
            Event::Loggedout { .. } => EventKind::Loggedout,
            Event::SaslFailed { .. } => EventKind::SaslFailed,
            Event::NickInUse { .. } => EventKind::NickInUse,
            Event::NickInvalid { .. } => EventKind::NickInvalid,
            Event::Ping { .. } => EventKind::Ping,
            Event::Pong { .. } => EventKind::Pong,
            Event::IrcError { .. } => EventKind::IrcError,
            Event::Unknown { .. } => EventKind::Unknown,
            Event::Raw { .. } => EventKind::Raw,
            Event::SocketConnected => EventKind::SocketConnected,
            Event::SocketClose { .. } => EventKind::SocketClose,
            Event::Reconnecting { .. } => EventKind::Reconnecting,
            Event::PingTimeout => EventKind::PingTimeout,
            Event::Close => EventKind::Close,
        }
    }
}

type Listener = Box<dyn FnMut(&Event) + Send>;

/// Fan-out of events to per-kind and catch-all listeners.
#[derive(Default)]
pub struct EventBus {
    by_kind: HashMap<EventKind, Vec<Listener>>,
    all: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for one kind of event.
    pub fn on<F>(&mut self, kind: EventKind, listener: F)
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.by_kind.entry(kind).or_default().push(Box::new(listener));
    }

    /// Listen for every event.
    pub fn on_all<F>(&mut self, listener: F)
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.all.push(Box::new(listener));
    }

    /// Deliver to kind listeners first, then catch-all listeners, each in
    /// registration order.
    pub fn emit(&mut self, event: &Event) {
        if let Some(listeners) = self.by_kind.get_mut(&event.kind()) {
            for listener in listeners.iter_mut() {
                listener(event);
            }
        }
        for listener in self.all.iter_mut() {
            listener(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.by_kind.values().all(Vec::is_empty)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("kinds", &self.by_kind.len())
            .field("catch_all", &self.all.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_kind() {
        assert_eq!(Event::Close.kind(), EventKind::Close);
        assert_eq!(
            Event::Nick { nick: "a".into(), new_nick: "b".into() }.kind(),
            EventKind::Nick
        );
    }

    #[test]
    fn test_bus_routes_by_kind_and_catch_all() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        let s = seen.clone();
        bus.on(EventKind::PingTimeout, move |_| s.lock().unwrap().push("kind"));
        let s = seen.clone();
        bus.on_all(move |e| s.lock().unwrap().push(if e.kind() == EventKind::Close { "all-close" } else { "all" }));

        bus.emit(&Event::PingTimeout);
        bus.emit(&Event::Close);

        assert_eq!(*seen.lock().unwrap(), vec!["kind", "all", "all-close"]);
    }
}
