//! Routing of parsed messages to handlers.
//!
//! Handlers are plain functions keyed by command name. Numerics are looked
//! up by their `RPL_`/`ERR_` name, so `"001"` reaches the `RPL_WELCOME`
//! handler. A handler mutates the [`Session`] and writes replies and events
//! into an [`Outbox`]; it never touches the socket.

pub mod accumulator;
mod channel;
mod messaging;
mod registration;
mod server;
mod user;

use std::collections::HashMap;

use tracing::trace;

use crate::connection::Session;
use crate::event::Event;
use crate::message::Message;
use crate::response::numeric_name;

/// Lines to send and events to publish, in order.
#[derive(Debug, Default, PartialEq)]
pub struct Outbox {
    pub lines: Vec<String>,
    pub events: Vec<Event>,
}

impl Outbox {
    pub fn send(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}

pub type Handler = fn(&mut Session, &Message, &mut Outbox);

/// Command table.
pub struct Dispatcher {
    handlers: HashMap<&'static str, Handler>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// A dispatcher with every built-in handler registered.
    pub fn new() -> Self {
        let mut dispatcher = Dispatcher {
            handlers: HashMap::new(),
        };
        registration::register(&mut dispatcher);
        channel::register(&mut dispatcher);
        messaging::register(&mut dispatcher);
        user::register(&mut dispatcher);
        server::register(&mut dispatcher);
        dispatcher
    }

    /// Add or replace a handler.
    pub fn add(&mut self, name: &'static str, handler: Handler) {
        self.handlers.insert(name, handler);
    }

    pub fn handles(&self, command: &str) -> bool {
        self.handlers.contains_key(Self::key(command))
    }

    fn key(command: &str) -> &str {
        numeric_name(command).unwrap_or(command)
    }

    /// Run the handler for `msg`, or report it as unknown.
    pub fn dispatch(&self, session: &mut Session, msg: &Message) -> Outbox {
        let mut out = Outbox::default();
        let key = Self::key(&msg.command);
        match self.handlers.get(key) {
            Some(handler) => handler(session, msg, &mut out),
            None => {
                trace!(command = %msg.command, "no handler");
                out.emit(Event::Unknown {
                    command: msg.command.clone(),
                    params: msg.params.clone(),
                });
            }
        }
        out
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Owned copy of parameter `i`, empty when missing.
pub(crate) fn param(msg: &Message, i: usize) -> String {
    msg.param(i).unwrap_or_default().to_string()
}

/// Owned copy of the last parameter, empty when there are none.
pub(crate) fn last(msg: &Message) -> String {
    msg.last_param().unwrap_or_default().to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::ClientConfig;
    use crate::connection::ConnectionState;

    pub fn session() -> Session {
        let mut session = Session::new(&ClientConfig::new("irc.example.org", 6667, "me"));
        session.transition(ConnectionState::Connected);
        session
    }

    pub fn feed(session: &mut Session, line: &str) -> Outbox {
        let msg = Message::parse_line(line).unwrap();
        Dispatcher::new().dispatch(session, &msg)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_unknown_command() {
        let mut s = session();
        let out = feed(&mut s, ":srv FOOBAR a :b c");
        assert_eq!(
            out.events,
            vec![Event::Unknown {
                command: "FOOBAR".into(),
                params: vec!["a".into(), "b c".into()]
            }]
        );
    }

    #[test]
    fn test_unmapped_numeric_is_unknown() {
        let mut s = session();
        let out = feed(&mut s, ":srv 999 me :what");
        assert!(matches!(&out.events[0], Event::Unknown { command, .. } if command == "999"));
    }

    #[test]
    fn test_numeric_routed_by_name() {
        let d = Dispatcher::new();
        assert!(d.handles("001"));
        assert!(d.handles("RPL_WELCOME"));
        assert!(d.handles("PRIVMSG"));
        assert!(!d.handles("FOOBAR"));
    }
}
