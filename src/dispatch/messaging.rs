//! PRIVMSG, NOTICE, CTCP, ACTION, WALLOPS and TAGMSG.

use chrono::Utc;
use tracing::debug;

use super::{last, param, Dispatcher, Outbox};
use crate::connection::Session;
use crate::ctcp::{self, Ctcp};
use crate::event::{CtcpEvent, Event, MessageEvent};
use crate::message::Message;

pub(super) fn register(d: &mut Dispatcher) {
    d.add("PRIVMSG", privmsg);
    d.add("NOTICE", notice);
    d.add("RPL_WALLOPS", wallops);
    d.add("TAGMSG", tagmsg);
}

fn message_event(msg: &Message, target: String, message: String) -> MessageEvent {
    MessageEvent {
        nick: msg.nick.clone(),
        ident: msg.ident.clone(),
        hostname: msg.hostname.clone(),
        target,
        message,
        tags: msg.tags.clone(),
        time: msg.server_time().unwrap_or_else(Utc::now),
        account: msg.tag("account").map(str::to_string),
        from_server: msg.prefix.is_empty() || msg.from_server(),
    }
}

fn ctcp_event(msg: &Message, ctcp: &Ctcp<'_>) -> CtcpEvent {
    CtcpEvent {
        nick: msg.nick.clone(),
        ident: msg.ident.clone(),
        hostname: msg.hostname.clone(),
        target: param(msg, 0),
        kind: ctcp.kind.clone(),
        args: ctcp.args.to_string(),
    }
}

fn privmsg(s: &mut Session, msg: &Message, out: &mut Outbox) {
    let target = param(msg, 0);
    let body = last(msg);
    let Some(ctcp) = Ctcp::parse(&body) else {
        out.emit(Event::Privmsg(message_event(msg, target, body.clone())));
        return;
    };
    if ctcp.kind == "ACTION" {
        out.emit(Event::Action(message_event(msg, target, ctcp.args.to_string())));
        return;
    }
    if ctcp.kind == "VERSION" {
        if let Some(version) = &s.version {
            debug!(to = %msg.nick, "answering CTCP VERSION");
            let reply = ctcp::encode("VERSION", version);
            out.send(Message::new("NOTICE", [msg.nick.clone(), reply]).to_string());
        }
    }
    out.emit(Event::CtcpRequest(ctcp_event(msg, &ctcp)));
}

fn notice(_: &mut Session, msg: &Message, out: &mut Outbox) {
    let target = param(msg, 0);
    let body = last(msg);
    match Ctcp::parse(&body) {
        Some(ctcp) if ctcp.kind == "ACTION" => {
            out.emit(Event::Action(message_event(msg, target, ctcp.args.to_string())));
        }
        Some(ctcp) => out.emit(Event::CtcpResponse(ctcp_event(msg, &ctcp))),
        None => out.emit(Event::Notice(message_event(msg, target, body.clone()))),
    }
}

fn wallops(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::Wallops(message_event(msg, String::new(), last(msg))));
}

fn tagmsg(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::Tagmsg {
        nick: msg.nick.clone(),
        target: param(msg, 0),
        tags: msg.tags.clone(),
    });
}
