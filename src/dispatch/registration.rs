//! Connection registration, keepalive, CAP and SASL.

use tracing::{debug, info};

use super::{last, param, Dispatcher, Outbox};
use crate::connection::{ConnectionState, Session};
use crate::event::Event;
use crate::message::Message;

pub(super) fn register(d: &mut Dispatcher) {
    d.add("RPL_WELCOME", welcome);
    d.add("RPL_YOURHOST", ignore);
    d.add("RPL_CREATED", ignore);
    d.add("RPL_MYINFO", myinfo);
    d.add("RPL_ISUPPORT", isupport);
    d.add("PING", ping);
    d.add("PONG", pong);
    d.add("CAP", cap);
    d.add("AUTHENTICATE", authenticate);
    d.add("RPL_LOGGEDIN", loggedin);
    d.add("RPL_LOGGEDOUT", loggedout);
    d.add("RPL_SASLSUCCESS", sasl_success);
    d.add("ERR_NICKLOCKED", sasl_failed);
    d.add("ERR_SASLFAIL", sasl_failed);
    d.add("ERR_SASLTOOLONG", sasl_failed);
    d.add("ERR_SASLABORTED", sasl_failed);
    d.add("ERR_SASLALREADY", sasl_failed);
    d.add("RPL_SASLMECHS", ignore);
    d.add("ERR_NICKNAMEINUSE", nick_in_use);
    d.add("ERR_ERRONEUSNICKNAME", nick_invalid);
    d.add("ERROR", error);
}

fn ignore(_: &mut Session, _: &Message, _: &mut Outbox) {}

fn welcome(s: &mut Session, msg: &Message, out: &mut Outbox) {
    let nick = param(msg, 0);
    if !nick.is_empty() {
        s.nick = nick;
    }
    if s.network.server.is_empty() {
        s.network.server = msg.prefix.clone();
    }
    s.caps.registered();
    s.transition(ConnectionState::Registered);
    info!(nick = %s.nick, server = %s.network.server, "registered");
    out.emit(Event::Registered {
        nick: s.nick.clone(),
    });
}

fn myinfo(s: &mut Session, msg: &Message, _: &mut Outbox) {
    if let Some(server) = msg.param(1) {
        s.network.server = server.to_string();
    }
}

fn isupport(s: &mut Session, msg: &Message, out: &mut Outbox) {
    s.network.apply_isupport(&msg.params);
    out.emit(Event::ServerOptions(Box::new(s.network.clone())));
}

fn ping(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.send(Message::new("PONG", msg.params.iter().cloned()).to_string());
    out.emit(Event::Ping { message: last(msg) });
}

fn pong(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::Pong { message: last(msg) });
}

fn cap(s: &mut Session, msg: &Message, out: &mut Outbox) {
    out.lines.extend(s.caps.handle_cap(&msg.params));
}

fn authenticate(s: &mut Session, msg: &Message, out: &mut Outbox) {
    out.lines.extend(s.caps.handle_authenticate(&msg.params));
}

fn loggedin(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::Loggedin {
        nick: param(msg, 0),
        account: param(msg, 2),
        message: last(msg),
    });
}

fn loggedout(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::Loggedout {
        nick: param(msg, 0),
        message: last(msg),
    });
}

fn sasl_success(s: &mut Session, _: &Message, out: &mut Outbox) {
    debug!("sasl authentication succeeded");
    out.lines.extend(s.caps.sasl_finished());
}

fn sasl_failed(s: &mut Session, msg: &Message, out: &mut Outbox) {
    let reason = match msg.command.as_str() {
        "902" => "nick_locked",
        "905" => "too_long",
        "906" => "aborted",
        "907" => "already_authenticated",
        _ => "fail",
    };
    debug!(reason, "sasl authentication failed");
    out.emit(Event::SaslFailed {
        reason: reason.to_string(),
        message: last(msg),
    });
    out.lines.extend(s.caps.sasl_finished());
}

fn nick_in_use(s: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::NickInUse {
        nick: param(msg, 1),
        reason: last(msg),
    });
    if !s.is_registered() {
        s.nick.push('_');
        debug!(nick = %s.nick, "nick in use, retrying");
        out.send(Message::new("NICK", [s.nick.as_str()]).to_string());
    }
}

fn nick_invalid(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::NickInvalid {
        nick: param(msg, 1),
        reason: last(msg),
    });
}

fn error(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::IrcError {
        error: "irc".to_string(),
        channel: None,
        nick: None,
        reason: last(msg),
    });
}
