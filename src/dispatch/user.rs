//! User state changes, WHOIS and WHO.

use chrono::{TimeZone, Utc};

use super::{last, param, Dispatcher, Outbox};
use crate::connection::Session;
use crate::event::{Event, WhoUser, WhoisInfo};
use crate::message::Message;

pub(super) fn register(d: &mut Dispatcher) {
    d.add("NICK", nick);
    d.add("QUIT", quit);
    d.add("AWAY", away);
    d.add("RPL_NOWAWAY", now_away);
    d.add("RPL_UNAWAY", un_away);
    d.add("ACCOUNT", account);
    d.add("CHGHOST", chghost);
    d.add("SETNAME", setname);

    for name in [
        "RPL_WHOISUSER",
        "RPL_WHOISSERVER",
        "RPL_WHOISOPERATOR",
        "RPL_WHOISIDLE",
        "RPL_WHOISCHANNELS",
        "RPL_WHOISACCOUNT",
        "RPL_AWAY",
        "RPL_WHOISSECURE",
        "RPL_WHOISCERTFP",
        "RPL_WHOISHOST",
        "RPL_WHOISACTUALLY",
        "RPL_WHOISBOT",
        "RPL_WHOISSPECIAL",
        "RPL_WHOISREGNICK",
        "RPL_WHOISMODES",
    ] {
        d.add(name, whois_part);
    }
    d.add("RPL_ENDOFWHOIS", end_of_whois);
    d.add("RPL_WHOREPLY", who_reply);
    d.add("RPL_ENDOFWHO", end_of_who);
}

fn nick(s: &mut Session, msg: &Message, out: &mut Outbox) {
    let new_nick = param(msg, 0);
    if s.is_me(&msg.nick) {
        s.nick = new_nick.clone();
    }
    out.emit(Event::Nick {
        nick: msg.nick.clone(),
        new_nick,
    });
}

fn quit(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::Quit {
        nick: msg.nick.clone(),
        ident: msg.ident.clone(),
        hostname: msg.hostname.clone(),
        message: param(msg, 0),
    });
}

fn away(_: &mut Session, msg: &Message, out: &mut Outbox) {
    let message = param(msg, 0);
    if message.is_empty() {
        out.emit(Event::Back {
            nick: msg.nick.clone(),
            message,
        });
    } else {
        out.emit(Event::Away {
            nick: msg.nick.clone(),
            message,
        });
    }
}

fn now_away(s: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::Away {
        nick: s.nick.clone(),
        message: last(msg),
    });
}

fn un_away(s: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::Back {
        nick: s.nick.clone(),
        message: last(msg),
    });
}

fn account(_: &mut Session, msg: &Message, out: &mut Outbox) {
    let account = msg.param(0).filter(|a| *a != "*").map(str::to_string);
    out.emit(Event::Account {
        nick: msg.nick.clone(),
        account,
    });
}

fn chghost(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::Chghost {
        nick: msg.nick.clone(),
        ident: msg.ident.clone(),
        hostname: msg.hostname.clone(),
        new_ident: param(msg, 0),
        new_hostname: param(msg, 1),
    });
}

fn setname(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::Setname {
        nick: msg.nick.clone(),
        gecos: last(msg),
    });
}

/// Last whitespace-separated word of the trailing text.
fn last_word(msg: &Message) -> Option<String> {
    msg.last_param()
        .and_then(|t| t.split_whitespace().last())
        .map(str::to_string)
}

fn whois_part(s: &mut Session, msg: &Message, out: &mut Outbox) {
    let target = param(msg, 1);
    let key = s.network.fold(&target);

    // RPL_AWAY also arrives outside WHOIS, in reply to PRIVMSG.
    if msg.command == "301" {
        if let Some(info) = s.pending.whois.get_mut(&key) {
            info.away = Some(last(msg));
        } else {
            out.emit(Event::Away {
                nick: target,
                message: last(msg),
            });
        }
        return;
    }

    let info = s.pending.whois.entry(&key);
    if info.nick.is_empty() {
        info.nick = target;
    }
    match msg.command.as_str() {
        "311" => {
            info.ident = msg.param(2).map(str::to_string);
            info.hostname = msg.param(3).map(str::to_string);
            info.real_name = msg.param(5).map(str::to_string);
        }
        "312" => {
            info.server = msg.param(2).map(str::to_string);
            info.server_info = msg.param(3).map(str::to_string);
        }
        "313" => info.operator = msg.last_param().map(str::to_string),
        "317" => {
            info.idle = msg.param(2).and_then(|v| v.parse().ok());
            info.logon = msg
                .param(3)
                .and_then(|v| v.parse::<i64>().ok())
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single());
        }
        "319" => info.channels.extend(
            msg.last_param()
                .unwrap_or_default()
                .split_whitespace()
                .map(str::to_string),
        ),
        "330" => info.account = msg.param(2).map(str::to_string),
        "671" => info.secure = true,
        "276" => info.certfp = last_word(msg),
        "378" => {
            // "is connecting from *@host 192.0.2.1"
            let words: Vec<&str> = msg.last_param().unwrap_or_default().split_whitespace().collect();
            if let [.., host, ip] = words.as_slice() {
                info.actual_host = Some(host.trim_start_matches("*@").to_string());
                info.actual_ip = Some(ip.to_string());
            }
        }
        "338" => {
            if msg.params.len() > 3 {
                info.actual_ip = msg.param(msg.params.len() - 2).map(str::to_string);
            }
        }
        "335" => info.bot = true,
        "320" => info.special.push(last(msg)),
        "307" => info.registered_nick = true,
        "379" => info.modes = last_word(msg),
        _ => {}
    }
}

fn end_of_whois(s: &mut Session, msg: &Message, out: &mut Outbox) {
    let target = param(msg, 1);
    let key = s.network.fold(&target);
    let mut info = s.pending.whois.finalize(&key).unwrap_or_else(|| WhoisInfo {
        nick: target,
        ..WhoisInfo::default()
    });
    info.not_found = info.ident.is_none();
    out.emit(Event::Whois(info));
}

fn who_reply(s: &mut Session, msg: &Message, _: &mut Outbox) {
    // 352 me #chan ident host server nick flags :hops realname
    let flags = param(msg, 6);
    let trailing = last(msg);
    let (hops, real_name) = trailing.split_once(' ').unwrap_or((trailing.as_str(), ""));
    let user = WhoUser {
        channel: param(msg, 1),
        ident: param(msg, 2),
        hostname: param(msg, 3),
        server: param(msg, 4),
        nick: param(msg, 5),
        away: flags.starts_with('G'),
        operator: flags.contains('*'),
        channel_modes: flags.chars().filter_map(|c| s.network.mode_for_symbol(c)).collect(),
        hops: hops.parse().unwrap_or(0),
        real_name: real_name.to_string(),
    };
    s.pending.who.entry("").push(user);
}

fn end_of_who(s: &mut Session, msg: &Message, out: &mut Outbox) {
    let users = s.pending.who.finalize("").unwrap_or_default();
    out.emit(Event::Wholist {
        target: param(msg, 1),
        users,
    });
}
