//! Channel membership, topics, modes, NAMES and ban lists.

use super::{last, param, Dispatcher, Outbox};
use crate::connection::Session;
use crate::event::{BanEntry, ChannelUser, Event};
use crate::message::Message;
use crate::mode::parse_mode_changes;
use crate::prefix::PrefixParts;

pub(super) fn register(d: &mut Dispatcher) {
    d.add("JOIN", join);
    d.add("PART", part);
    d.add("KICK", kick);
    d.add("TOPIC", topic);
    d.add("RPL_TOPIC", rpl_topic);
    d.add("RPL_NOTOPIC", rpl_topic);
    d.add("RPL_TOPICWHOTIME", topic_who_time);
    d.add("MODE", mode);
    d.add("RPL_CHANNELMODEIS", channel_mode_is);
    d.add("RPL_CREATIONTIME", creation_time);
    d.add("INVITE", invite);
    d.add("RPL_NAMEREPLY", names);
    d.add("RPL_ENDOFNAMES", end_of_names);
    d.add("RPL_BANLIST", banlist);
    d.add("RPL_ENDOFBANLIST", end_of_banlist);
}

fn join(_: &mut Session, msg: &Message, out: &mut Outbox) {
    // extended-join: JOIN #chan account :realname
    let account = msg
        .param(1)
        .filter(|a| *a != "*")
        .map(str::to_string);
    let gecos = if msg.params.len() > 2 {
        Some(last(msg))
    } else {
        None
    };
    out.emit(Event::Join {
        channel: param(msg, 0),
        nick: msg.nick.clone(),
        ident: msg.ident.clone(),
        hostname: msg.hostname.clone(),
        account,
        gecos,
    });
}

fn part(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::Part {
        channel: param(msg, 0),
        nick: msg.nick.clone(),
        ident: msg.ident.clone(),
        hostname: msg.hostname.clone(),
        message: param(msg, 1),
    });
}

fn kick(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::Kick {
        channel: param(msg, 0),
        kicked: param(msg, 1),
        nick: msg.nick.clone(),
        message: param(msg, 2),
    });
}

fn topic(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::Topic {
        channel: param(msg, 0),
        topic: param(msg, 1),
        nick: Some(msg.nick.clone()),
    });
}

fn rpl_topic(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::Topic {
        channel: param(msg, 1),
        topic: if msg.command == "331" {
            String::new()
        } else {
            param(msg, 2)
        },
        nick: None,
    });
}

fn topic_who_time(_: &mut Session, msg: &Message, out: &mut Outbox) {
    let setter = param(msg, 2);
    out.emit(Event::TopicSetBy {
        channel: param(msg, 1),
        nick: PrefixParts::parse(&setter).nick.to_string(),
        when: msg.param(3).and_then(|t| t.parse().ok()),
    });
}

fn mode(s: &mut Session, msg: &Message, out: &mut Outbox) {
    let target = param(msg, 0);
    let is_channel = s.network.is_channel(&target);
    let modes = parse_mode_changes(
        msg.param(1).unwrap_or_default(),
        msg.params.get(2..).unwrap_or_default(),
        &s.network,
        is_channel,
    );
    out.emit(Event::Mode {
        target,
        nick: msg.nick.clone(),
        modes,
    });
}

fn channel_mode_is(s: &mut Session, msg: &Message, out: &mut Outbox) {
    let modes = parse_mode_changes(
        msg.param(2).unwrap_or_default(),
        msg.params.get(3..).unwrap_or_default(),
        &s.network,
        true,
    );
    out.emit(Event::ChannelInfo {
        channel: param(msg, 1),
        modes,
        created_at: None,
    });
}

fn creation_time(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::ChannelInfo {
        channel: param(msg, 1),
        modes: Vec::new(),
        created_at: msg.param(2).and_then(|t| t.parse().ok()),
    });
}

fn invite(_: &mut Session, msg: &Message, out: &mut Outbox) {
    out.emit(Event::Invite {
        nick: msg.nick.clone(),
        invited: param(msg, 0),
        channel: param(msg, 1),
    });
}

fn names(s: &mut Session, msg: &Message, _: &mut Outbox) {
    // 353 me = #chan :@alice +bob carol
    let channel = param(msg, 2);
    let key = s.network.fold(&channel);
    let mut users = Vec::new();
    for entry in last(msg).split(' ').filter(|e| !e.is_empty()) {
        let (modes, rest) = s.network.split_user_prefixes(entry);
        let parts = PrefixParts::parse(rest);
        users.push(ChannelUser {
            nick: parts.nick.to_string(),
            ident: parts.ident.to_string(),
            hostname: if parts.ident.is_empty() && parts.hostname == parts.nick {
                String::new()
            } else {
                parts.hostname.to_string()
            },
            modes,
        });
    }
    s.pending.names.entry(&key).extend(users);
}

fn end_of_names(s: &mut Session, msg: &Message, out: &mut Outbox) {
    let channel = param(msg, 1);
    let key = s.network.fold(&channel);
    let users = s.pending.names.finalize(&key).unwrap_or_default();
    out.emit(Event::Userlist { channel, users });
}

fn banlist(s: &mut Session, msg: &Message, _: &mut Outbox) {
    let channel = param(msg, 1);
    let key = s.network.fold(&channel);
    let entry = BanEntry {
        mask: param(msg, 2),
        banned_by: msg.param(3).map(str::to_string),
        banned_at: msg.param(4).and_then(|t| t.parse().ok()),
        channel,
    };
    s.pending.bans.entry(&key).push(entry);
}

fn end_of_banlist(s: &mut Session, msg: &Message, out: &mut Outbox) {
    let channel = param(msg, 1);
    let key = s.network.fold(&channel);
    let bans = s.pending.bans.finalize(&key).unwrap_or_default();
    out.emit(Event::Banlist { channel, bans });
}
