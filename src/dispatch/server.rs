//! MOTD, LIST, LINKS, user modes and error numerics.

use super::{last, param, Dispatcher, Outbox};
use crate::connection::Session;
use crate::event::{ChannelListEntry, Event, ServerLink};
use crate::message::Message;
use crate::mode::parse_mode_changes;

/// LIST entries are flushed in batches of this size.
const LIST_BATCH: usize = 50;

/// Where an error numeric carries its subject.
#[derive(Clone, Copy)]
enum Subject {
    None,
    Nick,
    Channel,
    NickChannel,
}

/// Error numerics surfaced as [`Event::IrcError`].
const ERRORS: &[(&str, &str, Subject)] = &[
    ("ERR_NOSUCHNICK", "no_such_nick", Subject::Nick),
    ("ERR_NOSUCHSERVER", "no_such_server", Subject::None),
    ("ERR_NOSUCHCHANNEL", "no_such_channel", Subject::Channel),
    ("ERR_CANNOTSENDTOCHAN", "cannot_send_to_channel", Subject::Channel),
    ("ERR_TOOMANYCHANNELS", "too_many_channels", Subject::Channel),
    ("ERR_WASNOSUCHNICK", "was_no_such_nick", Subject::Nick),
    ("ERR_TOOMANYTARGETS", "too_many_targets", Subject::None),
    ("ERR_NOORIGIN", "no_origin", Subject::None),
    ("ERR_NORECIPIENT", "no_recipient", Subject::None),
    ("ERR_NOTEXTTOSEND", "no_text_to_send", Subject::None),
    ("ERR_INPUTTOOLONG", "input_too_long", Subject::None),
    ("ERR_UNKNOWNCOMMAND", "unknown_command", Subject::None),
    ("ERR_NONICKNAMEGIVEN", "no_nickname_given", Subject::None),
    ("ERR_NICKCOLLISION", "nick_collision", Subject::Nick),
    ("ERR_UNAVAILRESOURCE", "unavailable_resource", Subject::None),
    ("ERR_USERNOTINCHANNEL", "user_not_in_channel", Subject::NickChannel),
    ("ERR_NOTONCHANNEL", "not_on_channel", Subject::Channel),
    ("ERR_USERONCHANNEL", "user_on_channel", Subject::NickChannel),
    ("ERR_NOTREGISTERED", "not_registered", Subject::None),
    ("ERR_NEEDMOREPARAMS", "not_enough_parameters", Subject::None),
    ("ERR_ALREADYREGISTRED", "already_registered", Subject::None),
    ("ERR_PASSWDMISMATCH", "password_mismatch", Subject::None),
    ("ERR_YOUREBANNEDCREEP", "banned_from_server", Subject::None),
    ("ERR_KEYSET", "key_set", Subject::Channel),
    ("ERR_LINKCHANNEL", "channel_forwarded", Subject::Channel),
    ("ERR_CHANNELISFULL", "channel_is_full", Subject::Channel),
    ("ERR_UNKNOWNMODE", "unknown_mode", Subject::None),
    ("ERR_INVITEONLYCHAN", "invite_only_channel", Subject::Channel),
    ("ERR_BANNEDFROMCHAN", "banned_from_channel", Subject::Channel),
    ("ERR_BADCHANNELKEY", "bad_channel_key", Subject::Channel),
    ("ERR_BADCHANMASK", "bad_channel_mask", Subject::Channel),
    ("ERR_NOCHANMODES", "channel_needs_registered_nick", Subject::Channel),
    ("ERR_BANLISTFULL", "ban_list_full", Subject::Channel),
    ("ERR_NOPRIVILEGES", "no_privileges", Subject::None),
    ("ERR_CHANOPRIVSNEEDED", "chanop_privs_needed", Subject::Channel),
    ("ERR_CANTKILLSERVER", "cant_kill_server", Subject::None),
    ("ERR_RESTRICTED", "restricted", Subject::None),
    ("ERR_UNIQOPPRIVSNEEDED", "uniq_op_privs_needed", Subject::None),
    ("ERR_NOOPERHOST", "no_oper_host", Subject::None),
    ("ERR_UMODEUNKNOWNFLAG", "unknown_user_mode_flag", Subject::None),
    ("ERR_USERSDONTMATCH", "users_dont_match", Subject::None),
    ("ERR_INVALIDMODEPARAM", "invalid_mode_param", Subject::None),
    ("ERR_NOPRIVS", "no_privs", Subject::None),
    ("ERR_MONLISTFULL", "monitor_list_full", Subject::None),
    ("ERR_CANNOTDOCOMMAND", "cannot_do_command", Subject::None),
];

pub(super) fn register(d: &mut Dispatcher) {
    d.add("RPL_MOTDSTART", motd_start);
    d.add("RPL_MOTD", motd);
    d.add("RPL_ENDOFMOTD", end_of_motd);
    d.add("ERR_NOMOTD", no_motd);
    d.add("RPL_LISTSTART", list_start);
    d.add("RPL_LIST", list);
    d.add("RPL_LISTEND", list_end);
    d.add("RPL_LINKS", links);
    d.add("RPL_ENDOFLINKS", end_of_links);
    d.add("RPL_UMODEIS", umode_is);
    for (name, _, _) in ERRORS {
        d.add(*name, irc_error);
    }
}

fn motd_start(s: &mut Session, _: &Message, _: &mut Outbox) {
    s.pending.motd.entry("").clear();
}

fn motd(s: &mut Session, msg: &Message, _: &mut Outbox) {
    let buf = s.pending.motd.entry("");
    buf.push_str(&last(msg));
    buf.push('\n');
}

fn end_of_motd(s: &mut Session, _: &Message, out: &mut Outbox) {
    out.emit(Event::Motd {
        motd: s.pending.motd.finalize("").unwrap_or_default(),
        error: None,
    });
}

fn no_motd(s: &mut Session, msg: &Message, out: &mut Outbox) {
    s.pending.motd.finalize("");
    out.emit(Event::Motd {
        motd: String::new(),
        error: Some(last(msg)),
    });
}

fn list_start(s: &mut Session, _: &Message, out: &mut Outbox) {
    s.pending.list.finalize("");
    out.emit(Event::ChannelListStart);
}

fn list(s: &mut Session, msg: &Message, out: &mut Outbox) {
    let entries = s.pending.list.entry("");
    entries.push(ChannelListEntry {
        channel: param(msg, 1),
        num_users: msg.param(2).and_then(|n| n.parse().ok()).unwrap_or(0),
        topic: param(msg, 3),
    });
    if entries.len() >= LIST_BATCH {
        out.emit(Event::ChannelList(std::mem::take(entries)));
    }
}

fn list_end(s: &mut Session, _: &Message, out: &mut Outbox) {
    if let Some(rest) = s.pending.list.finalize("").filter(|r| !r.is_empty()) {
        out.emit(Event::ChannelList(rest));
    }
    out.emit(Event::ChannelListEnd);
}

fn links(s: &mut Session, msg: &Message, _: &mut Outbox) {
    // 364 me mask server :hops description
    let trailing = last(msg);
    let (hops, description) = trailing.split_once(' ').unwrap_or((trailing.as_str(), ""));
    let link = ServerLink {
        address: param(msg, 1),
        access_via: param(msg, 2),
        hops: hops.parse().unwrap_or(0),
        description: description.to_string(),
    };
    s.pending.links.entry("").push(link);
}

fn end_of_links(s: &mut Session, _: &Message, out: &mut Outbox) {
    out.emit(Event::ServerLinks(
        s.pending.links.finalize("").unwrap_or_default(),
    ));
}

fn umode_is(s: &mut Session, msg: &Message, out: &mut Outbox) {
    let target = param(msg, 0);
    let modes = parse_mode_changes(msg.param(1).unwrap_or_default(), &[], &s.network, false);
    out.emit(Event::Mode {
        nick: target.clone(),
        target,
        modes,
    });
}

fn irc_error(_: &mut Session, msg: &Message, out: &mut Outbox) {
    let name = crate::response::numeric_name(&msg.command).unwrap_or_default();
    let Some((_, error, subject)) = ERRORS.iter().find(|(n, _, _)| *n == name) else {
        return;
    };
    let (nick, channel) = match subject {
        Subject::None => (None, None),
        Subject::Nick => (msg.param(1).map(str::to_string), None),
        Subject::Channel => (None, msg.param(1).map(str::to_string)),
        Subject::NickChannel => (
            msg.param(1).map(str::to_string),
            msg.param(2).map(str::to_string),
        ),
    };
    out.emit(Event::IrcError {
        error: error.to_string(),
        channel,
        nick,
        reason: last(msg),
    });
}
