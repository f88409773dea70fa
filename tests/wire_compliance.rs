//! RFC 1459/2812 and IRCv3 edge cases through the public API.
//!
//! Covers tag escaping, the line grammar, prefix splitting, ISUPPORT-driven
//! mode decoding, CAP request computation and dispatch of real server
//! traffic.
//!
//! Run with: `cargo test --test wire_compliance`

use slirc_client::message::tags::{escape_tag_value, unescape_tag_value};
use slirc_client::{
    parse_mode_changes, CapNegotiator, ClientConfig, ConnectionState, Dispatcher, Event, Frames,
    LineFramer, Message, MessageParseError, ModeChange, NetworkInfo, Outbox, Session, TagValue,
};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn feed(session: &mut Session, line: &str) -> Outbox {
    let msg: Message = line.parse().expect("valid line");
    Dispatcher::new().dispatch(session, &msg)
}

fn registered() -> Session {
    let mut session = Session::new(&ClientConfig::new("irc.example.org", 6667, "me"));
    session.transition(ConnectionState::Registered);
    session
}

// =============================================================================
// IRCv3 MESSAGE TAGS (https://ircv3.net/specs/extensions/message-tags)
// =============================================================================

mod tag_escaping {
    use super::*;

    #[test]
    fn test_unescape_backslash() {
        assert_eq!(unescape_tag_value("path\\\\file"), "path\\file");
    }

    #[test]
    fn test_unescape_line_endings() {
        assert_eq!(unescape_tag_value("line\\rend"), "line\rend");
        assert_eq!(unescape_tag_value("line\\nend"), "line\nend");
    }

    #[test]
    fn test_escape_all_specials() {
        let mut escaped = String::new();
        escape_tag_value(&mut escaped, "a; b\\c\r\n").unwrap();
        assert_eq!(escaped, "a\\:\\sb\\\\c\\r\\n");
    }
}

mod tag_parsing {
    use super::*;

    #[test]
    fn test_tag_with_escaped_semicolon() {
        let msg: Message = "@key=value\\:with\\:semicolons :nick PRIVMSG #ch :hi"
            .parse()
            .unwrap();
        assert_eq!(msg.tag("key"), Some("value;with;semicolons"));
    }

    #[test]
    fn test_flag_tag_is_true_not_empty() {
        let msg: Message = "@+typing;empty= :nick TAGMSG #ch".parse().unwrap();
        assert_eq!(msg.tags.get("+typing"), Some(&TagValue::Flag));
        assert_eq!(msg.tags.get("empty"), Some(&TagValue::Text(String::new())));
    }

    #[test]
    fn test_vendor_and_client_only_tags() {
        let msg: Message = "@+example.com/custom=value;example.com/foo=bar :nick PRIVMSG #ch :hi"
            .parse()
            .unwrap();
        assert_eq!(msg.tag("+example.com/custom"), Some("value"));
        assert_eq!(msg.tag("example.com/foo"), Some("bar"));
    }

    #[test]
    fn test_duplicate_keys_last_wins_case_insensitive() {
        let msg: Message = "@Msgid=1;msgid=2 PING x".parse().unwrap();
        assert_eq!(msg.tags.len(), 1);
        assert_eq!(msg.tag("MSGID"), Some("2"));
    }

    #[test]
    fn test_server_time() {
        let msg: Message = "@time=2023-01-01T12:00:00.000Z :n!u@h PRIVMSG #c :x"
            .parse()
            .unwrap();
        assert_eq!(
            msg.server_time().map(|t| t.timestamp()),
            Some(1_672_574_400)
        );
        let bad: Message = "@time=yesterday :n!u@h PRIVMSG #c :x".parse().unwrap();
        assert!(bad.server_time().is_none());
    }
}

// =============================================================================
// RFC 1459/2812 MESSAGE FORMAT
// =============================================================================

mod message_format {
    use super::*;

    #[test]
    fn test_line_endings_accepted() {
        for raw in ["PING :server\r\n", "PING :server\n", "PING :server"] {
            let msg: Message = raw.parse().unwrap();
            assert_eq!(msg.command, "PING");
            assert_eq!(msg.params, vec!["server"]);
        }
    }

    #[test]
    fn test_command_upper_cased() {
        let msg: Message = "privmsg #c :x".parse().unwrap();
        assert_eq!(msg.command, "PRIVMSG");
    }

    #[test]
    fn test_trailing_preserves_leading_colon_and_spaces() {
        let msg: Message = "PRIVMSG #ch ::) hi  there".parse().unwrap();
        assert_eq!(msg.params, vec!["#ch", ":) hi  there"]);
    }

    #[test]
    fn test_numeric_command() {
        let msg: Message = ":irc.example.com 001 nick :Welcome".parse().unwrap();
        assert_eq!(msg.command, "001");
        assert!(msg.from_server());
    }

    #[test]
    fn test_many_params() {
        let raw = "CMD 1 2 3 4 5 6 7 8 9 10 11 12 13 14 :fifteen";
        let msg: Message = raw.parse().unwrap();
        assert_eq!(msg.params.len(), 15);
        assert_eq!(msg.params[14], "fifteen");
    }

    #[test]
    fn test_malformed_lines() {
        assert_eq!("".parse::<Message>(), Err(MessageParseError::EmptyMessage));
        assert!("   ".parse::<Message>().is_err());
        assert!("@a=b".parse::<Message>().is_err());
        assert!(":prefix.only".parse::<Message>().is_err());
        assert!("12 x".parse::<Message>().is_err());
    }
}

mod prefix_parsing {
    use super::*;

    #[test]
    fn test_full_user_prefix() {
        let msg: Message = ":nick!ident@host.example PRIVMSG #c :x".parse().unwrap();
        assert_eq!(
            (msg.nick.as_str(), msg.ident.as_str(), msg.hostname.as_str()),
            ("nick", "ident", "host.example")
        );
    }

    #[test]
    fn test_ipv6_host() {
        let msg: Message = ":nick!user@2001:db8::1 PRIVMSG #c :x".parse().unwrap();
        assert_eq!(msg.hostname, "2001:db8::1");
    }

    #[test]
    fn test_server_prefix() {
        let msg: Message = ":irc.example.com NOTICE * :hi".parse().unwrap();
        assert_eq!(msg.nick, "irc.example.com");
        assert_eq!(msg.hostname, "irc.example.com");
        assert!(msg.ident.is_empty());
    }
}

mod roundtrip {
    use super::*;

    fn check(raw: &str) {
        let msg: Message = raw.parse().unwrap();
        assert_eq!(msg.to_string(), raw);
    }

    #[test]
    fn test_roundtrip_lines() {
        check("PING server");
        check(":nick!user@host PRIVMSG #channel :Hello, world!");
        check("@time=2023-01-01T00:00:00Z;+typing :nick PRIVMSG #ch :hi there");
        check("PRIVMSG #ch :");
        check("PRIVMSG #ch ::starts-with-colon");
        check("@key=a\\sb\\:c PING x");
    }
}

mod framing {
    use super::*;

    #[test]
    fn test_overflow_at_limit_plus_one() {
        let mut framer = LineFramer::new(8);
        assert!(framer.push(b"12345678").lines.is_empty());
        let frames = framer.push(b"9");
        assert!(frames.overflow);
        assert!(frames.lines.is_empty());
        assert_eq!(framer.push(b"more\r\n"), Frames::default());
    }

    #[test]
    fn test_line_at_limit_is_fine() {
        let mut framer = LineFramer::new(8);
        let frames = framer.push(b"12345678\n");
        assert_eq!(frames.lines.len(), 1);
        assert!(!frames.overflow);
    }

    #[test]
    fn test_error_line_survives_overflow_in_same_chunk() {
        let mut framer = LineFramer::new(16);
        let mut chunk = b"ERROR :Closing link\r\n".to_vec();
        chunk.extend_from_slice(&[b'x'; 40]);
        let frames = framer.push(&chunk);
        assert!(frames.overflow);
        assert_eq!(frames.lines, vec![&b"ERROR :Closing link\r"[..]]);
    }
}

// =============================================================================
// ISUPPORT AND MODES
// =============================================================================

mod modes {
    use super::*;

    #[test]
    fn test_key_takes_param_and_flag_does_not() {
        let info = NetworkInfo::new();
        assert_eq!(
            parse_mode_changes("+k", &strings(&["pass"]), &info, true),
            vec![ModeChange {
                mode: "+k".into(),
                param: Some("pass".into())
            }]
        );
        assert_eq!(
            parse_mode_changes("-i", &[], &info, true),
            vec![ModeChange {
                mode: "-i".into(),
                param: None
            }]
        );
    }

    #[test]
    fn test_limit_only_on_add() {
        let info = NetworkInfo::new();
        let changes = parse_mode_changes("-l+lo", &strings(&["10", "bob"]), &info, true);
        assert_eq!(changes[0].param, None);
        assert_eq!(changes[1].param.as_deref(), Some("10"));
        assert_eq!(changes[2].param.as_deref(), Some("bob"));
    }

    #[test]
    fn test_isupport_changes_classification() {
        let mut info = NetworkInfo::new();
        info.apply_isupport(&strings(&[
            "me",
            "CHANMODES=beI,kf,lj,imnpst",
            "PREFIX=(ov)@+",
            "are supported by this server",
        ]));
        let changes = parse_mode_changes("+fj", &strings(&["#fwd", "3:5"]), &info, true);
        assert_eq!(changes[0].param.as_deref(), Some("#fwd"));
        assert_eq!(changes[1].param.as_deref(), Some("3:5"));
        assert!(!info.is_prefix_mode('h'));
    }
}

// =============================================================================
// CAP NEGOTIATION
// =============================================================================

mod caps {
    use super::*;

    fn ls(neg: &mut CapNegotiator, caps: &str) -> Vec<String> {
        neg.handle_cap(&strings(&["*", "LS", caps]))
    }

    #[test]
    fn test_request_without_credentials() {
        let mut neg = CapNegotiator::new(strings(&["multi-prefix"]), None);
        neg.begin();
        assert_eq!(ls(&mut neg, "multi-prefix sasl"), vec!["CAP REQ :multi-prefix"]);
    }

    #[test]
    fn test_request_with_credentials() {
        let config = ClientConfig {
            enable_sasl: true,
            password: Some("pw".into()),
            ..ClientConfig::new("irc.example.org", 6667, "me")
        };
        let mut neg = CapNegotiator::new(strings(&["multi-prefix"]), config.sasl_credentials());
        neg.begin();
        assert_eq!(
            ls(&mut neg, "multi-prefix sasl"),
            vec!["CAP REQ :multi-prefix sasl"]
        );
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

mod dispatch {
    use super::*;

    #[test]
    fn test_privmsg_event() {
        let mut s = registered();
        let out = feed(&mut s, ":nick!ident@host.example PRIVMSG #chan :hello world");
        match &out.events[..] {
            [Event::Privmsg(msg)] => {
                assert_eq!(msg.nick, "nick");
                assert_eq!(msg.ident, "ident");
                assert_eq!(msg.hostname, "host.example");
                assert_eq!(msg.target, "#chan");
                assert_eq!(msg.message, "hello world");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_names_with_multi_prefix_and_userhost() {
        let mut s = registered();
        feed(&mut s, ":srv 353 me = #Chan :@+alice!a@h bob");
        let out = feed(&mut s, ":srv 366 me #chan :End of /NAMES list.");
        match &out.events[..] {
            [Event::Userlist { channel, users }] => {
                assert_eq!(channel, "#chan");
                assert_eq!(users.len(), 2);
                assert_eq!(users[0].nick, "alice");
                assert_eq!(users[0].modes, vec!['o', 'v']);
                assert_eq!(users[0].hostname, "h");
                assert!(users[1].modes.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_casemapping_applies_to_own_nick() {
        let mut s = registered();
        s.nick = "Me[1]".into();
        feed(&mut s, ":srv 005 me CASEMAPPING=rfc1459 :are supported");
        let out = feed(&mut s, ":me{1}!u@h NICK other");
        assert_eq!(s.nick, "other");
        assert_eq!(out.events.len(), 1);
    }

    #[test]
    fn test_unknown_command_event() {
        let mut s = registered();
        let out = feed(&mut s, ":srv FOO bar :baz qux");
        assert_eq!(
            out.events,
            vec![Event::Unknown {
                command: "FOO".into(),
                params: strings(&["bar", "baz qux"])
            }]
        );
    }

    #[test]
    fn test_ctcp_version_reply() {
        let config = ClientConfig {
            version: Some("slirc 1.0".into()),
            ..ClientConfig::new("irc.example.org", 6667, "me")
        };
        let mut s = Session::new(&config);
        let out = feed(&mut s, ":bob!b@h PRIVMSG me :\u{1}VERSION\u{1}");
        assert_eq!(out.lines, vec!["NOTICE bob :\u{1}VERSION slirc 1.0\u{1}"]);
        assert!(matches!(&out.events[0], Event::CtcpRequest(c) if c.kind == "VERSION"));
    }
}
