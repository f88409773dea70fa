//! Fuzz target for IRC message parsing and dispatch.
//!
//! Any line the parser accepts must serialize and dispatch without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_client::{ClientConfig, Dispatcher, Message, Session};
use std::str;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = str::from_utf8(data) else {
        return;
    };
    if input.is_empty() || input.len() > 1024 {
        return;
    }

    if let Ok(msg) = input.parse::<Message>() {
        let _ = msg.to_string();
        let _ = msg.server_time();
        let mut session = Session::new(&ClientConfig::new("irc.example.org", 6667, "fuzz"));
        let _ = Dispatcher::new().dispatch(&mut session, &msg);
    }
});
