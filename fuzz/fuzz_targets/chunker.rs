//! Fuzz target for the outgoing message chunker.
//!
//! Every chunk must fit the budget and the chunks plus dropped whitespace
//! must rebuild the input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_client::{split_message, ChunkerConfig};

fuzz_target!(|input: (u8, String)| {
    let (budget, text) = input;
    let config = ChunkerConfig::with_max_bytes(usize::from(budget).max(4));
    if let Ok(chunks) = split_message(&text, &config) {
        let mut rebuilt = String::new();
        for chunk in &chunks {
            assert!(chunk.text.len() <= config.max_bytes);
            rebuilt.push_str(&chunk.text);
            rebuilt.push_str(&chunk.dropped);
        }
        assert_eq!(rebuilt, text);
    }
});
