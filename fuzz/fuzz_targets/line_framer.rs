//! Fuzz target for the line framer: arbitrary bytes, arbitrary chunking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_client::LineFramer;

fuzz_target!(|data: &[u8]| {
    let Some((&split, bytes)) = data.split_first() else {
        return;
    };
    let mut framer = LineFramer::new(64);
    for chunk in bytes.chunks(usize::from(split).max(1)) {
        for line in framer.push(chunk).lines {
            assert!(!line.contains(&b'\n'));
        }
    }
    assert!(framer.pending() <= 64 + usize::from(split).max(1));
});
