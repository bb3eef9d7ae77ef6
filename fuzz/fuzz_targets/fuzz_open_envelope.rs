#![no_main]

use libfuzzer_sys::fuzz_target;
use loraraw_rs::loraraw::crypto::{open, OpenedEnvelope};

const KEY: [u8; 16] = [0x42; 16];

fuzz_target!(|data: &[u8]| {
    // Random envelopes must be rejected cleanly
    let _ = open(data, &KEY);

    // The splitter sees attacker-controlled length bytes after decryption
    let _ = OpenedEnvelope::parse(data);
});
