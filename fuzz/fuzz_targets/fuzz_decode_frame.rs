#![no_main]

use libfuzzer_sys::fuzz_target;
use loraraw_rs::payload::decoder::decode_frame_with;
use loraraw_rs::payload::header::MessageIdFraming;

fuzz_target!(|data: &[u8]| {
    // Any byte string must decode without panicking under every framing
    for framing in [
        MessageIdFraming::FromFlags,
        MessageIdFraming::Uplink,
        MessageIdFraming::Response,
    ] {
        let frame = decode_frame_with(data, framing);
        assert_eq!(frame.summary.fields, frame.fields.len());
    }
});
