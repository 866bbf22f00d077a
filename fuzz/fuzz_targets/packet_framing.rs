#![no_main]

use codec::SELF_STATE_SIZE;
use libfuzzer_sys::fuzz_target;
use wire::{decode_packet, encode_packet, CountEncoding, Limits};

fuzz_target!(|data: &[u8]| {
    let Ok(packet) = decode_packet(data, SELF_STATE_SIZE, &Limits::for_testing()) else {
        return;
    };

    // Varint encodings may differ in bytes but must frame the same packet.
    let unlimited = Limits::unlimited();
    let bytes = match encode_packet(&packet, CountEncoding::Varint, &unlimited) {
        Ok(bytes) => bytes,
        Err(_) => return,
    };
    let reframed = decode_packet(&bytes, SELF_STATE_SIZE, &unlimited)
        .expect("re-encoded packet must decode");
    assert_eq!(reframed, packet);
});
