#![no_main]

use codec::{CodecLimits, FieldDeltaCodec, ReplicaHistory, WireLimits};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let codec = FieldDeltaCodec::new(CodecLimits::for_testing());
    let limits = WireLimits::for_testing();
    let mut history = ReplicaHistory::new();

    // Length-prefixed frames so later packets can reference earlier ones.
    let mut idx = 0usize;
    while idx < data.len() && idx < 8192 {
        let len = usize::from(data[idx]) * 2 + 1;
        idx += 1;
        let end = (idx + len).min(data.len());
        let _ = history.receive(&data[idx..end], &codec, &limits);
        idx = end;
    }
});
