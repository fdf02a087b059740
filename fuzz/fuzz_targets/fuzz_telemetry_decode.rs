#![no_main]
use fatigue_core::{decode_frame, encode_frame};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Whatever decodes must re-encode to the same bytes (modulo hex case).
    let Ok(record) = decode_frame(data) else {
        return;
    };
    let frame = encode_frame(&record);
    let again = decode_frame(&frame).unwrap();
    assert_eq!(record.to_bytes(), again.to_bytes());
});
