#![no_main]
use std::collections::VecDeque;

use fatigue_core::{Command, LineBuffer, parse_command};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes through the line assembler, then every completed line
    // through the parser. Accepted commands carry only finite numbers.
    let mut src: VecDeque<u8> = data.iter().copied().collect();
    let mut lines = LineBuffer::new(64);
    while !src.is_empty() {
        let Some(line) = lines.poll(&mut src) else {
            continue;
        };
        match parse_command(&line) {
            Ok(Command::Set(p)) => {
                assert!(p.stop_force.is_finite());
                assert!(p.zero_force_clear_threshold.is_finite());
                assert!(p.forward_velocity.is_finite());
                assert!(p.reverse_velocity.is_finite());
            }
            Ok(Command::Goto(mm)) => assert!(mm.is_finite()),
            Ok(Command::Begin) | Err(_) => {}
        }
    }
});
