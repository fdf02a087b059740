//! Helper doubles for fatigue_core

use crate::command::ByteSource;

/// A command source that never has input; the rig stays IDLE on it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInput;

impl ByteSource for NoInput {
    fn next_byte(&mut self) -> Option<u8> {
        None
    }
}
