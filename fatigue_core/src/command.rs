//! Line-oriented ASCII command protocol.
//!
//! ```text
//! SET <stop_force> <zero_force_clear_threshold> <forward_velocity> <reverse_velocity>
//! BEGIN
//! G0 <position_mm>
//! ```
//!
//! Fields are whitespace separated. A line that does not parse is dropped
//! whole; nothing is acknowledged on the wire.

use std::collections::VecDeque;

use crate::config::ControlParams;
use crate::error::CommandError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Replace all four control parameters.
    Set(ControlParams),
    /// Leave IDLE and start the first forward stroke.
    Begin,
    /// Jog to an absolute position (mm) without changing state.
    Goto(f32),
}

const SET_FIELDS: [&str; 4] = [
    "stop_force",
    "zero_force_clear_threshold",
    "forward_velocity",
    "reverse_velocity",
];

fn number(field: &'static str, text: &str) -> Result<f32, CommandError> {
    match text.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CommandError::BadNumber {
            field,
            text: text.to_owned(),
        }),
    }
}

fn expect_fields(keyword: &'static str, args: &[&str], expected: usize) -> Result<(), CommandError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(CommandError::FieldCount {
            keyword,
            expected,
            got: args.len(),
        })
    }
}

/// Parse one command line (without its terminating newline).
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut tokens = line.split_ascii_whitespace();
    let Some(keyword) = tokens.next() else {
        return Err(CommandError::Empty);
    };
    let args: Vec<&str> = tokens.collect();

    match keyword {
        "SET" => {
            expect_fields("SET", &args, SET_FIELDS.len())?;
            let mut v = [0.0f32; 4];
            for ((slot, field), text) in v.iter_mut().zip(SET_FIELDS).zip(&args) {
                *slot = number(field, text)?;
            }
            Ok(Command::Set(ControlParams {
                stop_force: v[0],
                zero_force_clear_threshold: v[1],
                forward_velocity: v[2],
                reverse_velocity: v[3],
            }))
        }
        "BEGIN" => {
            expect_fields("BEGIN", &args, 0)?;
            Ok(Command::Begin)
        }
        "G0" => {
            expect_fields("G0", &args, 1)?;
            Ok(Command::Goto(number("position", args[0])?))
        }
        other => Err(CommandError::UnknownKeyword(other.to_owned())),
    }
}

/// Non-blocking byte supply for the command accumulator.
pub trait ByteSource {
    /// Next pending byte, or `None` if nothing is available right now.
    fn next_byte(&mut self) -> Option<u8>;
}

impl ByteSource for VecDeque<u8> {
    fn next_byte(&mut self) -> Option<u8> {
        self.pop_front()
    }
}

/// Accumulates command bytes across ticks until a newline arrives.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    max_len: usize,
    overflowed: bool,
}

impl LineBuffer {
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_len),
            max_len,
            overflowed: false,
        }
    }

    /// Drain available bytes until one line completes.
    ///
    /// Returns at most one line per call; bytes after its newline stay in
    /// `src`. A line that grows past `max_len` is discarded up to and
    /// including its newline.
    pub fn poll<B: ByteSource + ?Sized>(&mut self, src: &mut B) -> Option<String> {
        while let Some(byte) = src.next_byte() {
            if byte == b'\n' {
                if self.overflowed {
                    self.overflowed = false;
                    tracing::warn!(
                        error = %CommandError::LineTooLong(self.max_len),
                        "command line discarded"
                    );
                    continue;
                }
                let line = String::from_utf8_lossy(&self.buf).into_owned();
                self.buf.clear();
                return Some(line);
            }
            if self.overflowed {
                continue;
            }
            if self.buf.len() >= self.max_len {
                self.buf.clear();
                self.overflowed = true;
                continue;
            }
            self.buf.push(byte);
        }
        None
    }

    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
