//! Sample record and its hex line framing.
//!
//! Record layout (20 bytes, little-endian):
//!
//! | offset | width | field            |
//! |--------|-------|------------------|
//! | 0      | u32   | `cycle`          |
//! | 4      | u32   | `elapsed_micros` |
//! | 8      | f32   | `force` (N)      |
//! | 12     | f32   | `position` (mm)  |
//! | 16     | u32   | `state` tag      |
//!
//! A frame is the record as 40 uppercase hex digits, most-significant nibble
//! of each byte first, followed by `\n`.

use std::fmt;

use crate::error::TelemetryError;

pub const RECORD_LEN: usize = 20;
pub const FRAME_LEN: usize = 2 * RECORD_LEN + 1;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Controller state as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleState {
    /// Forward stroke toward the sample.
    Fwd,
    /// Retracting until the force releases.
    Rev,
    /// Backing off the clearance distance.
    RevClear,
    /// Waiting for commands.
    Idle,
}

impl CycleState {
    pub const fn tag(self) -> u32 {
        match self {
            Self::Fwd => 0,
            Self::Rev => 1,
            Self::RevClear => 2,
            Self::Idle => 3,
        }
    }

    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Fwd),
            1 => Some(Self::Rev),
            2 => Some(Self::RevClear),
            3 => Some(Self::Idle),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Fwd => "FWD",
            Self::Rev => "REV",
            Self::RevClear => "REV_CLEAR",
            Self::Idle => "IDLE",
        }
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Telemetry snapshot, rewritten once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRecord {
    pub cycle: u32,
    pub elapsed_micros: u32,
    pub force: f32,
    pub position: f32,
    pub state: CycleState,
}

impl Default for SampleRecord {
    fn default() -> Self {
        Self {
            cycle: 0,
            elapsed_micros: 0,
            force: 0.0,
            position: 0.0,
            state: CycleState::Idle,
        }
    }
}

impl SampleRecord {
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        out[0..4].copy_from_slice(&self.cycle.to_le_bytes());
        out[4..8].copy_from_slice(&self.elapsed_micros.to_le_bytes());
        out[8..12].copy_from_slice(&self.force.to_le_bytes());
        out[12..16].copy_from_slice(&self.position.to_le_bytes());
        out[16..20].copy_from_slice(&self.state.tag().to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; RECORD_LEN]) -> Result<Self, TelemetryError> {
        let word = |at: usize| [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]];
        let tag = u32::from_le_bytes(word(16));
        let state = CycleState::from_tag(tag).ok_or(TelemetryError::UnknownState(tag))?;
        Ok(Self {
            cycle: u32::from_le_bytes(word(0)),
            elapsed_micros: u32::from_le_bytes(word(4)),
            force: f32::from_le_bytes(word(8)),
            position: f32::from_le_bytes(word(12)),
            state,
        })
    }
}

/// Encode a record as one 41-byte telemetry line.
pub fn encode_frame(record: &SampleRecord) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    for (i, b) in record.to_bytes().iter().enumerate() {
        frame[2 * i] = HEX_UPPER[usize::from(b >> 4)];
        frame[2 * i + 1] = HEX_UPPER[usize::from(b & 0x0F)];
    }
    frame[FRAME_LEN - 1] = b'\n';
    frame
}

#[inline]
fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Decode one telemetry line back into a record.
///
/// Trailing `\n` / `\r` are ignored and lowercase digits are accepted, so
/// lines read by a host with text-mode I/O still decode.
pub fn decode_frame(line: &[u8]) -> Result<SampleRecord, TelemetryError> {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    let hex = &line[..end];
    if hex.len() != 2 * RECORD_LEN {
        return Err(TelemetryError::Length {
            expected: 2 * RECORD_LEN,
            got: hex.len(),
        });
    }
    let mut bytes = [0u8; RECORD_LEN];
    for (i, pair) in hex.chunks_exact(2).enumerate() {
        let hi = nibble(pair[0]).ok_or(TelemetryError::HexDigit(2 * i))?;
        let lo = nibble(pair[1]).ok_or(TelemetryError::HexDigit(2 * i + 1))?;
        bytes[i] = (hi << 4) | lo;
    }
    SampleRecord::from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_zero_record_frame() {
        let frame = encode_frame(&SampleRecord::default());
        assert_eq!(frame.len(), 41);
        assert_eq!(&frame[..], b"0000000000000000000000000000000003000000\n");
    }

    #[test]
    fn known_layout() {
        let rec = SampleRecord {
            cycle: 1,
            elapsed_micros: 0x0102_0304,
            force: 10.0,
            position: -1.0,
            state: CycleState::RevClear,
        };
        // 10.0f32 = 0x41200000, -1.0f32 = 0xBF800000
        assert_eq!(
            &encode_frame(&rec)[..],
            b"010000000403020100002041000080BF02000000\n"
        );
    }

    #[test]
    fn decode_accepts_lowercase_and_crlf() {
        let rec = SampleRecord {
            cycle: 7,
            elapsed_micros: 99,
            force: -0.25,
            position: 12.5,
            state: CycleState::Rev,
        };
        let mut line = String::from_utf8(encode_frame(&rec)[..40].to_vec())
            .unwrap()
            .to_lowercase();
        line.push_str("\r\n");
        assert_eq!(decode_frame(line.as_bytes()).unwrap(), rec);
    }

    #[test]
    fn decode_rejects_bad_input() {
        assert_eq!(
            decode_frame(b"00\n"),
            Err(TelemetryError::Length { expected: 40, got: 2 })
        );
        let mut frame = encode_frame(&SampleRecord::default());
        frame[5] = b'G';
        assert_eq!(decode_frame(&frame), Err(TelemetryError::HexDigit(5)));
        let mut frame = encode_frame(&SampleRecord::default());
        frame[32] = b'0';
        frame[33] = b'9';
        assert_eq!(decode_frame(&frame), Err(TelemetryError::UnknownState(9)));
    }

    #[test]
    fn state_tags_round_trip() {
        for s in [
            CycleState::Fwd,
            CycleState::Rev,
            CycleState::RevClear,
            CycleState::Idle,
        ] {
            assert_eq!(CycleState::from_tag(s.tag()), Some(s));
        }
        assert_eq!(CycleState::from_tag(4), None);
        assert_eq!(CycleState::RevClear.to_string(), "REV_CLEAR");
    }
}
