//! `fatigue decode`: hex telemetry lines in, JSON objects out.

use std::io::{BufRead, Write};

use eyre::WrapErr;
use fatigue_core::{SampleRecord, decode_frame};
use serde_json::json;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStats {
    pub decoded: u64,
    pub skipped: u64,
}

pub fn record_json(r: &SampleRecord) -> serde_json::Value {
    json!({
        "cycle": r.cycle,
        "elapsed_us": r.elapsed_micros,
        "force_n": r.force,
        "position_mm": r.position,
        "state": r.state.name(),
    })
}

/// Decode every line of `input`. Blank lines are ignored, malformed ones
/// are logged and skipped.
pub fn decode_stream<R: BufRead, W: Write>(mut input: R, out: &mut W) -> eyre::Result<DecodeStats> {
    let mut stats = DecodeStats::default();
    let mut line = Vec::with_capacity(64);
    let mut line_no: u64 = 0;
    loop {
        line.clear();
        let n = input.read_until(b'\n', &mut line).wrap_err("read telemetry input")?;
        if n == 0 {
            break;
        }
        line_no += 1;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match decode_frame(&line) {
            Ok(record) => {
                writeln!(out, "{}", record_json(&record)).wrap_err("write decoded record")?;
                stats.decoded += 1;
            }
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping malformed frame");
                stats.skipped += 1;
            }
        }
    }
    out.flush().wrap_err("flush decoded output")?;
    tracing::debug!(decoded = stats.decoded, skipped = stats.skipped, "decode done");
    Ok(stats)
}
