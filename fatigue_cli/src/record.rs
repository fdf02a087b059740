//! `fatigue record`: start a run with one parameter set and log it as JSON
//! lines.
//!
//! The first line written is the run header (`"type": "run"`). Every tick
//! then adds one `"type": "sample"` line tagged with the run id; a sample
//! whose state differs from the one before it carries `"transition": true`.
//! Records are appended, so one file can hold many runs.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use fatigue_config::{Calibration, Config};
use fatigue_core::{ControlParams, CycleState, RigError, RunOptions, RunSummary, decode_frame};
use serde::Serialize;

use crate::run::build_rig;

#[derive(Debug, Clone, Default)]
pub struct RecordArgs {
    pub name: String,
    pub stop_force: Option<f32>,
    pub clear_force: Option<f32>,
    pub feed_rate: Option<f32>,
    pub retract_rate: Option<f32>,
    pub max_ticks: Option<u64>,
    pub tick_hz: Option<u32>,
}

impl RecordArgs {
    /// Configured parameters with the command-line overrides applied.
    pub fn params(&self, cfg: &Config) -> eyre::Result<ControlParams> {
        let base = ControlParams::from(&cfg.params);
        let params = ControlParams {
            stop_force: self.stop_force.unwrap_or(base.stop_force),
            zero_force_clear_threshold: self.clear_force.unwrap_or(base.zero_force_clear_threshold),
            forward_velocity: self.feed_rate.unwrap_or(base.forward_velocity),
            reverse_velocity: self.retract_rate.unwrap_or(base.reverse_velocity),
        };
        for (key, v) in [
            ("stop_force", params.stop_force),
            ("clear_force", params.zero_force_clear_threshold),
            ("feed_rate", params.forward_velocity),
            ("retract_rate", params.reverse_velocity),
        ] {
            if !v.is_finite() {
                return Err(eyre::Report::new(RigError::Config(format!(
                    "record {key} must be finite, got {v}"
                ))));
            }
        }
        Ok(params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunHeader {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub run_id: u64,
    pub name: String,
    pub start_time: String,
    pub stop_force: f32,
    pub clear_force: f32,
    pub feed_rate: f32,
    pub retract_rate: f32,
}

impl RunHeader {
    pub fn new(run_id: u64, name: &str, params: &ControlParams) -> Self {
        Self {
            kind: "run",
            run_id,
            name: name.to_owned(),
            start_time: chrono::Local::now().to_rfc3339(),
            stop_force: params.stop_force,
            clear_force: params.zero_force_clear_threshold,
            feed_rate: params.forward_velocity,
            retract_rate: params.reverse_velocity,
        }
    }

    /// Command lines that load this run's parameters and start cycling.
    pub fn commands(&self) -> String {
        format!(
            "SET {} {} {} {}\nBEGIN\n",
            self.stop_force, self.clear_force, self.feed_rate, self.retract_rate
        )
    }
}

#[derive(Serialize)]
struct SampleRow {
    #[serde(rename = "type")]
    kind: &'static str,
    run_id: u64,
    cycle: u32,
    elapsed_us: u32,
    force_n: f32,
    position_mm: f32,
    state: &'static str,
    transition: bool,
}

/// Telemetry frames in, sample rows out.
pub struct RecordSink<W: Write> {
    inner: W,
    run_id: u64,
    line: Vec<u8>,
    previous: Option<CycleState>,
    samples: u64,
    transitions: u64,
}

impl<W: Write> RecordSink<W> {
    pub fn new(inner: W, run_id: u64) -> Self {
        Self {
            inner,
            run_id,
            line: Vec::with_capacity(fatigue_core::FRAME_LEN),
            previous: None,
            samples: 0,
            transitions: 0,
        }
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    fn emit(&mut self) -> io::Result<()> {
        let record =
            decode_frame(&self.line).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let transition = self.previous.is_some_and(|p| p != record.state);
        self.previous = Some(record.state);

        let row = SampleRow {
            kind: "sample",
            run_id: self.run_id,
            cycle: record.cycle,
            elapsed_us: record.elapsed_micros,
            force_n: record.force,
            position_mm: record.position,
            state: record.state.name(),
            transition,
        };
        serde_json::to_writer(&mut self.inner, &row)?;
        self.inner.write_all(b"\n")?;

        self.samples += 1;
        if transition {
            self.transitions += 1;
            tracing::debug!(cycle = record.cycle, state = %record.state, "state transition");
        }
        Ok(())
    }
}

impl<W: Write> Write for RecordSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &b in buf {
            self.line.push(b);
            if b == b'\n' {
                self.emit()?;
                self.line.clear();
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// One past the highest run id in `existing`, or 1 when there is none.
pub fn next_run_id<R: BufRead>(existing: R) -> eyre::Result<u64> {
    let mut last = 0;
    for line in existing.lines() {
        let line = line.wrap_err("read existing record file")?;
        if !line.contains("\"run\"") {
            continue;
        }
        let Ok(v) = serde_json::from_str::<serde_json::Value>(&line) else {
            continue;
        };
        if v["type"] == "run" {
            if let Some(id) = v["run_id"].as_u64() {
                last = last.max(id);
            }
        }
    }
    Ok(last + 1)
}

/// Open `path` for appending and pick the run id that follows what it holds.
pub fn open_record_file(path: &Path) -> eyre::Result<(u64, BufWriter<File>)> {
    let run_id = match File::open(path) {
        Ok(f) => next_run_id(BufReader::new(f))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => 1,
        Err(e) => return Err(e).wrap_err_with(|| format!("open {}", path.display())),
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .wrap_err_with(|| format!("open {} for append", path.display()))?;
    Ok((run_id, BufWriter::new(file)))
}

#[derive(Debug, Clone)]
pub struct RecordSummary {
    pub run_id: u64,
    pub samples: u64,
    pub transitions: u64,
    pub run: RunSummary,
}

/// Initialize the rig, write the run header, send SET and BEGIN, and log
/// every tick until `max_ticks` or shutdown.
pub fn record<W: Write>(
    cfg: &Config,
    calib: Option<&Calibration>,
    args: &RecordArgs,
    run_id: u64,
    mut out: W,
    shutdown: &AtomicBool,
) -> eyre::Result<RecordSummary> {
    let params = args.params(cfg)?;
    let mut ctrl = build_rig(cfg, calib)?;
    ctrl.initialize().wrap_err("rig startup")?;

    let header = RunHeader::new(run_id, &args.name, &params);
    serde_json::to_writer(&mut out, &header).wrap_err("write run header")?;
    out.write_all(b"\n").wrap_err("write run header")?;
    tracing::info!(run_id, name = %header.name, start_time = %header.start_time, "run started");

    let mut commands: VecDeque<u8> = header.commands().into_bytes().into();
    let mut sink = RecordSink::new(out, run_id);
    let opts = RunOptions {
        tick_hz: args.tick_hz.unwrap_or(cfg.runner.tick_hz),
        max_ticks: args.max_ticks,
    };
    let run = fatigue_core::run(&mut ctrl, &mut commands, &mut sink, opts, shutdown)?;
    sink.flush().wrap_err("flush record output")?;

    Ok(RecordSummary {
        run_id,
        samples: sink.samples(),
        transitions: sink.transitions(),
        run,
    })
}
