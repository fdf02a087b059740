//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "fatigue", version, about = "Fatigue rig controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/fatigue_config.toml")]
    pub config: PathBuf,

    /// Optional force calibration CSV (strict header: raw,newtons)
    #[arg(long, value_name = "FILE")]
    pub calibration: Option<PathBuf>,

    /// Log and report errors as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins if set
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

impl RtLock {
    #[inline]
    pub fn os_default() -> Self {
        if cfg!(target_os = "linux") {
            RtLock::Current
        } else {
            RtLock::None
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop: commands on stdin, telemetry frames on stdout
    Run {
        /// Stop cleanly after this many ticks (default: run until Ctrl-C)
        #[arg(long, value_name = "N")]
        max_ticks: Option<u64>,
        /// Override the configured loop rate (0 = back to back)
        #[arg(long, value_name = "HZ")]
        tick_hz: Option<u32>,
        /// Enable real-time mode (SCHED_FIFO, affinity, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on Linux.\n\nAttempts SCHED_FIFO priority, pins to one CPU, and calls mlockall to lock the process address space into RAM. This reduces page faults and jitter during the control loop but may require elevated privileges or ulimits (e.g., memlock). Ignored on other OSes."
        )]
        rt: bool,
        /// Real-time priority for SCHED_FIFO (1..=max)
        #[arg(
            long,
            value_name = "PRIO",
            long_help = "SCHED_FIFO priority when --rt is enabled. Higher values run before lower ones. Range is platform-defined (usually 1..=99); out-of-range values are clamped."
        )]
        rt_prio: Option<i32>,
        /// Select memory locking mode for --rt: none, current, or all
        #[arg(
            long,
            value_enum,
            value_name = "MODE",
            long_help = "Select memory locking mode when --rt is enabled.\n- none: do not lock memory.\n- current: lock currently resident pages (mlockall(MCL_CURRENT)).\n- all: lock current and future pages (mlockall(MCL_CURRENT|MCL_FUTURE)).\nDefault: current on Linux."
        )]
        rt_lock: Option<RtLock>,
        /// CPU index to pin the process to when --rt is enabled. Defaults to 0.
        #[arg(long, value_name = "CPU")]
        rt_cpu: Option<usize>,
    },
    /// Send SET and BEGIN, then log the run as JSON lines under a run header
    Record {
        /// Run name stored in the header
        #[arg(long)]
        name: String,
        /// Append to this file instead of writing to stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Force that ends the forward stroke (N)
        #[arg(long, value_name = "N", allow_negative_numbers = true)]
        stop_force: Option<f32>,
        /// Force below which the retract stroke backs off (N)
        #[arg(long, value_name = "N", allow_negative_numbers = true)]
        clear_force: Option<f32>,
        /// Forward stroke velocity (mm/s)
        #[arg(long, value_name = "MM_S")]
        feed_rate: Option<f32>,
        /// Retract stroke velocity (mm/s)
        #[arg(long, value_name = "MM_S")]
        retract_rate: Option<f32>,
        /// Stop cleanly after this many ticks (default: run until Ctrl-C)
        #[arg(long, value_name = "N")]
        max_ticks: Option<u64>,
        /// Override the configured loop rate (0 = back to back)
        #[arg(long, value_name = "HZ")]
        tick_hz: Option<u32>,
    },
    /// Decode telemetry frames from stdin into JSON lines
    Decode,
    /// Build the rig, initialize it, run one tick and report
    SelfCheck,
}
