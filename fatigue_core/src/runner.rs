use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use fatigue_traits::{AngleSensor, LoadCell, MotionDriver};

use crate::command::ByteSource;
use crate::controller::RigController;
use crate::error::Result as CoreResult;
use crate::telemetry::CycleState;

/// Loop pacing and limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Ticks per second; 0 runs the loop back to back.
    pub tick_hz: u32,
    /// Stop cleanly after this many ticks.
    pub max_ticks: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            tick_hz: 1_000,
            max_ticks: None,
        }
    }
}

impl From<&fatigue_config::Runner> for RunOptions {
    fn from(c: &fatigue_config::Runner) -> Self {
        Self {
            tick_hz: c.tick_hz,
            max_ticks: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    /// Forward strokes started (the record's `cycle` counter).
    pub cycles: u32,
    pub final_state: CycleState,
}

/// Deadline for the next tick given the current deadline and the time now.
///
/// An overrun resynchronises to `now` instead of bursting to catch up.
#[inline]
fn next_deadline(deadline: std::time::Instant, period: Duration, now: std::time::Instant) -> std::time::Instant {
    let next = deadline + period;
    if next < now { now } else { next }
}

/// Drive the controller until `shutdown` is raised or `max_ticks` is hit.
///
/// Each tick writes exactly one telemetry frame to `out`. On a fatal error
/// the carriage is halted best-effort, nothing more is written, and the
/// error is returned.
pub fn run<L, A, D, B, W>(
    ctrl: &mut RigController<L, A, D>,
    input: &mut B,
    out: &mut W,
    opts: RunOptions,
    shutdown: &AtomicBool,
) -> CoreResult<RunSummary>
where
    L: LoadCell,
    A: AngleSensor,
    D: MotionDriver,
    B: ByteSource + ?Sized,
    W: Write + ?Sized,
{
    let period = (opts.tick_hz > 0).then(|| Duration::from_micros(crate::util::period_us(opts.tick_hz)));
    tracing::info!(tick_hz = opts.tick_hz, max_ticks = ?opts.max_ticks, "control loop start");

    let mut ticks: u64 = 0;
    let mut deadline = ctrl.clock().now();
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!(ticks, "shutdown requested");
            break;
        }
        if opts.max_ticks.is_some_and(|max| ticks >= max) {
            break;
        }

        if let Err(e) = ctrl.tick(input, out) {
            tracing::error!(error = %e, ticks, state = %ctrl.state(), "control loop failed");
            if let Err(h) = ctrl.halt() {
                tracing::warn!(error = %h, "halt after failure did not complete");
            }
            return Err(e);
        }
        ticks += 1;

        if let Some(period) = period {
            let now = ctrl.clock().now();
            deadline = next_deadline(deadline, period, now);
            if deadline > now {
                ctrl.clock().sleep(deadline - now);
            }
        }
    }

    if let Err(e) = ctrl.halt() {
        tracing::warn!(error = %e, "halt on exit did not complete");
    }
    let summary = RunSummary {
        ticks,
        cycles: ctrl.record().cycle,
        final_state: ctrl.state(),
    };
    tracing::info!(ticks, cycles = summary.cycles, state = %summary.final_state, "control loop stopped");
    Ok(summary)
}
