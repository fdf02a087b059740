//! Rig assembly, the `run` control loop and `self-check`.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use fatigue_config::{Calibration, Config};
use fatigue_core::mocks::NoInput;
use fatigue_core::{CommandInput, FRAME_LEN, RigBuilder, RigController, RunOptions, RunSummary};
use fatigue_traits::{AngleSensor, LoadCell, MotionDriver};

use crate::backend;
use crate::cli::RtLock;
use crate::rt::setup_rt_once;

/// Chunks buffered between the stdin reader thread and the loop.
const INPUT_QUEUE: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunArgs {
    pub max_ticks: Option<u64>,
    pub tick_hz: Option<u32>,
    pub rt: bool,
    pub rt_prio: Option<i32>,
    pub rt_lock: Option<RtLock>,
    pub rt_cpu: Option<usize>,
}

/// Open the backend and build an un-initialized controller from config.
pub fn build_rig(
    cfg: &Config,
    calib: Option<&Calibration>,
) -> eyre::Result<RigController<impl LoadCell, impl AngleSensor, impl MotionDriver>> {
    let (load_cell, encoder, driver) = backend::open(cfg)?;
    let mut builder = RigBuilder::from_config(cfg)
        .with_load_cell(load_cell)
        .with_encoder(encoder)
        .with_driver(driver);
    if let Some(c) = calib {
        tracing::info!(
            counts_per_newton = c.counts_per_newton,
            zero_counts = c.zero_counts,
            "using CSV force calibration"
        );
        builder = builder.with_calibration(c.into());
    }
    builder.build()
}

pub fn run_rig(
    cfg: &Config,
    calib: Option<&Calibration>,
    args: RunArgs,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunSummary> {
    let mut ctrl = build_rig(cfg, calib)?;
    ctrl.initialize().wrap_err("rig startup")?;

    setup_rt_once(
        args.rt,
        args.rt_prio,
        args.rt_lock.unwrap_or_else(RtLock::os_default),
        args.rt_cpu,
    );

    let opts = RunOptions {
        tick_hz: args.tick_hz.unwrap_or(cfg.runner.tick_hz),
        max_ticks: args.max_ticks,
    };
    let mut input = CommandInput::spawn(std::io::stdin(), INPUT_QUEUE);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    fatigue_core::run(&mut ctrl, &mut input, &mut out, opts, &shutdown)
}

/// Startup plus one tick with no command input. Returns the frame produced.
pub fn self_check(cfg: &Config, calib: Option<&Calibration>) -> eyre::Result<Vec<u8>> {
    let mut ctrl = build_rig(cfg, calib)?;
    ctrl.initialize().wrap_err("rig startup")?;
    let mut frame = Vec::with_capacity(FRAME_LEN);
    let record = ctrl.tick(&mut NoInput, &mut frame)?;
    ctrl.halt()?;
    tracing::info!(
        force_n = record.force,
        position_mm = record.position,
        state = %record.state,
        "self-check passed"
    );
    Ok(frame)
}
