//! Type-state builder for `RigController`.
//!
//! `build()` only exists once a load cell, an angle sensor and a motion
//! driver have been supplied; forgetting one is a compile error. Numeric
//! settings are checked at `build()` and reported as `BuildError`.

use std::time::{Duration, Instant};

use fatigue_traits::clock::{Clock, MonotonicClock};
use fatigue_traits::{AngleSensor, LoadCell, MotionDriver};

use crate::calibration::ForceCalibration;
use crate::command::LineBuffer;
use crate::config::{ControlParams, EncoderCfg, ForceCfg, MotionCfg, TravelCfg};
use crate::controller::RigController;
use crate::error::{BuildError, Result};
use crate::fusion::SensorFusion;
use crate::motion::Motion;
use crate::telemetry::SampleRecord;
use crate::units::UnitConverter;

/// Placeholder for a collaborator that has not been supplied yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct Missing;

pub const DEFAULT_MAX_LINE_LEN: usize = 128;

pub struct RigBuilder<L, A, D> {
    load_cell: L,
    encoder: A,
    driver: D,
    units: UnitConverter,
    travel: TravelCfg,
    motion: MotionCfg,
    encoder_cfg: EncoderCfg,
    force: ForceCfg,
    calibration: ForceCalibration,
    params: ControlParams,
    max_line_len: usize,
    clock: Option<Box<dyn Clock + Send + Sync>>,
}

impl Default for RigBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            load_cell: Missing,
            encoder: Missing,
            driver: Missing,
            units: UnitConverter::default(),
            travel: TravelCfg::default(),
            motion: MotionCfg::default(),
            encoder_cfg: EncoderCfg::default(),
            force: ForceCfg::default(),
            calibration: ForceCalibration::default(),
            params: ControlParams::default(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            clock: None,
        }
    }
}

impl RigBuilder<Missing, Missing, Missing> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed every setting from a loaded TOML config.
    pub fn from_config(cfg: &fatigue_config::Config) -> Self {
        Self {
            units: (&cfg.units).into(),
            travel: (&cfg.travel).into(),
            motion: (&cfg.motion).into(),
            encoder_cfg: (&cfg.encoder).into(),
            force: (&cfg.force).into(),
            calibration: (&cfg.force).into(),
            params: (&cfg.params).into(),
            max_line_len: cfg.runner.max_line_len,
            ..Self::default()
        }
    }
}

impl<L, A, D> RigBuilder<L, A, D> {
    pub fn with_load_cell<L2: LoadCell>(self, load_cell: L2) -> RigBuilder<L2, A, D> {
        RigBuilder {
            load_cell,
            encoder: self.encoder,
            driver: self.driver,
            units: self.units,
            travel: self.travel,
            motion: self.motion,
            encoder_cfg: self.encoder_cfg,
            force: self.force,
            calibration: self.calibration,
            params: self.params,
            max_line_len: self.max_line_len,
            clock: self.clock,
        }
    }

    pub fn with_encoder<A2: AngleSensor>(self, encoder: A2) -> RigBuilder<L, A2, D> {
        RigBuilder {
            load_cell: self.load_cell,
            encoder,
            driver: self.driver,
            units: self.units,
            travel: self.travel,
            motion: self.motion,
            encoder_cfg: self.encoder_cfg,
            force: self.force,
            calibration: self.calibration,
            params: self.params,
            max_line_len: self.max_line_len,
            clock: self.clock,
        }
    }

    pub fn with_driver<D2: MotionDriver>(self, driver: D2) -> RigBuilder<L, A, D2> {
        RigBuilder {
            load_cell: self.load_cell,
            encoder: self.encoder,
            driver,
            units: self.units,
            travel: self.travel,
            motion: self.motion,
            encoder_cfg: self.encoder_cfg,
            force: self.force,
            calibration: self.calibration,
            params: self.params,
            max_line_len: self.max_line_len,
            clock: self.clock,
        }
    }

    pub fn with_units(mut self, units: UnitConverter) -> Self {
        self.units = units;
        self
    }

    pub fn with_travel(mut self, travel: TravelCfg) -> Self {
        self.travel = travel;
        self
    }

    pub fn with_motion(mut self, motion: MotionCfg) -> Self {
        self.motion = motion;
        self
    }

    pub fn with_encoder_cfg(mut self, encoder_cfg: EncoderCfg) -> Self {
        self.encoder_cfg = encoder_cfg;
        self
    }

    pub fn with_force(mut self, force: ForceCfg) -> Self {
        self.force = force;
        self
    }

    /// Replace the force calibration, e.g. one fitted from a CSV.
    pub fn with_calibration(mut self, calibration: ForceCalibration) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn with_params(mut self, params: ControlParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    fn validate(&self) -> std::result::Result<(), BuildError> {
        let t = self.travel;
        if !t.max_travel_mm.is_finite() || t.max_travel_mm <= 0.0 {
            return Err(BuildError::InvalidConfig("max_travel_mm must be > 0"));
        }
        if !t.clearance_mm.is_finite() || t.clearance_mm < 0.0 {
            return Err(BuildError::InvalidConfig("clearance_mm must be >= 0"));
        }
        let m = self.motion;
        if !(m.accel_mm_s2 > 0.0 && m.fast_stop_decel_mm_s2 > 0.0) {
            return Err(BuildError::InvalidConfig("accelerations must be > 0"));
        }
        if self.encoder_cfg.full_scale < 2 {
            return Err(BuildError::InvalidConfig("encoder full_scale must be >= 2"));
        }
        let tf = self.encoder_cfg.turn_factor_mm;
        if !tf.is_finite() || tf == 0.0 {
            return Err(BuildError::InvalidConfig("turn_factor_mm must be non-zero"));
        }
        let cpn = self.calibration.counts_per_newton;
        if !cpn.is_finite() || cpn == 0.0 {
            return Err(BuildError::InvalidConfig("counts_per_newton must be non-zero"));
        }
        if self.force.read_timeout_ms == 0 {
            return Err(BuildError::InvalidConfig("read_timeout_ms must be >= 1"));
        }
        let p = self.params;
        if ![
            p.stop_force,
            p.zero_force_clear_threshold,
            p.forward_velocity,
            p.reverse_velocity,
        ]
        .iter()
        .all(|v| v.is_finite())
        {
            return Err(BuildError::InvalidConfig("control parameters must be finite"));
        }
        if self.max_line_len < 8 {
            return Err(BuildError::InvalidConfig("max_line_len must be >= 8"));
        }
        Ok(())
    }
}

impl<L: LoadCell, A: AngleSensor, D: MotionDriver> RigBuilder<L, A, D> {
    /// Validate settings and assemble the controller. Does not touch the
    /// hardware; call `RigController::initialize` next.
    pub fn build(self) -> Result<RigController<L, A, D>> {
        self.validate().map_err(eyre::Report::new)?;
        let clock: Box<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Box::new(MonotonicClock::new()),
        };
        let cycle_start: Instant = clock.now();
        Ok(RigController {
            fusion: SensorFusion::new(
                self.load_cell,
                self.encoder,
                self.calibration,
                self.encoder_cfg,
                Duration::from_millis(self.force.read_timeout_ms),
            ),
            motion: Motion::new(self.driver, self.units),
            params: self.params,
            travel: self.travel,
            motion_cfg: self.motion,
            force_cfg: self.force,
            lines: LineBuffer::new(self.max_line_len),
            record: SampleRecord::default(),
            cycle_start,
            clock,
        })
    }
}
