//! Sensor fusion: calibrated force and multi-turn linear position.
//!
//! The angle sensor only knows where it is within one revolution. The
//! `EncoderTracker` counts revolutions in software by watching for jumps of
//! more than half a revolution between consecutive samples:
//!
//! - `raw - previous >  full_scale / 2` → wrapped backward, `turns -= 1`
//! - `raw - previous < -full_scale / 2` → wrapped forward, `turns += 1`
//! - a jump of exactly half a revolution is treated as no wrap
//!
//! Position is `turn_factor_mm * (turns + (raw - origin) / full_scale)`,
//! where `origin` is the first raw sample seen, so the carriage reads 0 mm
//! wherever the magnet happens to sit at startup. With the default negative
//! turn factor, forward carriage travel decreases the raw angle. `turns`
//! starts at 0 and is never reset.

use std::time::Duration;

use fatigue_traits::{AngleSensor, LoadCell};

use crate::calibration::ForceCalibration;
use crate::config::EncoderCfg;
use crate::error::{Result, RigError};
use crate::hw_error::hw;

/// Pure revolution counter over wrapping angle samples.
#[derive(Debug, Clone)]
pub struct EncoderTracker {
    full_scale: u16,
    turn_factor_mm: f32,
    turns: i32,
    origin: u16,
    previous: u16,
    current: u16,
    primed: bool,
}

impl EncoderTracker {
    pub fn new(cfg: EncoderCfg) -> Self {
        Self {
            full_scale: cfg.full_scale,
            turn_factor_mm: cfg.turn_factor_mm,
            turns: 0,
            origin: 0,
            previous: 0,
            current: 0,
            primed: false,
        }
    }

    /// Fold in the next raw sample and return the fused position (mm).
    ///
    /// The first sample only primes the tracker: it becomes the origin and,
    /// with nothing to compare it against, can never count a wrap.
    pub fn update(&mut self, raw: u16) -> f32 {
        if !self.primed {
            self.origin = raw;
            self.previous = raw;
            self.primed = true;
        } else {
            self.previous = self.current;
        }
        self.current = raw;

        let diff = i32::from(self.current) - i32::from(self.previous);
        let fs = i32::from(self.full_scale);
        if 2 * diff > fs {
            self.turns -= 1;
        } else if 2 * diff < -fs {
            self.turns += 1;
        }
        self.position_mm()
    }

    pub fn position_mm(&self) -> f32 {
        let offset = f64::from(self.current) - f64::from(self.origin);
        let revs = f64::from(self.turns) + offset / f64::from(self.full_scale);
        (f64::from(self.turn_factor_mm) * revs) as f32
    }

    pub fn turns(&self) -> i32 {
        self.turns
    }

    pub fn raw(&self) -> u16 {
        self.current
    }

    /// Raw angle that maps to 0 mm. Meaningless until the first sample.
    pub fn origin(&self) -> u16 {
        self.origin
    }

    pub fn full_scale(&self) -> u16 {
        self.full_scale
    }
}

/// Owns the load cell and angle sensor and turns their raw readings into
/// newtons and millimetres.
pub struct SensorFusion<L: LoadCell, A: AngleSensor> {
    load_cell: L,
    encoder: A,
    calibration: ForceCalibration,
    tracker: EncoderTracker,
    read_timeout: Duration,
}

impl<L: LoadCell, A: AngleSensor> SensorFusion<L, A> {
    pub fn new(
        load_cell: L,
        encoder: A,
        calibration: ForceCalibration,
        encoder_cfg: EncoderCfg,
        read_timeout: Duration,
    ) -> Self {
        Self {
            load_cell,
            encoder,
            calibration,
            tracker: EncoderTracker::new(encoder_cfg),
            read_timeout,
        }
    }

    /// Average `samples` raw readings and adopt the mean as the zero count.
    pub fn tare(&mut self, samples: u16) -> Result<i32> {
        if samples == 0 {
            return Ok(self.calibration.zero_counts);
        }
        let mut sum: i64 = 0;
        for _ in 0..samples {
            sum += i64::from(self.read_raw_force()?);
        }
        let mean = (sum as f64 / f64::from(samples)).round() as i32;
        self.calibration.zero_counts = mean;
        tracing::info!(zero_counts = mean, samples, "load cell tared");
        Ok(mean)
    }

    fn read_raw_force(&mut self) -> Result<i32> {
        hw(self.load_cell.read(self.read_timeout), "reading load cell")
    }

    /// Calibrated force (N). No filtering beyond the amplifier's own.
    pub fn read_force(&mut self) -> Result<f32> {
        let raw = self.read_raw_force()?;
        let force = self.calibration.to_newtons(raw);
        tracing::trace!(raw, force_n = force, "force sample");
        Ok(force)
    }

    /// Fused linear position (mm).
    pub fn read_position(&mut self) -> Result<f32> {
        let raw = hw(self.encoder.read_raw_angle(), "reading angle sensor")?;
        let full_scale = self.tracker.full_scale();
        if raw >= full_scale {
            return Err(eyre::Report::new(RigError::HardwareFault(format!(
                "angle {raw} outside full scale {full_scale}"
            ))));
        }
        let position = self.tracker.update(raw);
        tracing::trace!(raw, turns = self.tracker.turns(), position_mm = position, "position sample");
        Ok(position)
    }

    pub fn calibration(&self) -> &ForceCalibration {
        &self.calibration
    }

    pub fn tracker(&self) -> &EncoderTracker {
        &self.tracker
    }
}
