//! `From` implementations bridging `fatigue_config` types to `fatigue_core` types.

use crate::calibration::ForceCalibration;
use crate::config::{ControlParams, EncoderCfg, ForceCfg, MotionCfg, TravelCfg};
use crate::units::UnitConverter;

// ── Units ────────────────────────────────────────────────────────────────────

impl From<&fatigue_config::Units> for UnitConverter {
    fn from(c: &fatigue_config::Units) -> Self {
        UnitConverter::new(c.microsteps_per_mm, c.velocity_factor, c.accel_factor)
    }
}

// ── Travel / Motion / Encoder ────────────────────────────────────────────────

impl From<&fatigue_config::Travel> for TravelCfg {
    fn from(c: &fatigue_config::Travel) -> Self {
        Self {
            max_travel_mm: c.max_travel_mm,
            clearance_mm: c.clearance_mm,
        }
    }
}

impl From<&fatigue_config::Motion> for MotionCfg {
    fn from(c: &fatigue_config::Motion) -> Self {
        Self {
            accel_mm_s2: c.accel_mm_s2,
            fast_stop_decel_mm_s2: c.fast_stop_decel_mm_s2,
            start_velocity_mm_s: c.start_velocity_mm_s,
            stop_velocity_mm_s: c.stop_velocity_mm_s,
        }
    }
}

impl From<&fatigue_config::Encoder> for EncoderCfg {
    fn from(c: &fatigue_config::Encoder) -> Self {
        Self {
            full_scale: c.full_scale,
            turn_factor_mm: c.turn_factor_mm,
        }
    }
}

// ── Force ────────────────────────────────────────────────────────────────────

impl From<&fatigue_config::Force> for ForceCfg {
    fn from(c: &fatigue_config::Force) -> Self {
        Self {
            tare_samples: c.tare_samples,
            read_timeout_ms: c.read_timeout_ms,
        }
    }
}

impl From<&fatigue_config::Force> for ForceCalibration {
    fn from(c: &fatigue_config::Force) -> Self {
        Self {
            zero_counts: 0,
            counts_per_newton: c.counts_per_newton,
        }
    }
}

impl From<&fatigue_config::Calibration> for ForceCalibration {
    fn from(c: &fatigue_config::Calibration) -> Self {
        Self {
            zero_counts: c.zero_counts,
            counts_per_newton: c.counts_per_newton,
        }
    }
}

// ── Params ───────────────────────────────────────────────────────────────────

impl From<&fatigue_config::Params> for ControlParams {
    fn from(c: &fatigue_config::Params) -> Self {
        Self {
            stop_force: c.stop_force_n,
            zero_force_clear_threshold: c.zero_force_clear_n,
            forward_velocity: c.forward_velocity_mm_s,
            reverse_velocity: c.reverse_velocity_mm_s,
        }
    }
}
