//! Runtime configuration for the controller.
//!
//! These are the structs `RigController` reads while running. They are
//! separate from the TOML-deserialized config in `fatigue_config`.

/// User-settable thresholds and speeds, replaced atomically by `SET`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlParams {
    /// Forward stroke ends once force reaches this (N).
    pub stop_force: f32,
    /// Reverse stroke hands over to the clearance move below this (N).
    pub zero_force_clear_threshold: f32,
    /// mm/s
    pub forward_velocity: f32,
    /// mm/s
    pub reverse_velocity: f32,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            stop_force: 10.0,
            zero_force_clear_threshold: 0.5,
            forward_velocity: 50.0,
            reverse_velocity: 100.0,
        }
    }
}

/// Stroke geometry.
#[derive(Debug, Clone, Copy)]
pub struct TravelCfg {
    /// Forward-stroke target (mm).
    pub max_travel_mm: f32,
    /// Extra retraction once the force has released (mm).
    pub clearance_mm: f32,
}

impl Default for TravelCfg {
    fn default() -> Self {
        Self {
            max_travel_mm: 65.0,
            clearance_mm: 5.0,
        }
    }
}

/// Ramp settings applied at startup and on transitions.
#[derive(Debug, Clone, Copy)]
pub struct MotionCfg {
    /// Normal acceleration and deceleration (mm/s²).
    pub accel_mm_s2: f32,
    /// Deceleration while a forward stroke may end abruptly (mm/s²).
    pub fast_stop_decel_mm_s2: f32,
    pub start_velocity_mm_s: f32,
    pub stop_velocity_mm_s: f32,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            accel_mm_s2: 500.0,
            fast_stop_decel_mm_s2: 50_000.0,
            start_velocity_mm_s: 5.0,
            stop_velocity_mm_s: 5.0,
        }
    }
}

/// Angle sensor geometry.
#[derive(Debug, Clone, Copy)]
pub struct EncoderCfg {
    /// Ticks per revolution.
    pub full_scale: u16,
    /// mm per revolution. Negative: forward travel decreases the raw angle.
    pub turn_factor_mm: f32,
}

impl Default for EncoderCfg {
    fn default() -> Self {
        Self {
            full_scale: 4096,
            turn_factor_mm: -5.0,
        }
    }
}

/// Load-cell acquisition.
#[derive(Debug, Clone, Copy)]
pub struct ForceCfg {
    /// Samples averaged for the startup tare; 0 skips tare.
    pub tare_samples: u16,
    /// Max wait per conversion (ms).
    pub read_timeout_ms: u64,
}

impl Default for ForceCfg {
    fn default() -> Self {
        Self {
            tare_samples: 100,
            read_timeout_ms: 150,
        }
    }
}
