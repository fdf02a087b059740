//! Physical <-> driver-native unit conversion.
//!
//! Native values are what the ramp generator registers hold:
//! - position: signed microsteps
//! - velocity: `microsteps/s * velocity_factor` (23-bit register)
//! - acceleration: `microsteps/s² * accel_factor` (16-bit register)
//!
//! Rounding rule: physical -> native truncates toward zero and saturates at
//! the register range (NaN maps to 0). Native -> physical is plain division,
//! so `to_native(from_native(n))` lands on `n` or `n - 1`.

/// Largest value the 23-bit VMAX register accepts.
pub const VELOCITY_NATIVE_MAX: u32 = (1 << 23) - 512;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    microsteps_per_mm: f64,
    velocity_factor: f64,
    accel_factor: f64,
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::new(40.0 * 64.0, 1.398_101_333_333_333_4, 0.015_270_994_830_222_222)
    }
}

impl UnitConverter {
    pub const fn new(microsteps_per_mm: f64, velocity_factor: f64, accel_factor: f64) -> Self {
        Self {
            microsteps_per_mm,
            velocity_factor,
            accel_factor,
        }
    }

    pub fn microsteps_per_mm(&self) -> f64 {
        self.microsteps_per_mm
    }

    #[inline]
    fn velocity_scale(&self) -> f64 {
        self.microsteps_per_mm * self.velocity_factor
    }

    #[inline]
    fn accel_scale(&self) -> f64 {
        self.microsteps_per_mm * self.accel_factor
    }

    #[inline]
    pub fn to_native_velocity(&self, mm_per_s: f32) -> u32 {
        let v = f64::from(mm_per_s) * self.velocity_scale();
        (v as u32).min(VELOCITY_NATIVE_MAX)
    }

    #[inline]
    pub fn to_native_accel(&self, mm_per_s2: f32) -> u16 {
        (f64::from(mm_per_s2) * self.accel_scale()) as u16
    }

    #[inline]
    pub fn to_native_position(&self, mm: f32) -> i32 {
        (f64::from(mm) * self.microsteps_per_mm) as i32
    }

    #[inline]
    pub fn from_native_velocity(&self, native: u32) -> f32 {
        (f64::from(native) / self.velocity_scale()) as f32
    }

    #[inline]
    pub fn from_native_accel(&self, native: u16) -> f32 {
        (f64::from(native) / self.accel_scale()) as f32
    }

    #[inline]
    pub fn from_native_position(&self, native: i32) -> f32 {
        (f64::from(native) / self.microsteps_per_mm) as f32
    }
}
