//! Collaborator seams for the fatigue rig controller.
//!
//! Every piece of hardware the control loop talks to sits behind one of
//! these traits so the core can run against the simulated rig, scripted test
//! doubles, or the real HX711 / AS5600 / TMC5160 stack interchangeably.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Strain-gauge amplifier producing raw signed counts.
pub trait LoadCell {
    fn read(&mut self, timeout: std::time::Duration) -> HwResult<i32>;
}

/// Absolute single-turn angle sensor.
pub trait AngleSensor {
    /// Raw angle in `[0, full_scale)` ticks.
    fn read_raw_angle(&mut self) -> HwResult<u16>;
}

/// Ramp-generating motion driver, addressed in its native integer units.
pub trait MotionDriver {
    fn set_target_position(&mut self, microsteps: i32) -> HwResult<()>;
    fn set_max_velocity(&mut self, native: u32) -> HwResult<()>;
    fn set_acceleration(&mut self, native: u16) -> HwResult<()>;
    fn set_deceleration(&mut self, native: u16) -> HwResult<()>;
    fn set_start_stop_velocity(&mut self, start: u32, stop: u32) -> HwResult<()>;
    /// Declare the current carriage location as microstep 0.
    fn zero_position(&mut self) -> HwResult<()>;
    fn position_reached(&mut self) -> HwResult<bool>;
    fn is_stalled(&mut self) -> HwResult<bool>;
    /// Bring the carriage to rest as quickly as the ramp allows.
    fn halt(&mut self) -> HwResult<()>;
}
