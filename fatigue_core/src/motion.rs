//! Physical-unit facade over the motion driver.
//!
//! Every call is a single write or query; failures propagate and are fatal
//! to the control loop.

use fatigue_traits::MotionDriver;

use crate::error::Result;
use crate::hw_error::hw;
use crate::units::UnitConverter;

pub struct Motion<D: MotionDriver> {
    driver: D,
    units: UnitConverter,
}

impl<D: MotionDriver> Motion<D> {
    pub fn new(driver: D, units: UnitConverter) -> Self {
        Self { driver, units }
    }

    pub fn set_target_position(&mut self, mm: f32) -> Result<()> {
        let native = self.units.to_native_position(mm);
        tracing::trace!(mm, native, "target position");
        hw(self.driver.set_target_position(native), "set_target_position")
    }

    pub fn set_max_velocity(&mut self, mm_per_s: f32) -> Result<()> {
        let native = self.units.to_native_velocity(mm_per_s);
        tracing::trace!(mm_per_s, native, "max velocity");
        hw(self.driver.set_max_velocity(native), "set_max_velocity")
    }

    pub fn set_max_accel(&mut self, mm_per_s2: f32) -> Result<()> {
        let native = self.units.to_native_accel(mm_per_s2);
        tracing::trace!(mm_per_s2, native, "max acceleration");
        hw(self.driver.set_acceleration(native), "set_max_accel")
    }

    pub fn set_max_decel(&mut self, mm_per_s2: f32) -> Result<()> {
        let native = self.units.to_native_accel(mm_per_s2);
        tracing::trace!(mm_per_s2, native, "max deceleration");
        hw(self.driver.set_deceleration(native), "set_max_decel")
    }

    pub fn set_start_stop_velocity(&mut self, start_mm_s: f32, stop_mm_s: f32) -> Result<()> {
        let start = self.units.to_native_velocity(start_mm_s);
        let stop = self.units.to_native_velocity(stop_mm_s);
        hw(
            self.driver.set_start_stop_velocity(start, stop),
            "set_start_stop_velocity",
        )
    }

    /// Declare the current carriage position as 0 mm.
    pub fn zero_position(&mut self) -> Result<()> {
        hw(self.driver.zero_position(), "zero_position")
    }

    pub fn position_reached(&mut self) -> Result<bool> {
        hw(self.driver.position_reached(), "position_reached")
    }

    /// Stall flag from the driver. Informational only.
    pub fn is_stalled(&mut self) -> Result<bool> {
        let stalled = hw(self.driver.is_stalled(), "is_stalled")?;
        tracing::trace!(stalled, "stall flag");
        Ok(stalled)
    }

    pub fn halt(&mut self) -> Result<()> {
        hw(self.driver.halt(), "halt")
    }

    pub fn units(&self) -> &UnitConverter {
        &self.units
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
