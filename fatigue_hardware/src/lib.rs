//! Hardware backends for the fatigue rig.
//!
//! The simulated rig is always available. The real HX711 load cell, AS5600
//! encoder and TMC5160 driver are behind the `hardware` feature (Linux,
//! rppal).

pub mod error;
pub mod sim;
pub mod util;

#[cfg(feature = "hardware")]
pub mod as5600;
#[cfg(feature = "hardware")]
pub mod hx711;
#[cfg(feature = "hardware")]
pub mod tmc5160;

pub use sim::{SimDriver, SimEncoder, SimLoadCell, SimParams, SimRig};

#[cfg(feature = "hardware")]
pub use hardware::{HardwareDriver, HardwareEncoder, HardwareLoadCell};

#[cfg(feature = "hardware")]
mod hardware {
    use fatigue_traits::{AngleSensor, HwResult, LoadCell, MotionDriver};

    use crate::as5600::As5600;
    use crate::error::HwError;
    use crate::hx711::Hx711;
    use crate::tmc5160::Tmc5160;

    /// HX711 on channel A, gain 128.
    pub struct HardwareLoadCell {
        hx711: Hx711,
    }

    impl HardwareLoadCell {
        pub fn new(dt_pin: u8, sck_pin: u8) -> Result<Self, HwError> {
            Ok(Self {
                hx711: Hx711::new(dt_pin, sck_pin, 1)?,
            })
        }
    }

    impl LoadCell for HardwareLoadCell {
        fn read(&mut self, timeout: std::time::Duration) -> HwResult<i32> {
            match self.hx711.read_with_timeout(timeout) {
                Ok(raw) => Ok(raw),
                Err(e) => {
                    tracing::error!(error = %e, "load cell read failed");
                    Err(Box::new(e))
                }
            }
        }
    }

    pub struct HardwareEncoder {
        as5600: As5600,
    }

    impl HardwareEncoder {
        pub fn new(bus: u8, addr: u16) -> Result<Self, HwError> {
            Ok(Self {
                as5600: As5600::new(bus, addr)?,
            })
        }
    }

    impl AngleSensor for HardwareEncoder {
        fn read_raw_angle(&mut self) -> HwResult<u16> {
            Ok(self.as5600.raw_angle()?)
        }
    }

    pub struct HardwareDriver {
        tmc: Tmc5160,
        // Held low while the driver is in use
        _enable: Option<rppal::gpio::OutputPin>,
    }

    impl HardwareDriver {
        pub fn new(
            spi_bus: u8,
            spi_cs: u8,
            spi_clock_hz: u32,
            enable_pin: Option<u8>,
        ) -> Result<Self, HwError> {
            let enable = match enable_pin {
                Some(pin) => {
                    let gpio = rppal::gpio::Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
                    let mut out = gpio
                        .get(pin)
                        .map_err(|e| HwError::Gpio(format!("open motor enable pin {pin}: {e}")))?
                        .into_output();
                    out.set_low();
                    Some(out)
                }
                None => None,
            };
            Ok(Self {
                tmc: Tmc5160::new(spi_bus, spi_cs, spi_clock_hz)?,
                _enable: enable,
            })
        }
    }

    impl MotionDriver for HardwareDriver {
        fn set_target_position(&mut self, microsteps: i32) -> HwResult<()> {
            Ok(self.tmc.set_xtarget(microsteps)?)
        }

        fn set_max_velocity(&mut self, native: u32) -> HwResult<()> {
            Ok(self.tmc.set_vmax(native)?)
        }

        fn set_acceleration(&mut self, native: u16) -> HwResult<()> {
            Ok(self.tmc.set_amax(native)?)
        }

        fn set_deceleration(&mut self, native: u16) -> HwResult<()> {
            Ok(self.tmc.set_dmax(native)?)
        }

        fn set_start_stop_velocity(&mut self, start: u32, stop: u32) -> HwResult<()> {
            Ok(self.tmc.set_vstart_vstop(start, stop)?)
        }

        fn zero_position(&mut self) -> HwResult<()> {
            self.tmc.set_xactual(0)?;
            Ok(self.tmc.set_xtarget(0)?)
        }

        fn position_reached(&mut self) -> HwResult<bool> {
            Ok(self.tmc.position_reached()?)
        }

        fn is_stalled(&mut self) -> HwResult<bool> {
            Ok(self.tmc.stalled()?)
        }

        fn halt(&mut self) -> HwResult<()> {
            // VMAX = 0 in positioning mode decelerates to standstill
            Ok(self.tmc.set_vmax(0)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fatigue_traits::{AngleSensor, LoadCell, MotionDriver};
    use std::time::Duration;

    #[test]
    fn sim_carriage_moves_toward_target_and_reports_reached() {
        let rig = SimRig::new(SimParams::default());
        let mut cell = rig.load_cell();
        let mut drv = rig.driver();
        // 10 mm/s in native units, target 1 mm
        drv.set_max_velocity((10.0 * 2560.0 * 1.398_101_333_333_333_4) as u32)
            .unwrap();
        drv.set_target_position(2560).unwrap();
        assert!(!drv.position_reached().unwrap());
        for _ in 0..101 {
            cell.read(Duration::from_millis(1)).unwrap();
        }
        assert!(drv.position_reached().unwrap());
        assert!((rig.position_mm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sim_force_counts_include_tare_offset() {
        let params = SimParams::default();
        let tare = params.tare_counts;
        let rig = SimRig::new(params);
        let mut cell = rig.load_cell();
        assert_eq!(cell.read(Duration::from_millis(1)).unwrap(), tare);
    }

    #[test]
    fn sim_encoder_zero_at_origin() {
        let rig = SimRig::new(SimParams::default());
        assert_eq!(rig.encoder().read_raw_angle().unwrap(), 0);
    }
}
