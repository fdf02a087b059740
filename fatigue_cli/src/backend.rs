//! Collaborator construction: the simulated plant by default, the real
//! HX711 / AS5600 / TMC5160 stack with the `hardware` feature.

use fatigue_config::Config;

#[cfg(not(feature = "hardware"))]
pub use sim::open;

#[cfg(feature = "hardware")]
pub use real::open;

#[cfg(not(feature = "hardware"))]
mod sim {
    use fatigue_config::Config;
    use fatigue_hardware::{SimDriver, SimEncoder, SimLoadCell, SimParams, SimRig};

    pub fn open(cfg: &Config) -> eyre::Result<(SimLoadCell, SimEncoder, SimDriver)> {
        let rig = SimRig::new(super::sim_params(cfg));
        tracing::info!(backend = "sim", "collaborators ready");
        Ok((rig.load_cell(), rig.encoder(), rig.driver()))
    }
}

#[cfg(feature = "hardware")]
mod real {
    use eyre::WrapErr;
    use fatigue_config::Config;
    use fatigue_core::RigError;
    use fatigue_hardware::error::HwError;
    use fatigue_hardware::{HardwareDriver, HardwareEncoder, HardwareLoadCell};

    fn hw_err(e: HwError) -> eyre::Report {
        eyre::Report::new(RigError::Hardware(e.to_string()))
    }

    pub fn open(cfg: &Config) -> eyre::Result<(HardwareLoadCell, HardwareEncoder, HardwareDriver)> {
        let p = &cfg.pins;
        let load_cell = HardwareLoadCell::new(p.hx711_dt, p.hx711_sck)
            .map_err(hw_err)
            .wrap_err_with(|| format!("open hx711 (dt={}, sck={})", p.hx711_dt, p.hx711_sck))?;
        let encoder = HardwareEncoder::new(p.i2c_bus, p.encoder_addr)
            .map_err(hw_err)
            .wrap_err_with(|| format!("open as5600 (bus={}, addr={:#04x})", p.i2c_bus, p.encoder_addr))?;
        let driver = HardwareDriver::new(p.spi_bus, p.spi_cs, p.spi_clock_hz, p.driver_enable)
            .map_err(hw_err)
            .wrap_err_with(|| format!("open tmc5160 (spi{}.{})", p.spi_bus, p.spi_cs))?;
        tracing::info!(backend = "hardware", "collaborators ready");
        Ok((load_cell, encoder, driver))
    }
}

/// Plant parameters matching the configured geometry, one plant step per tick.
#[cfg_attr(feature = "hardware", allow(dead_code))]
pub fn sim_params(cfg: &Config) -> fatigue_hardware::SimParams {
    let dt_s = match cfg.runner.tick_hz {
        0 => 0.001,
        hz => 1.0 / f64::from(hz),
    };
    fatigue_hardware::SimParams {
        dt_s,
        microsteps_per_mm: cfg.units.microsteps_per_mm,
        velocity_factor: cfg.units.velocity_factor,
        counts_per_newton: f64::from(cfg.force.counts_per_newton),
        full_scale: cfg.encoder.full_scale,
        turn_factor_mm: f64::from(cfg.encoder.turn_factor_mm),
        ..fatigue_hardware::SimParams::default()
    }
}
