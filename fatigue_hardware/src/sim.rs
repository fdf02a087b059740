//! Deterministic simulated rig.
//!
//! One shared plant feeds three collaborator handles (load cell, encoder,
//! driver). The plant advances by one fixed `dt` every time the load cell is
//! read, which the control loop does exactly once per tick.

use std::cell::RefCell;
use std::rc::Rc;

use fatigue_traits::{AngleSensor, HwResult, LoadCell, MotionDriver};

/// Physical description of the simulated rig.
#[derive(Debug, Clone)]
pub struct SimParams {
    /// Plant time step per load-cell read (s).
    pub dt_s: f64,
    pub microsteps_per_mm: f64,
    /// Driver velocity units per microstep/s.
    pub velocity_factor: f64,
    /// Carriage position where the sample starts pushing back (mm).
    pub contact_mm: f64,
    pub stiffness_n_per_mm: f64,
    /// Force at which the motor stalls and the carriage stops advancing.
    pub stall_force_n: f64,
    pub counts_per_newton: f64,
    /// Raw load-cell reading at zero force.
    pub tare_counts: i32,
    pub full_scale: u16,
    pub turn_factor_mm: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            dt_s: 0.001,
            microsteps_per_mm: 2560.0,
            velocity_factor: 1.398_101_333_333_333_4,
            contact_mm: 40.0,
            stiffness_n_per_mm: 4.0,
            stall_force_n: 250.0,
            counts_per_newton: 20_149.592,
            tare_counts: 8_410,
            full_scale: 4096,
            turn_factor_mm: -5.0,
        }
    }
}

#[derive(Debug)]
struct Plant {
    params: SimParams,
    carriage_steps: f64,
    target_steps: i32,
    vmax: u32,
    stalled: bool,
}

impl Plant {
    fn position_mm(&self) -> f64 {
        self.carriage_steps / self.params.microsteps_per_mm
    }

    fn force_n(&self) -> f64 {
        (self.position_mm() - self.params.contact_mm).max(0.0) * self.params.stiffness_n_per_mm
    }

    fn advance(&mut self) {
        let speed = f64::from(self.vmax) / self.params.velocity_factor;
        let max_step = speed * self.params.dt_s;
        let delta = f64::from(self.target_steps) - self.carriage_steps;
        let forward = delta > 0.0;
        self.stalled = forward && self.force_n() >= self.params.stall_force_n;
        if self.stalled {
            return;
        }
        if delta.abs() <= max_step {
            self.carriage_steps = f64::from(self.target_steps);
        } else {
            self.carriage_steps += max_step.copysign(delta);
        }
    }

    fn raw_angle(&self) -> u16 {
        let fs = f64::from(self.params.full_scale);
        let revs = self.position_mm() / self.params.turn_factor_mm;
        let ticks = (revs * fs).rem_euclid(fs).floor();
        (ticks as u16).min(self.params.full_scale - 1)
    }
}

/// Shared handle to the simulated plant.
#[derive(Clone)]
pub struct SimRig {
    plant: Rc<RefCell<Plant>>,
}

impl SimRig {
    pub fn new(params: SimParams) -> Self {
        Self {
            plant: Rc::new(RefCell::new(Plant {
                params,
                carriage_steps: 0.0,
                target_steps: 0,
                vmax: 0,
                stalled: false,
            })),
        }
    }

    pub fn load_cell(&self) -> SimLoadCell {
        SimLoadCell { rig: self.clone() }
    }

    pub fn encoder(&self) -> SimEncoder {
        SimEncoder { rig: self.clone() }
    }

    pub fn driver(&self) -> SimDriver {
        SimDriver { rig: self.clone() }
    }

    /// True carriage position (mm), for assertions.
    pub fn position_mm(&self) -> f64 {
        self.plant.borrow().position_mm()
    }

    /// True force on the sample (N), for assertions.
    pub fn force_n(&self) -> f64 {
        self.plant.borrow().force_n()
    }

    /// Last commanded native target.
    pub fn target_steps(&self) -> i32 {
        self.plant.borrow().target_steps
    }

    /// Last commanded native max velocity.
    pub fn max_velocity(&self) -> u32 {
        self.plant.borrow().vmax
    }
}

pub struct SimLoadCell {
    rig: SimRig,
}

impl LoadCell for SimLoadCell {
    fn read(&mut self, _timeout: std::time::Duration) -> HwResult<i32> {
        let mut plant = self.rig.plant.borrow_mut();
        plant.advance();
        let counts = plant.force_n() * plant.params.counts_per_newton;
        let raw = f64::from(plant.params.tare_counts) + counts;
        tracing::trace!(raw, "sim load cell read");
        Ok(raw as i32)
    }
}

pub struct SimEncoder {
    rig: SimRig,
}

impl AngleSensor for SimEncoder {
    fn read_raw_angle(&mut self) -> HwResult<u16> {
        Ok(self.rig.plant.borrow().raw_angle())
    }
}

pub struct SimDriver {
    rig: SimRig,
}

impl MotionDriver for SimDriver {
    fn set_target_position(&mut self, microsteps: i32) -> HwResult<()> {
        self.rig.plant.borrow_mut().target_steps = microsteps;
        Ok(())
    }

    fn set_max_velocity(&mut self, native: u32) -> HwResult<()> {
        self.rig.plant.borrow_mut().vmax = native;
        Ok(())
    }

    fn set_acceleration(&mut self, _native: u16) -> HwResult<()> {
        Ok(())
    }

    fn set_deceleration(&mut self, _native: u16) -> HwResult<()> {
        Ok(())
    }

    fn set_start_stop_velocity(&mut self, _start: u32, _stop: u32) -> HwResult<()> {
        Ok(())
    }

    fn zero_position(&mut self) -> HwResult<()> {
        let mut plant = self.rig.plant.borrow_mut();
        plant.carriage_steps = 0.0;
        plant.target_steps = 0;
        Ok(())
    }

    fn position_reached(&mut self) -> HwResult<bool> {
        let plant = self.rig.plant.borrow();
        Ok(plant.carriage_steps == f64::from(plant.target_steps))
    }

    fn is_stalled(&mut self) -> HwResult<bool> {
        Ok(self.rig.plant.borrow().stalled)
    }

    fn halt(&mut self) -> HwResult<()> {
        let mut plant = self.rig.plant.borrow_mut();
        plant.target_steps = plant.carriage_steps.round() as i32;
        plant.carriage_steps = f64::from(plant.target_steps);
        Ok(())
    }
}
