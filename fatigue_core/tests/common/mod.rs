#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use fatigue_core::{
    EncoderCfg, ForceCalibration, ForceCfg, RigBuilder, RigController,
};
use fatigue_traits::clock::test_clock::TestClock;
use fatigue_traits::{AngleSensor, HwResult, LoadCell, MotionDriver};

/// Driver writes, in the order the controller issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Target(i32),
    Velocity(u32),
    Accel(u16),
    Decel(u16),
    StartStop(u32, u32),
    Zero,
    Halt,
}

#[derive(Debug, Default)]
pub struct Bench {
    /// Raw load-cell counts; the last value repeats once the queue is empty.
    pub forces: VecDeque<i32>,
    pub force: i32,
    pub angles: VecDeque<u16>,
    pub angle: u16,
    pub reached: bool,
    pub stalled: bool,
    pub calls: Vec<Call>,
    pub fail_load_cell: Option<&'static str>,
    pub fail_driver: Option<&'static str>,
}

pub type Shared = Rc<RefCell<Bench>>;

pub struct ScriptedCell(pub Shared);
pub struct ScriptedEncoder(pub Shared);
pub struct ScriptedDriver(pub Shared);

fn err(msg: &str) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::other(msg.to_owned()))
}

impl LoadCell for ScriptedCell {
    fn read(&mut self, _timeout: Duration) -> HwResult<i32> {
        let mut b = self.0.borrow_mut();
        if let Some(msg) = b.fail_load_cell {
            return Err(err(msg));
        }
        if let Some(v) = b.forces.pop_front() {
            b.force = v;
        }
        Ok(b.force)
    }
}

impl AngleSensor for ScriptedEncoder {
    fn read_raw_angle(&mut self) -> HwResult<u16> {
        let mut b = self.0.borrow_mut();
        if let Some(v) = b.angles.pop_front() {
            b.angle = v;
        }
        Ok(b.angle)
    }
}

impl ScriptedDriver {
    fn record(&mut self, call: Call) -> HwResult<()> {
        let mut b = self.0.borrow_mut();
        if let Some(msg) = b.fail_driver {
            return Err(err(msg));
        }
        b.calls.push(call);
        Ok(())
    }
}

impl MotionDriver for ScriptedDriver {
    fn set_target_position(&mut self, microsteps: i32) -> HwResult<()> {
        self.record(Call::Target(microsteps))
    }
    fn set_max_velocity(&mut self, native: u32) -> HwResult<()> {
        self.record(Call::Velocity(native))
    }
    fn set_acceleration(&mut self, native: u16) -> HwResult<()> {
        self.record(Call::Accel(native))
    }
    fn set_deceleration(&mut self, native: u16) -> HwResult<()> {
        self.record(Call::Decel(native))
    }
    fn set_start_stop_velocity(&mut self, start: u32, stop: u32) -> HwResult<()> {
        self.record(Call::StartStop(start, stop))
    }
    fn zero_position(&mut self) -> HwResult<()> {
        self.record(Call::Zero)
    }
    fn position_reached(&mut self) -> HwResult<bool> {
        Ok(self.0.borrow().reached)
    }
    fn is_stalled(&mut self) -> HwResult<bool> {
        Ok(self.0.borrow().stalled)
    }
    fn halt(&mut self) -> HwResult<()> {
        self.record(Call::Halt)
    }
}

pub type Rig = RigController<ScriptedCell, ScriptedEncoder, ScriptedDriver>;

/// Native units for the default converter.
pub const V50: u32 = 178_956;
pub const V100: u32 = 357_913;
pub const A500: u16 = 19_546;
pub const FAST_STOP: u16 = u16::MAX;
pub const MAX_TRAVEL: i32 = 166_400;

/// 100 counts per newton, zero at 0 counts, tare skipped.
/// The encoder reads `raw / 64` mm (exact in f32) with no wrap for small moves.
pub fn rig() -> (Rig, Shared, TestClock) {
    let bench: Shared = Rc::new(RefCell::new(Bench::default()));
    let clock = TestClock::new();
    let ctrl = RigBuilder::new()
        .with_load_cell(ScriptedCell(bench.clone()))
        .with_encoder(ScriptedEncoder(bench.clone()))
        .with_driver(ScriptedDriver(bench.clone()))
        .with_force(ForceCfg {
            tare_samples: 0,
            read_timeout_ms: 10,
        })
        .with_calibration(ForceCalibration {
            zero_counts: 0,
            counts_per_newton: 100.0,
        })
        .with_encoder_cfg(EncoderCfg {
            full_scale: 4096,
            turn_factor_mm: 64.0,
        })
        .with_clock(clock.clone())
        .build()
        .expect("build");
    (ctrl, bench, clock)
}

/// Newtons to raw counts for `rig()`.
pub fn n(newtons: f32) -> i32 {
    (newtons * 100.0).round() as i32
}

pub fn input(s: &str) -> VecDeque<u8> {
    s.bytes().collect()
}

/// Calls recorded since the last `take_calls`.
pub fn take_calls(bench: &Shared) -> Vec<Call> {
    std::mem::take(&mut bench.borrow_mut().calls)
}
