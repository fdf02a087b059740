//! The cycle state machine.
//!
//! One `step` is one tick: read force and position, evaluate the branch for
//! the current state, issue driver commands, and update the sample record.
//! `tick` additionally encodes and writes the telemetry frame.
//!
//! ```text
//!          BEGIN                force >= stop | reached
//!   IDLE ---------> FWD ------------------------------> REV
//!                    ^                                   |
//!                    | reached         force < clear     |
//!                    +-------- REV_CLEAR <---------------+
//!                                        | reached (no new target)
//! ```

use std::io::Write;
use std::time::Instant;

use fatigue_traits::clock::Clock;
use fatigue_traits::{AngleSensor, LoadCell, MotionDriver};

use crate::command::{ByteSource, Command, LineBuffer, parse_command};
use crate::config::{ControlParams, ForceCfg, MotionCfg, TravelCfg};
use crate::error::{Report, Result, RigError};
use crate::fusion::SensorFusion;
use crate::motion::Motion;
use crate::telemetry::{CycleState, SampleRecord, encode_frame};

pub struct RigController<L: LoadCell, A: AngleSensor, D: MotionDriver> {
    pub(crate) fusion: SensorFusion<L, A>,
    pub(crate) motion: Motion<D>,
    pub(crate) params: ControlParams,
    pub(crate) travel: TravelCfg,
    pub(crate) motion_cfg: MotionCfg,
    pub(crate) force_cfg: ForceCfg,
    pub(crate) lines: LineBuffer,
    pub(crate) record: SampleRecord,
    pub(crate) cycle_start: Instant,
    pub(crate) clock: Box<dyn Clock + Send + Sync>,
}

impl<L: LoadCell, A: AngleSensor, D: MotionDriver> core::fmt::Debug for RigController<L, A, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RigController")
            .field("record", &self.record)
            .field("params", &self.params)
            .field("travel", &self.travel)
            .finish_non_exhaustive()
    }
}

impl<L: LoadCell, A: AngleSensor, D: MotionDriver> RigController<L, A, D> {
    /// Startup: tare the load cell, configure the driver ramps, zero the
    /// driver position and prime the encoder tracker. Leaves the rig IDLE.
    pub fn initialize(&mut self) -> Result<()> {
        self.fusion.tare(self.force_cfg.tare_samples)?;

        let m = self.motion_cfg;
        self.motion.set_max_velocity(self.params.forward_velocity)?;
        self.motion.set_max_accel(m.accel_mm_s2)?;
        self.motion.set_max_decel(m.accel_mm_s2)?;
        self.motion
            .set_start_stop_velocity(m.start_velocity_mm_s, m.stop_velocity_mm_s)?;
        self.motion.zero_position()?;
        self.motion.set_target_position(0.0)?;

        self.record.position = self.fusion.read_position()?;
        self.record.state = CycleState::Idle;
        self.record.cycle = 0;
        self.record.elapsed_micros = 0;
        self.cycle_start = self.clock.now();
        tracing::info!(
            zero_counts = self.fusion.calibration().zero_counts,
            position_mm = self.record.position,
            "rig initialized"
        );
        Ok(())
    }

    /// One control tick without telemetry output.
    pub fn step<B: ByteSource + ?Sized>(&mut self, input: &mut B) -> Result<SampleRecord> {
        let force = self.fusion.read_force()?;
        let position = self.fusion.read_position()?;
        self.record.force = force;
        self.record.position = position;

        let entered_fwd = match self.record.state {
            CycleState::Fwd => {
                if force >= self.params.stop_force || self.motion.position_reached()? {
                    self.motion.set_target_position(0.0)?;
                    self.motion.set_max_velocity(self.params.reverse_velocity)?;
                    self.transition(CycleState::Rev);
                }
                false
            }
            CycleState::Rev => {
                if force < self.params.zero_force_clear_threshold {
                    self.motion.set_max_decel(self.motion_cfg.accel_mm_s2)?;
                    let target = (position - self.travel.clearance_mm).max(0.0);
                    self.motion.set_target_position(target)?;
                    self.transition(CycleState::RevClear);
                } else if self.motion.position_reached()? {
                    tracing::warn!(
                        cycle = self.record.cycle,
                        force_n = force,
                        "retracted fully without force release"
                    );
                    self.transition(CycleState::RevClear);
                }
                false
            }
            CycleState::RevClear => {
                if self.motion.position_reached()? {
                    self.start_forward_stroke()?;
                    true
                } else {
                    false
                }
            }
            CycleState::Idle => self.poll_command(input)?,
        };

        self.record.elapsed_micros = if entered_fwd {
            0
        } else {
            self.clock.us_since(self.cycle_start)
        };
        Ok(self.record)
    }

    /// One control tick followed by writing its telemetry frame to `out`.
    pub fn tick<B: ByteSource + ?Sized, W: Write + ?Sized>(
        &mut self,
        input: &mut B,
        out: &mut W,
    ) -> Result<SampleRecord> {
        let record = self.step(input)?;
        let frame = encode_frame(&record);
        out.write_all(&frame)
            .and_then(|()| out.flush())
            .map_err(|e| Report::new(RigError::Telemetry(e.to_string())))?;
        Ok(record)
    }

    /// Returns true if the command moved the rig into FWD.
    fn poll_command<B: ByteSource + ?Sized>(&mut self, input: &mut B) -> Result<bool> {
        let Some(line) = self.lines.poll(input) else {
            return Ok(false);
        };
        match parse_command(&line) {
            Ok(Command::Set(params)) => {
                tracing::info!(?params, "parameters updated");
                self.params = params;
                Ok(false)
            }
            Ok(Command::Begin) => {
                tracing::info!("begin");
                self.start_forward_stroke()?;
                Ok(true)
            }
            Ok(Command::Goto(mm)) => {
                tracing::debug!(target_mm = mm, "jog");
                self.motion.set_target_position(mm)?;
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(error = %e, line = %line, "command discarded");
                Ok(false)
            }
        }
    }

    fn start_forward_stroke(&mut self) -> Result<()> {
        self.motion.set_max_decel(self.motion_cfg.fast_stop_decel_mm_s2)?;
        self.motion.set_target_position(self.travel.max_travel_mm)?;
        self.motion.set_max_velocity(self.params.forward_velocity)?;
        self.record.cycle = self.record.cycle.wrapping_add(1);
        self.cycle_start = self.clock.now();
        self.transition(CycleState::Fwd);
        Ok(())
    }

    fn transition(&mut self, to: CycleState) {
        tracing::debug!(
            cycle = self.record.cycle,
            force_n = self.record.force,
            position_mm = self.record.position,
            from = %self.record.state,
            to = %to,
            "state transition"
        );
        self.record.state = to;
    }

    /// Best-effort stop of the carriage.
    pub fn halt(&mut self) -> Result<()> {
        self.motion.halt()
    }

    pub fn record(&self) -> &SampleRecord {
        &self.record
    }

    pub fn state(&self) -> CycleState {
        self.record.state
    }

    pub fn params(&self) -> &ControlParams {
        &self.params
    }

    pub fn fusion(&self) -> &SensorFusion<L, A> {
        &self.fusion
    }

    pub fn motion(&self) -> &Motion<D> {
        &self.motion
    }

    pub fn motion_mut(&mut self) -> &mut Motion<D> {
        &mut self.motion
    }

    pub fn clock(&self) -> &(dyn Clock + Send + Sync) {
        &*self.clock
    }
}
