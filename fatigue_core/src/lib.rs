#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Closed-loop control for a cyclic fatigue/force test rig (hardware-agnostic).
//!
//! All hardware goes through the `fatigue_traits::LoadCell`,
//! `fatigue_traits::AngleSensor` and `fatigue_traits::MotionDriver` traits.
//!
//! ## Architecture
//!
//! - **Units**: physical <-> driver-native conversion (`units`)
//! - **Fusion**: calibrated force and multi-turn position (`fusion`)
//! - **Motion**: physical-unit facade over the driver (`motion`)
//! - **Telemetry**: fixed 20-byte record, hex line framing (`telemetry`)
//! - **Commands**: `SET` / `BEGIN` / `G0` line protocol (`command`)
//! - **Control**: the FWD / REV / REV_CLEAR / IDLE cycle (`controller`)
//! - **Runner**: paced loop, shutdown, fatal-error halt (`runner`)
//!
//! ## Tick order
//!
//! Sensors are read before the decision, driver commands follow the
//! decision, and the telemetry frame is the last thing a tick does.

pub mod builder;
pub mod calibration;
pub mod command;
pub mod config;
pub mod controller;
mod conversions;
pub mod error;
pub mod fusion;
pub mod hw_error;
pub mod input;
pub mod mocks;
pub mod motion;
pub mod runner;
pub mod telemetry;
pub mod units;
pub mod util;

pub use builder::{Missing, RigBuilder};
pub use calibration::ForceCalibration;
pub use command::{ByteSource, Command, LineBuffer, parse_command};
pub use config::{ControlParams, EncoderCfg, ForceCfg, MotionCfg, TravelCfg};
pub use controller::RigController;
pub use error::{BuildError, CommandError, RigError, TelemetryError};
pub use fusion::{EncoderTracker, SensorFusion};
pub use input::CommandInput;
pub use motion::Motion;
pub use runner::{RunOptions, RunSummary, run};
pub use telemetry::{CycleState, FRAME_LEN, RECORD_LEN, SampleRecord, decode_frame, encode_frame};
pub use units::UnitConverter;
