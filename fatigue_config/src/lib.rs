#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and force-calibration parsing for the fatigue rig.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section has defaults matching the reference rig, so an empty
//!   file is a valid simulation config.
//! - The calibration CSV loader enforces headers and performs a robust refit
//!   to reduce outlier influence before slope/intercept estimation.
use serde::Deserialize;

/// Force calibration CSV schema.
///
/// Expected headers:
/// raw,newtons
///
/// Example:
/// raw,newtons
/// 8410,0.0
/// 209906,10.0
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CalibrationRow {
    pub raw: i64,
    pub newtons: f32,
}

/// Conversion constants between physical and driver-native units.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Units {
    /// Driver microsteps per millimetre of carriage travel.
    pub microsteps_per_mm: f64,
    /// Native velocity units per microstep/s.
    pub velocity_factor: f64,
    /// Native acceleration units per microstep/s².
    pub accel_factor: f64,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            microsteps_per_mm: 40.0 * 64.0,
            velocity_factor: 1.398_101_333_333_333_4,
            accel_factor: 0.015_270_994_830_222_222,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Travel {
    /// Forward-stroke target, mm from the startup origin.
    pub max_travel_mm: f32,
    /// Extra retraction after the force has released, mm.
    pub clearance_mm: f32,
}

impl Default for Travel {
    fn default() -> Self {
        Self {
            max_travel_mm: 65.0,
            clearance_mm: 5.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Motion {
    /// Normal acceleration and deceleration (mm/s²).
    pub accel_mm_s2: f32,
    /// Deceleration used when reversing from full extension (mm/s²).
    pub fast_stop_decel_mm_s2: f32,
    pub start_velocity_mm_s: f32,
    pub stop_velocity_mm_s: f32,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            accel_mm_s2: 500.0,
            fast_stop_decel_mm_s2: 50_000.0,
            start_velocity_mm_s: 5.0,
            stop_velocity_mm_s: 5.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Encoder {
    /// Ticks per revolution of the angle sensor.
    pub full_scale: u16,
    /// mm of travel per revolution; the sign fixes the direction convention.
    pub turn_factor_mm: f32,
}

impl Default for Encoder {
    fn default() -> Self {
        Self {
            full_scale: 4096,
            turn_factor_mm: -5.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Force {
    /// Load-cell counts per newton (amplifier scale).
    pub counts_per_newton: f32,
    /// Samples averaged at startup to find the zero count.
    pub tare_samples: u16,
    /// Max time to wait for a single load-cell conversion.
    pub read_timeout_ms: u64,
}

impl Default for Force {
    fn default() -> Self {
        Self {
            counts_per_newton: 20_149.592,
            tare_samples: 100,
            read_timeout_ms: 150,
        }
    }
}

/// Control parameters in effect before the first `SET` command.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Params {
    pub stop_force_n: f32,
    pub zero_force_clear_n: f32,
    pub forward_velocity_mm_s: f32,
    pub reverse_velocity_mm_s: f32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            stop_force_n: 10.0,
            zero_force_clear_n: 0.5,
            forward_velocity_mm_s: 50.0,
            reverse_velocity_mm_s: 100.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Runner {
    /// Control loop rate; 0 runs ticks back to back.
    pub tick_hz: u32,
    /// Command lines longer than this are discarded.
    pub max_line_len: usize,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            tick_hz: 1000,
            max_line_len: 128,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Wiring for the real rig; ignored by the simulated backend.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Pins {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
    pub i2c_bus: u8,
    pub encoder_addr: u16,
    pub spi_bus: u8,
    pub spi_cs: u8,
    pub spi_clock_hz: u32,
    pub driver_enable: Option<u8>,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            hx711_dt: 18,
            hx711_sck: 19,
            i2c_bus: 1,
            encoder_addr: 0x36,
            spi_bus: 0,
            spi_cs: 0,
            spi_clock_hz: 3_000_000,
            driver_enable: None,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub units: Units,
    pub travel: Travel,
    pub motion: Motion,
    pub encoder: Encoder,
    pub force: Force,
    pub params: Params,
    pub runner: Runner,
    pub logging: Logging,
    pub pins: Pins,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Linear load-cell model: newtons = (raw - zero_counts) / counts_per_newton.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub zero_counts: i32,
    pub counts_per_newton: f32,
}

impl Calibration {
    /// Build a calibration from rows using ordinary least squares on all points.
    /// Fits newtons = a*raw + b, then converts to counts_per_newton = 1/a and
    /// zero_counts = round(-b/a), the raw reading at zero force.
    pub fn from_rows(rows: Vec<CalibrationRow>) -> eyre::Result<Self> {
        if rows.len() < 2 {
            eyre::bail!("calibration requires at least two rows, got {}", rows.len());
        }

        let mut dir: i8 = 0;
        for i in 1..rows.len() {
            let d = rows[i].raw - rows[i - 1].raw;
            if d == 0 {
                eyre::bail!(
                    "calibration rows have duplicate raw values at index {} and {}",
                    i - 1,
                    i
                );
            }
            let step_dir = if d > 0 { 1 } else { -1 };
            if dir == 0 {
                dir = step_dir;
            } else if dir != step_dir {
                eyre::bail!(
                    "calibration raw values must be monotonic (strictly increasing or strictly decreasing)"
                );
            }
        }

        let pts: Vec<(i64, f32)> = rows.iter().map(|r| (r.raw, r.newtons)).collect();
        let (a0, b0) = ols_fit(&pts)?;

        let sumsq: f64 = pts
            .iter()
            .map(|(x, y)| {
                let r = f64::from(*y) - (a0 * (*x as f64) + b0);
                r * r
            })
            .sum();
        let rms = (sumsq / (pts.len() as f64)).sqrt();

        // Reject outliers with |residual| > 2σ and refit if at least 2 remain.
        let (a, b) = robust_refit(&pts, a0, b0, rms, 2.0).unwrap_or((a0, b0));

        let zero_counts = -b / a;
        if !zero_counts.is_finite() || zero_counts.abs() > f64::from(i32::MAX) {
            eyre::bail!("calibration produced invalid tare baseline");
        }
        let counts_per_newton = 1.0 / a;
        if !counts_per_newton.is_finite() {
            eyre::bail!("calibration produced non-finite scale");
        }

        Ok(Calibration {
            zero_counts: zero_counts.round() as i32,
            counts_per_newton: counts_per_newton as f32,
        })
    }
}

fn ols_fit(pts: &[(i64, f32)]) -> eyre::Result<(f64, f64)> {
    let n = pts.len() as f64;
    let mean_x = pts.iter().map(|r| r.0 as f64).sum::<f64>() / n;
    let mean_y = pts.iter().map(|r| f64::from(r.1)).sum::<f64>() / n;
    let mut sxx = 0.0f64;
    let mut sxy = 0.0f64;
    for (rx, ny) in pts {
        let x = *rx as f64 - mean_x;
        let y = f64::from(*ny) - mean_y;
        sxx += x * x;
        sxy += x * y;
    }
    if !sxx.is_finite() || sxx == 0.0 {
        eyre::bail!("calibration cannot determine slope (degenerate X variance)");
    }
    let a = sxy / sxx;
    if !a.is_finite() {
        eyre::bail!("calibration produced non-finite slope");
    }
    if a == 0.0 {
        eyre::bail!("calibration produced zero slope (invalid scale factor)");
    }
    Ok((a, mean_y - a * mean_x))
}

/// Refit over inliers (|residual| <= k * rms around y = a0*x + b0) using an
/// online covariance update. None means "keep (a0, b0)": no outliers, fewer
/// than two inliers, or a degenerate fit.
fn robust_refit(pts: &[(i64, f32)], a0: f64, b0: f64, rms: f64, k: f64) -> Option<(f64, f64)> {
    if !(rms.is_finite() && rms > 0.0 && k.is_finite() && k > 0.0) {
        return None;
    }
    let thr = k * rms;
    let mut n_in: usize = 0;
    let mut mean_x = 0.0f64;
    let mut mean_y = 0.0f64;
    let mut cxx = 0.0f64;
    let mut cxy = 0.0f64;

    for (x_i, y_i) in pts {
        let x = *x_i as f64;
        let y = f64::from(*y_i);
        if (y - (a0 * x + b0)).abs() > thr {
            continue;
        }
        n_in += 1;
        let n = n_in as f64;
        let dx = x - mean_x;
        let dy = y - mean_y;
        mean_x += dx / n;
        mean_y += dy / n;
        cxx += dx * (x - mean_x);
        cxy += dx * (y - mean_y);
    }

    if n_in < 2 || n_in == pts.len() || !cxx.is_finite() || cxx == 0.0 {
        return None;
    }
    let a = cxy / cxx;
    if !a.is_finite() || a == 0.0 {
        return None;
    }
    Some((a, mean_y - a * mean_x))
}

impl TryFrom<Vec<CalibrationRow>> for Calibration {
    type Error = eyre::Report;
    fn try_from(rows: Vec<CalibrationRow>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

pub fn load_calibration_csv(path: &std::path::Path) -> eyre::Result<Calibration> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<&str> = headers.iter().collect();
    if actual != ["raw", "newtons"] {
        eyre::bail!(
            "calibration CSV must have headers 'raw,newtons', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        }
    }

    Calibration::try_from(rows)
}

fn finite_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Units
        if !finite_positive(self.units.microsteps_per_mm) {
            eyre::bail!("units.microsteps_per_mm must be finite and > 0");
        }
        if !finite_positive(self.units.velocity_factor) {
            eyre::bail!("units.velocity_factor must be finite and > 0");
        }
        if !finite_positive(self.units.accel_factor) {
            eyre::bail!("units.accel_factor must be finite and > 0");
        }

        // Travel
        if !finite_positive(f64::from(self.travel.max_travel_mm)) {
            eyre::bail!("travel.max_travel_mm must be finite and > 0");
        }
        if !self.travel.clearance_mm.is_finite() || self.travel.clearance_mm < 0.0 {
            eyre::bail!("travel.clearance_mm must be finite and >= 0");
        }

        // Motion
        if !finite_positive(f64::from(self.motion.accel_mm_s2)) {
            eyre::bail!("motion.accel_mm_s2 must be finite and > 0");
        }
        if !finite_positive(f64::from(self.motion.fast_stop_decel_mm_s2)) {
            eyre::bail!("motion.fast_stop_decel_mm_s2 must be finite and > 0");
        }
        for (key, v) in [
            ("motion.start_velocity_mm_s", self.motion.start_velocity_mm_s),
            ("motion.stop_velocity_mm_s", self.motion.stop_velocity_mm_s),
        ] {
            if !v.is_finite() || v < 0.0 {
                eyre::bail!("{key} must be finite and >= 0");
            }
        }

        // Encoder
        if self.encoder.full_scale < 2 {
            eyre::bail!("encoder.full_scale must be >= 2");
        }
        if !self.encoder.turn_factor_mm.is_finite() || self.encoder.turn_factor_mm == 0.0 {
            eyre::bail!("encoder.turn_factor_mm must be finite and non-zero");
        }

        // Force
        if !self.force.counts_per_newton.is_finite() || self.force.counts_per_newton == 0.0 {
            eyre::bail!("force.counts_per_newton must be finite and non-zero");
        }
        if self.force.tare_samples == 0 {
            eyre::bail!("force.tare_samples must be >= 1");
        }
        if self.force.read_timeout_ms == 0 {
            eyre::bail!("force.read_timeout_ms must be >= 1");
        }

        // Params
        for (key, v) in [
            ("params.stop_force_n", self.params.stop_force_n),
            ("params.zero_force_clear_n", self.params.zero_force_clear_n),
            ("params.forward_velocity_mm_s", self.params.forward_velocity_mm_s),
            ("params.reverse_velocity_mm_s", self.params.reverse_velocity_mm_s),
        ] {
            if !v.is_finite() {
                eyre::bail!("{key} must be finite");
            }
        }

        // Runner
        if self.runner.max_line_len < 8 {
            eyre::bail!("runner.max_line_len must be >= 8");
        }
        if self.runner.tick_hz > 1_000_000 {
            eyre::bail!("runner.tick_hz is unreasonably large (>1 MHz)");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
