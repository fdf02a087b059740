/// Linear load-cell model.
///
/// newtons = (raw - zero_counts) / counts_per_newton
///
/// `zero_counts` is normally replaced by the startup tare; a persisted or
/// CSV-fitted value only matters when tare is skipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceCalibration {
    pub zero_counts: i32,
    pub counts_per_newton: f32,
}

impl ForceCalibration {
    #[inline]
    pub fn to_newtons(&self, raw: i32) -> f32 {
        let delta = i64::from(raw) - i64::from(self.zero_counts);
        (delta as f64 / f64::from(self.counts_per_newton)) as f32
    }
}

impl Default for ForceCalibration {
    fn default() -> Self {
        Self {
            zero_counts: 0,
            counts_per_newton: 20_149.592,
        }
    }
}
