use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait until the provided `is_high` predicate becomes false (i.e., line goes low),
/// or a timeout expires. Sleeps in small intervals to avoid CPU spinning.
pub fn wait_until_low_with_timeout(
    mut is_high: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while is_high() {
        if Instant::now() >= deadline {
            return Err(HwError::DataReadyTimeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}

/// Reject angle readings outside `[0, full_scale)`.
#[inline]
pub fn check_raw_angle(raw: u16, full_scale: u16) -> Result<u16> {
    if raw < full_scale {
        Ok(raw)
    } else {
        Err(HwError::AngleOutOfRange { raw, full_scale })
    }
}

/// Sign-extend a 24-bit two's complement sample held in the low bits of `v`.
#[inline]
pub fn sign_extend_24(v: u32) -> i32 {
    ((v << 8) as i32) >> 8
}
