//! Maps `Box<dyn Error>` from trait boundaries to typed `RigError`.
//!
//! The traits in `fatigue_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to the core's error enum, with an optional
//! feature-gated path for `fatigue_hardware::error::HwError` downcasting.

use eyre::WrapErr;
use fatigue_traits::HwResult;

use crate::error::{Result, RigError};

/// Map a trait-boundary error to a typed `RigError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> RigError {
    #[cfg(feature = "hardware-errors")]
    {
        use fatigue_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::DataReadyTimeout => RigError::Timeout,
                other => RigError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        RigError::Timeout
    } else {
        RigError::Hardware(s)
    }
}

/// Lift a collaborator result into the core `Result`, naming the call.
pub(crate) fn hw<T>(res: HwResult<T>, what: &'static str) -> Result<T> {
    res.map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err(what)
}
