//! Human-readable error descriptions, exit codes and structured JSON errors.

use fatigue_core::error::{BuildError, RigError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    // Calibration CSV header special-case
    if lower.contains("calibration csv must have headers") {
        return "Invalid headers in calibration CSV. Expected 'raw,newtons'.".to_string();
    }

    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML or a degenerate calibration.\nHow to fix: Edit the config file, then rerun."
        );
    }

    if let Some(re) = err.downcast_ref::<RigError>() {
        return match re {
            RigError::Timeout => {
                let call = match timed_out_call(err) {
                    Some(call) => format!(" ({call})"),
                    None => String::new(),
                };
                format!(
                    "What happened: A hardware call timed out{call}.\nLikely causes: The device behind that call is miswired or unpowered, or the timeout is too low.\nHow to fix: Check the [pins] wiring and power for that device. For load cell reads, consider raising force.read_timeout_ms in the config."
                )
            }
            RigError::HardwareFault(what) => format!(
                "What happened: A sensor reported an impossible value ({what}).\nLikely causes: Encoder magnet missing or misaligned, or a bus glitch.\nHow to fix: Check the AS5600 mounting and I2C wiring, then restart the rig."
            ),
            RigError::Hardware(what) => format!(
                "What happened: A hardware call failed ({what}).\nLikely causes: SPI/I2C/GPIO wiring, permissions, or the driver lost power.\nHow to fix: Check [pins] in the config and the wiring, then restart the rig."
            ),
            RigError::Telemetry(what) => format!(
                "What happened: Telemetry output failed ({what}).\nLikely causes: The reader of stdout went away.\nHow to fix: Keep the consumer attached for the whole run."
            ),
            RigError::Config(what) => format!(
                "What happened: Configuration could not be loaded ({what}).\nLikely causes: Missing file, TOML syntax error, or out-of-range values.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// The context attached directly around the timeout, i.e. the call that failed.
fn timed_out_call(err: &eyre::Report) -> Option<String> {
    let mut context = None;
    for cause in err.chain() {
        if matches!(cause.downcast_ref::<RigError>(), Some(RigError::Timeout)) {
            return context;
        }
        context = Some(cause.to_string());
    }
    None
}

/// Stable process exit codes.
///
/// 2 config/build, 3 sensor timeout, 4 hardware, 5 telemetry, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    match err.downcast_ref::<RigError>() {
        Some(RigError::Config(_)) => 2,
        Some(RigError::Timeout) => 3,
        Some(RigError::HardwareFault(_) | RigError::Hardware(_)) => 4,
        Some(RigError::Telemetry(_)) => 5,
        None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<RigError>() {
        Some(RigError::Config(_)) => "Config",
        Some(RigError::Timeout) => "Timeout",
        Some(RigError::HardwareFault(_)) => "HardwareFault",
        Some(RigError::Hardware(_)) => "Hardware",
        Some(RigError::Telemetry(_)) => "Telemetry",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
