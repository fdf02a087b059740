use fatigue_config::load_toml;
use rstest::rstest;

const REFERENCE_RIG: &str = r#"
[units]
microsteps_per_mm = 2560.0
velocity_factor = 1.3981013333333334
accel_factor = 0.015270994830222222

[travel]
max_travel_mm = 65.0
clearance_mm = 5.0

[motion]
accel_mm_s2 = 500.0
fast_stop_decel_mm_s2 = 50000.0

[encoder]
full_scale = 4096
turn_factor_mm = -5.0

[force]
counts_per_newton = 20149.5923684438
tare_samples = 100

[params]
stop_force_n = 10.0
zero_force_clear_n = 0.5
forward_velocity_mm_s = 50.0
reverse_velocity_mm_s = 100.0

[runner]
tick_hz = 1000
"#;

#[test]
fn reference_rig_config_is_valid() {
    let cfg = load_toml(REFERENCE_RIG).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.pins.encoder_addr, 0x36);
    assert_eq!(cfg.runner.max_line_len, 128);
}

#[test]
fn empty_file_uses_defaults() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults should pass");
    assert_eq!(cfg.travel.max_travel_mm, 65.0);
    assert_eq!(cfg.params.reverse_velocity_mm_s, 100.0);
}

#[rstest]
#[case("[units]\nmicrosteps_per_mm = 0.0", "units.microsteps_per_mm")]
#[case("[units]\nvelocity_factor = -1.0", "units.velocity_factor")]
#[case("[travel]\nmax_travel_mm = 0.0", "travel.max_travel_mm")]
#[case("[travel]\nclearance_mm = -1.0", "travel.clearance_mm")]
#[case("[motion]\nfast_stop_decel_mm_s2 = 0.0", "motion.fast_stop_decel_mm_s2")]
#[case("[encoder]\nfull_scale = 1", "encoder.full_scale")]
#[case("[encoder]\nturn_factor_mm = 0.0", "encoder.turn_factor_mm")]
#[case("[force]\ncounts_per_newton = 0.0", "force.counts_per_newton")]
#[case("[force]\ntare_samples = 0", "force.tare_samples")]
#[case("[force]\nread_timeout_ms = 0", "force.read_timeout_ms")]
#[case("[params]\nstop_force_n = nan", "params.stop_force_n")]
#[case("[runner]\nmax_line_len = 4", "runner.max_line_len")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation")]
fn rejects_bad_value(#[case] toml: &str, #[case] key: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(format!("{err}").contains(key), "{err}");
}

#[test]
fn unknown_type_is_a_parse_error() {
    assert!(load_toml("[runner]\ntick_hz = \"fast\"").is_err());
}
