use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::tempdir;

const FRAME_LEN: usize = 41;

// Sim-mode config: short tare, loop runs back to back unless overridden
fn write_config(dir: &tempfile::TempDir, extra: &str) -> PathBuf {
    let toml = format!(
        r#"
[force]
tare_samples = 4
read_timeout_ms = 50

[runner]
tick_hz = 0

[logging]
level = "warn"
{extra}
"#
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn fatigue(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("fatigue").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "ok", "stdout")]
#[case(&["bogus"], 2, "unrecognized subcommand", "stderr")]
#[case(&["run", "--rt-lock", "sometimes"], 2, "invalid value", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let assert = fatigue(&cfg).args(args).assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn run_emits_one_frame_per_tick() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let out = fatigue(&cfg)
        .args(["run", "--max-ticks", "25"])
        .write_stdin("")
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(out.stdout.len(), 25 * FRAME_LEN);

    let text = String::from_utf8(out.stdout).unwrap();
    for line in text.lines() {
        assert_eq!(line.len(), 40);
        assert!(line.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)));
        // no BEGIN was sent: cycle 0, state IDLE
        assert!(line.starts_with("00000000"), "{line}");
        assert!(line.ends_with("03000000"), "{line}");
    }
}

#[test]
fn run_accepts_begin_from_stdin() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let out = fatigue(&cfg)
        .args(["run", "--max-ticks", "500", "--tick-hz", "1000"])
        .write_stdin("SET 10 0.5 50 100\nBEGIN\n")
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(out.stdout.len(), 500 * FRAME_LEN);

    let text = String::from_utf8(out.stdout).unwrap();
    // FWD with cycle 1 once BEGIN is consumed
    assert!(
        text.lines()
            .any(|l| l.starts_with("01000000") && l.ends_with("00000000")),
        "no forward stroke in output"
    );
}

#[test]
fn decode_prints_json_lines() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let out = fatigue(&cfg)
        .arg("decode")
        .write_stdin(
            "010000000403020100002041000080BF02000000\nZZ\n0000000000000000000000000000000003000000\n",
        )
        .output()
        .unwrap();
    assert!(out.status.success());

    let text = String::from_utf8(out.stdout).unwrap();
    let rows: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["cycle"], 1);
    assert_eq!(rows[0]["force_n"], 10.0);
    assert_eq!(rows[0]["state"], "REV_CLEAR");
    assert_eq!(rows[1]["state"], "IDLE");
}

#[test]
fn decode_round_trips_run_output() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let run = fatigue(&cfg)
        .args(["run", "--max-ticks", "5"])
        .write_stdin("")
        .output()
        .unwrap();
    assert!(run.status.success());

    let decoded = fatigue(&cfg)
        .arg("decode")
        .write_stdin(run.stdout)
        .output()
        .unwrap();
    assert!(decoded.status.success());
    let text = String::from_utf8(decoded.stdout).unwrap();
    assert_eq!(text.lines().count(), 5);
    assert!(text.lines().all(|l| l.contains("\"state\":\"IDLE\"")));
}

#[test]
fn cli_reports_bad_calibration_header() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let bad_csv = dir.path().join("calib.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "raw,grams").unwrap();
    writeln!(f, "100,0.0").unwrap();
    writeln!(f, "200,1.0").unwrap();

    fatigue(&cfg)
        .arg("--calibration")
        .arg(&bad_csv)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid headers"));
}

#[test]
fn cli_accepts_good_calibration() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let csv = dir.path().join("calib.csv");
    fs::write(&csv, "raw,newtons\n8410,0.0\n109158,5.0\n209906,10.0\n").unwrap();

    fatigue(&cfg)
        .arg("--calibration")
        .arg(&csv)
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn invalid_config_exits_2_naming_the_key() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[travel]\nmax_travel_mm = -1.0\n");
    fatigue(&cfg)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("max_travel_mm"));
}

#[test]
fn missing_config_exits_2() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    fatigue(&missing)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration could not be loaded"));
}

#[test]
fn json_mode_reports_structured_error() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[encoder]\nfull_scale = 1\n");
    let out = fatigue(&cfg)
        .args(["--json", "self-check"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));

    let stderr = String::from_utf8(out.stderr).unwrap();
    let err_line = stderr
        .lines()
        .rev()
        .find(|l| l.contains("\"reason\""))
        .unwrap();
    let v: serde_json::Value = serde_json::from_str(err_line).unwrap();
    assert_eq!(v["reason"], "Config");
    assert_eq!(v["exit_code"], 2);
}

#[test]
fn json_self_check_reports_record() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let out = fatigue(&cfg)
        .args(["--json", "self-check"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["status"], "ok");
    assert_eq!(v["record"]["state"], "IDLE");
    assert_eq!(v["record"]["cycle"], 0);
}

fn read_rows(path: &std::path::Path) -> Vec<serde_json::Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn record_writes_header_then_tagged_samples() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let log = dir.path().join("runs.jsonl");

    fatigue(&cfg)
        .args(["record", "--name", "raw noodle", "--feed-rate", "80", "--max-ticks", "50"])
        .arg("--out")
        .arg(&log)
        .assert()
        .success();

    let rows = read_rows(&log);
    assert_eq!(rows.len(), 51);
    let header = &rows[0];
    assert_eq!(header["type"], "run");
    assert_eq!(header["run_id"], 1);
    assert_eq!(header["name"], "raw noodle");
    assert_eq!(header["stop_force"], 10.0);
    assert_eq!(header["clear_force"], 0.5);
    assert_eq!(header["feed_rate"], 80.0);
    assert_eq!(header["retract_rate"], 100.0);
    assert!(header["start_time"].as_str().is_some_and(|t| !t.is_empty()));

    let samples = &rows[1..];
    assert!(samples.iter().all(|r| r["type"] == "sample" && r["run_id"] == 1));
    // SET lands on the first tick, BEGIN on the second
    assert_eq!(samples[0]["state"], "IDLE");
    assert_eq!(samples[0]["transition"], false);
    assert_eq!(samples[1]["state"], "FWD");
    assert_eq!(samples[1]["cycle"], 1);
    assert_eq!(samples[1]["transition"], true);
    for pair in samples.windows(2) {
        let changed = pair[0]["state"] != pair[1]["state"];
        assert_eq!(pair[1]["transition"], changed);
    }
}

#[test]
fn record_appends_runs_with_increasing_ids() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let log = dir.path().join("runs.jsonl");

    for name in ["first", "second"] {
        fatigue(&cfg)
            .args(["record", "--name", name, "--max-ticks", "5"])
            .arg("--out")
            .arg(&log)
            .assert()
            .success();
    }

    let rows = read_rows(&log);
    assert_eq!(rows.len(), 12);
    let headers: Vec<_> = rows.iter().filter(|r| r["type"] == "run").collect();
    assert_eq!(headers.len(), 2);
    assert_eq!(headers[0]["run_id"], 1);
    assert_eq!(headers[1]["run_id"], 2);
    assert_eq!(headers[1]["name"], "second");
    assert!(rows[7..].iter().all(|r| r["run_id"] == 2));
}

#[test]
fn record_without_out_writes_to_stdout() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let out = fatigue(&cfg)
        .args(["record", "--name", "bench", "--max-ticks", "3"])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let text = String::from_utf8(out.stdout).unwrap();
    assert_eq!(text.lines().count(), 4);
    let header: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
    assert_eq!(header["run_id"], 1);
    assert_eq!(header["name"], "bench");
}

#[test]
fn record_rejects_non_finite_params() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    fatigue(&cfg)
        .args(["record", "--name", "x", "--stop-force", "NaN", "--max-ticks", "3"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("stop_force"));
}
