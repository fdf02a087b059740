use std::fs::File;
use std::io::Write;

use fatigue_config::{Calibration, CalibrationRow, load_calibration_csv};
use rstest::rstest;
use tempfile::tempdir;

fn row(raw: i64, newtons: f32) -> CalibrationRow {
    CalibrationRow { raw, newtons }
}

#[rstest]
fn two_point_fit_gives_scale_and_zero() {
    let c = Calibration::from_rows(vec![row(1_000, 0.0), row(3_000, 20.0)]).unwrap();
    assert!((c.counts_per_newton - 100.0).abs() < 1e-3);
    assert_eq!(c.zero_counts, 1_000);
}

#[rstest]
fn decreasing_raw_is_accepted() {
    let c = Calibration::from_rows(vec![row(3_000, 0.0), row(2_000, 10.0), row(1_000, 20.0)]).unwrap();
    assert!((c.counts_per_newton + 100.0).abs() < 1e-3);
    assert_eq!(c.zero_counts, 3_000);
}

#[rstest]
#[case(vec![row(1, 0.0)], "at least two rows")]
#[case(vec![row(1, 0.0), row(1, 1.0)], "duplicate raw")]
#[case(vec![row(1, 0.0), row(3, 1.0), row(2, 2.0)], "monotonic")]
#[case(vec![row(1, 5.0), row(2, 5.0)], "zero slope")]
fn rejects_bad_rows(#[case] rows: Vec<CalibrationRow>, #[case] needle: &str) {
    let err = Calibration::from_rows(rows).expect_err("should fail");
    assert!(format!("{err}").contains(needle), "{err}");
}

#[rstest]
fn loads_csv_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cal.csv");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "raw,newtons").unwrap();
    writeln!(f, "8410,0").unwrap();
    writeln!(f, "109158,5").unwrap();
    writeln!(f, "209906,10").unwrap();
    drop(f);

    let c = load_calibration_csv(&path).unwrap();
    assert!((c.counts_per_newton - 20_149.6).abs() < 0.5);
    assert!((c.zero_counts - 8_410).abs() <= 1);
}

#[rstest]
fn wrong_headers_are_named_in_the_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cal.csv");
    std::fs::write(&path, "raw,grams\n1,0\n2,1\n").unwrap();
    let err = load_calibration_csv(&path).expect_err("should fail");
    assert!(format!("{err}").contains("headers 'raw,newtons', got: raw,grams"));
}

#[rstest]
fn bad_row_reports_line_number() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cal.csv");
    std::fs::write(&path, "raw,newtons\n1,0\nx,1\n").unwrap();
    let err = load_calibration_csv(&path).expect_err("should fail");
    assert!(format!("{err}").contains("row 3"), "{err}");
}
