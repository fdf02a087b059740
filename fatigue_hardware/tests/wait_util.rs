use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use fatigue_hardware::error::HwError;
use fatigue_hardware::util::{sign_extend_24, wait_until_low_with_timeout};

#[test]
fn data_ready_seen_before_deadline() {
    let busy = Arc::new(AtomicBool::new(true));
    let flip = busy.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        flip.store(false, Ordering::Relaxed);
    });

    let res = wait_until_low_with_timeout(
        || busy.load(Ordering::Relaxed),
        Duration::from_millis(500),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected data ready, got {res:?}");
}

#[test]
fn stuck_high_line_times_out() {
    let err = wait_until_low_with_timeout(|| true, Duration::from_millis(5), Duration::from_micros(200))
        .expect_err("expected timeout");
    assert!(matches!(err, HwError::DataReadyTimeout));
}

#[test]
fn already_low_line_returns_immediately() {
    assert!(wait_until_low_with_timeout(|| false, Duration::ZERO, Duration::from_secs(1)).is_ok());
}

#[test]
fn hx711_words_sign_extend() {
    // 24-bit words as clocked out of the amplifier
    assert_eq!(sign_extend_24(0x00_20DA), 8_410);
    assert_eq!(sign_extend_24(0xFF_DF26), -8_410);
}
