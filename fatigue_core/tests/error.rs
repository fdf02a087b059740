mod common;

use common::*;
use fatigue_core::{CycleState, RigError, RunOptions};
use std::sync::atomic::AtomicBool;

#[test]
fn load_cell_timeout_maps_to_timeout() {
    let (mut ctrl, bench, _) = rig();
    bench.borrow_mut().fail_load_cell = Some("hx711 data-ready timeout");
    let err = ctrl.step(&mut input("")).unwrap_err();
    assert!(matches!(err.downcast_ref::<RigError>(), Some(RigError::Timeout)));
    assert!(format!("{err:#}").contains("reading load cell"));
}

#[test]
fn driver_failure_is_fatal_and_named() {
    let (mut ctrl, bench, _) = rig();
    bench.borrow_mut().fail_driver = Some("spi bus fault");
    let err = ctrl.step(&mut input("BEGIN\n")).unwrap_err();
    match err.downcast_ref::<RigError>() {
        Some(RigError::Hardware(msg)) => assert!(msg.contains("spi bus fault")),
        other => panic!("unexpected {other:?}"),
    }
    assert!(format!("{err:#}").contains("set_max_decel"));
}

#[test]
fn angle_outside_full_scale_is_a_fault() {
    let (mut ctrl, bench, _) = rig();
    bench.borrow_mut().angle = 4_096;
    let err = ctrl.step(&mut input("")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RigError>(),
        Some(RigError::HardwareFault(_))
    ));
}

#[test]
fn runner_halts_and_stops_reporting_after_fatal_error() {
    let (mut ctrl, bench, _) = rig();
    let mut out = Vec::new();
    let stop = AtomicBool::new(false);
    let mut q = input("");
    fatigue_core::run(
        &mut ctrl,
        &mut q,
        &mut out,
        RunOptions {
            tick_hz: 0,
            max_ticks: Some(2),
        },
        &stop,
    )
    .unwrap();
    assert_eq!(out.len(), 2 * 41);
    take_calls(&bench);

    bench.borrow_mut().fail_load_cell = Some("wire broken");
    let err = fatigue_core::run(&mut ctrl, &mut q, &mut out, RunOptions::default(), &stop)
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<RigError>(), Some(RigError::Hardware(_))));
    assert_eq!(out.len(), 2 * 41);
    assert_eq!(take_calls(&bench), vec![Call::Halt]);
    assert_eq!(ctrl.state(), CycleState::Idle);
}
