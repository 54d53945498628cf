//! Home/tamp/recover against the simulated axis.

use std::sync::mpsc::{self, Receiver};

use tamper_common::hal::driver::MotionFault;
use tamper_common::hal::types::DriverParam;
use tamper_common::tamper::config::TamperConfig;
use tamper_common::tamper::error::TamperError;
use tamper_common::tamper::event::{AxisIdentity, StallEvent};
use tamper_common::tamper::homing::HomingDirection;
use tamper_common::tamper::state::AxisState;
use tamper_control_unit::{AxisController, StallDisposition, TampOutcome};
use tamper_hal::{SimAxisConfig, SimHandle, SimulatedMotion};

struct Rig {
    controller: AxisController<SimulatedMotion>,
    sim: SimHandle,
    events: Receiver<StallEvent>,
}

fn rig(config: &TamperConfig, geometry: SimAxisConfig) -> Rig {
    let (tx, events) = mpsc::channel();
    let sim = SimulatedMotion::new(config.axis, geometry).with_event_sink(move |e| {
        let _ = tx.send(e);
    });
    let handle = sim.handle();
    let controller = AxisController::new(config, sim).unwrap();
    Rig {
        controller,
        sim: handle,
        events,
    }
}

fn approx_eq(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
}

#[test]
fn home_tamp_and_recover_from_material_stall() {
    let config = TamperConfig::default();
    let rig = rig(&config, SimAxisConfig::default().with_material_surface(12.0));
    let ctl = &rig.controller;

    ctl.home().unwrap();
    assert_eq!(ctl.status().state, AxisState::Idle);
    assert_eq!(rig.sim.position(), 0.0);

    // Above the material: plain two-phase tamp.
    assert_eq!(ctl.tamp_default(10.0).unwrap(), TampOutcome::DepthReached);
    assert_eq!(ctl.status().current_position_mm, 10.0);
    assert!(rig.events.try_recv().is_err());

    // Into the material: stalls on the approach.
    rig.sim.clear_journal();
    assert_eq!(ctl.tamp_default(17.0).unwrap(), TampOutcome::Stalled);
    assert_eq!(ctl.status().state, AxisState::Tamping);

    let event = rig.events.try_recv().unwrap();
    assert_eq!(event.position, Some(12.0));
    assert_eq!(
        ctl.handle_stall(&event).unwrap(),
        StallDisposition::Recovered {
            base_position_mm: 12.0
        }
    );

    let expected = [
        12.0, 17.0, 16.8, 17.0, 16.8, 17.0, 16.8, 17.0, 16.8, 17.0, 16.8, 17.0, 0.0,
    ];
    assert!(
        approx_eq(&rig.sim.move_targets(), &expected),
        "{:?}",
        rig.sim.move_targets()
    );

    let status = ctl.status();
    assert_eq!(status.state, AxisState::Idle);
    assert_eq!(status.current_position_mm, 0.0);
    assert_eq!(status.last_stall_detected_at, Some(12.0));
    assert_eq!(rig.sim.position(), 0.0);
}

#[test]
fn homing_runs_at_reduced_current_then_restores() {
    let config = TamperConfig::default();
    let rig = rig(&config, SimAxisConfig::default());
    rig.controller.home().unwrap();

    let currents: Vec<u32> = rig
        .sim
        .params()
        .iter()
        .filter_map(|p| match p {
            DriverParam::MotorCurrent { milliamps } => Some(*milliamps),
            _ => None,
        })
        .collect();
    assert_eq!(currents, vec![800, 1000]);
    assert_eq!(rig.sim.motor_current_ma(), Some(1000));
    assert_eq!(rig.sim.move_targets(), vec![0.0, 3.0, 0.0]);
}

#[test]
fn homing_origin_is_the_reference_stop() {
    let config = TamperConfig::default();
    let geometry = SimAxisConfig {
        reference_stop_mm: 5.0,
        ..SimAxisConfig::default()
    };
    let rig = rig(&config, geometry);
    rig.controller.home().unwrap();
    rig.controller.tamp_default(4.0).unwrap();

    assert_eq!(rig.controller.status().current_position_mm, 4.0);
    assert_eq!(rig.sim.position(), 9.0);
}

#[test]
fn homing_away_from_the_stop_faults() {
    let mut config = TamperConfig::default();
    config.homing.direction = HomingDirection::Positive;
    let rig = rig(&config, SimAxisConfig::default());

    let err = rig.controller.home().unwrap_err();
    assert!(matches!(
        err,
        TamperError::MotionFault(MotionFault::LimitExceeded { .. })
    ));
    assert_eq!(rig.controller.status().state, AxisState::Unhomed);
}

#[test]
fn slow_final_phase_pushes_through_material() {
    let config = TamperConfig::default();
    let rig = rig(&config, SimAxisConfig::default().with_material_surface(16.0));
    rig.controller.home().unwrap();

    // 300 mm/min is below the 480 mm/min detection minimum.
    let outcome = rig.controller.tamp(17.0, 1000.0, 300.0).unwrap();
    assert_eq!(outcome, TampOutcome::DepthReached);
    assert_eq!(rig.controller.status().current_position_mm, 17.0);
    assert!(rig.events.try_recv().is_err());
}

#[test]
fn travel_limit_fault_requires_rehome() {
    let mut config = TamperConfig::default();
    config.tamping.max_depth_mm = 30.0;
    let geometry = SimAxisConfig {
        travel_limit_mm: 20.0,
        ..SimAxisConfig::default()
    };
    let rig = rig(&config, geometry);
    rig.controller.home().unwrap();

    assert!(matches!(
        rig.controller.tamp_default(25.0),
        Err(TamperError::MotionFault(MotionFault::LimitExceeded { .. }))
    ));
    assert_eq!(rig.controller.status().state, AxisState::Unhomed);
    assert_eq!(rig.controller.tamp_default(5.0), Err(TamperError::NotHomed));

    rig.controller.home().unwrap();
    assert_eq!(rig.controller.tamp_default(5.0).unwrap(), TampOutcome::DepthReached);
}

#[test]
fn event_for_another_driver_is_not_handled() {
    let config = TamperConfig::default();
    let rig = rig(&config, SimAxisConfig::default().with_material_surface(12.0));
    rig.controller.home().unwrap();
    rig.controller.tamp_default(17.0).unwrap();

    let other = AxisIdentity {
        driver_id: 7,
        ..AxisIdentity::default()
    };
    let event = StallEvent::new(other.driver_id, other.board_id, "driver-stall");
    assert_eq!(
        rig.controller.handle_stall(&event).unwrap(),
        StallDisposition::NotThisAxis
    );
    assert_eq!(rig.controller.status().state, AxisState::Tamping);
}
