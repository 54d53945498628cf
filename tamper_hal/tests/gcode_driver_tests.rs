//! G-code driver tests against a scripted firmware link.

use std::collections::VecDeque;
use std::sync::mpsc;

use tamper_common::hal::driver::{MotionFault, MotionPort};
use tamper_common::hal::types::{MoveCommand, MoveOutcome};
use tamper_common::tamper::event::AxisIdentity;
use tamper_common::tamper::stall::{MotorSpecs, StallConfig};
use tamper_hal::{GcodeMotion, STALL_DESCRIPTION, Transport};

/// Answers `ok` to everything except `M114`, which pops the next scripted
/// position.
#[derive(Default)]
struct ScriptedLink {
    sent: Vec<String>,
    positions: VecDeque<f64>,
    reject: Option<&'static str>,
}

impl ScriptedLink {
    fn with_positions(positions: &[f64]) -> Self {
        Self {
            positions: positions.iter().copied().collect(),
            ..Default::default()
        }
    }
}

impl Transport for ScriptedLink {
    fn send(&mut self, line: &str) -> Result<String, MotionFault> {
        self.sent.push(line.to_string());
        if self.reject.is_some_and(|prefix| line.starts_with(prefix)) {
            return Ok("Error: unsupported command".to_string());
        }
        if line == "M114" {
            return match self.positions.pop_front() {
                Some(v) => Ok(format!("X:0.000 Y:0.000 Z:0.000 V:{v:.3} E:0.000 Count 0 0 0 0")),
                None => Err(MotionFault::CommunicationLost("script exhausted".to_string())),
            };
        }
        Ok("ok".to_string())
    }
}

fn driver(link: ScriptedLink) -> GcodeMotion<ScriptedLink> {
    GcodeMotion::new(link, AxisIdentity::default(), &MotorSpecs::default())
}

#[test]
fn initialize_selects_stealth_chop_and_absolute_mode() {
    let mut port = driver(ScriptedLink::default());
    port.initialize().unwrap();
    assert_eq!(port.transport().sent, vec!["M569 P0.2 D3", "G90"]);

    let mut port = driver(ScriptedLink::default()).without_stealth_chop();
    port.initialize().unwrap();
    assert_eq!(port.transport().sent, vec!["G90"]);
}

#[test]
fn tamping_config_writes_in_order() {
    let mut port = driver(ScriptedLink::default());
    for param in StallConfig::tamping_default().driver_params() {
        port.apply_driver_config(&param).unwrap();
    }
    assert_eq!(
        port.transport().sent,
        vec!["M915 V S3 F1 H200 R2", "M906 V1000", "M201 V500", "M566 V300"]
    );
}

#[test]
fn relative_stall_move_detects_short_travel() {
    // Start at 30, commanded -80, firmware stopped at 0.
    let mut port = driver(ScriptedLink::with_positions(&[30.0, 0.0]));
    let outcome = port.move_axis(&MoveCommand::relative(-80.0, 2000.0, true)).unwrap();
    assert_eq!(outcome, MoveOutcome::Stalled);
    assert_eq!(
        port.transport().sent,
        vec!["M114", "G91", "G1 H1 V-80 F2000", "G90", "M400", "M114"]
    );
}

#[test]
fn absolute_stall_move_reaching_target_completes() {
    let mut port = driver(ScriptedLink::with_positions(&[17.0]));
    let outcome = port.move_axis(&MoveCommand::absolute(17.0, 500.0, true)).unwrap();
    assert_eq!(outcome, MoveOutcome::Completed);
    assert_eq!(port.transport().sent, vec!["G90", "G1 H1 V17 F500", "M400", "M114"]);
}

#[test]
fn plain_move_does_not_read_back() {
    let mut port = driver(ScriptedLink::default());
    let outcome = port.move_axis(&MoveCommand::relative(3.0, 600.0, false)).unwrap();
    assert_eq!(outcome, MoveOutcome::Completed);
    assert_eq!(port.transport().sent, vec!["G91", "G1 V3 F600", "G90"]);
}

#[test]
fn rejected_move_restores_absolute_mode() {
    let link = ScriptedLink {
        reject: Some("G1"),
        ..Default::default()
    };
    let mut port = driver(link);
    let err = port.move_axis(&MoveCommand::relative(3.0, 600.0, false)).unwrap_err();
    assert!(matches!(err, MotionFault::Rejected(ref m) if m.contains("G1 V3")));
    assert_eq!(port.transport().sent.last().map(String::as_str), Some("G90"));
}

#[test]
fn position_and_idle() {
    let mut port = driver(ScriptedLink::with_positions(&[12.5]));
    port.wait_for_idle().unwrap();
    assert_eq!(port.position().unwrap(), 12.5);
    assert_eq!(port.transport().sent, vec!["M400", "M114"]);

    assert!(matches!(
        port.position(),
        Err(MotionFault::CommunicationLost(_))
    ));
}

#[test]
fn create_event_stall_raises_event_at_reached_position() {
    let (tx, rx) = mpsc::channel();
    let mut port = driver(ScriptedLink::with_positions(&[12.0, 17.0])).with_event_sink(move |event| {
        let _ = tx.send(event);
    });
    for param in StallConfig::tamping_default().driver_params() {
        port.apply_driver_config(&param).unwrap();
    }

    let outcome = port.move_axis(&MoveCommand::absolute(15.3, 1000.0, true)).unwrap();
    assert_eq!(outcome, MoveOutcome::Stalled);
    let event = rx.try_recv().unwrap();
    assert_eq!((event.driver_id, event.board_id), (2, 0));
    assert_eq!(event.position, Some(12.0));
    assert_eq!(event.description, STALL_DESCRIPTION);

    // Reaching the target is not a stall.
    let outcome = port.move_axis(&MoveCommand::absolute(17.0, 1000.0, true)).unwrap();
    assert_eq!(outcome, MoveOutcome::Completed);
    assert!(rx.try_recv().is_err());
}

#[test]
fn report_stall_raises_no_event() {
    let (tx, rx) = mpsc::channel();
    let mut port = driver(ScriptedLink::with_positions(&[30.0, 0.0])).with_event_sink(move |event| {
        let _ = tx.send(event);
    });
    for param in StallConfig::homing_default().driver_params() {
        port.apply_driver_config(&param).unwrap();
    }

    let outcome = port.move_axis(&MoveCommand::relative(-80.0, 2000.0, true)).unwrap();
    assert_eq!(outcome, MoveOutcome::Stalled);
    assert!(rx.try_recv().is_err());
}
