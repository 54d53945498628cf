//! Home/tamp/recover through the G-code driver over a scripted firmware link.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tamper_common::hal::driver::MotionFault;
use tamper_common::tamper::config::TamperConfig;
use tamper_common::tamper::state::AxisState;
use tamper_control_unit::{
    AxisController, Dispatch, LogSafeStop, StallDisposition, StallEventHandler, TampOutcome,
    stall_channel,
};
use tamper_hal::{GcodeMotion, Transport};

/// Answers `ok` to everything except `M114`, which reports the next
/// scripted V position.
struct FirmwareLink {
    positions: VecDeque<f64>,
}

impl Transport for FirmwareLink {
    fn send(&mut self, line: &str) -> Result<String, MotionFault> {
        if line != "M114" {
            return Ok("ok".to_string());
        }
        match self.positions.pop_front() {
            Some(v) => Ok(format!("X:0.000 Y:0.000 Z:0.000 V:{v:.3} E:0.000")),
            None => Err(MotionFault::CommunicationLost("script exhausted".to_string())),
        }
    }
}

#[test]
fn stalled_tamp_on_gcode_driver_recovers_to_idle() {
    #[rustfmt::skip]
    let positions = [
        // homing: search start/end, refine start/end, origin
        30.0, 0.0, 3.0, 0.0, 0.0,
        // tamp to 17: approach stops in material at 12
        12.0,
        // recovery: seed read, lift, five shakes, retract
        12.0, 17.0,
        16.8, 17.0, 16.8, 17.0, 16.8, 17.0, 16.8, 17.0, 16.8, 17.0,
        0.0,
        // tamp to 5 afterwards: approach, final
        4.5, 5.0,
    ];
    let link = FirmwareLink {
        positions: positions.into_iter().collect(),
    };

    let config = TamperConfig::default();
    let (notifier, rx) = stall_channel();
    let port = GcodeMotion::new(link, config.axis, &config.motor).with_event_sink(move |event| {
        notifier.send(event);
    });
    let controller = Arc::new(AxisController::new(&config, port).unwrap());
    let handler = StallEventHandler::new(Arc::clone(&controller), rx, LogSafeStop);

    controller.home().unwrap();
    assert_eq!(controller.tamp_default(17.0).unwrap(), TampOutcome::Stalled);
    assert_eq!(controller.status().state, AxisState::Tamping);

    assert_eq!(
        handler.recv_and_dispatch(Duration::from_millis(100)).unwrap(),
        Dispatch::Handled(StallDisposition::Recovered {
            base_position_mm: 12.0
        })
    );

    let status = controller
        .wait_settled(Duration::from_millis(200))
        .expect("axis did not settle");
    assert_eq!(status.state, AxisState::Idle);
    assert_eq!(status.current_position_mm, 0.0);
    assert_eq!(status.last_stall_detected_at, Some(12.0));

    assert_eq!(controller.tamp_default(5.0).unwrap(), TampOutcome::DepthReached);
    assert_eq!(controller.status().current_position_mm, 5.0);
}
