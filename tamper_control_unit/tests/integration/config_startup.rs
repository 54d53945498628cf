//! Controller startup from a config file on disk.

use std::fs;

use tamper_common::config::ConfigLoader;
use tamper_common::hal::types::DriverParam;
use tamper_common::tamper::config::TamperConfig;
use tamper_common::tamper::error::TamperError;
use tamper_common::tamper::state::AxisState;
use tamper_control_unit::AxisController;
use tamper_hal::{SimAxisConfig, SimulatedMotion};
use tempfile::TempDir;

fn load(body: &str) -> TamperConfig {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tamper.toml");
    fs::write(&path, body).unwrap();
    TamperConfig::load(&path).unwrap()
}

#[test]
fn configured_identity_and_limits_apply() {
    let config = load(
        r#"
[axis]
driver_id = 5
board_id = 1
axis_letter = "U"

[tamping]
max_depth_mm = 20.0
"#,
    );
    let sim = SimulatedMotion::new(config.axis, SimAxisConfig::default());
    let controller = AxisController::new(&config, sim).unwrap();

    assert_eq!(controller.identity().driver_id, 5);
    assert_eq!(controller.identity().board_id, 1);
    controller.home().unwrap();
    assert!(matches!(
        controller.tamp_default(25.0),
        Err(TamperError::DepthOutOfRange { max, .. }) if max == 20.0
    ));
    assert_eq!(controller.status().state, AxisState::Idle);
}

#[test]
fn low_min_speed_is_raised_for_the_motor() {
    let config = load(
        r#"
[tamping.stall]
threshold = 3
filtered = true
min_speed_mm_min = 100.0
action = "create_event"
motor_current_ma = 1000
acceleration_mm_s2 = 500.0
jerk_mm_s = 5.0
"#,
    );
    let sim = SimulatedMotion::new(config.axis, SimAxisConfig::default());
    let handle = sim.handle();
    let controller = AxisController::new(&config, sim).unwrap();
    controller.home().unwrap();

    let written = handle.params().into_iter().rev().find_map(|p| match p {
        DriverParam::StallDetection {
            min_speed_mm_min, ..
        } => Some(min_speed_mm_min),
        _ => None,
    });
    assert!((written.unwrap() - 480.0).abs() < 1e-9);
}

#[test]
fn invalid_config_is_rejected_at_startup() {
    let config = load(
        r#"
[stall_response]
shake_count = 5
lift_mm = -1.0
"#,
    );
    let sim = SimulatedMotion::new(config.axis, SimAxisConfig::default());
    assert!(matches!(
        AxisController::new(&config, sim),
        Err(TamperError::ConfigInvalid(ref m)) if m.contains("lift_mm")
    ));
}
