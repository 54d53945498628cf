//! RepRapFirmware command rendering and reply parsing.
//!
//! | Concern              | Command                          |
//! |----------------------|----------------------------------|
//! | Stall detection      | `M915 <axis> S F [H] R`          |
//! | Motor current        | `M906 <axis><mA>`                |
//! | Acceleration         | `M201 <axis><mm/s²>`             |
//! | Jerk                 | `M566 <axis><mm/min>`            |
//! | Driver mode          | `M569 P<board>.<driver> D3`      |
//! | Positioning mode     | `G90` / `G91`                    |
//! | Move                 | `G1 [H1] <axis><mm> F<mm/min>`   |
//! | Join                 | `M400`                           |
//! | Position report      | `M114`                           |

use tamper_common::hal::types::DriverParam;
use tamper_common::tamper::event::AxisIdentity;
use tamper_common::tamper::stall::{StallAction, StallConfig};

pub const ABSOLUTE_MODE: &str = "G90";
pub const RELATIVE_MODE: &str = "G91";
pub const WAIT_FOR_MOVES: &str = "M400";
pub const REPORT_POSITION: &str = "M114";

/// Format a number with at most three decimals and no trailing zeros.
pub fn fmt_num(value: f64) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// `M915`: stall detection threshold, filter, minimum speed and action.
///
/// `H` is left out when `min_speed_steps_s` is zero so the firmware keeps
/// its own default.
pub fn stall_detection(
    axis: char,
    threshold: i8,
    filtered: bool,
    min_speed_steps_s: u32,
    action: StallAction,
) -> String {
    let mut line = format!("M915 {axis} S{threshold} F{}", u8::from(filtered));
    if min_speed_steps_s > 0 {
        line.push_str(&format!(" H{min_speed_steps_s}"));
    }
    line.push_str(&format!(" R{}", action.code()));
    line
}

/// `M906`: motor current.
pub fn motor_current(axis: char, milliamps: u32) -> String {
    format!("M906 {axis}{milliamps}")
}

/// `M201`: acceleration.
pub fn acceleration(axis: char, acceleration_mm_s2: f64) -> String {
    format!("M201 {axis}{}", fmt_num(acceleration_mm_s2))
}

/// `M566`: maximum instantaneous speed change, which RRF takes in mm/min.
pub fn jerk(axis: char, jerk_mm_s: f64) -> String {
    format!("M566 {axis}{}", fmt_num(jerk_mm_s * 60.0))
}

/// `M569 … D3`: put the driver in stealthChop, required for stallGuard on
/// the tamper motor.
pub fn stealth_chop(identity: &AxisIdentity) -> String {
    format!("M569 P{}.{} D3", identity.board_id, identity.driver_id)
}

/// `G1`: linear move, stall-terminated with `H1`.
pub fn linear_move(axis: char, value: f64, feed_rate_mm_min: f64, stall_terminated: bool) -> String {
    let h = if stall_terminated { "H1 " } else { "" };
    format!("G1 {h}{axis}{} F{}", fmt_num(value), fmt_num(feed_rate_mm_min))
}

/// Minimum stall speed in full steps per second, as `M915 H` expects.
#[inline]
pub fn min_speed_steps_s(min_speed_mm_min: f64, full_steps_per_mm: f64) -> u32 {
    (min_speed_mm_min / 60.0 * full_steps_per_mm).round().max(0.0) as u32
}

/// Lines for one driver parameter write.
pub fn render_param(axis: char, param: &DriverParam, full_steps_per_mm: f64) -> Vec<String> {
    match *param {
        DriverParam::StallDetection {
            threshold,
            filtered,
            min_speed_mm_min,
            action,
        } => vec![stall_detection(
            axis,
            threshold,
            filtered,
            min_speed_steps_s(min_speed_mm_min, full_steps_per_mm),
            action,
        )],
        DriverParam::MotorCurrent { milliamps } => vec![motor_current(axis, milliamps)],
        DriverParam::Dynamics {
            acceleration_mm_s2,
            jerk_mm_s,
        } => vec![acceleration(axis, acceleration_mm_s2), jerk(axis, jerk_mm_s)],
    }
}

/// Full block switching the driver to `stall`, in write order.
pub fn config_block(axis: char, stall: &StallConfig, full_steps_per_mm: f64) -> Vec<String> {
    stall
        .driver_params()
        .iter()
        .flat_map(|param| render_param(axis, param, full_steps_per_mm))
        .collect()
}

/// Extract the user-coordinate position of `axis` from an `M114` reply.
///
/// RRF answers e.g. `X:0.000 Y:0.000 Z:0.000 V:12.000 E:0.000 Count 0 0 0 960`;
/// the first `V:` token wins.
pub fn parse_position(reply: &str, axis: char) -> Option<f64> {
    let prefix = format!("{axis}:");
    reply
        .split_whitespace()
        .find_map(|token| token.strip_prefix(prefix.as_str()))
        .and_then(|value| value.parse().ok())
}
