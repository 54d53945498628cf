//! Command and parameter types exchanged with a `MotionPort`.

use serde::{Deserialize, Serialize};

use crate::tamper::stall::StallAction;

/// Positioning mode of a single move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveMode {
    /// `value` is a signed displacement from the current position.
    Relative,
    /// `value` is a target in machine coordinates.
    Absolute,
}

/// One discrete move on the tamper axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveCommand {
    /// Displacement or target [mm], depending on `mode`.
    pub value: f64,
    /// Feed rate [mm/min].
    pub feed_rate_mm_min: f64,
    /// Positioning mode.
    pub mode: MoveMode,
    /// Terminate the move early when the armed stall detection fires.
    pub wait_for_stall: bool,
}

impl MoveCommand {
    /// Relative move by `displacement` mm.
    pub const fn relative(displacement: f64, feed_rate_mm_min: f64, wait_for_stall: bool) -> Self {
        Self {
            value: displacement,
            feed_rate_mm_min,
            mode: MoveMode::Relative,
            wait_for_stall,
        }
    }

    /// Absolute move to `target` mm (machine coordinates).
    pub const fn absolute(target: f64, feed_rate_mm_min: f64, wait_for_stall: bool) -> Self {
        Self {
            value: target,
            feed_rate_mm_min,
            mode: MoveMode::Absolute,
            wait_for_stall,
        }
    }

    /// Machine-coordinate target when starting from `from`.
    #[inline]
    pub fn target_from(&self, from: f64) -> f64 {
        match self.mode {
            MoveMode::Relative => from + self.value,
            MoveMode::Absolute => self.value,
        }
    }
}

/// How a move ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// The axis reached the commanded position.
    Completed,
    /// Stall detection stopped the axis short of the commanded position.
    Stalled,
}

/// A single driver-level write.
///
/// Switching stall semantics takes three of these, in declaration order:
/// detection parameters, then motor current, then dynamics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverParam {
    /// Stall detection sensitivity and reaction.
    StallDetection {
        /// Threshold in [-64, 63]; lower is more sensitive.
        threshold: i8,
        /// Filter the stall signal over four full steps.
        filtered: bool,
        /// Minimum speed for valid detection [mm/min].
        min_speed_mm_min: f64,
        /// What the firmware does when a stall is detected.
        action: StallAction,
    },
    /// Motor run current.
    MotorCurrent {
        /// Current [mA].
        milliamps: u32,
    },
    /// Acceleration and jerk limits.
    Dynamics {
        /// Acceleration [mm/s²].
        acceleration_mm_s2: f64,
        /// Instantaneous speed change [mm/s].
        jerk_mm_s: f64,
    },
}
