//! Tamper axis state and observable status.
//!
//! All enums use `#[repr(u8)]` so they can be logged or exported as plain
//! codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the tamper axis.
///
/// Only `AxisController` transitions between these. `StallRecovering` is
/// entered from `Tamping` alone and always leaves toward `Idle` (or
/// `Unhomed` when recovery itself faults).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AxisState {
    /// Position unknown, homing required before tamping.
    Unhomed = 0,
    /// Sensorless homing in progress.
    Homing = 1,
    /// Homed and at rest.
    Idle = 2,
    /// Tamping move in progress or stopped by a stall awaiting its event.
    Tamping = 3,
    /// Lift/shake/retract sequence running.
    StallRecovering = 4,
}

impl AxisState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unhomed),
            1 => Some(Self::Homing),
            2 => Some(Self::Idle),
            3 => Some(Self::Tamping),
            4 => Some(Self::StallRecovering),
            _ => None,
        }
    }

    /// True while a motion sequence owns the axis.
    #[inline]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Homing | Self::Tamping | Self::StallRecovering)
    }

    /// True once no further transition is pending without a new request.
    #[inline]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Unhomed | Self::Idle)
    }
}

impl Default for AxisState {
    fn default() -> Self {
        Self::Unhomed
    }
}

impl fmt::Display for AxisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unhomed => "Unhomed",
            Self::Homing => "Homing",
            Self::Idle => "Idle",
            Self::Tamping => "Tamping",
            Self::StallRecovering => "StallRecovering",
        };
        f.write_str(name)
    }
}

/// Which stall-detection bundle is currently applied to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ConfiguredMode {
    /// Nothing applied yet (or the last switch failed part-way).
    None = 0,
    /// Sensorless homing bundle.
    Homing = 1,
    /// Tamping bundle.
    Tamping = 2,
}

impl Default for ConfiguredMode {
    fn default() -> Self {
        Self::None
    }
}

/// Snapshot of the tamper axis exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TamperStatus {
    /// Axis state at snapshot time.
    pub state: AxisState,
    /// Logical position relative to the homed origin [mm].
    pub current_position_mm: f64,
    /// Stall bundle currently applied.
    pub configured_mode: ConfiguredMode,
    /// Position of the most recent handled tamping stall [mm].
    pub last_stall_detected_at: Option<f64>,
}
