//! Driver stall notifications and axis identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::consts::{DEFAULT_AXIS_LETTER, DEFAULT_BOARD_ID, DEFAULT_DRIVER_ID};

/// Hardware identity of the tamper motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisIdentity {
    /// Driver number on its board.
    #[serde(default = "default_driver_id")]
    pub driver_id: u8,
    /// Board address (0 = main board).
    #[serde(default = "default_board_id")]
    pub board_id: u8,
    /// G-code axis letter.
    #[serde(default = "default_axis_letter")]
    pub axis_letter: char,
}

fn default_driver_id() -> u8 {
    DEFAULT_DRIVER_ID
}
fn default_board_id() -> u8 {
    DEFAULT_BOARD_ID
}
fn default_axis_letter() -> char {
    DEFAULT_AXIS_LETTER
}

impl Default for AxisIdentity {
    fn default() -> Self {
        Self {
            driver_id: DEFAULT_DRIVER_ID,
            board_id: DEFAULT_BOARD_ID,
            axis_letter: DEFAULT_AXIS_LETTER,
        }
    }
}

impl AxisIdentity {
    /// Exact match on (driver, board).
    #[inline]
    pub fn owns(&self, event: &StallEvent) -> bool {
        self.driver_id == event.driver_id && self.board_id == event.board_id
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.axis_letter.is_ascii_uppercase() {
            return Err(format!(
                "axis.axis_letter must be an uppercase ASCII letter, got {:?}",
                self.axis_letter
            ));
        }
        Ok(())
    }
}

impl fmt::Display for AxisIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (driver {}.{})", self.axis_letter, self.board_id, self.driver_id)
    }
}

/// A driver-stall notification raised by the motion layer.
///
/// Consumed exactly once by the stall event handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StallEvent {
    /// Driver that stalled.
    pub driver_id: u8,
    /// Board of that driver.
    pub board_id: u8,
    /// Free-form firmware description.
    pub description: String,
    /// Machine position when the event was raised, if the source knew it [mm].
    pub position: Option<f64>,
}

impl StallEvent {
    pub fn new(driver_id: u8, board_id: u8, description: impl Into<String>) -> Self {
        Self {
            driver_id,
            board_id,
            description: description.into(),
            position: None,
        }
    }

    pub fn at_position(mut self, position: f64) -> Self {
        self.position = Some(position);
        self
    }
}

impl fmt::Display for StallEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stall on driver {}.{}: {}",
            self.board_id, self.driver_id, self.description
        )?;
        if let Some(pos) = self.position {
            write!(f, " at {pos:.3} mm")?;
        }
        Ok(())
    }
}
