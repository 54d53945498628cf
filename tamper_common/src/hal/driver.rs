//! Motion port trait and fault types.
//!
//! This module defines:
//! - `MotionPort` trait - Interface every motion backend implements
//! - `MotionFault` enum - Faults reported by the motion layer

use crate::hal::types::{DriverParam, MoveCommand, MoveOutcome};
use thiserror::Error;

/// Faults reported by the motion layer.
///
/// A fault is fatal to the operation in progress; the controller never
/// retries a faulted move.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionFault {
    /// Commanded motion would leave the mechanical travel range.
    #[error("Travel limit exceeded at {position:.3} mm (limit {limit:.3} mm)")]
    LimitExceeded {
        /// Position where motion stopped [mm].
        position: f64,
        /// Limit that was hit [mm].
        limit: f64,
    },

    /// Link to the motion firmware was lost.
    #[error("Communication lost: {0}")]
    CommunicationLost(String),

    /// The firmware refused or could not parse a command.
    #[error("Command rejected: {0}")]
    Rejected(String),
}

/// Trait defining the interface between the axis controller and the
/// motion layer.
///
/// Implementations execute moves synchronously: `move_axis` returns once
/// the axis has either reached its target or been stopped by armed stall
/// detection.
///
/// # Lifecycle
///
/// 1. `initialize()` - Called once before the first parameter write
/// 2. `apply_driver_config()` - Called three times per stall-config switch
/// 3. `move_axis()` / `wait_for_idle()` / `position()` - Any number of times
///
/// # Timing Contracts
///
/// | Operation               | Blocks until                              |
/// |-------------------------|-------------------------------------------|
/// | `apply_driver_config()` | parameter accepted by the driver          |
/// | `move_axis()`           | move completed or stopped by a stall      |
/// | `wait_for_idle()`       | every queued move has retired             |
/// | `position()`            | position reported                         |
pub trait MotionPort: Send {
    /// Returns the backend's identifier (e.g., "simulation", "gcode").
    fn name(&self) -> &'static str;

    /// One-time driver preparation.
    ///
    /// Default implementation does nothing.
    fn initialize(&mut self) -> Result<(), MotionFault> {
        Ok(())
    }

    /// Write one driver parameter.
    fn apply_driver_config(&mut self, param: &DriverParam) -> Result<(), MotionFault>;

    /// Execute a single move.
    ///
    /// # Returns
    /// `MoveOutcome::Stalled` only when `cmd.wait_for_stall` is set and the
    /// armed stall detection stopped the axis.
    fn move_axis(&mut self, cmd: &MoveCommand) -> Result<MoveOutcome, MotionFault>;

    /// Block until all queued moves have finished.
    fn wait_for_idle(&mut self) -> Result<(), MotionFault>;

    /// Current axis position in machine coordinates [mm].
    fn position(&mut self) -> Result<f64, MotionFault>;
}

impl<M: MotionPort + ?Sized> MotionPort for Box<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn initialize(&mut self) -> Result<(), MotionFault> {
        (**self).initialize()
    }

    fn apply_driver_config(&mut self, param: &DriverParam) -> Result<(), MotionFault> {
        (**self).apply_driver_config(param)
    }

    fn move_axis(&mut self, cmd: &MoveCommand) -> Result<MoveOutcome, MotionFault> {
        (**self).move_axis(cmd)
    }

    fn wait_for_idle(&mut self) -> Result<(), MotionFault> {
        (**self).wait_for_idle()
    }

    fn position(&mut self) -> Result<f64, MotionFault> {
        (**self).position()
    }
}
