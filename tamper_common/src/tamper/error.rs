//! Error taxonomy of the tamper axis controller.
//!
//! Every error is returned synchronously from the operation that detected
//! it. None is retried internally.

use thiserror::Error;

use crate::config::ConfigError;
use crate::hal::driver::MotionFault;
use crate::tamper::state::AxisState;

/// Errors returned by `AxisController` operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TamperError {
    /// Homing search or refine finished without the expected stall.
    #[error("Homing failed: {0}")]
    HomingFailed(String),

    /// Tamping requested before a successful home.
    #[error("Axis is not homed")]
    NotHomed,

    /// Requested tamp depth outside (0, max_depth].
    #[error("Tamp depth {requested} mm outside (0, {max}] mm")]
    DepthOutOfRange {
        /// Requested depth [mm].
        requested: f64,
        /// Configured maximum depth [mm].
        max: f64,
    },

    /// Feed rate not a positive finite number.
    #[error("Invalid feed rate {0} mm/min")]
    InvalidFeedRate(f64),

    /// Another operation owns the axis.
    #[error("Axis busy ({0})")]
    AxisBusy(AxisState),

    /// Hardware-reported fault.
    #[error("Motion fault: {0}")]
    MotionFault(#[from] MotionFault),

    /// A recovery move was stopped by a second stall.
    #[error("Stall recovery interrupted after {completed_moves} of {total_moves} moves")]
    RecoveryInterrupted {
        /// Moves finished before the interruption.
        completed_moves: usize,
        /// Moves in the full sequence.
        total_moves: usize,
    },

    /// Startup configuration rejected.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
}

impl From<ConfigError> for TamperError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigInvalid(err.to_string())
    }
}
