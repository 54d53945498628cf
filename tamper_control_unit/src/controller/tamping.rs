//! Two-phase tamping move.

use tamper_common::hal::driver::{MotionFault, MotionPort};
use tamper_common::hal::types::MoveOutcome;
use tamper_common::tamper::error::TamperError;
use tamper_common::tamper::stall::StallConfig;
use tamper_common::tamper::state::ConfiguredMode;
use tracing::debug;

use crate::axis_port::AxisPort;

/// How a tamp ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TampOutcome {
    /// Target depth reached without a stall; axis is Idle.
    DepthReached,
    /// Stopped by a stall; axis stays Tamping until the stall event is handled.
    ///
    /// `current_position_mm` still holds the end of the last completed move.
    /// The stall position is read once by `handle_stall`.
    Stalled,
}

/// Validated tamp request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct TampRequest {
    pub target_mm: f64,
    pub approach_speed_mm_min: f64,
    pub tamp_speed_mm_min: f64,
    pub approach_fraction: f64,
}

impl TampRequest {
    pub fn validate(&self, max_depth_mm: f64) -> Result<(), TamperError> {
        let target = self.target_mm;
        if !target.is_finite() || target <= 0.0 || target > max_depth_mm {
            return Err(TamperError::DepthOutOfRange {
                requested: target,
                max: max_depth_mm,
            });
        }
        for speed in [self.approach_speed_mm_min, self.tamp_speed_mm_min] {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(TamperError::InvalidFeedRate(speed));
            }
        }
        Ok(())
    }

    /// Where the fast approach ends when starting from `current`.
    #[inline]
    pub fn approach_target(&self, current: f64) -> f64 {
        current + self.approach_fraction * (self.target_mm - current)
    }
}

/// Fast approach, then slow final phase, both stall-terminated.
pub(super) fn run_tamp<M: MotionPort>(
    axis: &mut AxisPort<M>,
    request: &TampRequest,
    stall: &StallConfig,
) -> Result<TampOutcome, MotionFault> {
    let mut armed = axis.ensure_config(ConfiguredMode::Tamping, stall)?;
    let current = armed.position();

    if request.target_mm <= current {
        debug!(
            "Target {:.3} mm not below {:.3} mm, single move",
            request.target_mm, current
        );
        armed.move_to(request.target_mm, request.approach_speed_mm_min, false)?;
        return Ok(TampOutcome::DepthReached);
    }

    let approach = request.approach_target(current);
    debug!(
        "Approach {:.3} -> {:.3} mm at {:.0} mm/min",
        current, approach, request.approach_speed_mm_min
    );
    if armed.move_to(approach, request.approach_speed_mm_min, true)? == MoveOutcome::Stalled {
        return Ok(TampOutcome::Stalled);
    }

    debug!(
        "Final {:.3} -> {:.3} mm at {:.0} mm/min",
        approach, request.target_mm, request.tamp_speed_mm_min
    );
    if armed.move_to(request.target_mm, request.tamp_speed_mm_min, true)? == MoveOutcome::Stalled {
        return Ok(TampOutcome::Stalled);
    }

    Ok(TampOutcome::DepthReached)
}
