//! Sensorless homing sequence.
//!
//! ```text
//!  fast search ──stall──► back off ──► slow refine ──stall──► origin
//!       │                                   │
//!       └── no stall ──► HomingFailed ◄─────┘
//! ```

use tamper_common::hal::driver::MotionPort;
use tamper_common::hal::types::MoveOutcome;
use tamper_common::tamper::error::TamperError;
use tamper_common::tamper::homing::HomingParams;
use tamper_common::tamper::stall::StallConfig;
use tamper_common::tamper::state::ConfiguredMode;
use tracing::{debug, info, warn};

use crate::axis_port::AxisPort;

/// Home against the reference stop, then restore the tamping bundle.
///
/// The tamping bundle is also restored when homing fails, so the driver is
/// not left at homing current. If that restore fails too, no mode is
/// recorded as active.
pub(super) fn run_homing<M: MotionPort>(
    axis: &mut AxisPort<M>,
    params: &HomingParams,
    tamping_stall: &StallConfig,
) -> Result<(), TamperError> {
    let result = home_sequence(axis, params, tamping_stall);
    if result.is_err() {
        if let Err(fault) = axis.apply_config(ConfiguredMode::Tamping, tamping_stall) {
            warn!("Tamping config not restored after failed homing: {}", fault);
        }
    }
    result
}

fn home_sequence<M: MotionPort>(
    axis: &mut AxisPort<M>,
    params: &HomingParams,
    tamping_stall: &StallConfig,
) -> Result<(), TamperError> {
    let sign = params.direction.sign();
    let mut armed = axis.apply_config(ConfiguredMode::Homing, &params.stall)?;

    debug!(
        "Fast search: {:.1} mm at {:.0} mm/min",
        sign * params.max_travel_mm,
        params.fast_feed_mm_min
    );
    let outcome = armed.move_relative(sign * params.max_travel_mm, params.fast_feed_mm_min, true)?;
    if outcome == MoveOutcome::Completed {
        return Err(TamperError::HomingFailed(format!(
            "no stall within {:.1} mm fast search",
            params.max_travel_mm
        )));
    }

    armed.move_relative(-sign * params.backoff_mm, params.slow_feed_mm_min, false)?;

    let refine = params.refine_travel_mm();
    debug!("Refine: {:.1} mm at {:.0} mm/min", sign * refine, params.slow_feed_mm_min);
    let outcome = armed.move_relative(sign * refine, params.slow_feed_mm_min, true)?;
    if outcome == MoveOutcome::Completed {
        return Err(TamperError::HomingFailed(format!(
            "no stall within {refine:.1} mm refine approach"
        )));
    }

    armed.wait_for_idle()?;
    let machine = armed.define_origin()?;
    info!("Reference found at machine position {:.3} mm", machine);

    // Back to full current and tamping dynamics.
    axis.apply_config(ConfiguredMode::Tamping, tamping_stall)?;
    Ok(())
}
