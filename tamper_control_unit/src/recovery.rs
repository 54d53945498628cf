//! Post-stall lift/shake/retract sequence.
//!
//! The plan is computed from the stall position alone and then executed
//! move by move. It has no early exit: every shake cycle runs.

use tamper_common::hal::driver::MotionPort;
use tamper_common::hal::types::MoveOutcome;
use tamper_common::tamper::error::TamperError;
use tamper_common::tamper::stall::StallResponseParams;
use tracing::{debug, trace, warn};

use crate::axis_port::ArmedPort;

/// Role of a single recovery move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStep {
    Lift,
    ShakeDown,
    ShakeUp,
    Retract,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoveryMove {
    pub step: RecoveryStep,
    /// Logical target [mm].
    pub target_mm: f64,
}

/// Ordered recovery moves for one stall.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryPlan {
    base_mm: f64,
    feed_rate_mm_min: f64,
    moves: Vec<RecoveryMove>,
}

impl RecoveryPlan {
    /// Lift to `base + lift`, shake `shake_count` times between
    /// `lift - shake_distance` and `lift`, retract to logical zero.
    pub fn new(base_mm: f64, params: &StallResponseParams) -> Self {
        let lift = base_mm + params.lift_mm;
        let shake_low = lift - params.shake_distance_mm;

        let mut moves = Vec::with_capacity(params.move_count());
        moves.push(RecoveryMove {
            step: RecoveryStep::Lift,
            target_mm: lift,
        });
        for _ in 0..params.shake_count {
            moves.push(RecoveryMove {
                step: RecoveryStep::ShakeDown,
                target_mm: shake_low,
            });
            moves.push(RecoveryMove {
                step: RecoveryStep::ShakeUp,
                target_mm: lift,
            });
        }
        moves.push(RecoveryMove {
            step: RecoveryStep::Retract,
            target_mm: 0.0,
        });

        Self {
            base_mm,
            feed_rate_mm_min: params.feed_rate_mm_min,
            moves,
        }
    }

    #[inline]
    pub fn base_mm(&self) -> f64 {
        self.base_mm
    }

    pub fn moves(&self) -> &[RecoveryMove] {
        &self.moves
    }

    pub fn targets(&self) -> Vec<f64> {
        self.moves.iter().map(|m| m.target_mm).collect()
    }

    /// Run every move, stall-terminated.
    ///
    /// A move stopped by a stall aborts the sequence: the port is drained
    /// with `wait_for_idle` and `RecoveryInterrupted` is returned.
    pub fn execute<M: MotionPort>(&self, armed: &mut ArmedPort<'_, M>) -> Result<(), TamperError> {
        let total = self.moves.len();
        debug!(
            "Stall recovery from {:.3} mm: {} moves at {:.0} mm/min",
            self.base_mm, total, self.feed_rate_mm_min
        );

        for (index, mv) in self.moves.iter().enumerate() {
            trace!("Recovery {:?} -> {:.3} mm", mv.step, mv.target_mm);
            if armed.move_to(mv.target_mm, self.feed_rate_mm_min, true)? == MoveOutcome::Stalled {
                warn!(
                    "Recovery {:?} move {} of {} stalled, stopping axis",
                    mv.step,
                    index + 1,
                    total
                );
                armed.wait_for_idle()?;
                return Err(TamperError::RecoveryInterrupted {
                    completed_moves: index,
                    total_moves: total,
                });
            }
        }
        Ok(())
    }
}
