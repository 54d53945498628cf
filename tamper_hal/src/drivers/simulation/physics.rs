//! Tamper axis physics.
//!
//! The axis is a point on a line: a hard reference stop at the low end, a
//! soft travel limit at the high end and, optionally, a material surface
//! that resists motion in +direction. Moves are instantaneous; only where a
//! move ends and why is modeled.

use tamper_common::consts::POSITION_TOLERANCE_MM;
use tamper_common::hal::driver::MotionFault;
use tamper_common::hal::types::{DriverParam, MoveCommand, MoveOutcome};
use tamper_common::tamper::stall::StallAction;
use tracing::{debug, trace};

/// Geometry of the simulated axis, in machine coordinates [mm].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimAxisConfig {
    /// Mechanical end stop the axis homes against (negative direction).
    pub reference_stop_mm: f64,
    /// Highest position the firmware accepts as a target.
    pub travel_limit_mm: f64,
    /// Position at power-up.
    pub start_position_mm: f64,
    /// Where the material starts. Everything above it is material.
    pub material_surface_mm: Option<f64>,
}

impl Default for SimAxisConfig {
    fn default() -> Self {
        Self {
            reference_stop_mm: 0.0,
            travel_limit_mm: 100.0,
            start_position_mm: 30.0,
            material_surface_mm: None,
        }
    }
}

impl SimAxisConfig {
    /// Same geometry with material starting at `surface_mm`.
    pub fn with_material_surface(mut self, surface_mm: f64) -> Self {
        self.material_surface_mm = Some(surface_mm);
        self
    }
}

/// Stall detection parameters currently written to the simulated driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmedDetection {
    /// Sensitivity (logged only, the simulation stalls deterministically).
    pub threshold: i8,
    /// Feed rate below which the driver cannot see a stall [mm/min].
    pub min_speed_mm_min: f64,
    /// What the driver does when it stalls.
    pub action: StallAction,
}

/// What stopped a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    /// The hard reference stop.
    ReferenceStop,
    /// The material surface.
    Material,
}

/// Physical state of one simulated tamper axis.
#[derive(Debug, Clone)]
pub struct SimAxis {
    config: SimAxisConfig,
    position: f64,
    detection: Option<ArmedDetection>,
    motor_current_ma: Option<u32>,
    dynamics: Option<(f64, f64)>,
}

impl SimAxis {
    pub fn new(config: SimAxisConfig) -> Self {
        Self {
            position: config.start_position_mm,
            config,
            detection: None,
            motor_current_ma: None,
            dynamics: None,
        }
    }

    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    #[inline]
    pub fn detection(&self) -> Option<ArmedDetection> {
        self.detection
    }

    #[inline]
    pub fn motor_current_ma(&self) -> Option<u32> {
        self.motor_current_ma
    }

    /// Acceleration [mm/s²] and jerk [mm/s] last written.
    #[inline]
    pub fn dynamics(&self) -> Option<(f64, f64)> {
        self.dynamics
    }

    pub fn set_material_surface(&mut self, surface_mm: Option<f64>) {
        self.config.material_surface_mm = surface_mm;
    }

    /// Latch one driver parameter.
    pub fn apply(&mut self, param: &DriverParam) {
        match *param {
            DriverParam::StallDetection {
                threshold,
                min_speed_mm_min,
                action,
                ..
            } => {
                debug!(
                    "Sim detection armed: threshold={} min_speed={:.1} mm/min action={:?}",
                    threshold, min_speed_mm_min, action
                );
                self.detection = Some(ArmedDetection {
                    threshold,
                    min_speed_mm_min,
                    action,
                });
            }
            DriverParam::MotorCurrent { milliamps } => {
                self.motor_current_ma = Some(milliamps);
            }
            DriverParam::Dynamics {
                acceleration_mm_s2,
                jerk_mm_s,
            } => {
                self.dynamics = Some((acceleration_mm_s2, jerk_mm_s));
            }
        }
    }

    /// Whether a move at `feed` would be stopped by a stall.
    fn stops_on_stall(&self, cmd: &MoveCommand) -> bool {
        cmd.wait_for_stall
            && self
                .detection
                .is_some_and(|d| cmd.feed_rate_mm_min >= d.min_speed_mm_min)
    }

    /// Execute one move.
    ///
    /// Targets beyond the travel limit are refused without motion. Running
    /// into the reference stop ends in `Stalled` when detection can see it,
    /// otherwise the axis crashes into the stop and the move faults. The
    /// material only stops moves that wait for a stall.
    pub fn travel(&mut self, cmd: &MoveCommand) -> Result<(MoveOutcome, Option<Contact>), MotionFault> {
        let from = self.position;
        let target = cmd.target_from(from);
        let stop = self.config.reference_stop_mm;
        let limit = self.config.travel_limit_mm;

        if target > limit + POSITION_TOLERANCE_MM {
            return Err(MotionFault::LimitExceeded {
                position: from,
                limit,
            });
        }

        let detecting = self.stops_on_stall(cmd);

        if target < stop - POSITION_TOLERANCE_MM {
            self.position = stop;
            if detecting {
                trace!("Sim stalled on reference stop at {:.3}", stop);
                return Ok((MoveOutcome::Stalled, Some(Contact::ReferenceStop)));
            }
            return Err(MotionFault::LimitExceeded {
                position: stop,
                limit: stop,
            });
        }

        let contact = self
            .config
            .material_surface_mm
            .filter(|&surface| detecting && from < surface && target > surface);
        if let Some(surface) = contact {
            trace!("Sim stalled on material at {:.3}", surface);
            self.position = surface;
            return Ok((MoveOutcome::Stalled, Some(Contact::Material)));
        }

        self.position = target.max(stop);
        Ok((MoveOutcome::Completed, None))
    }
}
