//! Stall-detection parameter bundles.
//!
//! A [`StallConfig`] is everything the driver needs to know before a class of
//! moves: detection sensitivity, what to do on a stall, run current and
//! dynamics. The homing and tamping regimes each own one instance; the
//! controller switches between them as a unit.

use serde::{Deserialize, Serialize};

use crate::consts::{MIN_STALL_SPEED_FLOOR_STEPS_S, STALL_THRESHOLD_MAX, STALL_THRESHOLD_MIN};
use crate::hal::types::DriverParam;

/// Firmware reaction to a detected stall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum StallAction {
    /// Report the stall to the move in progress (terminates `G1 H1` moves).
    Report = 1,
    /// Raise an asynchronous driver-stall event.
    CreateEvent = 2,
}

impl StallAction {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Report),
            2 => Some(Self::CreateEvent),
            _ => None,
        }
    }

    /// Firmware `R` parameter value.
    #[inline]
    pub const fn code(&self) -> u8 {
        *self as u8
    }
}

/// Atomically-applied stall detection and motion parameter bundle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StallConfig {
    /// Detection threshold in [-64, 63]; lower is more sensitive.
    pub threshold: i8,
    /// Filter the stall signal.
    pub filtered: bool,
    /// Minimum speed for reliable detection [mm/min].
    pub min_speed_mm_min: f64,
    /// Reaction on stall.
    pub action: StallAction,
    /// Motor run current [mA].
    pub motor_current_ma: u32,
    /// Acceleration [mm/s²].
    pub acceleration_mm_s2: f64,
    /// Jerk [mm/s].
    pub jerk_mm_s: f64,
}

impl StallConfig {
    /// Stock sensorless-homing bundle: report only, reduced current.
    pub const fn homing_default() -> Self {
        Self {
            threshold: 3,
            filtered: true,
            min_speed_mm_min: 0.0,
            action: StallAction::Report,
            motor_current_ma: 800,
            acceleration_mm_s2: 1000.0,
            jerk_mm_s: 5.0,
        }
    }

    /// Stock tamping bundle: raise an event, full current.
    pub const fn tamping_default() -> Self {
        Self {
            threshold: 3,
            filtered: true,
            min_speed_mm_min: 480.0,
            action: StallAction::CreateEvent,
            motor_current_ma: 1000,
            acceleration_mm_s2: 500.0,
            jerk_mm_s: 5.0,
        }
    }

    /// Copy with a different minimum detection speed.
    pub const fn with_min_speed(mut self, min_speed_mm_min: f64) -> Self {
        self.min_speed_mm_min = min_speed_mm_min;
        self
    }

    /// The three driver writes that make this bundle active, in the order
    /// they must be applied.
    pub fn driver_params(&self) -> [DriverParam; 3] {
        [
            DriverParam::StallDetection {
                threshold: self.threshold,
                filtered: self.filtered,
                min_speed_mm_min: self.min_speed_mm_min,
                action: self.action,
            },
            DriverParam::MotorCurrent {
                milliamps: self.motor_current_ma,
            },
            DriverParam::Dynamics {
                acceleration_mm_s2: self.acceleration_mm_s2,
                jerk_mm_s: self.jerk_mm_s,
            },
        ]
    }

    /// Range checks. `name` prefixes the error message.
    pub fn validate(&self, name: &str) -> Result<(), String> {
        if !(STALL_THRESHOLD_MIN..=STALL_THRESHOLD_MAX).contains(&self.threshold) {
            return Err(format!(
                "{name}.threshold {} outside [{STALL_THRESHOLD_MIN}, {STALL_THRESHOLD_MAX}]",
                self.threshold
            ));
        }
        if !self.min_speed_mm_min.is_finite() || self.min_speed_mm_min < 0.0 {
            return Err(format!(
                "{name}.min_speed_mm_min must be >= 0, got {}",
                self.min_speed_mm_min
            ));
        }
        if self.motor_current_ma == 0 {
            return Err(format!("{name}.motor_current_ma must be > 0"));
        }
        if !self.acceleration_mm_s2.is_finite() || self.acceleration_mm_s2 <= 0.0 {
            return Err(format!(
                "{name}.acceleration_mm_s2 must be > 0, got {}",
                self.acceleration_mm_s2
            ));
        }
        if !self.jerk_mm_s.is_finite() || self.jerk_mm_s <= 0.0 {
            return Err(format!("{name}.jerk_mm_s must be > 0, got {}", self.jerk_mm_s));
        }
        Ok(())
    }
}

/// Motion pattern run after a tamping stall.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StallResponseParams {
    /// Amplitude of each shake [mm].
    #[serde(default = "default_shake_distance")]
    pub shake_distance_mm: f64,
    /// Number of shake cycles.
    #[serde(default = "default_shake_count")]
    pub shake_count: u32,
    /// Lift above the stall position before shaking [mm].
    #[serde(default = "default_lift")]
    pub lift_mm: f64,
    /// Feed rate for every recovery move [mm/min].
    #[serde(default = "default_response_feed")]
    pub feed_rate_mm_min: f64,
}

fn default_shake_distance() -> f64 {
    0.2
}
fn default_shake_count() -> u32 {
    5
}
fn default_lift() -> f64 {
    5.0
}
fn default_response_feed() -> f64 {
    500.0
}

impl Default for StallResponseParams {
    fn default() -> Self {
        Self {
            shake_distance_mm: default_shake_distance(),
            shake_count: default_shake_count(),
            lift_mm: default_lift(),
            feed_rate_mm_min: default_response_feed(),
        }
    }
}

impl StallResponseParams {
    /// Number of moves the recovery sequence issues.
    #[inline]
    pub const fn move_count(&self) -> usize {
        2 * self.shake_count as usize + 2
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.shake_distance_mm.is_finite() || self.shake_distance_mm < 0.0 {
            return Err(format!(
                "stall_response.shake_distance_mm must be >= 0, got {}",
                self.shake_distance_mm
            ));
        }
        if !self.lift_mm.is_finite() || self.lift_mm < 0.0 {
            return Err(format!("stall_response.lift_mm must be >= 0, got {}", self.lift_mm));
        }
        if !self.feed_rate_mm_min.is_finite() || self.feed_rate_mm_min <= 0.0 {
            return Err(format!(
                "stall_response.feed_rate_mm_min must be > 0, got {}",
                self.feed_rate_mm_min
            ));
        }
        Ok(())
    }
}

/// Stepper motor and drivetrain data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MotorSpecs {
    /// Full steps per revolution (200 for a 1.8° motor).
    #[serde(default = "default_full_steps")]
    pub full_steps_per_rev: u32,
    /// Rated phase current [mA].
    #[serde(default = "default_rated_current")]
    pub rated_current_ma: u32,
    /// Rated holding torque [Nm].
    #[serde(default = "default_holding_torque")]
    pub rated_holding_torque_nm: f64,
    /// Linear travel per motor revolution [mm].
    #[serde(default = "default_travel_per_rev")]
    pub travel_per_rev_mm: f64,
}

fn default_full_steps() -> u32 {
    200
}
fn default_rated_current() -> u32 {
    1500
}
fn default_holding_torque() -> f64 {
    0.4
}
fn default_travel_per_rev() -> f64 {
    8.0
}

impl Default for MotorSpecs {
    fn default() -> Self {
        Self {
            full_steps_per_rev: default_full_steps(),
            rated_current_ma: default_rated_current(),
            rated_holding_torque_nm: default_holding_torque(),
            travel_per_rev_mm: default_travel_per_rev(),
        }
    }
}

impl MotorSpecs {
    /// Full steps per millimetre of axis travel.
    #[inline]
    pub fn full_steps_per_mm(&self) -> f64 {
        self.full_steps_per_rev as f64 / self.travel_per_rev_mm
    }

    /// Minimum speed for reliable stall detection [full steps/s].
    ///
    /// `H = fspr · I_rated · I_actual / (√2 · π · T_hold)`, truncated to whole
    /// steps and never below 200 full steps/s.
    pub fn min_stall_speed_steps_s(&self, actual_current_ma: u32) -> f64 {
        let rated_a = self.rated_current_ma as f64 / 1000.0;
        let actual_a = actual_current_ma as f64 / 1000.0;
        let h = self.full_steps_per_rev as f64 * rated_a * actual_a
            / (std::f64::consts::SQRT_2 * std::f64::consts::PI * self.rated_holding_torque_nm);
        h.floor().max(MIN_STALL_SPEED_FLOOR_STEPS_S)
    }

    /// [`min_stall_speed_steps_s`](Self::min_stall_speed_steps_s) in mm/min.
    pub fn min_stall_speed_mm_min(&self, actual_current_ma: u32) -> f64 {
        self.min_stall_speed_steps_s(actual_current_ma) / self.full_steps_per_mm() * 60.0
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.full_steps_per_rev == 0 {
            return Err("motor.full_steps_per_rev must be > 0".to_string());
        }
        if self.rated_current_ma == 0 {
            return Err("motor.rated_current_ma must be > 0".to_string());
        }
        if !self.rated_holding_torque_nm.is_finite() || self.rated_holding_torque_nm <= 0.0 {
            return Err(format!(
                "motor.rated_holding_torque_nm must be > 0, got {}",
                self.rated_holding_torque_nm
            ));
        }
        if !self.travel_per_rev_mm.is_finite() || self.travel_per_rev_mm <= 0.0 {
            return Err(format!(
                "motor.travel_per_rev_mm must be > 0, got {}",
                self.travel_per_rev_mm
            ));
        }
        Ok(())
    }
}
