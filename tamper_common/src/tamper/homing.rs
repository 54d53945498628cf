//! Sensorless homing parameters.
//!
//! Defines `HomingDirection` and `HomingParams`, including the
//! stall-detection bundle applied while homing.

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_HOMING_FAST_FEED_MM_MIN, DEFAULT_HOMING_SLOW_FEED_MM_MIN};
use crate::tamper::stall::{StallAction, StallConfig};

/// Homing approach direction.
///
/// Determines travel direction of the fast search and the refine approach.
/// Safety-critical: a wrong direction drives the tamper into the bed instead
/// of its reference stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum HomingDirection {
    /// Approach in +direction.
    Positive = 0,
    /// Approach in -direction.
    Negative = 1,
}

impl HomingDirection {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Positive),
            1 => Some(Self::Negative),
            _ => None,
        }
    }

    /// Returns the sign multiplier for approach direction.
    #[inline]
    pub const fn sign(&self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
        }
    }
}

impl Default for HomingDirection {
    fn default() -> Self {
        Self::Negative
    }
}

/// Motion parameters of the homing sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HomingParams {
    /// Direction toward the reference stop.
    #[serde(default)]
    pub direction: HomingDirection,
    /// Fast search feed rate [mm/min].
    #[serde(default = "default_fast_feed")]
    pub fast_feed_mm_min: f64,
    /// Back-off and refine feed rate [mm/min].
    #[serde(default = "default_slow_feed")]
    pub slow_feed_mm_min: f64,
    /// Distance to back off after the fast search stall [mm].
    #[serde(default = "default_backoff")]
    pub backoff_mm: f64,
    /// Longest fast search before homing is declared failed [mm].
    #[serde(default = "default_max_travel")]
    pub max_travel_mm: f64,
    /// Extra refine travel past the back-off distance [mm].
    #[serde(default = "default_refine_margin")]
    pub refine_margin_mm: f64,
    /// Stall bundle applied for the whole homing sequence.
    #[serde(default = "StallConfig::homing_default")]
    pub stall: StallConfig,
}

fn default_fast_feed() -> f64 {
    DEFAULT_HOMING_FAST_FEED_MM_MIN
}
fn default_slow_feed() -> f64 {
    DEFAULT_HOMING_SLOW_FEED_MM_MIN
}
fn default_backoff() -> f64 {
    3.0
}
fn default_max_travel() -> f64 {
    80.0
}
fn default_refine_margin() -> f64 {
    2.0
}

impl Default for HomingParams {
    fn default() -> Self {
        Self {
            direction: HomingDirection::default(),
            fast_feed_mm_min: default_fast_feed(),
            slow_feed_mm_min: default_slow_feed(),
            backoff_mm: default_backoff(),
            max_travel_mm: default_max_travel(),
            refine_margin_mm: default_refine_margin(),
            stall: StallConfig::homing_default(),
        }
    }
}

impl HomingParams {
    /// Travel of the slow refine approach [mm].
    #[inline]
    pub fn refine_travel_mm(&self) -> f64 {
        self.backoff_mm + self.refine_margin_mm
    }

    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("homing.fast_feed_mm_min", self.fast_feed_mm_min),
            ("homing.slow_feed_mm_min", self.slow_feed_mm_min),
            ("homing.backoff_mm", self.backoff_mm),
            ("homing.max_travel_mm", self.max_travel_mm),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} must be > 0, got {value}"));
            }
        }
        if !self.refine_margin_mm.is_finite() || self.refine_margin_mm <= 0.0 {
            return Err(format!(
                "homing.refine_margin_mm must be > 0, got {}",
                self.refine_margin_mm
            ));
        }
        if self.slow_feed_mm_min > self.fast_feed_mm_min {
            return Err(format!(
                "homing.slow_feed_mm_min ({}) exceeds fast_feed_mm_min ({})",
                self.slow_feed_mm_min, self.fast_feed_mm_min
            ));
        }
        if self.refine_travel_mm() >= self.max_travel_mm {
            return Err("homing refine travel must be shorter than max_travel_mm".to_string());
        }
        self.stall.validate("homing.stall")?;
        if self.stall.action != StallAction::Report {
            return Err("homing.stall.action must be \"report\"".to_string());
        }
        Ok(())
    }
}
