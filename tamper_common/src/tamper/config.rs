//! Top-level tamper configuration.
//!
//! One TOML file describes the whole axis. Every section is optional and
//! falls back to the stock tamper setup; a `stall` sub-table, when present,
//! must be complete.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! service_name = "tamper-cu"
//!
//! [axis]
//! driver_id = 2
//! board_id = 0
//! axis_letter = "V"
//!
//! [tamping]
//! max_depth_mm = 20.0
//!
//! [stall_response]
//! shake_count = 5
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    DEFAULT_APPROACH_FRACTION, DEFAULT_MAX_DEPTH_MM, DEFAULT_TAMP_INCREMENT_MM, DEFAULT_TAMPER_SPEED_MM_MIN,
};
use crate::tamper::event::AxisIdentity;
use crate::tamper::homing::HomingParams;
use crate::tamper::stall::{MotorSpecs, StallAction, StallConfig, StallResponseParams};
use crate::tamper::state::ConfiguredMode;

/// Tamping motion parameters and stall bundle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TampingParams {
    /// Default feed rate of the fast approach phase [mm/min].
    #[serde(default = "default_approach_speed")]
    pub approach_speed_mm_min: f64,
    /// Default feed rate of the slow final phase [mm/min].
    #[serde(default = "default_tamp_speed")]
    pub tamp_speed_mm_min: f64,
    /// Share of the remaining travel covered by the approach, in (0, 1).
    #[serde(default = "default_approach_fraction")]
    pub approach_fraction: f64,
    /// Deepest allowed tamp target [mm].
    #[serde(default = "default_max_depth")]
    pub max_depth_mm: f64,
    /// Depth added past the current position when no target is given [mm].
    #[serde(default = "default_increment")]
    pub default_increment_mm: f64,
    /// Stall bundle applied while tamping.
    #[serde(default = "StallConfig::tamping_default")]
    pub stall: StallConfig,
}

fn default_approach_speed() -> f64 {
    DEFAULT_TAMPER_SPEED_MM_MIN
}
fn default_tamp_speed() -> f64 {
    DEFAULT_TAMPER_SPEED_MM_MIN * 0.5
}
fn default_approach_fraction() -> f64 {
    DEFAULT_APPROACH_FRACTION
}
fn default_max_depth() -> f64 {
    DEFAULT_MAX_DEPTH_MM
}
fn default_increment() -> f64 {
    DEFAULT_TAMP_INCREMENT_MM
}

impl Default for TampingParams {
    fn default() -> Self {
        Self {
            approach_speed_mm_min: default_approach_speed(),
            tamp_speed_mm_min: default_tamp_speed(),
            approach_fraction: default_approach_fraction(),
            max_depth_mm: default_max_depth(),
            default_increment_mm: default_increment(),
            stall: StallConfig::tamping_default(),
        }
    }
}

impl TampingParams {
    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("tamping.approach_speed_mm_min", self.approach_speed_mm_min),
            ("tamping.tamp_speed_mm_min", self.tamp_speed_mm_min),
            ("tamping.max_depth_mm", self.max_depth_mm),
            ("tamping.default_increment_mm", self.default_increment_mm),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} must be > 0, got {value}"));
            }
        }
        if self.default_increment_mm > self.max_depth_mm {
            return Err(format!(
                "tamping.default_increment_mm {} exceeds tamping.max_depth_mm {}",
                self.default_increment_mm, self.max_depth_mm
            ));
        }
        if !(self.approach_fraction > 0.0 && self.approach_fraction < 1.0) {
            return Err(format!(
                "tamping.approach_fraction must be in (0, 1), got {}",
                self.approach_fraction
            ));
        }
        self.stall.validate("tamping.stall")?;
        if self.stall.action != StallAction::CreateEvent {
            return Err("tamping.stall.action must be \"create_event\"".to_string());
        }
        Ok(())
    }
}

/// Complete tamper axis configuration, loaded once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TamperConfig {
    /// Service-wide settings.
    #[serde(default)]
    pub shared: SharedConfig,
    /// Driver/board identity of the tamper motor.
    #[serde(default)]
    pub axis: AxisIdentity,
    /// Sensorless homing.
    #[serde(default)]
    pub homing: HomingParams,
    /// Tamping.
    #[serde(default)]
    pub tamping: TampingParams,
    /// Post-stall lift/shake/retract.
    #[serde(default)]
    pub stall_response: StallResponseParams,
    /// Motor data for the minimum stall speed.
    #[serde(default)]
    pub motor: MotorSpecs,
}

impl TamperConfig {
    /// Validate every section and the cross-section rules.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        let checks = [
            self.axis.validate(),
            self.homing.validate(),
            self.tamping.validate(),
            self.stall_response.validate(),
            self.motor.validate(),
        ];
        for check in checks {
            check.map_err(ConfigError::ValidationError)?;
        }

        if self.homing.stall.motor_current_ma > self.tamping.stall.motor_current_ma {
            return Err(ConfigError::ValidationError(format!(
                "homing current {} mA must not exceed tamping current {} mA",
                self.homing.stall.motor_current_ma, self.tamping.stall.motor_current_ma
            )));
        }
        Ok(())
    }

    /// Parameters a controller runs with, effective tamping bundle included.
    pub fn parameters(&self) -> TamperParameters {
        TamperParameters {
            identity: self.axis,
            homing: self.homing,
            tamping: self.tamping,
            tamping_stall: self.effective_tamping_stall(),
            stall_response: self.stall_response,
            motor: self.motor,
        }
    }

    /// Tamping bundle with `min_speed` raised to what the motor needs for
    /// reliable detection at the tamping current.
    pub fn effective_tamping_stall(&self) -> StallConfig {
        let stall = self.tamping.stall;
        let computed = self.motor.min_stall_speed_mm_min(stall.motor_current_ma);
        if computed > stall.min_speed_mm_min {
            debug!(
                "Raising tamping min stall speed {:.1} -> {:.1} mm/min",
                stall.min_speed_mm_min, computed
            );
            stall.with_min_speed(computed)
        } else {
            stall
        }
    }
}

/// Parameters in effect on a running controller.
///
/// Differs from the loaded `TamperConfig` only in `tamping_stall`, whose
/// `min_speed_mm_min` is raised to the motor's detection minimum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TamperParameters {
    pub identity: AxisIdentity,
    pub homing: HomingParams,
    pub tamping: TampingParams,
    /// Stall bundle actually written for tamping.
    pub tamping_stall: StallConfig,
    pub stall_response: StallResponseParams,
    pub motor: MotorSpecs,
}

impl TamperParameters {
    /// Stall bundle written for `mode`, if any.
    pub fn stall_config(&self, mode: ConfiguredMode) -> Option<StallConfig> {
        match mode {
            ConfiguredMode::None => None,
            ConfiguredMode::Homing => Some(self.homing.stall),
            ConfiguredMode::Tamping => Some(self.tamping_stall),
        }
    }
}
