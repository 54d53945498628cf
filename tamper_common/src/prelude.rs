//! Prelude module for common re-exports.
//!
//! `use tamper_common::prelude::*;` brings in the types most consumers need
//! without listing individual paths.

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::tamper::config::{TamperConfig, TamperParameters, TampingParams};

// ─── Motion Port ────────────────────────────────────────────────────
pub use crate::hal::driver::{MotionFault, MotionPort};
pub use crate::hal::types::{DriverParam, MoveCommand, MoveMode, MoveOutcome};

// ─── Tamper Domain ──────────────────────────────────────────────────
pub use crate::tamper::error::TamperError;
pub use crate::tamper::event::{AxisIdentity, StallEvent};
pub use crate::tamper::homing::{HomingDirection, HomingParams};
pub use crate::tamper::stall::{MotorSpecs, StallAction, StallConfig, StallResponseParams};
pub use crate::tamper::state::{AxisState, ConfiguredMode, TamperStatus};
