//! Defaults and hardware bounds for the tamper axis.
//!
//! Default values reproduce the stock tamper tool setup (TMC2209 driver on a
//! 1.8° stepper, lead-screw tamper).

// ─── Stall Detection Bounds ─────────────────────────────────────────

/// Lowest stall threshold accepted by the driver (most sensitive).
pub const STALL_THRESHOLD_MIN: i8 = -64;
/// Highest stall threshold accepted by the driver (least sensitive).
pub const STALL_THRESHOLD_MAX: i8 = 63;

/// Floor for the computed minimum stall-detection speed [full steps/s].
pub const MIN_STALL_SPEED_FLOOR_STEPS_S: f64 = 200.0;

// ─── Axis Identity ──────────────────────────────────────────────────

/// Default driver number of the tamper motor.
pub const DEFAULT_DRIVER_ID: u8 = 2;
/// Default expansion board address (0 = main board).
pub const DEFAULT_BOARD_ID: u8 = 0;
/// Default G-code axis letter of the tamper.
pub const DEFAULT_AXIS_LETTER: char = 'V';

// ─── Motion Defaults ────────────────────────────────────────────────

/// Tamper feed rate for approach moves [mm/min].
pub const DEFAULT_TAMPER_SPEED_MM_MIN: f64 = 1000.0;
/// Share of the remaining travel covered by the fast approach phase.
pub const DEFAULT_APPROACH_FRACTION: f64 = 0.9;
/// Maximum tamping depth from the homed origin [mm].
pub const DEFAULT_MAX_DEPTH_MM: f64 = 50.0;
/// Depth added by a tamp without an explicit target [mm].
pub const DEFAULT_TAMP_INCREMENT_MM: f64 = 5.0;

/// Fast homing search feed rate [mm/min].
pub const DEFAULT_HOMING_FAST_FEED_MM_MIN: f64 = 2000.0;
/// Slow homing refine feed rate [mm/min].
pub const DEFAULT_HOMING_SLOW_FEED_MM_MIN: f64 = 600.0;

/// Tolerance used when comparing commanded and reported positions [mm].
pub const POSITION_TOLERANCE_MM: f64 = 0.01;
