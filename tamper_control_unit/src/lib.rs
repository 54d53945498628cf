//! # Tamper Control Unit
//!
//! Drives one tamper axis on a `MotionPort`: sensorless homing, two-phase
//! stall-terminated tamping and the lift/shake/retract recovery that
//! follows a tamping stall.
//!
//! # Module Structure
//!
//! - [`axis_port`] - Port ownership, stall-config switching, logical positions
//! - [`controller`] - `AxisController` state machine
//! - [`recovery`] - Post-stall `RecoveryPlan`
//! - [`stall_handler`] - Stall event channel and dispatch
//!
//! # Threads
//!
//! ```text
//!   caller ──home/tamp──► AxisController ◄──handle_stall── StallEventHandler
//!                              │                                  ▲
//!                              ▼                                  │
//!                         MotionPort ──stall── StallNotifier ─────┘
//! ```

pub mod axis_port;
pub mod controller;
pub mod recovery;
pub mod stall_handler;

#[cfg(test)]
mod testing;

pub use crate::controller::{AxisController, StallDisposition, TampOutcome};
pub use crate::stall_handler::{
    Dispatch, LogSafeStop, SafeStop, StallEventHandler, StallNotifier, stall_channel,
};
