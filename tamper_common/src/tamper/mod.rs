//! Tamper axis domain types.
//!
//! Everything the controller, the motion drivers and the CLI agree on:
//! state enums, stall-detection bundles, homing and tamping parameters,
//! stall events, the error taxonomy, and the top-level configuration.

pub mod config;
pub mod error;
pub mod event;
pub mod homing;
pub mod stall;
pub mod state;
