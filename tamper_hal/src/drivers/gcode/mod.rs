//! RepRapFirmware G-code driver module.
//!
//! Drives the tamper axis through a Duet-class controller: stallGuard
//! parameters via `M915`, motor current and dynamics via `M906`/`M201`/
//! `M566`, stall-terminated moves via `G1 H1`.

pub mod commands;
mod driver;

pub use driver::{GcodeMotion, Transport};
