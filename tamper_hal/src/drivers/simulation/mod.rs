//! Simulation driver module.
//!
//! Software tamper axis for development and testing without hardware.

mod driver;
mod physics;

pub use driver::{SimHandle, SimRecord, SimulatedMotion};
pub use physics::{ArmedDetection, Contact, SimAxis, SimAxisConfig};
