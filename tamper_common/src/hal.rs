//! Motion-layer contract.
//!
//! This module defines the boundary between the axis controller and
//! whatever executes moves on the real machine (or a simulation of it).

pub mod driver;
pub mod types;
