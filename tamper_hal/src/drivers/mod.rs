//! Motion-port implementations.
//!
//! - [`simulation`] - Software axis for development and testing
//! - [`gcode`] - RepRapFirmware over a line-oriented transport
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `MotionPort` trait from `tamper_common::hal::driver`
//! 3. Re-export the driver type from `lib.rs`

pub mod gcode;
pub mod simulation;

use tamper_common::tamper::event::StallEvent;

/// Description carried by stall events raised by the drivers.
pub const STALL_DESCRIPTION: &str = "driver-stall";

/// Receiver of stall events raised with the `CreateEvent` action.
pub type EventSink = Box<dyn Fn(StallEvent) + Send>;
