//! # Tamper HAL Library
//!
//! Motion-port drivers for the tamper axis.
//!
//! Drivers implement the `MotionPort` trait defined in
//! `tamper_common::hal::driver`. The axis controller is generic over that
//! trait and never sees which backend it is talking to.
//!
//! # Module Structure
//!
//! - [`drivers`] - `MotionPort` implementations
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐      ┌──────────────────────────────────────┐
//! │  AxisController   │      │            tamper_hal                │
//! │ (control unit)    │─────►│  ┌──────────────┐  ┌──────────────┐  │
//! │                   │ Port │  │ SimulatedMot.│  │ GcodeMotion  │  │
//! └───────────────────┘      │  └──────┬───────┘  └──────┬───────┘  │
//!          ▲                 │         │ SimAxis         │ Transport│
//!          │ StallEvent      │         ▼                 ▼          │
//!          └─────────────────┤   event sink        RRF line link    │
//!                            └──────────────────────────────────────┘
//! ```

pub mod drivers;

pub use crate::drivers::gcode::{GcodeMotion, Transport};
pub use crate::drivers::{EventSink, STALL_DESCRIPTION};
pub use crate::drivers::simulation::{SimAxisConfig, SimHandle, SimRecord, SimulatedMotion};
