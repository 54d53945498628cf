//! Tamper Common Library
//!
//! Shared types for the tamper axis workspace: configuration loading,
//! stall-detection parameter bundles, axis state and status, stall events,
//! the controller error taxonomy, and the `MotionPort` contract that every
//! motion backend implements.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Defaults and hardware bounds
//! - [`hal`] - `MotionPort` trait, move commands and driver parameters
//! - [`tamper`] - Tamper axis domain types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use tamper_common::prelude::*;
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
pub mod tamper;
