//! Tamper axis controller.
//!
//! `AxisController` owns the axis state machine and the motion port. All
//! operations take `&self` so one controller can be shared between the
//! caller issuing `home`/`tamp` and the stall event handler thread.
//!
//! # State Machine
//!
//! ```text
//!   Unhomed ──home──► Homing ──ok──► Idle ◄──────────────┐
//!      ▲                │              │                  │
//!      └──── failure ───┘            tamp                 │
//!                                      ▼                  │
//!                                   Tamping ─ depth ──────┤
//!                                      │                  │
//!                                 stall event             │
//!                                      ▼                  │
//!                              StallRecovering ─ done ────┘
//! ```
//!
//! # Locking
//!
//! Two locks, never nested in the opposite order:
//! - the operation lock around `AxisPort`, held for a whole operation
//! - the status lock, held only to read or publish a `TamperStatus`
//!
//! `home` and `tamp` only `try_lock` the operation lock and fail with
//! `AxisBusy`. `handle_stall` blocks on it, which is the join on the
//! in-flight tamp.

mod homing;
mod tamping;

pub use tamping::TampOutcome;

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tamper_common::hal::driver::MotionPort;
use tamper_common::tamper::config::{TamperConfig, TamperParameters};
use tamper_common::tamper::error::TamperError;
use tamper_common::tamper::event::{AxisIdentity, StallEvent};
use tamper_common::tamper::state::{AxisState, ConfiguredMode, TamperStatus};
use tracing::{debug, error, info, warn};

use crate::axis_port::AxisPort;
use crate::recovery::RecoveryPlan;
use tamping::TampRequest;

/// Result of `handle_stall` for an event it accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StallDisposition {
    /// Event names another driver.
    NotThisAxis,
    /// Matching event with no tamp waiting for it.
    Ignored,
    /// Recovery ran to completion from `base_position_mm`.
    Recovered { base_position_mm: f64 },
}

/// Controller for one tamper axis.
pub struct AxisController<M: MotionPort> {
    params: TamperParameters,
    axis: Mutex<AxisPort<M>>,
    status: Mutex<TamperStatus>,
    settled: Condvar,
}

impl<M: MotionPort> AxisController<M> {
    /// Validate `config`, initialize `port` and start Unhomed.
    ///
    /// # Errors
    ///
    /// `ConfigInvalid` for a rejected configuration, `MotionFault` when the
    /// port fails to initialize.
    pub fn new(config: &TamperConfig, port: M) -> Result<Self, TamperError> {
        config.validate()?;

        let mut axis = AxisPort::new(port);
        axis.initialize()?;

        let params = config.parameters();
        info!(
            "Tamper axis {} on '{}': max depth {:.1} mm, stall min speed {:.1} mm/min",
            params.identity,
            axis.port().name(),
            params.tamping.max_depth_mm,
            params.tamping_stall.min_speed_mm_min
        );

        Ok(Self {
            params,
            axis: Mutex::new(axis),
            status: Mutex::new(TamperStatus::default()),
            settled: Condvar::new(),
        })
    }

    #[inline]
    pub fn identity(&self) -> AxisIdentity {
        self.params.identity
    }

    /// Homing, tamping, stall-response and motor parameters in effect.
    pub fn parameters(&self) -> &TamperParameters {
        &self.params
    }

    /// Snapshot of the axis status. Never waits on motion.
    pub fn status(&self) -> TamperStatus {
        *self.status.lock()
    }

    #[inline]
    fn state(&self) -> AxisState {
        self.status.lock().state
    }

    fn set_state(&self, state: AxisState) {
        self.status.lock().state = state;
        self.settled.notify_all();
    }

    /// Publish `state` together with what the port currently knows.
    fn publish(&self, axis: &AxisPort<M>, state: AxisState) {
        {
            let mut status = self.status.lock();
            status.state = state;
            status.current_position_mm = axis.position();
            status.configured_mode = axis.active_mode();
        }
        self.settled.notify_all();
    }

    /// Block until the axis is Idle or Unhomed, or `timeout` elapses.
    ///
    /// Returns the settled status, or `None` on timeout.
    pub fn wait_settled(&self, timeout: Duration) -> Option<TamperStatus> {
        let deadline = Instant::now() + timeout;
        let mut status = self.status.lock();
        while !status.state.is_settled() {
            if self.settled.wait_until(&mut status, deadline).timed_out() {
                return status.state.is_settled().then_some(*status);
            }
        }
        Some(*status)
    }

    // ─── Homing ─────────────────────────────────────────────────────

    /// Sensorless homing. Allowed from Unhomed and Idle.
    ///
    /// Ends Idle at logical position 0, or Unhomed on any failure.
    pub fn home(&self) -> Result<(), TamperError> {
        let Some(mut axis) = self.axis.try_lock() else {
            return Err(TamperError::AxisBusy(self.state()));
        };
        let state = self.state();
        if !matches!(state, AxisState::Unhomed | AxisState::Idle) {
            return Err(TamperError::AxisBusy(state));
        }

        info!("Homing axis {} ({:?})", self.params.identity, self.params.homing.direction);
        self.set_state(AxisState::Homing);

        match homing::run_homing(&mut axis, &self.params.homing, &self.params.tamping_stall) {
            Ok(()) => {
                self.publish(&axis, AxisState::Idle);
                info!("Axis {} homed", self.params.identity);
                Ok(())
            }
            Err(e) => {
                error!("Homing failed: {}", e);
                self.publish(&axis, AxisState::Unhomed);
                Err(e)
            }
        }
    }

    // ─── Tamping ────────────────────────────────────────────────────

    /// Tamp to `target_depth_mm` with explicit approach and final speeds.
    ///
    /// A stall in either phase is the normal way a tamp ends in material:
    /// the call returns `TampOutcome::Stalled` and the axis stays Tamping
    /// until the stall event is handled.
    pub fn tamp(
        &self,
        target_depth_mm: f64,
        approach_speed_mm_min: f64,
        tamp_speed_mm_min: f64,
    ) -> Result<TampOutcome, TamperError> {
        let Some(mut axis) = self.axis.try_lock() else {
            return Err(TamperError::AxisBusy(self.state()));
        };
        match self.state() {
            AxisState::Idle => {}
            AxisState::Unhomed => return Err(TamperError::NotHomed),
            other => return Err(TamperError::AxisBusy(other)),
        }

        let request = TampRequest {
            target_mm: target_depth_mm,
            approach_speed_mm_min,
            tamp_speed_mm_min,
            approach_fraction: self.params.tamping.approach_fraction,
        };
        request.validate(self.params.tamping.max_depth_mm)?;

        if tamp_speed_mm_min < self.params.tamping_stall.min_speed_mm_min {
            warn!(
                "Tamp speed {:.0} mm/min below stall detection minimum {:.0} mm/min, stalls may go unnoticed",
                tamp_speed_mm_min, self.params.tamping_stall.min_speed_mm_min
            );
        }

        info!("Tamping to {:.3} mm", target_depth_mm);
        self.set_state(AxisState::Tamping);

        match tamping::run_tamp(&mut axis, &request, &self.params.tamping_stall) {
            Ok(TampOutcome::DepthReached) => {
                self.publish(&axis, AxisState::Idle);
                debug!("Depth {:.3} mm reached", target_depth_mm);
                Ok(TampOutcome::DepthReached)
            }
            Ok(TampOutcome::Stalled) => {
                self.publish(&axis, AxisState::Tamping);
                info!("Tamp stopped by stall, awaiting stall event");
                Ok(TampOutcome::Stalled)
            }
            Err(fault) => {
                error!("Tamp faulted, axis must be re-homed: {}", fault);
                self.publish(&axis, AxisState::Unhomed);
                Err(fault.into())
            }
        }
    }

    /// Tamp with the configured approach and final speeds.
    pub fn tamp_default(&self, target_depth_mm: f64) -> Result<TampOutcome, TamperError> {
        self.tamp(
            target_depth_mm,
            self.params.tamping.approach_speed_mm_min,
            self.params.tamping.tamp_speed_mm_min,
        )
    }

    /// Tamp `tamping.default_increment_mm` past the current position.
    ///
    /// Fails with `DepthOutOfRange` when that passes `max_depth_mm`.
    pub fn tamp_increment(&self) -> Result<TampOutcome, TamperError> {
        let target = self.status().current_position_mm + self.params.tamping.default_increment_mm;
        self.tamp_default(target)
    }

    // ─── Stall Handling ─────────────────────────────────────────────

    /// React to a driver stall notification.
    ///
    /// Only a matching event while Tamping does anything: it joins the
    /// in-flight tamp, drains the port, reads the stall position once and
    /// runs the recovery sequence.
    pub fn handle_stall(&self, event: &StallEvent) -> Result<StallDisposition, TamperError> {
        if !self.params.identity.owns(event) {
            debug!("Ignoring {} (axis {})", event, self.params.identity);
            return Ok(StallDisposition::NotThisAxis);
        }

        let state = self.state();
        if state != AxisState::Tamping {
            return match self.axis.try_lock() {
                Some(_) => {
                    debug!("Stall event in {} ignored", state);
                    Ok(StallDisposition::Ignored)
                }
                None => Err(TamperError::AxisBusy(state)),
            };
        }

        // Blocks until the tamp that produced this stall has returned.
        let mut axis = self.axis.lock();
        let state = self.state();
        if state != AxisState::Tamping {
            debug!("Stall event resolved to {} after join, ignored", state);
            return Ok(StallDisposition::Ignored);
        }

        info!("Handling {}", event);
        self.set_state(AxisState::StallRecovering);

        match self.recover(&mut axis) {
            Ok(base) => {
                {
                    let mut status = self.status.lock();
                    status.state = AxisState::Idle;
                    status.current_position_mm = axis.position();
                    status.configured_mode = axis.active_mode();
                    status.last_stall_detected_at = Some(base);
                }
                self.settled.notify_all();
                info!("Stall at {:.3} mm recovered", base);
                Ok(StallDisposition::Recovered {
                    base_position_mm: base,
                })
            }
            Err(e) => {
                error!("Stall recovery failed, axis must be re-homed: {}", e);
                self.publish(&axis, AxisState::Unhomed);
                Err(e)
            }
        }
    }

    fn recover(&self, axis: &mut AxisPort<M>) -> Result<f64, TamperError> {
        let mut armed = axis.ensure_config(ConfiguredMode::Tamping, &self.params.tamping_stall)?;
        armed.wait_for_idle()?;
        let base = armed.read_position()?;
        {
            let mut status = self.status.lock();
            status.current_position_mm = base;
        }

        let plan = RecoveryPlan::new(base, &self.params.stall_response);
        plan.execute(&mut armed)?;
        Ok(base)
    }
}
