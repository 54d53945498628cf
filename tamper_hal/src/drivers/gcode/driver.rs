//! G-code motion driver.
//!
//! `GcodeMotion` speaks the RepRapFirmware dialect over any line-oriented
//! `Transport` (serial, USB, network shell). Each call sends complete
//! commands and waits for the firmware's reply before returning.
//!
//! The firmware's stall event is not observed directly. A stall-terminated
//! move that ends short of its target is a stall, and with `CreateEvent`
//! armed the driver raises the `StallEvent` itself.

use tamper_common::consts::POSITION_TOLERANCE_MM;
use tamper_common::hal::driver::{MotionFault, MotionPort};
use tamper_common::hal::types::{DriverParam, MoveCommand, MoveMode, MoveOutcome};
use tamper_common::tamper::event::{AxisIdentity, StallEvent};
use tamper_common::tamper::stall::{MotorSpecs, StallAction};
use tracing::{debug, info, trace, warn};

use super::commands;
use crate::drivers::{EventSink, STALL_DESCRIPTION};

/// Line-oriented link to the motion firmware.
///
/// `send` transmits one command and returns the firmware's reply text.
pub trait Transport: Send {
    /// Send `line` and block for its reply.
    fn send(&mut self, line: &str) -> Result<String, MotionFault>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, line: &str) -> Result<String, MotionFault> {
        (**self).send(line)
    }
}

/// RepRapFirmware motion driver.
pub struct GcodeMotion<T: Transport> {
    transport: T,
    identity: AxisIdentity,
    full_steps_per_mm: f64,
    stealth_chop: bool,
    /// Action of the last accepted `M915`.
    armed_action: Option<StallAction>,
    sink: Option<EventSink>,
}

impl<T: Transport> GcodeMotion<T> {
    pub fn new(transport: T, identity: AxisIdentity, motor: &MotorSpecs) -> Self {
        Self {
            transport,
            identity,
            full_steps_per_mm: motor.full_steps_per_mm(),
            stealth_chop: true,
            armed_action: None,
            sink: None,
        }
    }

    /// Deliver `CreateEvent` stalls to `sink`.
    pub fn with_event_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(StallEvent) + Send + 'static,
    {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Skip the `M569 D3` driver-mode write in `initialize()`.
    pub fn without_stealth_chop(mut self) -> Self {
        self.stealth_chop = false;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn exchange(&mut self, line: &str) -> Result<String, MotionFault> {
        trace!("gcode >> {}", line);
        let reply = self.transport.send(line)?;
        trace!("gcode << {}", reply.trim_end());
        if reply.trim_start().starts_with("Error") {
            return Err(MotionFault::Rejected(format!("{line}: {}", reply.trim())));
        }
        Ok(reply)
    }

    fn raise_stall(&self, position: f64) {
        match self.armed_action {
            Some(StallAction::CreateEvent) => {
                let event = StallEvent::new(
                    self.identity.driver_id,
                    self.identity.board_id,
                    STALL_DESCRIPTION,
                )
                .at_position(position);
                match &self.sink {
                    Some(sink) => {
                        debug!("Raising {}", event);
                        sink(event);
                    }
                    None => warn!("Stall event dropped, no event sink: {}", event),
                }
            }
            Some(StallAction::Report) => info!(
                "Stall reported on driver {}.{} at {:.3} mm",
                self.identity.board_id, self.identity.driver_id, position
            ),
            None => {}
        }
    }

    fn read_position(&mut self) -> Result<f64, MotionFault> {
        let reply = self.exchange(commands::REPORT_POSITION)?;
        commands::parse_position(&reply, self.identity.axis_letter).ok_or_else(|| {
            MotionFault::Rejected(format!(
                "no {} position in M114 reply '{}'",
                self.identity.axis_letter,
                reply.trim()
            ))
        })
    }
}

impl<T: Transport> MotionPort for GcodeMotion<T> {
    fn name(&self) -> &'static str {
        "gcode"
    }

    fn initialize(&mut self) -> Result<(), MotionFault> {
        if self.stealth_chop {
            let line = commands::stealth_chop(&self.identity);
            self.exchange(&line)?;
        }
        self.exchange(commands::ABSOLUTE_MODE)?;
        info!("G-code driver ready for axis {}", self.identity);
        Ok(())
    }

    fn apply_driver_config(&mut self, param: &DriverParam) -> Result<(), MotionFault> {
        let lines = commands::render_param(self.identity.axis_letter, param, self.full_steps_per_mm);
        if let DriverParam::StallDetection { .. } = param {
            self.armed_action = None;
        }
        for line in &lines {
            self.exchange(line)?;
        }
        if let DriverParam::StallDetection { action, .. } = param {
            self.armed_action = Some(*action);
        }
        Ok(())
    }

    fn move_axis(&mut self, cmd: &MoveCommand) -> Result<MoveOutcome, MotionFault> {
        let axis = self.identity.axis_letter;

        // The stall check compares against an absolute target.
        let target = match (cmd.mode, cmd.wait_for_stall) {
            (_, false) => None,
            (MoveMode::Absolute, true) => Some(cmd.value),
            (MoveMode::Relative, true) => Some(self.read_position()? + cmd.value),
        };

        let line = commands::linear_move(axis, cmd.value, cmd.feed_rate_mm_min, cmd.wait_for_stall);
        match cmd.mode {
            MoveMode::Relative => {
                self.exchange(commands::RELATIVE_MODE)?;
                let sent = self.exchange(&line);
                self.exchange(commands::ABSOLUTE_MODE)?;
                sent?;
            }
            MoveMode::Absolute => {
                self.exchange(commands::ABSOLUTE_MODE)?;
                self.exchange(&line)?;
            }
        }

        let Some(target) = target else {
            return Ok(MoveOutcome::Completed);
        };

        self.exchange(commands::WAIT_FOR_MOVES)?;
        let reached = self.read_position()?;
        if (reached - target).abs() > POSITION_TOLERANCE_MM {
            debug!(
                "Stall-terminated move stopped at {:.3} mm (target {:.3} mm)",
                reached, target
            );
            self.raise_stall(reached);
            Ok(MoveOutcome::Stalled)
        } else {
            Ok(MoveOutcome::Completed)
        }
    }

    fn wait_for_idle(&mut self) -> Result<(), MotionFault> {
        self.exchange(commands::WAIT_FOR_MOVES).map(|_| ())
    }

    fn position(&mut self) -> Result<f64, MotionFault> {
        self.read_position()
    }
}
