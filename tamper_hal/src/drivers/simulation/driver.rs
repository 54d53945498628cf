//! Simulation driver implementation.
//!
//! `SimulatedMotion` implements `MotionPort` on top of a `SimAxis`. The axis
//! state lives behind a shared lock so a `SimHandle` can inspect the journal
//! and inject faults after the driver has been handed to a controller.

use std::sync::Arc;

use parking_lot::Mutex;
use tamper_common::hal::driver::{MotionFault, MotionPort};
use tamper_common::hal::types::{DriverParam, MoveCommand, MoveOutcome};
use tamper_common::tamper::event::{AxisIdentity, StallEvent};
use tamper_common::tamper::stall::StallAction;
use tracing::{debug, info, warn};

use super::physics::{Contact, SimAxis, SimAxisConfig};
use crate::drivers::{EventSink, STALL_DESCRIPTION};

/// One entry of the simulation journal.
#[derive(Debug, Clone, PartialEq)]
pub enum SimRecord {
    /// `initialize()` was called.
    Initialized,
    /// A driver parameter was written.
    Param(DriverParam),
    /// A move finished.
    Move {
        /// Command as issued.
        command: MoveCommand,
        /// Machine position before the move [mm].
        from: f64,
        /// Machine position after the move [mm].
        to: f64,
        /// How the move ended.
        outcome: MoveOutcome,
    },
    /// A move faulted.
    Fault {
        /// Command as issued.
        command: MoveCommand,
        /// Reported fault.
        fault: MotionFault,
    },
    /// `wait_for_idle()` was called.
    WaitForIdle,
    /// `position()` was read.
    PositionRead(f64),
}

struct SimShared {
    axis: SimAxis,
    journal: Vec<SimRecord>,
    pending_fault: Option<MotionFault>,
}

/// Simulated tamper axis driver.
pub struct SimulatedMotion {
    identity: AxisIdentity,
    shared: Arc<Mutex<SimShared>>,
    sink: Option<EventSink>,
}

impl SimulatedMotion {
    /// Create a simulated axis answering as `identity`.
    pub fn new(identity: AxisIdentity, config: SimAxisConfig) -> Self {
        Self {
            identity,
            shared: Arc::new(Mutex::new(SimShared {
                axis: SimAxis::new(config),
                journal: Vec::new(),
                pending_fault: None,
            })),
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

    /// Inspection handle sharing this driver's state.
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    fn raise_stall(&self, contact: Contact, position: f64, action: StallAction) {
        match action {
            StallAction::Report => {
                info!(
                    "Stall reported on driver {}.{} at {:.3} mm ({:?})",
                    self.identity.board_id, self.identity.driver_id, position, contact
                );
            }
            StallAction::CreateEvent => {
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
        }
    }
}

impl MotionPort for SimulatedMotion {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn initialize(&mut self) -> Result<(), MotionFault> {
        let mut shared = self.shared.lock();
        info!(
            "Simulation driver ready: axis {} at {:.3} mm",
            self.identity,
            shared.axis.position()
        );
        shared.journal.push(SimRecord::Initialized);
        Ok(())
    }

    fn apply_driver_config(&mut self, param: &DriverParam) -> Result<(), MotionFault> {
        let mut shared = self.shared.lock();
        shared.axis.apply(param);
        shared.journal.push(SimRecord::Param(*param));
        Ok(())
    }

    fn move_axis(&mut self, cmd: &MoveCommand) -> Result<MoveOutcome, MotionFault> {
        let mut shared = self.shared.lock();

        if let Some(fault) = shared.pending_fault.take() {
            warn!("Injected fault on move: {}", fault);
            shared.journal.push(SimRecord::Fault {
                command: *cmd,
                fault: fault.clone(),
            });
            return Err(fault);
        }

        let from = shared.axis.position();
        let result = shared.axis.travel(cmd);
        match result {
            Ok((outcome, contact)) => {
                let to = shared.axis.position();
                let action = shared.axis.detection().map(|d| d.action);
                shared.journal.push(SimRecord::Move {
                    command: *cmd,
                    from,
                    to,
                    outcome,
                });
                drop(shared);

                debug!("Sim move {:.3} -> {:.3} mm: {:?}", from, to, outcome);
                if let (Some(contact), Some(action)) = (contact, action) {
                    self.raise_stall(contact, to, action);
                }
                Ok(outcome)
            }
            Err(fault) => {
                warn!("Sim move from {:.3} mm faulted: {}", from, fault);
                shared.journal.push(SimRecord::Fault {
                    command: *cmd,
                    fault: fault.clone(),
                });
                Err(fault)
            }
        }
    }

    fn wait_for_idle(&mut self) -> Result<(), MotionFault> {
        self.shared.lock().journal.push(SimRecord::WaitForIdle);
        Ok(())
    }

    fn position(&mut self) -> Result<f64, MotionFault> {
        let mut shared = self.shared.lock();
        let position = shared.axis.position();
        shared.journal.push(SimRecord::PositionRead(position));
        Ok(position)
    }
}

/// Cloneable view into a `SimulatedMotion`.
#[derive(Clone)]
pub struct SimHandle {
    shared: Arc<Mutex<SimShared>>,
}

impl SimHandle {
    /// Physical axis position [mm].
    pub fn position(&self) -> f64 {
        self.shared.lock().axis.position()
    }

    /// Full journal, oldest first.
    pub fn records(&self) -> Vec<SimRecord> {
        self.shared.lock().journal.clone()
    }

    /// End positions of every finished move [mm].
    pub fn move_targets(&self) -> Vec<f64> {
        self.shared
            .lock()
            .journal
            .iter()
            .filter_map(|r| match r {
                SimRecord::Move { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    /// Every driver parameter written, oldest first.
    pub fn params(&self) -> Vec<DriverParam> {
        self.shared
            .lock()
            .journal
            .iter()
            .filter_map(|r| match r {
                SimRecord::Param(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    /// Number of `wait_for_idle()` calls.
    pub fn idle_waits(&self) -> usize {
        self.shared
            .lock()
            .journal
            .iter()
            .filter(|r| matches!(r, SimRecord::WaitForIdle))
            .count()
    }

    /// Motor current last written [mA].
    pub fn motor_current_ma(&self) -> Option<u32> {
        self.shared.lock().axis.motor_current_ma()
    }

    /// Fail the next move with `fault`.
    pub fn inject_fault(&self, fault: MotionFault) {
        self.shared.lock().pending_fault = Some(fault);
    }

    pub fn set_material_surface(&self, surface_mm: Option<f64>) {
        self.shared.lock().axis.set_material_surface(surface_mm);
    }

    pub fn clear_journal(&self) {
        self.shared.lock().journal.clear();
    }
}
