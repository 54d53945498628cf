//! Stall event delivery and dispatch.
//!
//! Driver stalls reach the controller through a single-consumer channel.
//! `StallNotifier` is the producer side handed to the motion layer;
//! `StallEventHandler` is the only consumer. Events are matched exactly on
//! (driver, board): a match goes to `AxisController::handle_stall`, anything
//! else to the `SafeStop` fallback. No event is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use tamper_common::hal::driver::MotionPort;
use tamper_common::tamper::error::TamperError;
use tamper_common::tamper::event::StallEvent;
use tracing::{debug, error, info, warn};

use crate::controller::{AxisController, StallDisposition};

/// Poll interval of `StallEventHandler::run` while checking its run flag.
const RECV_POLL: Duration = Duration::from_millis(50);

/// Producer side of the stall event channel.
#[derive(Clone)]
pub struct StallNotifier {
    tx: Sender<StallEvent>,
}

impl StallNotifier {
    /// Queue a stall notification. Returns `false` once the handler is gone.
    pub fn notify(&self, driver_id: u8, board_id: u8, description: impl Into<String>) -> bool {
        self.send(StallEvent::new(driver_id, board_id, description))
    }

    pub fn send(&self, event: StallEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(mpsc::SendError(event)) => {
                warn!("Stall handler gone, undelivered: {}", event);
                false
            }
        }
    }
}

/// Create a connected notifier/receiver pair.
pub fn stall_channel() -> (StallNotifier, Receiver<StallEvent>) {
    let (tx, rx) = mpsc::channel();
    (StallNotifier { tx }, rx)
}

/// Fallback for stall events no axis owns.
pub trait SafeStop: Send {
    fn stop(&self, event: &StallEvent);
}

impl<F> SafeStop for F
where
    F: Fn(&StallEvent) + Send,
{
    fn stop(&self, event: &StallEvent) {
        self(event)
    }
}

/// `SafeStop` that only raises an error log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSafeStop;

impl SafeStop for LogSafeStop {
    fn stop(&self, event: &StallEvent) {
        error!("Unowned stall event, machine must be stopped: {}", event);
    }
}

/// What happened to one dispatched event.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Controller accepted the event.
    Handled(StallDisposition),
    /// Controller returned an error.
    Failed(TamperError),
    /// No axis owns the event; `SafeStop` was invoked.
    SafeStopped,
}

/// Single consumer of the stall event channel.
pub struct StallEventHandler<M: MotionPort, S: SafeStop = LogSafeStop> {
    controller: Arc<AxisController<M>>,
    rx: Receiver<StallEvent>,
    safe_stop: S,
}

impl<M: MotionPort, S: SafeStop> StallEventHandler<M, S> {
    pub fn new(controller: Arc<AxisController<M>>, rx: Receiver<StallEvent>, safe_stop: S) -> Self {
        Self {
            controller,
            rx,
            safe_stop,
        }
    }

    /// Route one event.
    pub fn dispatch(&self, event: StallEvent) -> Dispatch {
        if !self.controller.identity().owns(&event) {
            self.safe_stop.stop(&event);
            return Dispatch::SafeStopped;
        }
        match self.controller.handle_stall(&event) {
            Ok(disposition) => {
                debug!("{} -> {:?}", event, disposition);
                Dispatch::Handled(disposition)
            }
            Err(e) => {
                error!("Handling {} failed: {}", event, e);
                Dispatch::Failed(e)
            }
        }
    }

    /// Wait up to `timeout` for the next event and dispatch it.
    pub fn recv_and_dispatch(&self, timeout: Duration) -> Result<Dispatch, RecvTimeoutError> {
        let event = self.rx.recv_timeout(timeout)?;
        Ok(self.dispatch(event))
    }

    /// Dispatch events until `running` is cleared or every notifier is
    /// dropped. Returns the number of events dispatched.
    pub fn run(&self, running: &AtomicBool) -> usize {
        info!("Stall event handler started for axis {}", self.controller.identity());
        let mut dispatched = 0;
        while running.load(Ordering::SeqCst) {
            match self.recv_and_dispatch(RECV_POLL) {
                Ok(_) => dispatched += 1,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        // Drain what is already queued.
        while let Ok(event) = self.rx.try_recv() {
            self.dispatch(event);
            dispatched += 1;
        }
        info!("Stall event handler stopped after {} events", dispatched);
        dispatched
    }
}
