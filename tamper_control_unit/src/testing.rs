//! Scripted motion port for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use parking_lot::Mutex;
use tamper_common::hal::driver::{MotionFault, MotionPort};
use tamper_common::hal::types::{DriverParam, MoveCommand, MoveOutcome};

#[derive(Default)]
struct MockState {
    position: f64,
    params: Vec<DriverParam>,
    moves: Vec<MoveCommand>,
    targets: Vec<f64>,
    idle_waits: usize,
    position_reads: usize,
    stalls: VecDeque<f64>,
    param_budget: Option<usize>,
    move_fault: Option<MotionFault>,
    gate: Option<(Sender<()>, Receiver<()>)>,
}

/// Port half, handed to the code under test.
pub struct MockPort {
    state: Arc<Mutex<MockState>>,
}

/// Inspection half, kept by the test.
#[derive(Clone)]
pub struct MockLog {
    state: Arc<Mutex<MockState>>,
}

/// Test side of a gated move.
pub struct MoveGate {
    pub entered: Receiver<()>,
    pub release: Sender<()>,
}

impl MockPort {
    pub fn new() -> (Self, MockLog) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockLog { state },
        )
    }
}

impl MotionPort for MockPort {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn apply_driver_config(&mut self, param: &DriverParam) -> Result<(), MotionFault> {
        let mut state = self.state.lock();
        match &mut state.param_budget {
            Some(0) => return Err(MotionFault::Rejected("M906".to_string())),
            Some(n) => *n -= 1,
            None => {}
        }
        state.params.push(*param);
        Ok(())
    }

    fn move_axis(&mut self, cmd: &MoveCommand) -> Result<MoveOutcome, MotionFault> {
        let gate = self.state.lock().gate.take();
        if let Some((entered, release)) = gate {
            let _ = entered.send(());
            let _ = release.recv();
        }

        let mut state = self.state.lock();
        if let Some(fault) = state.move_fault.take() {
            return Err(fault);
        }
        state.moves.push(*cmd);
        let stall = if cmd.wait_for_stall {
            state.stalls.pop_front()
        } else {
            None
        };
        let (position, outcome) = match stall {
            Some(at) => (at, MoveOutcome::Stalled),
            None => (cmd.target_from(state.position), MoveOutcome::Completed),
        };
        state.position = position;
        state.targets.push(position);
        Ok(outcome)
    }

    fn wait_for_idle(&mut self) -> Result<(), MotionFault> {
        self.state.lock().idle_waits += 1;
        Ok(())
    }

    fn position(&mut self) -> Result<f64, MotionFault> {
        let mut state = self.state.lock();
        state.position_reads += 1;
        Ok(state.position)
    }
}

impl MockLog {
    pub fn position(&self) -> f64 {
        self.state.lock().position
    }

    pub fn set_position(&self, position: f64) {
        self.state.lock().position = position;
    }

    /// The next stall-waiting move stops at `position`.
    pub fn stall_at(&self, position: f64) {
        self.state.lock().stalls.push_back(position);
    }

    /// Allow `n` more parameter writes, then reject.
    pub fn fail_param_writes_after(&self, n: usize) {
        self.state.lock().param_budget = Some(n);
    }

    pub fn fail_next_move(&self, fault: MotionFault) {
        self.state.lock().move_fault = Some(fault);
    }

    /// Hold the next move until the test releases it.
    pub fn gate_next_move(&self) -> MoveGate {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        self.state.lock().gate = Some((entered_tx, release_rx));
        MoveGate {
            entered: entered_rx,
            release: release_tx,
        }
    }

    pub fn params(&self) -> Vec<DriverParam> {
        self.state.lock().params.clone()
    }

    pub fn moves(&self) -> Vec<MoveCommand> {
        self.state.lock().moves.clone()
    }

    /// Machine position at the end of each move.
    pub fn targets(&self) -> Vec<f64> {
        self.state.lock().targets.clone()
    }

    pub fn idle_waits(&self) -> usize {
        self.state.lock().idle_waits
    }

    pub fn position_reads(&self) -> usize {
        self.state.lock().position_reads
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.params.clear();
        state.moves.clear();
        state.targets.clear();
        state.idle_waits = 0;
        state.position_reads = 0;
    }
}
