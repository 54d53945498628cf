//! Motion port ownership and stall-config switching.
//!
//! `AxisPort` owns the `MotionPort`, the logical origin and the tracked
//! logical position. Moves are only reachable through an `ArmedPort`, which
//! exists only after all three driver writes of a stall bundle succeeded.

use tamper_common::hal::driver::{MotionFault, MotionPort};
use tamper_common::hal::types::{MoveCommand, MoveOutcome};
use tamper_common::tamper::stall::StallConfig;
use tamper_common::tamper::state::ConfiguredMode;
use tracing::{debug, trace};

/// Exclusive owner of the tamper motion port.
pub struct AxisPort<M: MotionPort> {
    port: M,
    active: ConfiguredMode,
    /// Machine coordinate of logical zero.
    origin: f64,
    /// Logical position after the last completed move or read.
    position: f64,
}

impl<M: MotionPort> AxisPort<M> {
    pub fn new(port: M) -> Self {
        Self {
            port,
            active: ConfiguredMode::None,
            origin: 0.0,
            position: 0.0,
        }
    }

    pub fn initialize(&mut self) -> Result<(), MotionFault> {
        debug!("Initializing motion port '{}'", self.port.name());
        self.port.initialize()
    }

    /// Stall bundle fully applied to the driver.
    #[inline]
    pub fn active_mode(&self) -> ConfiguredMode {
        self.active
    }

    /// Tracked logical position [mm].
    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn port(&self) -> &M {
        &self.port
    }

    fn write_config(&mut self, mode: ConfiguredMode, stall: &StallConfig) -> Result<(), MotionFault> {
        // Cleared first so a failed write never leaves a mode recorded.
        self.active = ConfiguredMode::None;
        for param in stall.driver_params() {
            trace!("Driver write {:?}", param);
            self.port.apply_driver_config(&param)?;
        }
        self.active = mode;
        debug!(
            "Applied {:?} stall config: threshold={} current={} mA min_speed={:.1} mm/min",
            mode, stall.threshold, stall.motor_current_ma, stall.min_speed_mm_min
        );
        Ok(())
    }

    /// Write detection, current and dynamics for `mode`, in that order.
    pub fn apply_config(
        &mut self,
        mode: ConfiguredMode,
        stall: &StallConfig,
    ) -> Result<ArmedPort<'_, M>, MotionFault> {
        self.write_config(mode, stall)?;
        Ok(ArmedPort { inner: self })
    }

    /// Like `apply_config`, but skips the writes when `mode` is already
    /// active.
    pub fn ensure_config(
        &mut self,
        mode: ConfiguredMode,
        stall: &StallConfig,
    ) -> Result<ArmedPort<'_, M>, MotionFault> {
        if self.active == mode {
            trace!("{:?} stall config already active", mode);
        } else {
            self.write_config(mode, stall)?;
        }
        Ok(ArmedPort { inner: self })
    }
}

/// Motion access under a fully applied stall bundle.
pub struct ArmedPort<'a, M: MotionPort> {
    inner: &'a mut AxisPort<M>,
}

impl<M: MotionPort> ArmedPort<'_, M> {
    /// Tracked logical position [mm].
    #[inline]
    pub fn position(&self) -> f64 {
        self.inner.position
    }

    /// Relative move. The tracked position follows only completed moves.
    pub fn move_relative(
        &mut self,
        displacement: f64,
        feed_rate_mm_min: f64,
        wait_for_stall: bool,
    ) -> Result<MoveOutcome, MotionFault> {
        let cmd = MoveCommand::relative(displacement, feed_rate_mm_min, wait_for_stall);
        let outcome = self.inner.port.move_axis(&cmd)?;
        if outcome == MoveOutcome::Completed {
            self.inner.position += displacement;
        }
        Ok(outcome)
    }

    /// Absolute move to a logical target.
    pub fn move_to(
        &mut self,
        target: f64,
        feed_rate_mm_min: f64,
        wait_for_stall: bool,
    ) -> Result<MoveOutcome, MotionFault> {
        let cmd = MoveCommand::absolute(self.inner.origin + target, feed_rate_mm_min, wait_for_stall);
        let outcome = self.inner.port.move_axis(&cmd)?;
        if outcome == MoveOutcome::Completed {
            self.inner.position = target;
        }
        Ok(outcome)
    }

    pub fn wait_for_idle(&mut self) -> Result<(), MotionFault> {
        self.inner.port.wait_for_idle()
    }

    /// Absolute position read; resynchronizes the tracked position.
    pub fn read_position(&mut self) -> Result<f64, MotionFault> {
        let machine = self.inner.port.position()?;
        self.inner.position = machine - self.inner.origin;
        Ok(self.inner.position)
    }

    /// Make the current physical position logical zero. Returns it in
    /// machine coordinates.
    pub fn define_origin(&mut self) -> Result<f64, MotionFault> {
        let machine = self.inner.port.position()?;
        self.inner.origin = machine;
        self.inner.position = 0.0;
        Ok(machine)
    }
}
