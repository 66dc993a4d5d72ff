//! Cancellable setpoint streaming.
//!
//! A [`StreamingTask`] owns one offboard session from entry to release:
//!
//! 1. `start_if_needed` primes a zero setpoint and enters offboard mode
//! 2. `run` emits the program's setpoint every tick until the program is
//!    satisfied, the deadline passes, or the task is cancelled
//! 3. `drain_and_release` holds zero velocity for the settle interval and
//!    leaves offboard mode
//!
//! [`StreamingTask::stream`] runs all three and always performs step 3.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use offboard_pilot_core::VelocityBodyYawspeed;

use crate::cancel::CancelToken;
use crate::config::ControllerConfig;
use crate::error::ControlError;
use crate::link::VehicleLink;
use crate::session::{ControlMode, ControlState};

/// Why a streaming run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The program reported its goal reached.
    Satisfied,
    /// The deadline passed first.
    Elapsed,
    /// Cancellation was observed at a tick boundary.
    Cancelled,
}

/// Source of setpoints for a streaming run.
#[async_trait]
pub trait SetpointProgram: Send {
    /// Setpoint for the next tick.
    fn setpoint(&self) -> VelocityBodyYawspeed;

    /// Inspect telemetry after a tick. Return `true` to stop streaming.
    async fn observe(&mut self, _link: &dyn VehicleLink) -> Result<bool, ControlError> {
        Ok(false)
    }
}

/// Streams the same setpoint until the deadline.
#[derive(Debug, Clone, Copy)]
pub struct ConstantSetpoint(pub VelocityBodyYawspeed);

#[async_trait]
impl SetpointProgram for ConstantSetpoint {
    fn setpoint(&self) -> VelocityBodyYawspeed {
        self.0
    }
}

pub struct StreamingTask<'a> {
    link: &'a dyn VehicleLink,
    control: &'a Mutex<ControlState>,
    config: &'a ControllerConfig,
    cancel: CancelToken,
}

impl<'a> StreamingTask<'a> {
    pub fn new(
        link: &'a dyn VehicleLink,
        control: &'a Mutex<ControlState>,
        config: &'a ControllerConfig,
        cancel: CancelToken,
    ) -> Self {
        Self {
            link,
            control,
            config,
            cancel,
        }
    }

    /// Enter offboard mode unless already active.
    ///
    /// The autopilot refuses offboard without a prior setpoint, so one zero
    /// setpoint is sent first.
    pub async fn start_if_needed(&self) -> Result<(), ControlError> {
        let mut control = self.control.lock().await;
        if control.mode != ControlMode::Inactive {
            return Ok(());
        }
        self.link
            .set_velocity_body(VelocityBodyYawspeed::ZERO)
            .await
            .map_err(ControlError::StreamingFailure)?;
        self.link
            .start_offboard()
            .await
            .map_err(ControlError::StreamingFailure)?;
        control.mode = ControlMode::Active;
        debug!("Offboard started");
        Ok(())
    }

    /// Emit setpoints on the tick cadence until the program is satisfied,
    /// `deadline` passes, or cancellation is observed.
    pub async fn run(
        &self,
        program: &mut dyn SetpointProgram,
        deadline: Instant,
    ) -> Result<StreamOutcome, ControlError> {
        let tick = self.config.tick();
        let mut next_tick = Instant::now();
        loop {
            if self.cancel.is_cancelled() {
                return Ok(StreamOutcome::Cancelled);
            }
            if Instant::now() >= deadline {
                return Ok(StreamOutcome::Elapsed);
            }

            self.link
                .set_velocity_body(program.setpoint())
                .await
                .map_err(ControlError::StreamingFailure)?;

            next_tick += tick;
            let now = Instant::now();
            if next_tick < now {
                next_tick = now;
            }
            if self.cancel.sleep_until(next_tick.min(deadline)).await {
                return Ok(StreamOutcome::Cancelled);
            }

            if program.observe(self.link).await? {
                return Ok(StreamOutcome::Satisfied);
            }
        }
    }

    /// Hold zero velocity for the settle interval, then leave offboard mode.
    ///
    /// Runs to completion even when cancelled. Link failures are logged and
    /// the session is marked inactive regardless.
    pub async fn drain_and_release(&self) {
        let mut control = self.control.lock().await;
        if control.mode == ControlMode::Inactive {
            return;
        }
        control.mode = ControlMode::Draining;

        let tick = self.config.tick();
        let end = Instant::now() + self.config.settle();
        let mut next_tick = Instant::now();
        while Instant::now() < end {
            if let Err(e) = self.link.set_velocity_body(VelocityBodyYawspeed::ZERO).await {
                warn!("Zero setpoint failed during settle: {}", e);
            }
            next_tick += tick;
            tokio::time::sleep_until(next_tick.min(end)).await;
        }

        if let Err(e) = self.link.stop_offboard().await {
            warn!("Offboard stop failed: {}", e);
        }
        control.mode = ControlMode::Inactive;
        debug!("Offboard released");
    }

    /// Start, run for at most `duration`, then drain and release.
    ///
    /// The duration is measured from the moment offboard mode is active.
    pub async fn stream(
        &self,
        program: &mut dyn SetpointProgram,
        duration: Duration,
    ) -> Result<StreamOutcome, ControlError> {
        let outcome = match self.start_if_needed().await {
            Ok(()) => self.run(program, Instant::now() + duration).await,
            Err(e) => Err(e),
        };
        self.drain_and_release().await;
        outcome
    }
}
