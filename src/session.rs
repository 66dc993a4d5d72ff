//! Vehicle session guard and task dispatch.
//!
//! [`VehicleSession`] is the single owner of the link, the offboard state
//! and the active background task. Cloning it yields another handle to the
//! same session.
//!
//! # Task model
//!
//! At most one maneuver runs at a time. [`VehicleSession::launch`] holds the
//! dispatch gate while it cancels the previous task, waits for that task to
//! finish its settle-and-release, and only then spawns the new one. Two
//! maneuvers therefore never stream setpoints concurrently. Inline commands
//! (arm, disarm, gimbal) take the same gate through
//! [`VehicleSession::gate`], so nothing else reaches the link while they run.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cancel::{CancelSource, CancelToken};
use crate::config::ControllerConfig;
use crate::error::ControlError;
use crate::link::VehicleLink;
use crate::maneuver::{Maneuver, ManeuverReport};
use crate::streaming::StreamingTask;
use crate::types::{Attitude, Position, VehicleSnapshot};

const READY_POLL: Duration = Duration::from_millis(100);

/// Offboard streaming state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    #[default]
    Inactive,
    Active,
    /// Holding zero velocity before release.
    Draining,
}

#[derive(Debug, Default)]
pub struct ControlState {
    pub mode: ControlMode,
}

struct ActiveTask {
    label: String,
    cancel: CancelSource,
    handle: JoinHandle<()>,
}

struct Inner {
    link: Arc<dyn VehicleLink>,
    config: ControllerConfig,
    control: Mutex<ControlState>,
    active: Mutex<Option<ActiveTask>>,
    ready: Mutex<bool>,
}

/// Exclusive use of the link. No task runs and none can be launched until
/// the gate is dropped.
pub struct DispatchGate<'a> {
    active: MutexGuard<'a, Option<ActiveTask>>,
}

/// Handle to a launched maneuver.
pub struct ManeuverHandle {
    label: String,
    rx: oneshot::Receiver<Result<ManeuverReport, ControlError>>,
}

impl ManeuverHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Wait for the maneuver to finish. A task that was aborted before it
    /// could report yields [`ControlError::Cancelled`].
    pub async fn wait(self) -> Result<ManeuverReport, ControlError> {
        self.rx.await.unwrap_or(Err(ControlError::Cancelled))
    }
}

#[derive(Clone)]
pub struct VehicleSession {
    inner: Arc<Inner>,
}

impl VehicleSession {
    pub fn new(link: Arc<dyn VehicleLink>, config: ControllerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                link,
                config,
                control: Mutex::new(ControlState::default()),
                active: Mutex::new(None),
                ready: Mutex::new(false),
            }),
        }
    }

    pub fn link(&self) -> &dyn VehicleLink {
        self.inner.link.as_ref()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// Connect and wait for discovery and sensor calibration health.
    ///
    /// Idempotent: once ready, later calls return immediately.
    pub async fn ensure_connected(&self) -> Result<(), ControlError> {
        let mut ready = self.inner.ready.lock().await;
        if *ready {
            return Ok(());
        }

        let link = self.link();
        info!("Connecting ({} link)", link.link_type());
        link.connect()
            .await
            .map_err(|e| ControlError::Connection(e.to_string()))?;

        let deadline = Instant::now() + self.config().connect_timeout();
        while !link.is_connected() {
            if Instant::now() >= deadline {
                return Err(ControlError::Connection(
                    "vehicle not discovered".to_string(),
                ));
            }
            tokio::time::sleep(READY_POLL).await;
        }
        info!("Vehicle discovered");

        loop {
            match link.health().await {
                Ok(health) if health.is_baseline_ok() => break,
                Ok(_) => debug!("Waiting for sensor calibration"),
                Err(e) => debug!("Health unavailable: {}", e),
            }
            if Instant::now() >= deadline {
                return Err(ControlError::Connection(
                    "sensor calibration not reported healthy".to_string(),
                ));
            }
            tokio::time::sleep(READY_POLL).await;
        }
        info!("Vehicle ready");
        *ready = true;
        Ok(())
    }

    /// Arm unless already armed. A rejection is returned without retry.
    pub async fn ensure_armed(&self) -> Result<(), ControlError> {
        let armed = self.link().armed().await.map_err(ControlError::Telemetry)?;
        if armed {
            return Ok(());
        }
        info!("Arming");
        self.link()
            .arm()
            .await
            .map_err(|e| ControlError::ArmRejected {
                reason: e.action_result(),
            })?;
        info!("Armed");
        Ok(())
    }

    pub async fn disarm(&self) -> Result<(), ControlError> {
        self.link()
            .disarm()
            .await
            .map_err(|e| ControlError::action("disarm", e))
    }

    pub async fn position(&self) -> Result<Position, ControlError> {
        self.link().position().await.map_err(ControlError::Telemetry)
    }

    pub async fn attitude(&self) -> Result<Attitude, ControlError> {
        self.link().attitude().await.map_err(ControlError::Telemetry)
    }

    /// Fresh read of every telemetry value.
    pub async fn snapshot(&self) -> Result<VehicleSnapshot, ControlError> {
        let link = self.link();
        Ok(VehicleSnapshot {
            position: self.position().await?,
            attitude: self.attitude().await?,
            armed: link.armed().await.map_err(ControlError::Telemetry)?,
            in_air: link.in_air().await.map_err(ControlError::Telemetry)?,
            battery: link.battery().await.map_err(ControlError::Telemetry)?,
            gps: link.gps_info().await.map_err(ControlError::Telemetry)?,
            flight_mode: link.flight_mode().await.map_err(ControlError::Telemetry)?,
        })
    }

    /// Streaming task bound to this session's offboard state.
    pub fn streaming(&self, cancel: CancelToken) -> StreamingTask<'_> {
        StreamingTask::new(
            self.link(),
            &self.inner.control,
            self.config(),
            cancel,
        )
    }

    pub async fn offboard_mode(&self) -> ControlMode {
        self.inner.control.lock().await.mode
    }

    /// Leave offboard mode without a settle hold.
    pub async fn stop_offboard_if_active(&self) {
        let mut control = self.inner.control.lock().await;
        if control.mode == ControlMode::Inactive {
            return;
        }
        if let Err(e) = self.link().stop_offboard().await {
            warn!("Offboard stop failed: {}", e);
        }
        control.mode = ControlMode::Inactive;
    }

    /// Start `maneuver` in the background, cancelling and awaiting any
    /// active task first.
    pub async fn launch(&self, maneuver: Maneuver) -> ManeuverHandle {
        let mut gate = self.gate().await;

        let label = maneuver.label();
        let cancel = CancelSource::new();
        let token = cancel.token();
        let (tx, rx) = oneshot::channel();
        let session = self.clone();
        let handle = tokio::spawn(async move {
            let result = maneuver.execute(&session, &token).await;
            let _ = tx.send(result);
        });

        *gate.active = Some(ActiveTask {
            label: label.clone(),
            cancel,
            handle,
        });
        ManeuverHandle { label, rx }
    }

    /// Cancel and await the active task, then hold the dispatch gate.
    pub async fn gate(&self) -> DispatchGate<'_> {
        let mut active = self.inner.active.lock().await;
        if let Some(previous) = active.take() {
            Self::stop_task(previous).await;
        }
        DispatchGate { active }
    }

    /// Launch and wait for completion.
    pub async fn execute(&self, maneuver: Maneuver) -> Result<ManeuverReport, ControlError> {
        self.launch(maneuver).await.wait().await
    }

    /// Cancel the active task and wait for it to unwind, including its
    /// settle-and-release. Returns `true` if a task was still running.
    pub async fn cancel_active(&self) -> bool {
        let mut active = self.inner.active.lock().await;
        match active.take() {
            Some(task) => {
                let running = !task.handle.is_finished();
                Self::stop_task(task).await;
                running
            }
            None => false,
        }
    }

    /// Whether a launched task is still running.
    pub async fn is_busy(&self) -> bool {
        self.inner
            .active
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    async fn stop_task(task: ActiveTask) {
        if !task.handle.is_finished() {
            info!("Cancelling {}", task.label);
        }
        task.cancel.cancel();
        if let Err(e) = task.handle.await {
            warn!("{} ended abnormally: {}", task.label, e);
        }
    }
}
