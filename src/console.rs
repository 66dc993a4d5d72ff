//! Interactive command console.
//!
//! Every command prints a start line and a completion or failure line.
//! Motion commands run as the session's background task so that `stop` or
//! a new motion command can supersede them; their completion line is
//! printed when the task finishes. Link commands that run inline (arm,
//! disarm, gimbal) first supersede the running task and hold the session's
//! dispatch gate until they return. Errors never escape [`Console::dispatch`].

use tokio::sync::mpsc;
use tracing::debug;

use crate::command::{Command, ParseCommandError, HELP};
use crate::error::ControlError;
use crate::maneuver::gimbal::{self, GimbalOutcome};
use crate::maneuver::{Maneuver, ManeuverReport};
use crate::session::{ManeuverHandle, VehicleSession};
use crate::types::BatteryLine;

const NO_GIMBAL_GUIDANCE: &str =
    "  ✱ No gimbal API on this vehicle. Use look_left/right (yaw), or add a MAVLink gimbal/servo.";

/// Whether the read loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleFlow {
    Continue,
    Exit,
}

pub struct Console {
    session: VehicleSession,
    out: mpsc::UnboundedSender<String>,
}

impl Console {
    /// Status lines are sent to `out`; the binary prints them to stdout.
    pub fn new(session: VehicleSession, out: mpsc::UnboundedSender<String>) -> Self {
        Self { session, out }
    }

    pub fn session(&self) -> &VehicleSession {
        &self.session
    }

    fn print(&self, line: impl Into<String>) {
        let _ = self.out.send(line.into());
    }

    pub fn print_help(&self) {
        self.print(HELP);
    }

    /// Parse and run one input line.
    pub async fn dispatch(&self, line: &str) -> ConsoleFlow {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(ParseCommandError::Empty) => return ConsoleFlow::Continue,
            Err(e) => {
                self.print(e.to_string());
                return ConsoleFlow::Continue;
            }
        };
        debug!("Dispatch {:?}", command);

        if command == Command::Exit {
            self.shutdown().await;
            return ConsoleFlow::Exit;
        }
        if let Err(e) = self.run(command).await {
            self.print(format!("  ✗ {e}"));
        }
        ConsoleFlow::Continue
    }

    /// Cancel any running maneuver and leave offboard mode.
    pub async fn shutdown(&self) {
        self.print("Exiting…");
        self.session.cancel_active().await;
        self.session.stop_offboard_if_active().await;
    }

    async fn run(&self, command: Command) -> Result<(), ControlError> {
        let session = &self.session;
        match command {
            Command::Help => self.print_help(),
            Command::Status => {
                let snapshot = session.snapshot().await?;
                self.print(snapshot.to_string());
            }
            Command::Battery => {
                let battery = session.link().battery().await.map_err(ControlError::Telemetry)?;
                self.print(BatteryLine(&battery).to_string());
            }
            Command::Arm => {
                self.print("▶ Arm");
                let _gate = session.gate().await;
                session.ensure_connected().await?;
                match session.ensure_armed().await {
                    Ok(()) => self.print("  ✓ Armed"),
                    Err(ControlError::ArmRejected { reason }) => {
                        self.print(format!("  ✗ Arm failed: {reason}"))
                    }
                    Err(e) => return Err(e),
                }
            }
            Command::Disarm => {
                self.print("▶ Disarm");
                let _gate = session.gate().await;
                session.ensure_connected().await?;
                session.disarm().await?;
                self.print("  ✓ Disarmed");
            }
            Command::LookDown { degrees } => {
                self.print(format!("▶ Look down {degrees:.1}°"));
                let _gate = session.gate().await;
                let outcome = gimbal::look_down(session, degrees).await?;
                self.print_gimbal(outcome, "  ✓ Gimbal angle set", "  ✓ Gimbal rate applied");
            }
            Command::LookForward => {
                self.print("▶ Look forward (0°)");
                let _gate = session.gate().await;
                let outcome = gimbal::look_forward(session).await?;
                self.print_gimbal(
                    outcome,
                    "  ✓ Gimbal angle set to 0°",
                    "  ✓ Gimbal nudged toward 0°",
                );
            }
            command => {
                if let Some(maneuver) = command.maneuver(session.config()) {
                    self.print(self.start_line(&maneuver));
                    let handle = session.launch(maneuver).await;
                    if command == Command::Stop {
                        Self::report(self.out.clone(), handle).await;
                    } else {
                        tokio::spawn(Self::report(self.out.clone(), handle));
                    }
                }
            }
        }
        Ok(())
    }

    fn start_line(&self, maneuver: &Maneuver) -> String {
        let config = self.session.config();
        match maneuver {
            Maneuver::Translate { axis, distance_m } => {
                let speed = config.linear_speed_mps.abs().max(1e-3);
                format!(
                    "▶ Move {axis} {distance_m:.2}m for {:.2}s",
                    distance_m.max(0.0) / speed
                )
            }
            Maneuver::Takeoff { altitude_m } => format!(
                "▶ Takeoff to {:.1} m",
                altitude_m
                    .filter(|a| *a > 0.3)
                    .unwrap_or(config.default_takeoff_m)
            ),
            Maneuver::Land => "▶ Land".to_string(),
            Maneuver::ReturnToLaunch => "▶ RTL".to_string(),
            Maneuver::Hold => "▶ Stop/Hold".to_string(),
            other => {
                let label = other.label();
                let mut chars = label.chars();
                match chars.next() {
                    Some(first) => format!("▶ {}{}", first.to_uppercase(), chars.as_str()),
                    None => "▶".to_string(),
                }
            }
        }
    }

    async fn report(out: mpsc::UnboundedSender<String>, handle: ManeuverHandle) {
        let label = handle.label().to_string();
        let line = match handle.wait().await {
            Ok(ManeuverReport::Skipped { reason }) => format!("  ✱ {reason}"),
            Ok(report) => format!("  ✓ {report}"),
            Err(ControlError::Cancelled) => format!("  ✱ {label} cancelled"),
            Err(e) => format!("  ✗ {label} failed: {e}"),
        };
        let _ = out.send(line);
    }

    fn print_gimbal(&self, outcome: GimbalOutcome, angle_line: &str, rate_line: &str) {
        match outcome {
            GimbalOutcome::AngleSet => self.print(angle_line),
            GimbalOutcome::RateApplied => self.print(rate_line),
            GimbalOutcome::Unavailable => self.print(NO_GIMBAL_GUIDANCE),
        }
    }
}
