mod common;

use std::time::Duration;

use tokio::sync::mpsc;

use common::{session_with, LinkCall, MockBehavior};
use offboard_pilot::link::CapabilitySupport;
use offboard_pilot::{Console, ConsoleFlow, ControlMode};

fn console_with(
    behavior: MockBehavior,
) -> (
    std::sync::Arc<common::RecordingLink>,
    Console,
    mpsc::UnboundedReceiver<String>,
) {
    let (link, session) = session_with(behavior);
    let (tx, rx) = mpsc::unbounded_channel();
    (link, Console::new(session, tx), rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }
    lines
}

#[tokio::test(start_paused = true)]
async fn motion_prints_start_then_completion() {
    let (_link, console, mut rx) = console_with(MockBehavior::default());

    assert_eq!(console.dispatch("forward 2").await, ConsoleFlow::Continue);
    assert_eq!(drain(&mut rx), vec!["▶ Move forward 2.00m for 2.00s"]);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(drain(&mut rx), vec!["  ✓ Move done"]);
}

#[tokio::test(start_paused = true)]
async fn stop_supersedes_running_motion() {
    let (link, console, mut rx) = console_with(MockBehavior::default());

    console.dispatch("yaw_left 180").await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    console.dispatch("stop").await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    let lines = drain(&mut rx);
    assert_eq!(lines[0], "▶ Yaw CCW 180.0°");
    assert!(lines.contains(&"▶ Stop/Hold".to_string()));
    assert!(lines.contains(&"  ✓ Holding".to_string()));
    assert!(lines.iter().any(|l| l.contains("cancelled")));
    assert_eq!(link.calls().last(), Some(&LinkCall::StopOffboard));
    assert_eq!(console.session().offboard_mode().await, ControlMode::Inactive);
}

#[tokio::test(start_paused = true)]
async fn bad_input_reports_and_keeps_session() {
    let (_link, console, mut rx) = console_with(MockBehavior::default());

    console.dispatch("").await;
    console.dispatch("jump").await;
    console.dispatch("forward x").await;
    console.dispatch("orbit").await;
    assert_eq!(
        drain(&mut rx),
        vec![
            "Unknown command. Type 'help'.",
            "Invalid arguments. Type 'help' for usage.",
            "Usage: orbit <radius_m> [ccw|cw] [speed_mps] [return]",
        ]
    );

    console.dispatch("forward 0").await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    let lines = drain(&mut rx);
    assert_eq!(lines[1], "  ✱ Distance must be > 0.");
}

#[tokio::test(start_paused = true)]
async fn arm_rejection_prints_failure_line() {
    let (link, console, mut rx) = console_with(MockBehavior {
        reject_arm: true,
        ..Default::default()
    });
    link.set_armed(false);

    console.dispatch("arm").await;
    assert_eq!(
        drain(&mut rx),
        vec!["▶ Arm", "  ✗ Arm failed: Command denied"]
    );
}

#[tokio::test(start_paused = true)]
async fn gimbal_falls_back_to_rate_then_guidance() {
    let (link, console, mut rx) = console_with(MockBehavior {
        gimbal_rate: CapabilitySupport::Supported,
        ..Default::default()
    });

    console.dispatch("look_down 30").await;
    assert_eq!(
        drain(&mut rx),
        vec!["▶ Look down 30.0°", "  ✓ Gimbal rate applied"]
    );
    let rates: Vec<_> = link
        .calls()
        .into_iter()
        .filter(|c| matches!(c, LinkCall::GimbalRate { .. }))
        .collect();
    assert_eq!(
        rates,
        vec![
            LinkCall::GimbalRate {
                pitch_rate_deg_s: -60.0
            },
            LinkCall::GimbalRate {
                pitch_rate_deg_s: 0.0
            },
        ]
    );

    let (_link, console, mut rx) = console_with(MockBehavior::default());
    console.dispatch("look_forward").await;
    let lines = drain(&mut rx);
    assert_eq!(lines[0], "▶ Look forward (0°)");
    assert!(lines[1].contains("No gimbal API"));
}

#[tokio::test(start_paused = true)]
async fn exit_cancels_and_releases() {
    let (link, console, mut rx) = console_with(MockBehavior::default());

    console.dispatch("backward 10").await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(console.dispatch("exit").await, ConsoleFlow::Exit);

    assert!(drain(&mut rx).contains(&"Exiting…".to_string()));
    assert_eq!(link.calls().last(), Some(&LinkCall::StopOffboard));
    assert!(!console.session().is_busy().await);
}

#[tokio::test(start_paused = true)]
async fn status_and_battery_print_summaries() {
    let (_link, console, mut rx) = console_with(MockBehavior::default());

    console.dispatch("battery").await;
    console.dispatch("status").await;
    let lines = drain(&mut rx);
    assert_eq!(lines[0], "Battery: 87% (15.9 V)");
    assert!(lines[1].starts_with("---- STATUS ----"));
}

#[tokio::test(start_paused = true)]
async fn oversized_gimbal_sweep_fails_without_ending_session() {
    let (link, console, mut rx) = console_with(MockBehavior {
        gimbal_rate: CapabilitySupport::Supported,
        ..Default::default()
    });

    assert_eq!(console.dispatch("look_down inf").await, ConsoleFlow::Continue);
    assert_eq!(
        drain(&mut rx),
        vec!["Invalid arguments. Type 'help' for usage."]
    );

    assert_eq!(console.dispatch("look_down 1e300").await, ConsoleFlow::Continue);
    let lines = drain(&mut rx);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("▶ Look down"));
    assert_eq!(lines[1], "  ✗ Gimbal sweep out of range");
    assert!(!link
        .calls()
        .iter()
        .any(|c| matches!(c, LinkCall::GimbalRate { .. })));

    console.dispatch("battery").await;
    assert_eq!(drain(&mut rx), vec!["Battery: 87% (15.9 V)"]);
}

#[tokio::test(start_paused = true)]
async fn unschedulable_motion_fails_before_streaming() {
    let (link, console, mut rx) = console_with(MockBehavior::default());

    console.dispatch("forward inf").await;
    console.dispatch("yaw_left nan").await;
    console.dispatch("goto nan 0").await;
    assert_eq!(
        drain(&mut rx),
        vec!["Invalid arguments. Type 'help' for usage."; 3]
    );

    for line in ["forward 1e300", "turn_cw 1e300", "orbit 1e300"] {
        console.dispatch(line).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        let lines = drain(&mut rx);
        assert_eq!(lines.len(), 2, "{line}: {lines:?}");
        assert!(lines[1].starts_with("  ✗ "), "{line}: {}", lines[1]);
        assert!(lines[1].ends_with("duration out of range"), "{line}: {}", lines[1]);
    }

    assert!(link.calls().iter().all(|c| matches!(c, LinkCall::Connect)));
}

#[tokio::test(start_paused = true)]
async fn disarm_waits_for_running_motion_to_release() {
    let (link, console, mut rx) = console_with(MockBehavior::default());

    console.dispatch("forward 10").await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    console.dispatch("disarm").await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    let calls = link.calls();
    let disarm = calls
        .iter()
        .position(|c| *c == LinkCall::Disarm)
        .expect("disarm sent");
    assert_eq!(calls[disarm - 1], LinkCall::StopOffboard);
    assert!(!calls[disarm..]
        .iter()
        .any(|c| matches!(c, LinkCall::Setpoint(_))));
    assert!(calls[..disarm]
        .iter()
        .any(|c| matches!(c, LinkCall::Setpoint(_))));

    let lines = drain(&mut rx);
    assert!(lines.contains(&"▶ Disarm".to_string()));
    assert!(lines.contains(&"  ✓ Disarmed".to_string()));
    assert!(lines.iter().any(|l| l.contains("cancelled")));
    assert!(!console.session().is_busy().await);
    assert_eq!(console.session().offboard_mode().await, ControlMode::Inactive);
}
