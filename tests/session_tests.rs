mod common;

use common::{session_with, LinkCall, MockBehavior, HOME_ABS_M};
use offboard_pilot::{ControlError, ControlMode, Maneuver, ManeuverReport};
use offboard_pilot_core::{ActionResult, GeoFix};

#[tokio::test(start_paused = true)]
async fn ensure_connected_is_idempotent() {
    let (link, session) = session_with(MockBehavior::default());

    session.ensure_connected().await.unwrap();
    session.ensure_connected().await.unwrap();

    let connects = link
        .calls()
        .into_iter()
        .filter(|c| *c == LinkCall::Connect)
        .count();
    assert_eq!(connects, 1);
}

#[tokio::test(start_paused = true)]
async fn ensure_armed_skips_when_already_armed() {
    let (link, session) = session_with(MockBehavior::default());
    session.ensure_armed().await.unwrap();
    assert!(!link.calls().contains(&LinkCall::Arm));

    link.set_armed(false);
    session.ensure_armed().await.unwrap();
    session.ensure_armed().await.unwrap();
    let arms = link.calls().into_iter().filter(|c| *c == LinkCall::Arm).count();
    assert_eq!(arms, 1);
}

#[tokio::test(start_paused = true)]
async fn arm_rejection_carries_reason_without_retry() {
    let (link, session) = session_with(MockBehavior {
        reject_arm: true,
        ..Default::default()
    });
    link.set_armed(false);

    let err = session.ensure_armed().await.unwrap_err();
    assert!(matches!(
        err,
        ControlError::ArmRejected {
            reason: ActionResult::CommandDenied
        }
    ));
    let arms = link.calls().into_iter().filter(|c| *c == LinkCall::Arm).count();
    assert_eq!(arms, 1);
}

#[tokio::test(start_paused = true)]
async fn goto_defaults_altitude_and_heading() {
    let (link, session) = session_with(MockBehavior::default());

    let report = session
        .execute(Maneuver::Goto {
            lat_deg: 47.4,
            lon_deg: 8.55,
            abs_alt_m: None,
        })
        .await
        .unwrap();

    let expected = GeoFix::new(47.4, 8.55, HOME_ABS_M);
    assert_eq!(report, ManeuverReport::Enroute { target: expected });
    assert!(link.calls().contains(&LinkCall::Goto {
        target: expected,
        yaw_deg: 0.0
    }));
    assert!(link.setpoints().is_empty());
}

#[tokio::test(start_paused = true)]
async fn goto_with_non_finite_target_is_refused() {
    let (link, session) = session_with(MockBehavior::default());

    for (lat_deg, abs_alt_m) in [(f64::NAN, None), (47.4, Some(f64::INFINITY))] {
        let err = session
            .execute(Maneuver::Goto {
                lat_deg,
                lon_deg: 0.0,
                abs_alt_m,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::OutOfRange(_)), "{err}");
    }
    assert!(link.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn goto_during_motion_cancels_and_releases_first() {
    let (link, session) = session_with(MockBehavior::default());

    let moving = session
        .launch(Maneuver::Translate {
            axis: offboard_pilot_core::BodyAxis::Left,
            distance_m: 20.0,
        })
        .await;
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    session
        .execute(Maneuver::Goto {
            lat_deg: 47.4,
            lon_deg: 8.55,
            abs_alt_m: Some(510.0),
        })
        .await
        .unwrap();
    assert!(matches!(moving.wait().await, Err(ControlError::Cancelled)));

    let calls = link.calls();
    let stop = calls
        .iter()
        .position(|c| *c == LinkCall::StopOffboard)
        .unwrap();
    let goto = calls
        .iter()
        .position(|c| matches!(c, LinkCall::Goto { .. }))
        .unwrap();
    assert!(stop < goto);
    assert_eq!(session.offboard_mode().await, ControlMode::Inactive);
}

#[tokio::test(start_paused = true)]
async fn takeoff_arms_and_uses_default_altitude() {
    let (link, session) = session_with(MockBehavior::default());
    link.set_armed(false);

    let report = session
        .execute(Maneuver::Takeoff { altitude_m: Some(0.1) })
        .await
        .unwrap();
    assert_eq!(
        report,
        ManeuverReport::Takeoff {
            altitude_m: 3.0,
            reached: true
        }
    );
    let calls = link.calls();
    let arm = calls.iter().position(|c| *c == LinkCall::Arm).unwrap();
    let alt = calls
        .iter()
        .position(|c| *c == LinkCall::SetTakeoffAltitude(3.0))
        .unwrap();
    let takeoff = calls.iter().position(|c| *c == LinkCall::Takeoff).unwrap();
    assert!(arm < alt && alt < takeoff);
}

#[tokio::test(start_paused = true)]
async fn land_waits_for_touchdown_then_disarms() {
    let (link, session) = session_with(MockBehavior::default());

    let report = session.execute(Maneuver::Land).await.unwrap();
    assert_eq!(
        report,
        ManeuverReport::Landed {
            touched_down: true,
            disarmed: true
        }
    );
    let calls = link.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[LinkCall::Land, LinkCall::Disarm]
    );
}

#[tokio::test(start_paused = true)]
async fn stop_with_nothing_running_is_a_noop_hold() {
    let (link, session) = session_with(MockBehavior::default());

    assert!(!session.cancel_active().await);
    let report = session.execute(Maneuver::Hold).await.unwrap();
    assert_eq!(report, ManeuverReport::Holding);
    assert!(link.setpoints().is_empty());
    assert!(!session.is_busy().await);
}

#[tokio::test(start_paused = true)]
async fn snapshot_reads_every_value() {
    let (_link, session) = session_with(MockBehavior::default());

    let snapshot = session.snapshot().await.unwrap();
    assert!(snapshot.armed);
    assert!(snapshot.in_air);
    assert_eq!(snapshot.gps.num_satellites, 12);
    let text = snapshot.to_string();
    assert!(text.starts_with("---- STATUS ----"));
    assert!(text.contains("Battery: 87% (15.9 V)"));
}
