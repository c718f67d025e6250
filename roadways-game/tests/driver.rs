#![cfg(feature = "async")]

use std::time::Duration;

use roadways_game::{
    ActionOutcome, DriverError, IgnoreReason, Snapshot, TripDriver, TripMachine, TripPhase,
};
use tokio::sync::watch;

async fn wait_for_phase(rx: &mut watch::Receiver<Snapshot>, phase: TripPhase) -> Snapshot {
    tokio::time::timeout(Duration::from_secs(120), rx.wait_for(|snap| snap.phase == phase))
        .await
        .expect("phase reached before timeout")
        .expect("driver alive")
        .clone()
}

#[tokio::test(start_paused = true)]
async fn clock_ticks_and_first_event_arrives_after_delay() {
    let driver = TripDriver::spawn(TripMachine::with_seed(11));
    let handle = driver.handle();
    let mut rx = handle.subscribe();

    tokio::time::sleep(Duration::from_secs(14)).await;
    let early = handle.snapshot();
    assert_eq!(early.phase, TripPhase::Driving);
    assert_eq!(early.state.elapsed_minutes, 1);

    let snap = wait_for_phase(&mut rx, TripPhase::EventPending).await;
    assert!(snap.state.active_event.is_some());
    assert_eq!(
        handle.accelerate().await.unwrap(),
        ActionOutcome::Ignored(IgnoreReason::EventPending)
    );
    assert!(handle.choose(0).await.unwrap().is_applied());
    assert_eq!(handle.snapshot().phase, TripPhase::Driving);

    let machine = driver.shutdown().await.unwrap();
    assert_eq!(machine.state().events_seen, 1);
}

#[tokio::test(start_paused = true)]
async fn restart_discards_the_old_trigger() {
    let driver = TripDriver::spawn(TripMachine::with_seed(12));
    let handle = driver.handle();
    let mut rx = handle.subscribe();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(handle.restart().await.unwrap().is_applied());

    tokio::time::sleep(Duration::from_secs(11)).await;
    let after_stale = handle.snapshot();
    assert_eq!(after_stale.epoch, 1);
    assert_eq!(after_stale.phase, TripPhase::Driving);

    let snap = wait_for_phase(&mut rx, TripPhase::EventPending).await;
    assert_eq!(snap.epoch, 1);
    assert_eq!(snap.state.events_seen, 1);

    driver.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn terminal_trip_stops_ticking() {
    let mut machine = TripMachine::with_seed(13);
    machine.with_state_mut(|state| state.fuel = 0.5);
    let driver = TripDriver::spawn(machine);
    let handle = driver.handle();
    let mut rx = handle.subscribe();

    let lost = wait_for_phase(&mut rx, TripPhase::Lost).await;
    assert_eq!(lost.state.elapsed_minutes, 1);
    assert!(!lost.state.driving_enabled);

    tokio::time::sleep(Duration::from_secs(60)).await;
    let later = handle.snapshot();
    assert_eq!(later.state.elapsed_minutes, 1);
    assert_eq!(later.phase, TripPhase::Lost);
    assert_eq!(
        handle.accelerate().await.unwrap(),
        ActionOutcome::Ignored(IgnoreReason::Terminal)
    );

    driver.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn handle_reports_closed_after_shutdown() {
    let driver = TripDriver::spawn(TripMachine::with_seed(14));
    let handle = driver.handle();
    assert!(handle.brake().await.unwrap().is_applied());
    let machine = driver.shutdown().await.unwrap();
    assert!((machine.state().speed - 50.0).abs() < f32::EPSILON);
    assert!(matches!(handle.accelerate().await, Err(DriverError::Closed)));
}
