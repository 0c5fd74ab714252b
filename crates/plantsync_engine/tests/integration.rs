//! Integration tests for the sync engine against scripted and HTTP devices.

use plantsync_client::{ClientError, ErrorKind, ReqwestClient};
use plantsync_engine::{
    CommandOutcome, CommandResult, EngineError, EnginePhase, PollOutcome, SyncConfig, SyncEngine,
};
use plantsync_protocol::{Command, CommandKind, ProtocolError, MAX_MOISTURE_LEVEL};
use plantsync_testkit::{
    reading_strategy, reading_with_desired_moisture, reading_with_pump_duration, sample_reading,
    FakeDeviceServer, Method, MockDevice, MockResponse,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

const INTERVAL: Duration = Duration::from_secs(10);

fn engine_with(device: &Arc<MockDevice>, config: SyncConfig) -> SyncEngine<Arc<MockDevice>> {
    SyncEngine::new(config, Arc::clone(device)).unwrap()
}

fn engine(device: &Arc<MockDevice>) -> SyncEngine<Arc<MockDevice>> {
    engine_with(
        device,
        SyncConfig::new("http://device.test").with_poll_interval(INTERVAL),
    )
}

/// Yields to other tasks until `condition` holds. Never advances a paused
/// clock.
async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

// ============================================================================
// Polling
// ============================================================================

#[tokio::test]
async fn poll_publishes_exact_snapshot() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);

    assert_eq!(engine.poll_once().await, Ok(PollOutcome::Applied));

    let state = engine.state();
    let snapshot = state.snapshot.clone().unwrap();
    let expected = sample_reading()
        .into_snapshot(snapshot.observed_at, None)
        .unwrap();
    assert_eq!(snapshot, expected);
    assert_eq!(snapshot.temperature, 21.5);
    assert_eq!(snapshot.air_humidity, 60.0);
    assert_eq!(snapshot.soil_moisture, 1200);
    assert_eq!(snapshot.light_level, 300);
    assert_eq!(snapshot.desired_moisture, 1500);
    assert!(snapshot.auto_watering_enabled);
    assert_eq!(snapshot.full_date.as_deref(), Some("2024-01-01T00:00:00"));
    assert!(state.last_error.is_none());
    assert!(!state.loading);
    assert!(!engine.is_stale());
}

#[tokio::test]
async fn http_error_without_prior_snapshot() {
    let device = Arc::new(MockDevice::new());
    device.enqueue(Method::Get, "/data", MockResponse::status(500));
    let engine = engine(&device);

    assert_eq!(
        engine.poll_once().await,
        Err(EngineError::Client(ClientError::Http { status: 500 }))
    );

    let state = engine.state();
    assert!(state.snapshot.is_none());
    assert_eq!(state.last_error.unwrap().kind, ErrorKind::Http(500));
}

#[tokio::test]
async fn failed_poll_keeps_last_snapshot() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);
    engine.poll_once().await.unwrap();
    let before = engine.state().snapshot;

    device.enqueue(Method::Get, "/data", MockResponse::status(500));
    assert!(engine.poll_once().await.is_err());
    let state = engine.state();
    assert_eq!(state.snapshot, before);
    assert_eq!(state.last_error.as_ref().unwrap().kind, ErrorKind::Http(500));

    device.enqueue(Method::Get, "/data", MockResponse::body(200, ""));
    assert_eq!(
        engine.poll_once().await,
        Err(EngineError::Client(ClientError::EmptyBody))
    );
    assert_eq!(engine.state().snapshot, before);

    device.enqueue(Method::Get, "/data", MockResponse::transport("connection reset"));
    assert!(engine.poll_once().await.is_err());
    assert_eq!(
        engine.state().last_error.unwrap().kind,
        ErrorKind::Transport
    );

    // The next success clears the error.
    assert_eq!(engine.poll_once().await, Ok(PollOutcome::Applied));
    assert!(engine.state().last_error.is_none());
}

#[tokio::test]
async fn out_of_order_poll_is_dropped() {
    let device = Arc::new(MockDevice::new());
    let mut first = device.enqueue_gated(
        Method::Get,
        "/data",
        MockResponse::json(&reading_with_desired_moisture(100)),
    );
    device.enqueue(
        Method::Get,
        "/data",
        MockResponse::json(&reading_with_desired_moisture(200)),
    );
    let engine = engine(&device);

    let poller = engine.clone();
    let slow = tokio::spawn(async move { poller.poll_once().await });
    first.wait_started().await;

    assert_eq!(engine.poll_once().await, Ok(PollOutcome::Applied));
    assert!(engine.state().loading);

    first.release();
    assert_eq!(slow.await.unwrap(), Ok(PollOutcome::Stale));

    let state = engine.state();
    assert_eq!(state.snapshot.unwrap().desired_moisture, 200);
    assert!(!state.loading);
}

#[tokio::test]
async fn out_of_order_failure_is_dropped() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let mut first = device.enqueue_gated(Method::Get, "/data", MockResponse::status(500));
    let engine = engine(&device);

    let poller = engine.clone();
    let slow = tokio::spawn(async move { poller.poll_once().await });
    first.wait_started().await;
    engine.poll_once().await.unwrap();

    first.release();
    assert_eq!(slow.await.unwrap(), Ok(PollOutcome::Stale));
    let state = engine.state();
    assert!(state.last_error.is_none());
    assert!(state.snapshot.is_some());
}

#[tokio::test]
async fn auto_watering_carries_forward() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);
    engine.poll_once().await.unwrap();

    let mut legacy = reading_with_desired_moisture(1400);
    legacy.auto_watering = None;
    device.set_reading(&legacy);
    engine.poll_once().await.unwrap();

    let snapshot = engine.state().snapshot.unwrap();
    assert_eq!(snapshot.desired_moisture, 1400);
    assert!(snapshot.auto_watering_enabled);
}

#[tokio::test]
async fn subscribers_see_updates() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);
    let mut updates = engine.subscribe();

    engine.poll_once().await.unwrap();
    assert!(updates.has_changed().unwrap());
    assert!(updates.borrow_and_update().snapshot.is_some());
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn later_command_of_same_kind_wins_when_answered_first() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);
    engine.poll_once().await.unwrap();

    let mut gate = device.enqueue_gated(Method::Post, "/setMoisture", MockResponse::ok());
    let submitter = engine.clone();
    let first = tokio::spawn(async move {
        submitter.submit(Command::SetDesiredMoisture(500)).await
    });
    gate.wait_started().await;

    assert_eq!(
        engine.submit(Command::SetDesiredMoisture(900)).await,
        Ok(CommandOutcome::Applied)
    );
    gate.release();
    assert_eq!(
        first.await.unwrap(),
        Ok(CommandOutcome::Superseded {
            sequence: 1,
            latest: 2
        })
    );

    let state = engine.state();
    assert_eq!(state.snapshot.as_ref().unwrap().desired_moisture, 900);
    let status = state.command(CommandKind::SetDesiredMoisture).unwrap();
    assert_eq!(status.sequence, 2);
    assert_eq!(status.command, Command::SetDesiredMoisture(900));
    assert_eq!(status.result, CommandResult::Succeeded);
}

#[tokio::test]
async fn later_command_of_same_kind_wins_when_answered_last() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);
    engine.poll_once().await.unwrap();

    let mut first_gate = device.enqueue_gated(Method::Post, "/setMoisture", MockResponse::ok());
    let mut second_gate = device.enqueue_gated(Method::Post, "/setMoisture", MockResponse::ok());

    let submitter = engine.clone();
    let first = tokio::spawn(async move {
        submitter.submit(Command::SetDesiredMoisture(500)).await
    });
    first_gate.wait_started().await;
    let submitter = engine.clone();
    let second = tokio::spawn(async move {
        submitter.submit(Command::SetDesiredMoisture(900)).await
    });
    second_gate.wait_started().await;

    first_gate.release();
    assert!(matches!(
        first.await.unwrap(),
        Ok(CommandOutcome::Superseded { .. })
    ));
    let state = engine.state();
    assert_eq!(state.snapshot.as_ref().unwrap().desired_moisture, 1500);
    assert_eq!(
        state.command(CommandKind::SetDesiredMoisture).unwrap().result,
        CommandResult::Pending
    );

    second_gate.release();
    assert_eq!(second.await.unwrap(), Ok(CommandOutcome::Applied));
    assert_eq!(engine.state().snapshot.unwrap().desired_moisture, 900);
}

#[tokio::test]
async fn superseded_failure_does_not_mark_latest_failed() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);

    let mut gate = device.enqueue_gated(
        Method::Post,
        "/setAutoWatering",
        MockResponse::status(500),
    );
    let submitter = engine.clone();
    let first =
        tokio::spawn(async move { submitter.submit(Command::SetAutoWatering(true)).await });
    gate.wait_started().await;

    engine.submit(Command::SetAutoWatering(false)).await.unwrap();
    gate.release();
    assert!(matches!(
        first.await.unwrap(),
        Ok(CommandOutcome::Superseded { .. })
    ));
    assert_eq!(
        engine
            .state()
            .command(CommandKind::SetAutoWatering)
            .unwrap()
            .result,
        CommandResult::Succeeded
    );
}

#[tokio::test]
async fn command_kinds_are_independent() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);

    let mut gate = device.enqueue_gated(Method::Post, "/setMoisture", MockResponse::ok());
    let submitter = engine.clone();
    let moisture = tokio::spawn(async move {
        submitter.submit(Command::SetDesiredMoisture(700)).await
    });
    gate.wait_started().await;

    assert_eq!(
        engine.submit(Command::TriggerWaterNow).await,
        Ok(CommandOutcome::Applied)
    );
    gate.release();
    assert_eq!(moisture.await.unwrap(), Ok(CommandOutcome::Applied));
}

#[tokio::test]
async fn optimistic_patch_then_device_truth() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);
    engine.poll_once().await.unwrap();

    engine.submit(Command::SetDesiredMoisture(900)).await.unwrap();
    engine.submit(Command::SetAutoWatering(false)).await.unwrap();
    let snapshot = engine.state().snapshot.unwrap();
    assert_eq!(snapshot.desired_moisture, 900);
    assert!(!snapshot.auto_watering_enabled);

    // The device never applied the change; the next poll shows that.
    engine.poll_once().await.unwrap();
    let snapshot = engine.state().snapshot.unwrap();
    assert_eq!(snapshot.desired_moisture, 1500);
    assert!(snapshot.auto_watering_enabled);
}

#[tokio::test]
async fn optimistic_updates_can_be_disabled() {
    let device = Arc::new(MockDevice::healthy(reading_with_pump_duration(5)));
    let engine = engine_with(
        &device,
        SyncConfig::new("http://device.test").with_optimistic_updates(false),
    );
    engine.poll_once().await.unwrap();

    engine.submit(Command::SetDesiredMoisture(900)).await.unwrap();
    engine.submit(Command::SetPumpDuration(8)).await.unwrap();
    let snapshot = engine.state().snapshot.unwrap();
    assert_eq!(snapshot.desired_moisture, 1500);
    assert_eq!(snapshot.pump_duration_seconds, Some(5));
}

#[tokio::test]
async fn failed_command_records_status() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    device.enqueue(Method::Post, "/waterPlant", MockResponse::status(503));
    let engine = engine(&device);

    assert_eq!(
        engine.submit(Command::TriggerWaterNow).await,
        Err(EngineError::Client(ClientError::Http { status: 503 }))
    );

    let state = engine.state();
    let status = state.command(CommandKind::WaterNow).unwrap();
    match &status.result {
        CommandResult::Failed(info) => assert_eq!(info.kind, ErrorKind::Http(503)),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn invalid_commands_make_no_call() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);

    assert!(matches!(
        engine.submit(Command::SetPumpDuration(0)).await,
        Err(EngineError::Protocol(ProtocolError::InvalidCommand(_)))
    ));
    assert!(matches!(
        engine
            .submit(Command::SetDesiredMoisture(MAX_MOISTURE_LEVEL + 1))
            .await,
        Err(EngineError::Protocol(ProtocolError::InvalidCommand(_)))
    ));

    assert!(device.calls().is_empty());
    assert!(engine.state().commands.is_empty());
}

#[tokio::test]
async fn debug_pump_uses_get() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);

    engine.submit(Command::TriggerDebugPump).await.unwrap();
    assert_eq!(device.call_count(Method::Get, "/debugPump"), 1);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn loop_polls_on_interval() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);
    engine.start().unwrap();

    wait_for(|| engine.phase() == EnginePhase::Waiting).await;
    assert_eq!(device.call_count(Method::Get, "/data"), 1);
    assert!(engine.state().snapshot.is_some());

    tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
    wait_for(|| device.call_count(Method::Get, "/data") == 2).await;
    wait_for(|| engine.phase() == EnginePhase::Waiting).await;

    engine.shutdown().await;
    assert_eq!(engine.phase(), EnginePhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn loop_survives_failures() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    device.enqueue(Method::Get, "/data", MockResponse::status(500));
    let engine = engine(&device);
    engine.start().unwrap();

    wait_for(|| engine.phase() == EnginePhase::Waiting).await;
    assert_eq!(
        engine.state().last_error.unwrap().kind,
        ErrorKind::Http(500)
    );

    tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
    wait_for(|| engine.state().snapshot.is_some()).await;
    assert!(engine.state().last_error.is_none());

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stop_while_waiting_prevents_further_polls() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);
    engine.start().unwrap();

    wait_for(|| engine.phase() == EnginePhase::Waiting).await;
    assert_eq!(device.call_count(Method::Get, "/data"), 1);

    engine.stop();
    assert_eq!(engine.phase(), EnginePhase::Stopped);

    tokio::time::sleep(INTERVAL * 10).await;
    engine.shutdown().await;

    assert_eq!(device.calls().len(), 1);
    assert_eq!(engine.phase(), EnginePhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn successful_command_triggers_early_poll() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);
    engine.start().unwrap();
    wait_for(|| engine.phase() == EnginePhase::Waiting).await;

    let started = tokio::time::Instant::now();
    engine.submit(Command::SetAutoWatering(false)).await.unwrap();
    wait_for(|| device.call_count(Method::Get, "/data") == 2).await;
    assert!(started.elapsed() < INTERVAL);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_command_does_not_trigger_poll() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    device.enqueue(Method::Post, "/setMoisture", MockResponse::status(500));
    let engine = engine(&device);
    engine.start().unwrap();
    wait_for(|| engine.phase() == EnginePhase::Waiting).await;

    assert!(engine.submit(Command::SetDesiredMoisture(10)).await.is_err());
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
    assert_eq!(device.call_count(Method::Get, "/data"), 1);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn refresh_now_skips_the_wait() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);

    // Not running yet: ignored.
    engine.refresh_now();
    engine.start().unwrap();
    wait_for(|| engine.phase() == EnginePhase::Waiting).await;
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
    assert_eq!(device.call_count(Method::Get, "/data"), 1);

    engine.refresh_now();
    wait_for(|| device.call_count(Method::Get, "/data") == 2).await;

    engine.shutdown().await;
}

#[tokio::test]
async fn stop_discards_in_flight_poll() {
    let device = Arc::new(MockDevice::new());
    let mut gate = device.enqueue_gated(
        Method::Get,
        "/data",
        MockResponse::json(&sample_reading()),
    );
    let engine = engine(&device);
    let mut updates = engine.subscribe();

    let poller = engine.clone();
    let poll = tokio::spawn(async move { poller.poll_once().await });
    gate.wait_started().await;
    updates.borrow_and_update();

    engine.stop();
    gate.release();
    assert_eq!(poll.await.unwrap(), Err(EngineError::Stopped));
    assert!(engine.state().snapshot.is_none());
    assert!(!updates.has_changed().unwrap());
}

#[tokio::test]
async fn stop_discards_in_flight_command() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let mut gate = device.enqueue_gated(Method::Post, "/waterPlant", MockResponse::ok());
    let engine = engine(&device);

    let submitter = engine.command_sender();
    let command = tokio::spawn(async move { submitter.submit(Command::TriggerWaterNow).await });
    gate.wait_started().await;

    engine.stop();
    gate.release();
    assert_eq!(command.await.unwrap(), Err(EngineError::Stopped));
    assert_eq!(
        engine.state().command(CommandKind::WaterNow).unwrap().result,
        CommandResult::Pending
    );
}

#[tokio::test]
async fn shutdown_abandons_unanswered_poll() {
    let device = Arc::new(MockDevice::new());
    let mut gate = device.enqueue_gated(
        Method::Get,
        "/data",
        MockResponse::json(&sample_reading()),
    );
    let engine = engine(&device);
    engine.start().unwrap();
    gate.wait_started().await;

    // The device never answers.
    let finished = tokio::time::timeout(Duration::from_secs(3), engine.shutdown()).await;
    assert!(finished.is_ok());
    assert_eq!(engine.phase(), EnginePhase::Stopped);
    assert!(engine.state().snapshot.is_none());
    drop(gate);
}

#[tokio::test]
async fn abandoned_poll_releases_loading() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let mut gate = device.enqueue_gated(
        Method::Get,
        "/data",
        MockResponse::json(&reading_with_desired_moisture(100)),
    );
    let engine = engine(&device);

    let poller = engine.clone();
    let poll = tokio::spawn(async move { poller.poll_once().await });
    gate.wait_started().await;
    assert!(engine.state().loading);

    poll.abort();
    assert!(poll.await.unwrap_err().is_cancelled());
    assert!(!engine.state().loading);

    assert_eq!(engine.poll_once().await, Ok(PollOutcome::Applied));
    let state = engine.state();
    assert!(!state.loading);
    assert_eq!(state.snapshot.unwrap().desired_moisture, 1500);
}

#[tokio::test]
async fn abandoned_command_is_marked_cancelled() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let mut gate = device.enqueue_gated(Method::Post, "/waterPlant", MockResponse::ok());
    let engine = engine(&device);

    let submitter = engine.clone();
    let command = tokio::spawn(async move { submitter.submit(Command::TriggerWaterNow).await });
    gate.wait_started().await;
    assert_eq!(
        engine.state().command(CommandKind::WaterNow).unwrap().result,
        CommandResult::Pending
    );

    command.abort();
    assert!(command.await.unwrap_err().is_cancelled());
    assert_eq!(
        engine.state().command(CommandKind::WaterNow).unwrap().result,
        CommandResult::Cancelled
    );

    // A newer command of the kind is not touched by an older abandoned one.
    let mut gate = device.enqueue_gated(Method::Post, "/waterPlant", MockResponse::ok());
    let submitter = engine.clone();
    let older = tokio::spawn(async move { submitter.submit(Command::TriggerWaterNow).await });
    gate.wait_started().await;
    engine.submit(Command::TriggerWaterNow).await.unwrap();
    older.abort();
    assert!(older.await.unwrap_err().is_cancelled());
    assert_eq!(
        engine.state().command(CommandKind::WaterNow).unwrap().result,
        CommandResult::Succeeded
    );
}

#[tokio::test]
async fn poll_started_before_command_keeps_its_patch() {
    let device = Arc::new(MockDevice::healthy(sample_reading()));
    let engine = engine(&device);
    engine.poll_once().await.unwrap();

    // This poll reads the device before the set-point changes.
    let mut gate = device.enqueue_gated(
        Method::Get,
        "/data",
        MockResponse::json(&sample_reading()),
    );
    let poller = engine.clone();
    let early = tokio::spawn(async move { poller.poll_once().await });
    gate.wait_started().await;

    engine.submit(Command::SetDesiredMoisture(900)).await.unwrap();
    gate.release();
    assert_eq!(early.await.unwrap(), Ok(PollOutcome::Applied));
    assert_eq!(engine.state().snapshot.unwrap().desired_moisture, 900);

    // A poll issued after the acknowledgement reports what the device holds.
    engine.poll_once().await.unwrap();
    assert_eq!(engine.state().snapshot.unwrap().desired_moisture, 1500);
}

// ============================================================================
// Real HTTP
// ============================================================================

#[tokio::test]
async fn round_trip_over_http() {
    let server = FakeDeviceServer::start(sample_reading()).await.unwrap();
    let engine = SyncEngine::new(
        SyncConfig::new(server.base_url()),
        ReqwestClient::new().unwrap(),
    )
    .unwrap();

    assert_eq!(engine.poll_once().await, Ok(PollOutcome::Applied));
    assert_eq!(engine.state().snapshot.unwrap().soil_moisture, 1200);

    engine.submit(Command::SetDesiredMoisture(900)).await.unwrap();
    engine.submit(Command::SetAutoWatering(false)).await.unwrap();
    engine.submit(Command::SetPumpDuration(7)).await.unwrap();
    engine.submit(Command::TriggerWaterNow).await.unwrap();
    engine.submit(Command::TriggerDebugPump).await.unwrap();

    let device = server.state();
    assert_eq!(device.reading.desired_moisture, 900);
    assert_eq!(device.reading.auto_watering, Some(false));
    assert_eq!(device.reading.pump_duration, Some(7));
    assert_eq!(device.pump_runs, 1);
    assert_eq!(device.debug_pump_runs, 1);

    engine.poll_once().await.unwrap();
    let snapshot = engine.state().snapshot.unwrap();
    assert_eq!(snapshot.desired_moisture, 900);
    assert!(!snapshot.auto_watering_enabled);
    assert_eq!(snapshot.pump_duration_seconds, Some(7));

    server.fail_data_with(Some(500));
    assert!(engine.poll_once().await.is_err());
    let state = engine.state();
    assert_eq!(state.last_error.unwrap().kind, ErrorKind::Http(500));
    assert_eq!(state.snapshot.unwrap().desired_moisture, 900);

    server.stop().await;
}

// ============================================================================
// Properties
// ============================================================================

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn levels_and_release_order() -> impl Strategy<Value = (Vec<u16>, Vec<usize>)> {
    prop::collection::vec(0..=MAX_MOISTURE_LEVEL, 1..6).prop_flat_map(|levels| {
        let order: Vec<usize> = (0..levels.len()).collect();
        (Just(levels), Just(order).prop_shuffle())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn polled_snapshots_are_in_range(reading in reading_strategy()) {
        let snapshot = runtime().block_on(async {
            let device = Arc::new(MockDevice::healthy(reading));
            let engine = engine(&device);
            engine.poll_once().await.unwrap();
            engine.state().snapshot.unwrap()
        });
        prop_assert!(snapshot.desired_moisture <= MAX_MOISTURE_LEVEL);
    }

    #[test]
    fn newest_set_point_wins((levels, order) in levels_and_release_order()) {
        let (snapshot_level, status, applied) = runtime().block_on(async {
            let device = Arc::new(MockDevice::healthy(sample_reading()));
            let engine = engine(&device);
            engine.poll_once().await.unwrap();

            let mut gates = Vec::new();
            let mut tasks = Vec::new();
            for &level in &levels {
                let mut gate =
                    device.enqueue_gated(Method::Post, "/setMoisture", MockResponse::ok());
                let submitter = engine.clone();
                tasks.push(tokio::spawn(async move {
                    submitter.submit(Command::SetDesiredMoisture(level)).await
                }));
                gate.wait_started().await;
                gates.push(gate);
            }
            for &i in &order {
                gates[i].release();
                tokio::task::yield_now().await;
            }

            let mut applied = 0;
            for task in tasks {
                if task.await.unwrap() == Ok(CommandOutcome::Applied) {
                    applied += 1;
                }
            }
            let state = engine.state();
            (
                state.snapshot.as_ref().unwrap().desired_moisture,
                state.command(CommandKind::SetDesiredMoisture).cloned().unwrap(),
                applied,
            )
        });

        let last = *levels.last().unwrap();
        prop_assert_eq!(snapshot_level, last);
        prop_assert_eq!(status.command, Command::SetDesiredMoisture(last));
        prop_assert_eq!(status.result, CommandResult::Succeeded);
        prop_assert_eq!(applied, 1);
    }
}
