use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use fitfem_api::ai::{AiGateway, MockCompletion};
use fitfem_api::config::Settings;
use fitfem_api::firestore::MemoryStore;
use fitfem_api::paths;
use fitfem_api::timer::{Announcer, NoopAnnouncer, Segment, TimerState};
use fitfem_api::FitFemClient;
use serde_json::{json, Map, Value};
use tokio::time::Instant;

#[derive(Default)]
struct Transcript(Mutex<Vec<String>>);

impl Announcer for Transcript {
    fn announce(&self, text: &str) {
        self.0.lock().unwrap().push(text.to_string());
    }
}

impl Transcript {
    fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

fn client(store: &MemoryStore) -> FitFemClient {
    FitFemClient::with_store(
        Settings::default(),
        Arc::new(store.clone()),
        AiGateway::new(Arc::new(MockCompletion::failing("offline"))),
        "u1",
    )
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
}

fn short_routine() -> Vec<Segment> {
    vec![Segment::exercise("Squats", 3, 10.0), Segment::rest(2)]
}

async fn wait_for_fields(store: &MemoryStore, path: &str) -> Map<String, Value> {
    for _ in 0..100 {
        if let Some(fields) = store.fields(path).await {
            return fields;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("nothing written to {path}");
}

#[tokio::test(start_paused = true)]
async fn finished_workout_is_recorded_for_the_day() {
    let store = MemoryStore::new();
    let client = client(&store);
    let mut runner = client.workout_runner(short_routine(), Arc::new(NoopAnnouncer), day());
    let mut rx = runner.subscribe();

    let started = Instant::now();
    assert_eq!(runner.toggle().await, TimerState::Running);
    rx.wait_for(|s| s.state == TimerState::Finished).await.unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(5), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(6), "{elapsed:?}");

    let fields = wait_for_fields(&store, &paths::daily_stats("u1", day())).await;
    assert_eq!(fields.get("workoutsDone"), Some(&json!(1)));
    assert_eq!(fields.get("caloriesBurned"), Some(&json!(10.0)));

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!runner.is_ticking());
}

#[tokio::test(start_paused = true)]
async fn pausing_stops_the_countdown() {
    let store = MemoryStore::new();
    let mut runner = client(&store).workout_runner(short_routine(), Arc::new(NoopAnnouncer), day());

    runner.toggle().await;
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(runner.snapshot().await.remaining_secs, 2);

    assert_eq!(runner.toggle().await, TimerState::Paused);
    assert!(!runner.is_ticking());
    tokio::time::sleep(Duration::from_secs(10)).await;

    let snapshot = runner.snapshot().await;
    assert_eq!(snapshot.state, TimerState::Paused);
    assert_eq!(snapshot.remaining_secs, 2);
    assert_eq!(snapshot.index, 0);
}

#[tokio::test(start_paused = true)]
async fn skipping_past_the_end_finishes_and_records() {
    let store = MemoryStore::new();
    let transcript = Arc::new(Transcript::default());
    let mut runner = client(&store).workout_runner(short_routine(), transcript.clone(), day());

    runner.toggle().await;
    runner.skip().await;
    assert_eq!(runner.snapshot().await.index, 1);
    runner.skip().await;

    let snapshot = runner.snapshot().await;
    assert_eq!(snapshot.state, TimerState::Finished);
    assert!(!runner.is_ticking());

    let fields = wait_for_fields(&store, &paths::daily_stats("u1", day())).await;
    assert_eq!(fields.get("workoutsDone"), Some(&json!(1)));

    let lines = transcript.lines();
    assert_eq!(lines.first().map(String::as_str), Some("Starting Squats"));
    assert_eq!(
        lines.last().map(String::as_str),
        Some("Workout complete! Well done.")
    );
    assert!(!lines.iter().any(|l| l.starts_with("Next exercise")));
}

#[tokio::test(start_paused = true)]
async fn muted_runner_stays_silent() {
    let store = MemoryStore::new();
    let transcript = Arc::new(Transcript::default());
    let mut runner = client(&store).workout_runner(short_routine(), transcript.clone(), day());
    let mut rx = runner.subscribe();

    runner.set_muted(true).await;
    runner.toggle().await;
    rx.wait_for(|s| s.state == TimerState::Finished).await.unwrap();

    assert!(transcript.lines().is_empty());
}

#[tokio::test(start_paused = true)]
async fn restart_after_finish_waits_paused() {
    let store = MemoryStore::new();
    let mut runner = client(&store).workout_runner(short_routine(), Arc::new(NoopAnnouncer), day());

    assert!(runner.set_duration(0, 1).await);
    runner.toggle().await;
    runner.skip().await;
    runner.skip().await;
    assert_eq!(runner.snapshot().await.state, TimerState::Finished);

    runner.restart().await;
    let snapshot = runner.snapshot().await;
    assert_eq!(snapshot.state, TimerState::Paused);
    assert_eq!(snapshot.index, 0);
    assert_eq!(snapshot.remaining_secs, 3);
    assert!(!runner.is_ticking());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_runner_stops_ticking() {
    let store = MemoryStore::new();
    let mut runner = client(&store).workout_runner(short_routine(), Arc::new(NoopAnnouncer), day());
    let rx = runner.subscribe();

    runner.toggle().await;
    drop(runner);
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(rx.borrow().state, TimerState::Running);
    assert!(store.fields(&paths::daily_stats("u1", day())).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn second_workout_of_the_day_adds_to_the_counters() {
    let store = MemoryStore::new();
    let path = paths::daily_stats("u1", day());
    store
        .put(
            &path,
            json!({"workoutsDone": 2, "caloriesBurned": 100, "waterIntake": 5}),
        )
        .await;

    let mut runner = client(&store).workout_runner(
        vec![Segment::exercise("Squats", 2, 10.0)],
        Arc::new(NoopAnnouncer),
        day(),
    );
    let mut rx = runner.subscribe();
    runner.toggle().await;
    rx.wait_for(|s| s.state == TimerState::Finished).await.unwrap();

    let mut fields = Map::new();
    for _ in 0..100 {
        fields = store.fields(&path).await.unwrap_or_default();
        if fields.get("workoutsDone") != Some(&json!(2)) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(fields.get("workoutsDone"), Some(&json!(3)));
    assert_eq!(fields.get("caloriesBurned"), Some(&json!(110.0)));
    assert_eq!(fields.get("waterIntake"), Some(&json!(5)));
}

#[tokio::test(start_paused = true)]
async fn skipping_gives_the_next_segment_a_full_second() {
    let store = MemoryStore::new();
    let mut runner = client(&store).workout_runner(
        vec![Segment::exercise("Squats", 3, 10.0), Segment::rest(4)],
        Arc::new(NoopAnnouncer),
        day(),
    );

    runner.toggle().await;
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    runner.skip().await;
    assert!(runner.is_ticking());

    // The old schedule would have ticked at 2s.
    tokio::time::sleep(Duration::from_millis(600)).await;
    let snapshot = runner.snapshot().await;
    assert_eq!(snapshot.index, 1);
    assert_eq!(snapshot.remaining_secs, 4);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(runner.snapshot().await.remaining_secs, 3);
}

#[tokio::test(start_paused = true)]
async fn editing_the_active_segment_restarts_its_second() {
    let store = MemoryStore::new();
    let mut runner = client(&store).workout_runner(short_routine(), Arc::new(NoopAnnouncer), day());

    runner.toggle().await;
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert!(runner.set_duration(0, 10).await);
    assert_eq!(runner.snapshot().await.remaining_secs, 10);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(runner.snapshot().await.remaining_secs, 10);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(runner.snapshot().await.remaining_secs, 9);

    // Other segments apply when reached and leave the tick alone.
    assert!(runner.set_duration(1, 8).await);
    assert_eq!(runner.snapshot().await.remaining_secs, 9);
    assert!(runner.is_ticking());
}
