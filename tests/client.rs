use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use fitfem_api::ai::calories::{ActivityLevel, CalorieBudgetInput, CalorieGoal, Gender};
use fitfem_api::ai::{AiGateway, FitnessGoal, FitnessLevel, MockCompletion, WorkoutPlanInput};
use fitfem_api::config::Settings;
use fitfem_api::cycle::CyclePhase;
use fitfem_api::firestore::MemoryStore;
use fitfem_api::models::{BodyMeasurement, DailyStats, UserProfile};
use fitfem_api::paths;
use fitfem_api::timer::default_routine;
use fitfem_api::FitFemClient;
use serde_json::{json, Map, Value};

const UID: &str = "u1";

fn offline(store: &MemoryStore, mock: &MockCompletion) -> FitFemClient {
    FitFemClient::with_store(
        Settings::default(),
        Arc::new(store.clone()),
        AiGateway::new(Arc::new(mock.clone())),
        UID,
    )
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn profile_fields(store: &MemoryStore) -> Map<String, Value> {
    store
        .fields(&paths::user_profile(UID))
        .await
        .unwrap_or_default()
}

#[tokio::test]
async fn sleep_goal_is_merged_into_the_profile() {
    let store = MemoryStore::new();
    store
        .put(
            &paths::user_profile(UID),
            json!({"weeklyWorkoutPlan": "Monday: Squats"}),
        )
        .await;
    let client = offline(&store, &MockCompletion::default());

    client.save_sleep_goal(7.5).unwrap().await.unwrap();

    let fields = profile_fields(&store).await;
    assert_eq!(fields.get("idealSleepHours"), Some(&json!(7.5)));
    assert_eq!(fields.get("weeklyWorkoutPlan"), Some(&json!("Monday: Squats")));

    assert!(client.save_sleep_goal(0.0).is_err());
    assert!(client.save_sleep_goal(25.0).is_err());
    assert!(client.save_sleep_goal(f64::NAN).is_err());
}

#[tokio::test]
async fn body_measurements_are_stored_as_a_list() {
    let store = MemoryStore::new();
    let client = offline(&store, &MockCompletion::default());

    let mut measurements = UserProfile::default().body_measurements();
    measurements[0] = BodyMeasurement::new("Waist", 27.5, "in");
    client.save_body_measurements(&measurements).await.unwrap();

    let profile: UserProfile =
        serde_json::from_value(Value::Object(profile_fields(&store).await)).unwrap();
    assert_eq!(profile.body_measurements.len(), 5);
    assert_eq!(profile.body_measurements[0].value, 27.5);
}

#[tokio::test]
async fn toggling_period_days_persists_the_sorted_list() {
    let store = MemoryStore::new();
    let client = offline(&store, &MockCompletion::default());
    let mut cycle = client.cycle_state(&UserProfile::default());

    client
        .toggle_period_day(&mut cycle, date(2024, 3, 10))
        .await
        .unwrap();
    client
        .toggle_period_day(&mut cycle, date(2024, 2, 11))
        .await
        .unwrap();

    let fields = profile_fields(&store).await;
    assert_eq!(
        fields.get("loggedPeriodDays"),
        Some(&json!(["2024-02-11", "2024-03-10"]))
    );

    let today = date(2024, 3, 12);
    assert_eq!(cycle.current_day(today), 3);
    assert_eq!(cycle.current_phase(today), CyclePhase::Menstrual);
    // Counted from the earliest logged day.
    assert_eq!(cycle.next_predicted_period(today), date(2024, 3, 10));

    client
        .toggle_period_day(&mut cycle, date(2024, 3, 10))
        .await
        .unwrap();
    let fields = profile_fields(&store).await;
    assert_eq!(fields.get("loggedPeriodDays"), Some(&json!(["2024-02-11"])));
}

#[tokio::test]
async fn calorie_budget_is_written_per_day() {
    let store = MemoryStore::new();
    let client = offline(&store, &MockCompletion::default());
    let day = date(2024, 5, 6);

    let input = CalorieBudgetInput {
        goal: CalorieGoal::Maintain,
        daily_calories_burned: 200.0,
        daily_calories_intake: 1_000.0,
        weight_kg: 60.0,
        height_cm: 165.0,
        age_years: 30.0,
        gender: Gender::Female,
        activity_level: ActivityLevel::Sedentary,
    };
    let budget = client.set_calorie_budget(day, &input).unwrap();
    assert_eq!(budget.recommended_daily_calorie_intake, 1_584.0);
    assert_eq!(budget.remaining_calories, 784.0);
    assert!(budget.goal_deficit.is_none());

    let binding = client.calorie_budget_binding(day);
    let mut rx = binding.subscribe();
    let state = tokio::time::timeout(
        Duration::from_secs(10),
        rx.wait_for(|s| s.data.is_some()),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert_eq!(state.data, Some(budget));

    let invalid = CalorieBudgetInput {
        weight_kg: 0.0,
        ..input
    };
    assert!(client.set_calorie_budget(day, &invalid).is_err());
}

#[tokio::test]
async fn todos_round_trip_through_the_collection() {
    let store = MemoryStore::new();
    let client = offline(&store, &MockCompletion::default());

    assert!(client.add_todo("   ").is_err());
    let id = client.add_todo(" Drink water ").unwrap();

    let binding = client.todos_binding();
    let mut rx = binding.subscribe();
    let todos = tokio::time::timeout(
        Duration::from_secs(10),
        rx.wait_for(|s| s.data.as_ref().is_some_and(|t| !t.is_empty())),
    )
    .await
    .unwrap()
    .unwrap()
    .data
    .clone()
    .unwrap();
    assert_eq!(todos[0].id, id);
    assert_eq!(todos[0].text, "Drink water");
    assert!(!todos[0].completed);

    client.set_todo_completed(&id, true).await.unwrap();
    let fields = store
        .fields(&format!("{}/{}", paths::todos(UID), id))
        .await
        .unwrap();
    assert_eq!(fields.get("completed"), Some(&json!(true)));
    assert_eq!(fields.get("text"), Some(&json!("Drink water")));
}

#[tokio::test]
async fn water_tracking_floors_at_zero() {
    let store = MemoryStore::new();
    let client = offline(&store, &MockCompletion::default());
    let day = date(2024, 5, 6);
    let tracker = client.daily_stats_tracker(day);

    tracker.add_water(3).await;
    let stats = tracker.add_water(-5).await;
    assert_eq!(stats.water_intake, 0);
    tracker.flush().await;

    let fields = store.fields(&paths::daily_stats(UID, day)).await.unwrap();
    assert_eq!(fields.get("waterIntake"), Some(&json!(0)));

    let stats = DailyStats {
        water_intake: 6,
        ..DailyStats::default()
    };
    let water = client.water(&stats);
    assert_eq!(water.goal, 8);
    assert_eq!(water.percentage(), 75.0);
}

#[tokio::test]
async fn generated_plan_is_saved_to_the_profile() {
    let store = MemoryStore::new();
    let plan = "Justification: Balanced.\nMonday: Squats 3x10";
    let mock = MockCompletion::returning(json!({ "weeklyWorkoutPlan": plan }));
    let client = offline(&store, &mock);

    let input = WorkoutPlanInput {
        fitness_level: FitnessLevel::Intermediate,
        goals: FitnessGoal::MuscleGain,
        available_equipment: "none".into(),
        dietary_preferences: "vegetarian".into(),
    };
    let response = client.generate_workout_plan(&input).await;
    assert!(response.success);

    for _ in 0..100 {
        if profile_fields(&store).await.contains_key("weeklyWorkoutPlan") {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(
        profile_fields(&store).await.get("weeklyWorkoutPlan"),
        Some(&json!(plan))
    );
}

#[tokio::test]
async fn failed_plan_leaves_the_profile_alone() {
    let store = MemoryStore::new();
    let client = offline(&store, &MockCompletion::failing("offline"));

    let input = WorkoutPlanInput {
        fitness_level: FitnessLevel::Beginner,
        goals: FitnessGoal::WeightLoss,
        available_equipment: "none".into(),
        dietary_preferences: "none".into(),
    };
    assert!(!client.generate_workout_plan(&input).await.success);
    tokio::task::yield_now().await;
    assert!(store.fields(&paths::user_profile(UID)).await.is_none());
}

#[tokio::test]
async fn routine_falls_back_to_the_default() {
    let store = MemoryStore::new();
    let monday = date(2024, 5, 6);

    let mock = MockCompletion::failing("offline");
    let client = offline(&store, &mock);
    assert_eq!(client.routine_for(None, monday).await, default_routine());
    assert_eq!(mock.call_count(), 0);

    let profile = UserProfile {
        weekly_workout_plan: Some("Monday: Squats 2x10, rest 30s".into()),
        ..UserProfile::default()
    };
    assert_eq!(client.routine_for(Some(&profile), monday).await, default_routine());
    assert_eq!(mock.call_count(), 1);

    let rest_day = MockCompletion::returning(json!({
        "day": "Monday", "workoutExists": false, "steps": []
    }));
    let client = offline(&store, &rest_day);
    assert_eq!(client.routine_for(Some(&profile), monday).await, default_routine());
}

#[tokio::test]
async fn routine_follows_the_stored_plan() {
    let store = MemoryStore::new();
    let mock = MockCompletion::returning(json!({
        "day": "Monday",
        "workoutExists": true,
        "steps": [
            {"type": "exercise_set", "name": "Squats", "set": 1, "reps": "10", "duration": 40, "isRest": false},
            {"type": "rest", "name": "Rest", "duration": 30, "isRest": true},
            {"type": "exercise_set", "name": "Squats", "set": 2, "reps": "10", "duration": 40, "isRest": false}
        ]
    }));
    let client = offline(&store, &mock);
    let profile = UserProfile {
        weekly_workout_plan: Some("Monday: Squats 2x10, rest 30s".into()),
        ..UserProfile::default()
    };

    let routine = client.routine_for(Some(&profile), date(2024, 5, 6)).await;
    let names: Vec<_> = routine.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names.len(), 3);
    assert_eq!(routine[0].duration_secs, 40);
    assert!(routine[1].is_rest);
    assert_eq!(routine[0].calories, 28.0);

    let prompt = &mock.requests()[0].prompt;
    assert!(prompt.contains("Today is Monday."));
}
