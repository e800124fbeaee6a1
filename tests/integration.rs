use std::time::Duration;

use fitfem_api::config::{read_config, Settings};
use fitfem_api::timer::TimerState;
use fitfem_api::FitFemClient;

fn get_credentials() -> Option<(Settings, String, String)> {
    dotenvy::dotenv().ok();
    fitfem_api::logging::init("info");
    let email = std::env::var("FITFEM_EMAIL").ok()?;
    let password = std::env::var("FITFEM_PASSWORD").ok()?;
    let settings = read_config().ok()?;
    if settings.firebase.api_key.is_empty() {
        return None;
    }
    Some((settings, email, password))
}

async fn authenticated_client() -> Option<FitFemClient> {
    let (settings, email, password) = get_credentials()?;
    FitFemClient::login(settings, &email, &password).await.ok()
}

#[tokio::test]
async fn login_yields_user_and_token() {
    let Some(client) = authenticated_client().await else {
        eprintln!("Skipping: FITFEM_EMAIL/FITFEM_PASSWORD not set");
        return;
    };

    assert!(!client.user_id().is_empty());
    let auth = client.auth().expect("live client has auth");
    let token = auth.get_id_token().await.unwrap();
    assert!(!token.is_empty());
    assert_eq!(auth.get_user_id().await.unwrap(), client.user_id());
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let Some((settings, email, _)) = get_credentials() else {
        eprintln!("Skipping: FITFEM_EMAIL/FITFEM_PASSWORD not set");
        return;
    };

    let result = FitFemClient::login(settings, &email, "definitely-not-the-password").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn profile_binding_loads() {
    let Some(client) = authenticated_client().await else {
        eprintln!("Skipping: FITFEM_EMAIL/FITFEM_PASSWORD not set");
        return;
    };

    let binding = client.profile_binding();
    let mut rx = binding.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(20), rx.wait_for(|s| !s.is_loading))
        .await
        .expect("profile did not load in time")
        .unwrap()
        .clone();

    assert!(state.error.is_none(), "{:?}", state.error);
    if let Some(profile) = state.data {
        println!(
            "sleep goal {}h, {} period days logged",
            profile.ideal_sleep_hours(),
            profile.logged_period_days.len()
        );
        assert!(profile.ideal_sleep_hours() > 0.0);
    }
}

#[tokio::test]
async fn sleep_goal_round_trips() {
    let Some(client) = authenticated_client().await else {
        eprintln!("Skipping: FITFEM_EMAIL/FITFEM_PASSWORD not set");
        return;
    };

    let binding = client.profile_binding();
    let mut rx = binding.subscribe();
    let before = tokio::time::timeout(Duration::from_secs(20), rx.wait_for(|s| !s.is_loading))
        .await
        .expect("profile did not load in time")
        .unwrap()
        .clone();
    let original = before
        .data
        .as_ref()
        .map(|p| p.ideal_sleep_hours())
        .unwrap_or(8.0);
    let target = if original == 7.5 { 8.0 } else { 7.5 };

    client.save_sleep_goal(target).unwrap().await.unwrap();
    tokio::time::timeout(
        Duration::from_secs(20),
        rx.wait_for(|s| s.data.as_ref().is_some_and(|p| p.ideal_sleep_hours() == target)),
    )
    .await
    .expect("saved sleep goal was not observed")
    .unwrap();

    // Put it back
    client.save_sleep_goal(original).unwrap().await.unwrap();
}

#[tokio::test]
async fn daily_stats_for_today_are_readable() {
    let Some(client) = authenticated_client().await else {
        eprintln!("Skipping: FITFEM_EMAIL/FITFEM_PASSWORD not set");
        return;
    };

    let today = FitFemClient::today();
    let binding = client.daily_stats_binding(today);
    let mut rx = binding.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(20), rx.wait_for(|s| !s.is_loading))
        .await
        .expect("daily stats did not load in time")
        .unwrap()
        .clone();

    assert!(state.error.is_none(), "{:?}", state.error);
    let stats = state.data.unwrap_or_default();
    let water = client.water(&stats);
    println!(
        "{today}: {} workouts, {} kcal burned, water {}/{}",
        stats.workouts_done, stats.calories_burned, water.consumed, water.goal
    );
}

#[tokio::test]
async fn routine_for_today_is_runnable() {
    let Some(client) = authenticated_client().await else {
        eprintln!("Skipping: FITFEM_EMAIL/FITFEM_PASSWORD not set");
        return;
    };

    let binding = client.profile_binding();
    let mut rx = binding.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(20), rx.wait_for(|s| !s.is_loading))
        .await
        .expect("profile did not load in time")
        .unwrap()
        .clone();

    let routine = client
        .routine_for(state.data.as_ref(), FitFemClient::today())
        .await;
    assert!(!routine.is_empty());
    for segment in &routine {
        println!(
            "{} {}s{}",
            segment.name,
            segment.duration_secs,
            if segment.is_rest { " (rest)" } else { "" }
        );
    }

    // Building the engine must not start it.
    let engine = fitfem_api::timer::WorkoutTimerEngine::new(routine);
    assert_eq!(engine.state(), TimerState::Paused);
}
