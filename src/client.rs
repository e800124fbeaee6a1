use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate, Utc};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::info;

use crate::ai::calories::{recommend_calories, CalorieBudget, CalorieBudgetInput};
use crate::ai::{
    ActionResponse, AiGateway, DailyWorkoutInput, WeeklyWorkoutPlan, WorkoutPlanInput,
};
use crate::auth::{FirebaseAuth, Session};
use crate::binding::{CollectionBinding, DocumentBinding};
use crate::config::Settings;
use crate::cycle::CycleState;
use crate::error::ValidationError;
use crate::firestore::{DocumentStore, FirestoreClient};
use crate::models::*;
use crate::nutrition::WaterIntake;
use crate::paths;
use crate::plan;
use crate::progress::DailyStatsTracker;
use crate::timer::{default_routine, Announcer, Segment, WorkoutRunner, WorkoutTimerEngine};
use crate::writer::OptimisticWriter;

/// Everything a signed-in session needs, built once at startup and passed
/// down explicitly.
#[derive(Clone)]
pub struct FitFemClient {
    settings: Settings,
    auth: Option<FirebaseAuth>,
    store: Arc<dyn DocumentStore>,
    writer: OptimisticWriter,
    gateway: AiGateway,
    user_id: String,
}

impl FitFemClient {
    /// Assemble a client from parts, e.g. an in-memory store for offline
    /// use or tests.
    pub fn with_store(
        settings: Settings,
        store: Arc<dyn DocumentStore>,
        gateway: AiGateway,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            settings,
            auth: None,
            writer: OptimisticWriter::new(store.clone()),
            store,
            gateway,
            user_id: user_id.into(),
        }
    }

    fn from_session(settings: Settings, session: Session) -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(FirestoreClient::new(
            session.auth.clone(),
            settings.firebase.project_id.clone(),
        ));
        let gateway = AiGateway::gemini(&settings.gemini);
        Self {
            auth: Some(session.auth),
            writer: OptimisticWriter::new(store.clone()),
            store,
            gateway,
            user_id: session.user_id,
            settings,
        }
    }

    /// Sign in with email and password.
    pub async fn login(settings: Settings, email: &str, password: &str) -> Result<Self> {
        let session =
            FirebaseAuth::sign_in_with_email(&settings.firebase.api_key, email, password).await?;
        Ok(Self::from_session(settings, session))
    }

    /// Create an account and its `users/{uid}` document.
    pub async fn sign_up(settings: Settings, email: &str, password: &str) -> Result<Self> {
        let session =
            FirebaseAuth::sign_up_with_email(&settings.firebase.api_key, email, password).await?;
        let client = Self::from_session(settings, session);

        let account = UserAccount {
            email: Some(email.trim().to_string()),
            created_at: Utc::now(),
        };
        let patch = match serde_json::to_value(&account)? {
            serde_json::Value::Object(map) => map,
            _ => return Err(anyhow!("account document did not serialize to an object")),
        };
        client
            .store
            .merge_document(&paths::user_root(&client.user_id), patch)
            .await?;
        info!(user_id = %client.user_id, "user document created");
        Ok(client)
    }

    /// Resume from a stored refresh token.
    pub async fn resume(settings: Settings, refresh_token: String) -> Result<Self> {
        let auth = FirebaseAuth::new(&settings.firebase.api_key, refresh_token);
        let user_id = auth.get_user_id().await?;
        let session = Session {
            auth,
            user_id,
            email: None,
        };
        Ok(Self::from_session(settings, session))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn auth(&self) -> Option<&FirebaseAuth> {
        self.auth.as_ref()
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    pub fn writer(&self) -> &OptimisticWriter {
        &self.writer
    }

    pub fn gateway(&self) -> &AiGateway {
        &self.gateway
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Today in the local timezone, the key for per-day documents.
    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    // Live bindings

    pub fn profile_binding(&self) -> DocumentBinding<UserProfile> {
        DocumentBinding::document(
            self.store(),
            self.settings.sync.clone(),
            Some(paths::user_profile(&self.user_id)),
        )
    }

    pub fn todos_binding(&self) -> CollectionBinding<Todo> {
        CollectionBinding::collection(
            self.store(),
            self.settings.sync.clone(),
            Some(paths::todos(&self.user_id)),
        )
    }

    pub fn daily_stats_binding(&self, date: NaiveDate) -> DocumentBinding<DailyStats> {
        DocumentBinding::document(
            self.store(),
            self.settings.sync.clone(),
            Some(paths::daily_stats(&self.user_id, date)),
        )
    }

    /// Every recorded day, for the progress calendar.
    pub fn stats_history_binding(&self) -> CollectionBinding<DailyStats> {
        CollectionBinding::collection(
            self.store(),
            self.settings.sync.clone(),
            Some(paths::daily_stats_collection(&self.user_id)),
        )
    }

    pub fn calorie_budget_binding(&self, date: NaiveDate) -> DocumentBinding<CalorieBudget> {
        DocumentBinding::document(
            self.store(),
            self.settings.sync.clone(),
            Some(paths::calorie_budget(&self.user_id, date)),
        )
    }

    // Profile writes

    pub fn save_body_measurements(&self, measurements: &[BodyMeasurement]) -> JoinHandle<()> {
        self.writer.merge_value(
            paths::user_profile(&self.user_id),
            &json!({ "bodyMeasurements": measurements }),
        )
    }

    pub fn save_sleep_goal(&self, hours: f64) -> Result<JoinHandle<()>, ValidationError> {
        if !hours.is_finite() || hours <= 0.0 || hours > 24.0 {
            return Err(ValidationError::invalid(
                "idealSleepHours",
                "must be between 0 and 24 hours",
            ));
        }
        Ok(self.writer.merge_value(
            paths::user_profile(&self.user_id),
            &json!({ "idealSleepHours": hours }),
        ))
    }

    pub fn save_workout_plan(&self, plan: &WeeklyWorkoutPlan) -> JoinHandle<()> {
        self.writer
            .merge_value(paths::user_profile(&self.user_id), plan)
    }

    pub fn cycle_state(&self, profile: &UserProfile) -> CycleState {
        CycleState::from_profile(self.settings.cycle, profile)
    }

    /// Toggle a period day locally and persist the whole list.
    pub fn toggle_period_day(&self, cycle: &mut CycleState, date: NaiveDate) -> JoinHandle<()> {
        let logged = cycle.toggle_period_day(date);
        info!(%date, logged, "period day toggled");
        self.writer.merge_value(
            paths::user_profile(&self.user_id),
            &json!({ "loggedPeriodDays": cycle.to_iso_strings() }),
        )
    }

    // Nutrition and progress

    pub fn water(&self, stats: &DailyStats) -> WaterIntake {
        WaterIntake {
            consumed: stats.water_intake,
            goal: self.settings.nutrition.water_goal,
        }
    }

    pub fn daily_stats_tracker(&self, date: NaiveDate) -> DailyStatsTracker {
        DailyStatsTracker::new(self.writer.clone(), &self.user_id, date)
    }

    /// Compute today's budget and store it under `calorieBudgets/{date}`.
    pub fn set_calorie_budget(
        &self,
        date: NaiveDate,
        input: &CalorieBudgetInput,
    ) -> Result<CalorieBudget, ValidationError> {
        let budget = recommend_calories(input)?;
        self.writer
            .merge_value(paths::calorie_budget(&self.user_id, date), &budget);
        Ok(budget)
    }

    pub fn add_todo(&self, text: &str) -> Result<String, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::Empty { field: "text" });
        }
        let id = Utc::now().timestamp_micros().to_string();
        self.writer.merge_value(
            format!("{}/{}", paths::todos(&self.user_id), id),
            &json!({ "text": text, "completed": false }),
        );
        Ok(id)
    }

    pub fn set_todo_completed(&self, id: &str, completed: bool) -> JoinHandle<()> {
        self.writer.merge_value(
            format!("{}/{}", paths::todos(&self.user_id), id),
            &json!({ "completed": completed }),
        )
    }

    // AI-backed flows

    /// Generate a weekly plan and, on success, save it to the profile.
    pub async fn generate_workout_plan(
        &self,
        input: &WorkoutPlanInput,
    ) -> ActionResponse<WeeklyWorkoutPlan> {
        let response = self.gateway.workout_plan_action(input).await;
        if let Some(plan) = &response.data {
            self.save_workout_plan(plan);
        }
        response
    }

    /// Segments for `date`: today's part of the stored plan if the model
    /// finds one, otherwise the default routine.
    pub async fn routine_for(&self, profile: Option<&UserProfile>, date: NaiveDate) -> Vec<Segment> {
        let Some(weekly) = profile
            .and_then(|p| p.weekly_workout_plan.as_deref())
            .filter(|p| !p.trim().is_empty())
        else {
            return default_routine();
        };

        let input = DailyWorkoutInput {
            weekly_workout_plan: weekly.to_string(),
            today: plan::weekday_name(date).to_string(),
        };
        match self.gateway.daily_workout_action(&input).await.data {
            Some(workout) => {
                let segments = workout.to_segments();
                if segments.is_empty() {
                    default_routine()
                } else {
                    segments
                }
            }
            None => default_routine(),
        }
    }

    /// A runner whose completion is counted in `date`'s stats.
    pub fn workout_runner(
        &self,
        routine: Vec<Segment>,
        announcer: Arc<dyn Announcer>,
        date: NaiveDate,
    ) -> WorkoutRunner {
        let engine = WorkoutTimerEngine::with_announcer(routine, announcer);
        WorkoutRunner::new(engine, Some(self.daily_stats_tracker(date)))
    }
}
