use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::binding::{self, BindingState};
use crate::error::StoreError;
use crate::models::DailyStats;
use crate::paths;
use crate::sync::LocalState;
use crate::writer::OptimisticWriter;

/// Today's counters for one user, kept locally and merge-written on change.
///
/// The stored document is read before the first change so counters
/// continue from what the day already holds. Clones share the same
/// counters.
#[derive(Clone)]
pub struct DailyStatsTracker {
    writer: OptimisticWriter,
    path: String,
    date: NaiveDate,
    stats: Arc<Mutex<LocalState<DailyStats>>>,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl DailyStatsTracker {
    pub fn new(writer: OptimisticWriter, uid: &str, date: NaiveDate) -> Self {
        Self {
            writer,
            path: paths::daily_stats(uid, date),
            date,
            stats: Arc::new(Mutex::new(LocalState::new(DailyStats::default()))),
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub async fn snapshot(&self) -> DailyStats {
        self.stats.lock().await.get().clone()
    }

    /// Adopt a remote snapshot of the day if it is a new revision.
    ///
    /// While writes from this tracker are still in flight the snapshot may
    /// predate them; its revision is marked seen and the local counters
    /// are kept.
    pub async fn reconcile(&self, remote: &BindingState<DailyStats>) -> bool {
        let mut local = self.stats.lock().await;
        let mut pending = self.pending.lock().await;
        pending.retain(|h| !h.is_finished());
        if !pending.is_empty() {
            debug!(path = %self.path, version = ?remote.version, "snapshot skipped during local writes");
            local.acknowledge(remote);
            return false;
        }
        local.reconcile(remote)
    }

    /// Count a finished workout and its calories.
    pub async fn record_workout(&self, calories_burned: f64) -> DailyStats {
        let stats = self
            .apply(
                |s| {
                    s.workouts_done += 1;
                    s.calories_burned += calories_burned.max(0.0);
                },
                |s| {
                    json!({
                        "workoutsDone": s.workouts_done,
                        "caloriesBurned": s.calories_burned,
                    })
                },
            )
            .await;
        info!(
            date = %self.date,
            workouts = stats.workouts_done,
            burned = stats.calories_burned,
            "workout recorded"
        );
        stats
    }

    /// Change the water count by `delta` glasses, never below zero.
    pub async fn add_water(&self, delta: i32) -> DailyStats {
        self.apply(
            |s| {
                s.water_intake = (i64::from(s.water_intake) + i64::from(delta)).max(0) as u32;
            },
            |s| json!({ "waterIntake": s.water_intake }),
        )
        .await
    }

    /// Store the day's consumed calories, as derived from the meal log.
    pub async fn record_consumed(&self, calories: f64) -> DailyStats {
        self.apply(
            |s| s.calories_consumed = calories.max(0.0),
            |s| json!({ "caloriesConsumed": s.calories_consumed }),
        )
        .await
    }

    /// Wait for every write issued so far to settle.
    pub async fn flush(&self) {
        let handles: Vec<_> = self.pending.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Edit the counters and merge-write the fields `patch` picks out.
    /// The write is registered as pending before the counters unlock.
    async fn apply(
        &self,
        edit: impl FnOnce(&mut DailyStats),
        patch: impl FnOnce(&DailyStats) -> Value,
    ) -> DailyStats {
        let mut local = self.stats.lock().await;
        if !local.is_synced() {
            self.load(&mut local).await;
        }
        let stats = local.update(edit).clone();

        let handle = self.writer.merge_value(self.path.clone(), &patch(&stats));
        let mut pending = self.pending.lock().await;
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
        stats
    }

    /// Seed the counters from the stored document. On failure the local
    /// values are kept and loading is retried on the next change.
    async fn load(&self, local: &mut LocalState<DailyStats>) {
        match self.fetch().await {
            Ok(remote) => {
                local.reconcile(&remote);
                debug!(path = %self.path, version = ?remote.version, "daily stats loaded");
            }
            Err(e) => warn!(path = %self.path, error = %e, "daily stats not loaded; counting from local values"),
        }
    }

    async fn fetch(&self) -> Result<BindingState<DailyStats>, StoreError> {
        let snaps: Vec<_> = self
            .writer
            .store()
            .get_document(&self.path)
            .await?
            .into_iter()
            .collect();
        let data = match snaps.first() {
            Some(snap) => snap.decode::<DailyStats>()?,
            None => DailyStats::default(),
        };
        Ok(BindingState {
            data: Some(data),
            is_loading: false,
            error: None,
            version: Some(binding::signature(&snaps)),
        })
    }
}
