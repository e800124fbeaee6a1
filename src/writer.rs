use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::firestore::DocumentStore;

/// Fire-and-forget merge writes.
///
/// Every call returns before the store has acknowledged anything. Failures
/// are logged and otherwise dropped; concurrent writes to the same path are
/// last-writer-wins.
#[derive(Clone)]
pub struct OptimisticWriter {
    store: Arc<dyn DocumentStore>,
}

impl OptimisticWriter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Store the writes go to.
    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    /// Merge `patch` into the document at `path`.
    ///
    /// The returned handle only exists so tests and shutdown code can wait
    /// for the write to settle; ordinary callers drop it.
    pub fn merge(&self, path: impl Into<String>, patch: Map<String, Value>) -> JoinHandle<()> {
        let store = self.store.clone();
        let path = path.into();

        tokio::spawn(async move {
            let fields: Vec<String> = patch.keys().cloned().collect();
            match store.merge_document(&path, patch).await {
                Ok(()) => debug!(path = %path, ?fields, "optimistic write settled"),
                Err(e) => warn!(path = %path, ?fields, error = %e, "optimistic write failed"),
            }
        })
    }

    /// Serialize `patch` (a struct or `json!` object) and merge it.
    ///
    /// A value that does not serialize to a JSON object is logged and skipped.
    pub fn merge_value<P: Serialize>(&self, path: impl Into<String>, patch: &P) -> JoinHandle<()> {
        let path = path.into();
        match serde_json::to_value(patch) {
            Ok(Value::Object(map)) => self.merge(path, map),
            Ok(other) => {
                warn!(path = %path, kind = ?other, "write patch is not an object; skipped");
                tokio::spawn(async {})
            }
            Err(e) => {
                warn!(path = %path, error = %e, "write patch failed to serialize; skipped");
                tokio::spawn(async {})
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn merge_preserves_other_fields() {
        let store = MemoryStore::new();
        store
            .put("users/u1/userProfile/u1", json!({"idealSleepHours": 8, "weeklyWorkoutPlan": "plan"}))
            .await;
        let writer = OptimisticWriter::new(Arc::new(store.clone()));

        writer
            .merge_value("users/u1/userProfile/u1", &json!({"idealSleepHours": 7}))
            .await
            .unwrap();

        let fields = store.fields("users/u1/userProfile/u1").await.unwrap();
        assert_eq!(fields["idealSleepHours"], json!(7));
        assert_eq!(fields["weeklyWorkoutPlan"], json!("plan"));
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let store = MemoryStore::new();
        store.set_failing(true);
        let writer = OptimisticWriter::new(Arc::new(store.clone()));

        // The task completes normally even though the write failed.
        writer
            .merge_value("users/u1/dailyStats/2024-01-01", &json!({"waterIntake": 3}))
            .await
            .unwrap();

        store.set_failing(false);
        assert!(store.fields("users/u1/dailyStats/2024-01-01").await.is_none());
    }

    #[tokio::test]
    async fn non_object_patch_is_skipped() {
        let store = MemoryStore::new();
        let writer = OptimisticWriter::new(Arc::new(store.clone()));
        writer.merge_value("a/b", &json!(5)).await.unwrap();
        assert!(store.fields("a/b").await.is_none());
    }
}
