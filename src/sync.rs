use crate::binding::BindingState;

/// Session-local copy of a remote value.
///
/// Local edits are authoritative for the active session. A remote snapshot
/// replaces the local value only when its revision differs from the last one
/// applied, so re-delivering an already-seen snapshot never clobbers edits.
#[derive(Debug, Clone)]
pub struct LocalState<T> {
    value: T,
    applied_version: Option<String>,
}

impl<T: Clone> LocalState<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: initial,
            applied_version: None,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Apply a local (optimistic) edit.
    pub fn update(&mut self, f: impl FnOnce(&mut T)) -> &T {
        f(&mut self.value);
        &self.value
    }

    /// Reconcile with the latest binding state. Returns whether the local
    /// value was overwritten.
    pub fn reconcile(&mut self, remote: &BindingState<T>) -> bool {
        let (Some(data), Some(version)) = (&remote.data, &remote.version) else {
            return false;
        };
        if self.applied_version.as_deref() == Some(version.as_str()) {
            return false;
        }
        self.value = data.clone();
        self.applied_version = Some(version.clone());
        true
    }

    /// Record `remote`'s revision as seen without adopting its value, so a
    /// later reconcile with the same revision is a no-op.
    pub fn acknowledge(&mut self, remote: &BindingState<T>) {
        if let Some(version) = &remote.version {
            self.applied_version = Some(version.clone());
        }
    }

    /// Whether any remote revision has been applied or acknowledged.
    pub fn is_synced(&self) -> bool {
        self.applied_version.is_some()
    }
}
