//! Live bindings from remote documents into local state.
//!
//! A binding owns at most one background subscription. Subscriptions poll
//! the store and publish a new [`BindingState`] only when the remote
//! revision changes, so consumers see whole-value replacements.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::SyncSettings;
use crate::error::StoreError;
use crate::firestore::{DocumentSnapshot, DocumentStore};

/// What a binding exposes to the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Revision of the remote value currently in `data`.
    pub version: Option<String>,
}

impl<T> BindingState<T> {
    fn loading() -> Self {
        Self {
            data: None,
            is_loading: true,
            error: None,
            version: None,
        }
    }

    fn idle() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
            version: None,
        }
    }

    fn failed(error: &StoreError) -> Self {
        Self {
            data: None,
            is_loading: false,
            error: Some(error.to_string()),
            version: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Document,
    Collection,
}

impl Kind {
    async fn fetch(
        self,
        store: &dyn DocumentStore,
        path: &str,
    ) -> Result<Vec<DocumentSnapshot>, StoreError> {
        match self {
            Kind::Document => Ok(store.get_document(path).await?.into_iter().collect()),
            Kind::Collection => store.list_documents(path).await,
        }
    }
}

type Decoder<T> = fn(&[DocumentSnapshot]) -> Result<Option<T>, StoreError>;

fn decode_document<T: DeserializeOwned>(
    snaps: &[DocumentSnapshot],
) -> Result<Option<T>, StoreError> {
    snaps.first().map(|s| s.decode::<T>()).transpose()
}

fn decode_collection<T: DeserializeOwned>(
    snaps: &[DocumentSnapshot],
) -> Result<Option<Vec<T>>, StoreError> {
    snaps
        .iter()
        .map(|s| s.decode::<T>())
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Revision marker for a fetched set; a missing document maps to `"-"`.
pub(crate) fn signature(snaps: &[DocumentSnapshot]) -> String {
    if snaps.is_empty() {
        return "-".to_string();
    }
    snaps
        .iter()
        .map(|s| format!("{}@{}", s.id, s.version))
        .collect::<Vec<_>>()
        .join(",")
}

/// A single live subscription, torn down when the binding is dropped.
pub struct Binding<T> {
    store: Arc<dyn DocumentStore>,
    settings: SyncSettings,
    kind: Kind,
    path: Option<String>,
    decode: Decoder<T>,
    state: watch::Sender<BindingState<T>>,
    task: Option<JoinHandle<()>>,
}

/// Binding to one document.
pub type DocumentBinding<T> = Binding<T>;
/// Binding to every document under a collection path.
pub type CollectionBinding<T> = Binding<Vec<T>>;

impl<T> Binding<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Bind to a document. A `None` path defers the subscription until
    /// [`set_path`](Self::set_path) supplies one.
    pub fn document(
        store: Arc<dyn DocumentStore>,
        settings: SyncSettings,
        path: Option<String>,
    ) -> Self {
        Self::build(store, settings, Kind::Document, path, decode_document::<T>)
    }
}

impl<T> Binding<Vec<T>>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn collection(
        store: Arc<dyn DocumentStore>,
        settings: SyncSettings,
        path: Option<String>,
    ) -> Self {
        Self::build(
            store,
            settings,
            Kind::Collection,
            path,
            decode_collection::<T>,
        )
    }
}

impl<T> Binding<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn build(
        store: Arc<dyn DocumentStore>,
        settings: SyncSettings,
        kind: Kind,
        path: Option<String>,
        decode: Decoder<T>,
    ) -> Self {
        let (state, _) = watch::channel(BindingState::idle());
        let mut binding = Self {
            store,
            settings,
            kind,
            path: None,
            decode,
            state,
            task: None,
        };
        binding.retarget(path);
        binding
    }

    /// Receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<BindingState<T>> {
        self.state.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> BindingState<T> {
        self.state.borrow().clone()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn is_subscribed(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Point the binding somewhere else. The previous subscription is
    /// stopped before the new one starts; an unchanged path is a no-op.
    pub fn set_path(&mut self, path: Option<String>) {
        if path == self.path && (path.is_none() || self.task.is_some()) {
            return;
        }
        self.retarget(path);
    }

    /// Stop the subscription. The last published state is kept.
    pub fn teardown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(path = ?self.path(), "binding unsubscribed");
        }
    }

    fn retarget(&mut self, path: Option<String>) {
        self.teardown();
        self.path = path;

        let Some(path) = self.path.clone() else {
            self.state.send_replace(BindingState::idle());
            return;
        };

        self.state.send_replace(BindingState::loading());
        debug!(path = %path, "binding subscribed");
        self.task = Some(tokio::spawn(poll(
            self.store.clone(),
            self.kind,
            path,
            self.decode,
            self.state.clone(),
            self.settings.poll_interval(),
            self.settings.max_backoff(),
        )));
    }
}

impl<T> Drop for Binding<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn poll<T>(
    store: Arc<dyn DocumentStore>,
    kind: Kind,
    path: String,
    decode: Decoder<T>,
    state: watch::Sender<BindingState<T>>,
    interval: Duration,
    max_backoff: Duration,
) where
    T: Clone + Send + Sync + 'static,
{
    let mut last_signature: Option<String> = None;
    let mut delay = interval;

    loop {
        let result = match kind.fetch(store.as_ref(), &path).await {
            Ok(snaps) => {
                let sig = signature(&snaps);
                if last_signature.as_deref() == Some(sig.as_str()) {
                    Ok(None)
                } else {
                    decode(&snaps).map(|data| Some((sig, data)))
                }
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(Some((sig, data))) => {
                delay = interval;
                state.send_replace(BindingState {
                    data,
                    is_loading: false,
                    error: None,
                    version: Some(sig.clone()),
                });
                last_signature = Some(sig);
            }
            Ok(None) => delay = interval,
            Err(e) => {
                warn!(path = %path, error = %e, "subscription error");
                last_signature = None;
                state.send_replace(BindingState::failed(&e));
                delay = (delay * 2).min(max_backoff);
            }
        }

        tokio::time::sleep(delay).await;
    }
}
