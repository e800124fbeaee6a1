use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::auth::FirebaseAuth;
use crate::error::StoreError;

const BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Whole-document view returned by a [`DocumentStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    /// Last path segment.
    pub id: String,
    /// Path relative to the database root, e.g. `users/u1/userProfile/u1`.
    pub path: String,
    pub fields: Map<String, Value>,
    /// Opaque revision marker; changes on every write to the document.
    pub version: String,
}

impl DocumentSnapshot {
    /// Fields plus an `id` entry, the shape bindings hand to the UI.
    pub fn to_value(&self) -> Value {
        let mut map = self.fields.clone();
        map.entry("id".to_string())
            .or_insert_with(|| json!(self.id));
        Value::Object(map)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.to_value()).map_err(|e| StoreError::InvalidDocument {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

/// The remote document database as seen by the rest of the crate.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document; `Ok(None)` when it does not exist.
    async fn get_document(&self, path: &str) -> Result<Option<DocumentSnapshot>, StoreError>;

    /// Every document directly under a collection path.
    async fn list_documents(&self, collection_path: &str)
        -> Result<Vec<DocumentSnapshot>, StoreError>;

    /// Merge-write: top-level fields in `patch` replace stored ones, all
    /// other fields are preserved. Creates the document if missing.
    async fn merge_document(&self, path: &str, patch: Map<String, Value>)
        -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct FirestoreClient {
    client: Client,
    auth: FirebaseAuth,
    project_id: String,
}

#[derive(Debug, Deserialize)]
pub struct Document {
    pub name: String,
    pub fields: Option<Map<String, Value>>,
    #[serde(rename = "createTime")]
    pub create_time: Option<String>,
    #[serde(rename = "updateTime")]
    pub update_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListDocumentsResponse {
    documents: Option<Vec<Document>>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

impl FirestoreClient {
    pub fn new(auth: FirebaseAuth, project_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            auth,
            project_id: project_id.into(),
        }
    }

    fn documents_base(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            BASE_URL, self.project_id
        )
    }

    fn resource_prefix(&self) -> String {
        format!("projects/{}/databases/(default)/documents/", self.project_id)
    }

    fn snapshot(&self, doc: Document) -> DocumentSnapshot {
        let path = doc
            .name
            .strip_prefix(&self.resource_prefix())
            .unwrap_or(&doc.name)
            .to_string();
        let id = path.rsplit('/').next().unwrap_or_default().to_string();
        let fields = match doc.fields {
            Some(fields) => match parse_firestore_fields(&Value::Object(fields)) {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            None => Map::new(),
        };
        let version = doc.update_time.or(doc.create_time).unwrap_or_default();

        DocumentSnapshot {
            id,
            path,
            fields,
            version,
        }
    }

    async fn fail(path: &str, resp: reqwest::Response) -> StoreError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        StoreError::Http {
            path: path.to_string(),
            status,
            body,
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn get_document(&self, path: &str) -> Result<Option<DocumentSnapshot>, StoreError> {
        let token = self.auth.get_id_token().await?;
        let url = format!("{}/{}", self.documents_base(), path);

        let resp = self.client.get(&url).bearer_auth(&token).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Self::fail(path, resp).await);
        }

        let doc: Document = resp.json().await?;
        Ok(Some(self.snapshot(doc)))
    }

    async fn list_documents(
        &self,
        collection_path: &str,
    ) -> Result<Vec<DocumentSnapshot>, StoreError> {
        let token = self.auth.get_id_token().await?;
        let url = format!("{}/{}", self.documents_base(), collection_path);

        let mut all = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self.client.get(&url).bearer_auth(&token);
            if let Some(ref pt) = page_token {
                req = req.query(&[("pageToken", pt)]);
            }

            let resp = req.send().await?;
            if !resp.status().is_success() {
                return Err(Self::fail(collection_path, resp).await);
            }

            let list_resp: ListDocumentsResponse = resp.json().await?;
            all.extend(
                list_resp
                    .documents
                    .unwrap_or_default()
                    .into_iter()
                    .map(|d| self.snapshot(d)),
            );

            match list_resp.next_page_token {
                Some(pt) if !pt.is_empty() => page_token = Some(pt),
                _ => break,
            }
        }

        Ok(all)
    }

    async fn merge_document(
        &self,
        path: &str,
        patch: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let token = self.auth.get_id_token().await?;
        let url = format!("{}/{}", self.documents_base(), path);

        let mut req = self.client.patch(&url).bearer_auth(&token);
        for key in patch.keys() {
            req = req.query(&[("updateMask.fieldPaths", field_path(key))]);
        }

        let fields = to_firestore_fields(&Value::Object(patch));
        let resp = req.json(&json!({ "fields": fields })).send().await?;

        if !resp.status().is_success() {
            return Err(Self::fail(path, resp).await);
        }

        debug!(path, "merge write applied");
        Ok(())
    }
}

/// Quote a field name for an update mask unless it is a plain identifier.
fn field_path(key: &str) -> String {
    let simple = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        key.to_string()
    } else {
        format!("`{}`", key.replace('`', "\\`"))
    }
}

/// In-process [`DocumentStore`], used offline and in tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Arc<RwLock<BTreeMap<String, (Map<String, Value>, u64)>>>,
    revision: Arc<AtomicU64>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Replace a document wholesale, as another client would.
    pub async fn put(&self, path: &str, fields: Value) {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let rev = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.docs.write().await.insert(path.to_string(), (fields, rev));
    }

    pub async fn delete(&self, path: &str) {
        self.docs.write().await.remove(path);
    }

    /// Raw stored fields, bypassing failure injection.
    pub async fn fields(&self, path: &str) -> Option<Map<String, Value>> {
        self.docs.read().await.get(path).map(|(f, _)| f.clone())
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("store unavailable".into()));
        }
        Ok(())
    }

    fn snapshot(path: &str, fields: &Map<String, Value>, rev: u64) -> DocumentSnapshot {
        DocumentSnapshot {
            id: path.rsplit('/').next().unwrap_or_default().to_string(),
            path: path.to_string(),
            fields: fields.clone(),
            version: rev.to_string(),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, path: &str) -> Result<Option<DocumentSnapshot>, StoreError> {
        self.check()?;
        let docs = self.docs.read().await;
        Ok(docs
            .get(path)
            .map(|(fields, rev)| Self::snapshot(path, fields, *rev)))
    }

    async fn list_documents(
        &self,
        collection_path: &str,
    ) -> Result<Vec<DocumentSnapshot>, StoreError> {
        self.check()?;
        let prefix = format!("{}/", collection_path.trim_end_matches('/'));
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|(path, _)| {
                path.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .map(|(path, (fields, rev))| Self::snapshot(path, fields, *rev))
            .collect())
    }

    async fn merge_document(
        &self,
        path: &str,
        patch: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.check()?;
        let rev = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let mut docs = self.docs.write().await;
        let entry = docs
            .entry(path.to_string())
            .or_insert_with(|| (Map::new(), rev));
        for (key, value) in patch {
            entry.0.insert(key, value);
        }
        entry.1 = rev;
        Ok(())
    }
}

/// Convert a serde_json::Value into Firestore's typed value format.
pub fn to_firestore_value(val: &Value) -> Value {
    match val {
        Value::Null => json!({"nullValue": null}),
        Value::Bool(b) => json!({"booleanValue": b}),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({"integerValue": i.to_string()})
            } else if let Some(f) = n.as_f64() {
                json!({"doubleValue": f})
            } else {
                json!({"integerValue": n.to_string()})
            }
        }
        Value::String(s) => json!({"stringValue": s}),
        Value::Array(arr) => {
            let values: Vec<Value> = arr.iter().map(to_firestore_value).collect();
            json!({"arrayValue": {"values": values}})
        }
        Value::Object(map) => {
            let mut fields = Map::new();
            for (k, v) in map {
                fields.insert(k.clone(), to_firestore_value(v));
            }
            json!({"mapValue": {"fields": fields}})
        }
    }
}

/// Convert a flat JSON object into Firestore fields format.
pub fn to_firestore_fields(obj: &Value) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(map) = obj.as_object() {
        for (k, v) in map {
            fields.insert(k.clone(), to_firestore_value(v));
        }
    }
    fields
}

/// Parse a Firestore typed value into a serde_json::Value.
pub fn parse_firestore_value(val: &Value) -> Value {
    if let Some(s) = val.get("stringValue") {
        return s.clone();
    }
    if let Some(i) = val.get("integerValue") {
        // Firestore sends integers as strings
        if let Some(n) = i.as_str().and_then(|s| s.parse::<i64>().ok()) {
            return json!(n);
        }
        return i.clone();
    }
    if let Some(d) = val.get("doubleValue") {
        return d.clone();
    }
    if let Some(b) = val.get("booleanValue") {
        return b.clone();
    }
    if val.get("nullValue").is_some() {
        return Value::Null;
    }
    if let Some(ts) = val.get("timestampValue") {
        return ts.clone();
    }
    if let Some(r) = val.get("referenceValue") {
        return r.clone();
    }
    if let Some(map) = val.get("mapValue") {
        return match map.get("fields") {
            Some(fields) => parse_firestore_fields(fields),
            None => json!({}),
        };
    }
    if let Some(arr) = val.get("arrayValue") {
        return match arr.get("values").and_then(|v| v.as_array()) {
            Some(values) => Value::Array(values.iter().map(parse_firestore_value).collect()),
            None => json!([]),
        };
    }

    val.clone()
}

/// Parse Firestore document fields into a flat JSON object.
pub fn parse_firestore_fields(fields: &Value) -> Value {
    if let Some(map) = fields.as_object() {
        let mut result = Map::new();
        for (key, val) in map {
            result.insert(key.clone(), parse_firestore_value(val));
        }
        Value::Object(result)
    } else {
        Value::Null
    }
}
