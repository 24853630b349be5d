//! Live in-memory document store
//!
//! Holds every document in a single ordered map and pushes a fresh snapshot
//! to every live watcher whenever a document changes. Seeded from a JSON
//! fixture at startup; tests drive it directly and use the failure hooks to
//! exercise degraded paths.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, RwLock};

use super::{
    BlobStore, CollectionPath, Document, DocumentPath, DocumentStore, GatewayError, Result,
    SnapshotStream,
};

type DocumentSender = mpsc::UnboundedSender<Result<Option<Document>>>;
type CollectionSender = mpsc::UnboundedSender<Result<Vec<Document>>>;

#[derive(Default)]
struct Inner {
    documents: BTreeMap<DocumentPath, Map<String, Value>>,
    document_watchers: HashMap<DocumentPath, Vec<DocumentSender>>,
    collection_watchers: HashMap<CollectionPath, Vec<CollectionSender>>,
    blobs: HashMap<String, String>,
    failing_gets: HashSet<DocumentPath>,
    failing_blobs: HashSet<String>,
    fail_updates: bool,
    delays: HashMap<String, Duration>,
}

impl Inner {
    fn document(&self, path: &DocumentPath) -> Option<Document> {
        self.documents
            .get(path)
            .map(|fields| Document::new(path.id(), fields.clone()))
    }

    fn collection(&self, path: &CollectionPath) -> Vec<Document> {
        self.documents
            .iter()
            .filter(|(doc_path, _)| doc_path.parent() == *path)
            .map(|(doc_path, fields)| Document::new(doc_path.id(), fields.clone()))
            .collect()
    }

    fn notify(&mut self, path: &DocumentPath) {
        let snapshot = self.document(path);
        if let Some(watchers) = self.document_watchers.get_mut(path) {
            watchers.retain(|tx| tx.send(Ok(snapshot.clone())).is_ok());
        }

        let parent = path.parent();
        let listing = self.collection(&parent);
        if let Some(watchers) = self.collection_watchers.get_mut(&parent) {
            watchers.retain(|tx| tx.send(Ok(listing.clone())).is_ok());
        }
    }
}

/// In-memory `DocumentStore` + `BlobStore`
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a fixture of the form
    /// `{"users": {uid: {..}}, "groups": {gid: {"name": .., "songs": {sid: {..}}}}, "blobs": {path: url}}`.
    pub fn from_fixture(fixture: &Value) -> anyhow::Result<Self> {
        let mut inner = Inner::default();

        if let Some(users) = fixture.get("users").and_then(Value::as_object) {
            for (uid, fields) in users {
                let fields = fields
                    .as_object()
                    .with_context(|| format!("user {uid} is not an object"))?;
                inner.documents.insert(DocumentPath::user(uid), fields.clone());
            }
        }

        if let Some(groups) = fixture.get("groups").and_then(Value::as_object) {
            for (gid, group) in groups {
                let mut fields = group
                    .as_object()
                    .with_context(|| format!("group {gid} is not an object"))?
                    .clone();
                if let Some(songs) = fields.remove("songs") {
                    let songs = songs
                        .as_object()
                        .with_context(|| format!("songs of group {gid} is not an object"))?;
                    for (sid, song) in songs {
                        let song = song
                            .as_object()
                            .with_context(|| format!("song {gid}/{sid} is not an object"))?;
                        inner.documents.insert(DocumentPath::song(gid, sid), song.clone());
                    }
                }
                inner.documents.insert(DocumentPath::group(gid), fields);
            }
        }

        if let Some(blobs) = fixture.get("blobs").and_then(Value::as_object) {
            for (storage_path, url) in blobs {
                if let Some(url) = url.as_str() {
                    inner.blobs.insert(storage_path.clone(), url.to_string());
                }
            }
        }

        tracing::debug!(documents = inner.documents.len(), blobs = inner.blobs.len(), "Fixture loaded");

        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
        })
    }

    pub async fn load_fixture(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading fixture {}", path.display()))?;
        let fixture: Value = serde_json::from_str(&content)
            .with_context(|| format!("parsing fixture {}", path.display()))?;
        Self::from_fixture(&fixture)
    }

    /// Replaces a document and pushes the change to its watchers.
    pub async fn set_document(&self, path: &DocumentPath, fields: Value) {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let mut inner = self.inner.write().await;
        inner.documents.insert(path.clone(), fields);
        inner.notify(path);
    }

    pub async fn remove_document(&self, path: &DocumentPath) {
        let mut inner = self.inner.write().await;
        if inner.documents.remove(path).is_some() {
            inner.notify(path);
        }
    }

    pub async fn document(&self, path: &DocumentPath) -> Option<Document> {
        self.inner.read().await.document(path)
    }

    pub async fn set_blob(&self, storage_path: &str, url: &str) {
        let mut inner = self.inner.write().await;
        inner.blobs.insert(storage_path.to_string(), url.to_string());
    }

    /// Makes one-shot reads of `path` fail until cleared.
    pub async fn fail_get(&self, path: &DocumentPath, failing: bool) {
        let mut inner = self.inner.write().await;
        if failing {
            inner.failing_gets.insert(path.clone());
        } else {
            inner.failing_gets.remove(path);
        }
    }

    pub async fn fail_blob(&self, storage_path: &str) {
        let mut inner = self.inner.write().await;
        inner.failing_blobs.insert(storage_path.to_string());
    }

    pub async fn fail_updates(&self, failing: bool) {
        self.inner.write().await.fail_updates = failing;
    }

    /// Delays reads of a document path or resolution of a storage path.
    pub async fn delay(&self, key: &str, delay: Duration) {
        let mut inner = self.inner.write().await;
        inner.delays.insert(key.to_string(), delay);
    }

    /// Pushes an error to every live watcher of a collection.
    pub async fn break_collection(&self, path: &CollectionPath, message: &str) {
        let mut inner = self.inner.write().await;
        if let Some(watchers) = inner.collection_watchers.get_mut(path) {
            watchers.retain(|tx| {
                tx.send(Err(GatewayError::Unavailable(message.to_string())))
                    .is_ok()
            });
        }
    }

    /// Number of subscriptions on `path` whose receiver is still alive.
    pub async fn active_watchers(&self, path: &str) -> usize {
        let inner = self.inner.read().await;
        let documents = inner
            .document_watchers
            .iter()
            .filter(|(p, _)| p.as_str() == path)
            .flat_map(|(_, watchers)| watchers.iter())
            .filter(|tx| !tx.is_closed())
            .count();
        let collections = inner
            .collection_watchers
            .iter()
            .filter(|(p, _)| p.as_str() == path)
            .flat_map(|(_, watchers)| watchers.iter())
            .filter(|tx| !tx.is_closed())
            .count();
        documents + collections
    }

    async fn pause_for(&self, key: &str) {
        let delay = self.inner.read().await.delays.get(key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Writes `value` at a possibly dotted key, creating intermediate maps.
fn merge_field(fields: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            fields.insert(key.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = fields
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(nested) = entry {
                merge_field(nested, rest, value);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn watch_document(&self, path: &DocumentPath) -> SnapshotStream<Option<Document>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = self.inner.clone();
        let path = path.clone();
        // Registration needs the async lock; the receiver is usable right away.
        tokio::spawn(async move {
            let mut inner = inner.write().await;
            if tx.send(Ok(inner.document(&path))).is_ok() {
                let watchers = inner.document_watchers.entry(path).or_default();
                watchers.retain(|tx| !tx.is_closed());
                watchers.push(tx);
            }
        });
        rx
    }

    fn watch_collection(&self, path: &CollectionPath) -> SnapshotStream<Vec<Document>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = self.inner.clone();
        let path = path.clone();
        tokio::spawn(async move {
            let mut inner = inner.write().await;
            if tx.send(Ok(inner.collection(&path))).is_ok() {
                let watchers = inner.collection_watchers.entry(path).or_default();
                watchers.retain(|tx| !tx.is_closed());
                watchers.push(tx);
            }
        });
        rx
    }

    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>> {
        self.pause_for(path.as_str()).await;
        let inner = self.inner.read().await;
        if inner.failing_gets.contains(path) {
            return Err(GatewayError::Unavailable(format!("get {path} failed")));
        }
        Ok(inner.document(path))
    }

    async fn update(&self, path: &DocumentPath, fields: Map<String, Value>) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.fail_updates {
            return Err(GatewayError::Unavailable(format!("update {path} rejected")));
        }
        let Some(document) = inner.documents.get_mut(path) else {
            return Err(GatewayError::NotFound(path.to_string()));
        };
        for (key, value) in fields {
            merge_field(document, &key, value);
        }
        inner.notify(path);
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn resolve_download_url(&self, storage_path: &str) -> Result<String> {
        self.pause_for(storage_path).await;
        let inner = self.inner.read().await;
        if inner.failing_blobs.contains(storage_path) {
            return Err(GatewayError::PermissionDenied(storage_path.to_string()));
        }
        inner
            .blobs
            .get(storage_path)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(storage_path.to_string()))
    }
}
