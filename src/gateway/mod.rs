//! Gateway module - Remote document database and blob storage
//!
//! The app never owns persistent data. Everything it shows comes from two
//! external collaborators, abstracted here so the rest of the code only sees
//! snapshots and download URLs:
//!
//! - `DocumentStore`: live document/collection subscriptions, one-shot reads
//!   and partial updates
//! - `BlobStore`: resolution of storage paths to downloadable URLs
//!
//! Submodules:
//!
//! - `path`: Document and collection path helpers (`users/{uid}`, ...)
//! - `memory`: Live in-memory store seeded from a JSON fixture
//! - `blob`: Local directory blob store

mod blob;
mod memory;
mod path;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

pub use blob::LocalBlobStore;
pub use memory::MemoryStore;
pub use path::{CollectionPath, DocumentPath};

/// Errors surfaced by gateway operations
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// A point-in-time copy of one stored document
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Decodes the document fields into a typed record.
    pub fn decode<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|source| {
            GatewayError::Decode {
                path: path.to_string(),
                source,
            }
        })
    }
}

/// Receiving end of a live subscription.
///
/// The first item is the current value; every later item fully replaces it.
/// Dropping the receiver cancels the subscription on the store side.
pub type SnapshotStream<T> = mpsc::UnboundedReceiver<Result<T>>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Subscribes to a single document. `None` snapshots mean the document does not exist.
    fn watch_document(&self, path: &DocumentPath) -> SnapshotStream<Option<Document>>;

    /// Subscribes to every document of a collection.
    fn watch_collection(&self, path: &CollectionPath) -> SnapshotStream<Vec<Document>>;

    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>>;

    /// Merges `fields` into an existing document. Dotted keys (`lastOpened.s1`)
    /// address a single entry of a nested map.
    async fn update(&self, path: &DocumentPath, fields: Map<String, Value>) -> Result<()>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn resolve_download_url(&self, storage_path: &str) -> Result<String>;
}
