//! Core record types mirrored from the document store

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::gateway::{self, Document, DocumentPath};

/// Which of the two screen modes is active
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Browsing,
    Viewing,
}

/// Mirror of `users/{uid}`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub selected_group_id: Option<String>,
    pub last_opened: HashMap<String, DateTime<Utc>>,
}

/// Raw user fields; each one is validated separately.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UserFields {
    #[serde(default, alias = "choir_selected")]
    selected_group_id: Option<Value>,
    #[serde(default)]
    last_opened: Value,
}

impl UserRecord {
    /// An absent user document is a user with nothing selected yet.
    pub fn from_document(user_id: &str, document: Option<&Document>) -> gateway::Result<Self> {
        let fields: UserFields = match document {
            Some(doc) => doc.decode(DocumentPath::user(user_id).as_str())?,
            None => UserFields::default(),
        };

        let selected_group_id = match fields.selected_group_id {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id).filter(|id| !id.is_empty()),
            Some(other) => {
                tracing::warn!(user_id, value = %other, "Ignoring non-string selected group");
                None
            }
        };

        let entries = match fields.last_opened {
            Value::Object(map) => map,
            Value::Null => Default::default(),
            other => {
                tracing::warn!(user_id, value = %other, "Ignoring non-map last-opened field");
                Default::default()
            }
        };
        let last_opened = entries
            .into_iter()
            .filter_map(|(song_id, value)| match parse_stamp(&value) {
                Some(stamp) => Some((song_id, stamp)),
                None => {
                    tracing::warn!(user_id, song_id = %song_id, value = %value, "Skipping malformed last-opened entry");
                    None
                }
            })
            .collect();

        Ok(Self {
            id: user_id.to_string(),
            selected_group_id,
            last_opened,
        })
    }
}

fn parse_stamp(value: &Value) -> Option<DateTime<Utc>> {
    value.as_str()?.parse::<DateTime<Utc>>().ok()
}

/// Mirror of `groups/{groupId}`
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize)]
struct GroupFields {
    name: String,
}

impl Group {
    pub fn from_document(document: &Document) -> gateway::Result<Self> {
        let fields: GroupFields = document.decode(DocumentPath::group(&document.id).as_str())?;
        Ok(Self {
            id: document.id.clone(),
            name: fields.name,
        })
    }
}

/// One file attached to a song.
///
/// `resolved_url` is a per-selection cache, never written back to the store.
#[derive(Clone, Debug, PartialEq)]
pub struct FileRef {
    pub name: String,
    pub storage_path: String,
    pub resolved_url: Option<String>,
}

impl FileRef {
    pub fn is_available(&self) -> bool {
        self.resolved_url.is_some()
    }
}

/// Mirror of `groups/{groupId}/songs/{songId}`
#[derive(Clone, Debug, PartialEq)]
pub struct Song {
    pub song_id: String,
    pub name: String,
    pub files: Vec<FileRef>,
}

#[derive(Deserialize)]
struct SongFields {
    #[serde(default)]
    name: String,
    #[serde(default)]
    files: Vec<FileFields>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileFields {
    #[serde(default)]
    name: String,
    #[serde(alias = "url")]
    storage_path: String,
}

impl Song {
    pub fn from_document(group_id: &str, document: &Document) -> gateway::Result<Self> {
        let fields: SongFields =
            document.decode(DocumentPath::song(group_id, &document.id).as_str())?;
        Ok(Self {
            song_id: document.id.clone(),
            name: fields.name,
            files: fields
                .files
                .into_iter()
                .map(|f| FileRef {
                    name: f.name,
                    storage_path: f.storage_path,
                    resolved_url: None,
                })
                .collect(),
        })
    }

    /// Copy of the song with every cached URL dropped.
    pub fn without_urls(&self) -> Self {
        Self {
            files: self
                .files
                .iter()
                .map(|f| FileRef {
                    resolved_url: None,
                    ..f.clone()
                })
                .collect(),
            ..self.clone()
        }
    }
}
