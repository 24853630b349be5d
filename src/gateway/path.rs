//! Document and collection paths

use std::fmt;

const USERS: &str = "users";
const GROUPS: &str = "groups";
const SONGS: &str = "songs";

/// Slash-separated path to a single document, e.g. `groups/g1/songs/s1`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

/// Slash-separated path to a collection, e.g. `groups/g1/songs`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl DocumentPath {
    pub fn user(user_id: &str) -> Self {
        Self(format!("{USERS}/{user_id}"))
    }

    pub fn group(group_id: &str) -> Self {
        Self(format!("{GROUPS}/{group_id}"))
    }

    pub fn song(group_id: &str, song_id: &str) -> Self {
        Self(format!("{GROUPS}/{group_id}/{SONGS}/{song_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    pub fn parent(&self) -> CollectionPath {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => CollectionPath(parent.to_string()),
            None => CollectionPath(String::new()),
        }
    }
}

impl CollectionPath {
    pub fn songs(group_id: &str) -> Self {
        Self(format!("{GROUPS}/{group_id}/{SONGS}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn doc(&self, id: &str) -> DocumentPath {
        DocumentPath(format!("{}/{}", self.0, id))
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
