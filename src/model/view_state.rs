//! Local mirror of the remote user, group and song data
//!
//! Every async result that feeds this state carries the `GroupTag` it was
//! issued for. A result whose tag no longer matches the current group is
//! dropped, so a slow reply for a previous group can never overwrite data
//! for the one selected now.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::types::{Song, UserRecord};

pub const NO_GROUP_SELECTED: &str = "No group selected";
pub const NO_GROUP_FOUND: &str = "No group found";
pub const GROUP_FETCH_ERROR: &str = "Error fetching group";
pub const SONGS_FETCH_ERROR: &str = "Error fetching songs";
pub const USER_LOAD_ERROR: &str = "Error loading user";

/// Identifies the group a request or subscription was opened for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupTag {
    pub generation: u64,
    pub group_id: String,
}

/// What a user snapshot did to the group selection
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupChange {
    Unchanged,
    /// Selection went away; songs are cleared and the sentinel name is set.
    Cleared,
    /// A new group must be fetched and subscribed under this tag.
    Switched(GroupTag),
}

#[derive(Clone, Debug, Default)]
pub struct ViewState {
    pub selected_group_id: Option<String>,
    pub group_name: String,
    pub songs: Vec<Song>,
    pub last_opened: HashMap<String, DateTime<Utc>>,
    pub user_error: Option<String>,
    pub songs_error: Option<String>,
    generation: u64,
    user_seen: bool,
}

impl ViewState {
    /// Forgets everything from a previous session. The generation keeps
    /// counting so tags issued before the reset stay stale.
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    pub fn apply_user(&mut self, record: UserRecord) -> GroupChange {
        self.last_opened = record.last_opened;
        self.user_error = None;

        let first = !self.user_seen;
        self.user_seen = true;
        if !first && record.selected_group_id == self.selected_group_id {
            return GroupChange::Unchanged;
        }

        self.generation += 1;
        self.selected_group_id = record.selected_group_id;
        self.songs.clear();
        self.songs_error = None;

        match &self.selected_group_id {
            None => {
                self.group_name = NO_GROUP_SELECTED.to_string();
                GroupChange::Cleared
            }
            Some(group_id) => {
                self.group_name.clear();
                GroupChange::Switched(GroupTag {
                    generation: self.generation,
                    group_id: group_id.clone(),
                })
            }
        }
    }

    pub fn set_user_error(&mut self) {
        self.user_error = Some(USER_LOAD_ERROR.to_string());
        if !self.user_seen {
            self.group_name = USER_LOAD_ERROR.to_string();
        }
    }

    pub fn is_current(&self, tag: &GroupTag) -> bool {
        tag.generation == self.generation
            && self.selected_group_id.as_deref() == Some(tag.group_id.as_str())
    }

    /// Stores the group name, or a sentinel when the group could not be used.
    /// Returns false for stale tags.
    pub fn resolve_group(&mut self, tag: &GroupTag, name: Result<String, &'static str>) -> bool {
        if !self.is_current(tag) {
            return false;
        }
        match name {
            Ok(name) => self.group_name = name,
            Err(sentinel) => {
                self.group_name = sentinel.to_string();
                self.songs.clear();
            }
        }
        true
    }

    /// Replaces the whole song list. Returns false for stale tags.
    pub fn replace_songs(&mut self, tag: &GroupTag, songs: Vec<Song>) -> bool {
        if !self.is_current(tag) {
            return false;
        }
        self.songs = songs;
        self.songs_error = None;
        true
    }

    /// Flags a failed song subscription, keeping the last delivered list.
    pub fn fail_songs(&mut self, tag: &GroupTag) -> bool {
        if !self.is_current(tag) {
            return false;
        }
        self.songs_error = Some(SONGS_FETCH_ERROR.to_string());
        true
    }

    pub fn song(&self, index: usize) -> Option<&Song> {
        self.songs.get(index)
    }

    pub fn last_opened(&self, song_id: &str) -> Option<DateTime<Utc>> {
        self.last_opened.get(song_id).copied()
    }
}

/// Timestamp for a new open of a song: now, but never earlier than the
/// value already recorded.
pub fn next_open_stamp(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(previous) if previous > now => previous,
        _ => now,
    }
}
