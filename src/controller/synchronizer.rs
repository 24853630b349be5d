//! View-state synchronizer
//!
//! Owns the live subscriptions behind the screen: one on the user record and,
//! chained off its `selectedGroupId`, one group lookup followed by the song
//! collection subscription. A group change cancels the old chain before the
//! new one starts, and every result is checked against the `GroupTag` it was
//! issued for before it may touch the local mirror.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::gateway::{self, CollectionPath, Document, DocumentPath, DocumentStore};
use crate::{log_gateway_request, log_gateway_result};
use crate::model::{
    next_open_stamp, Group, GroupChange, GroupTag, HostShell, Song, UserRecord, ViewState,
    GROUP_FETCH_ERROR, NO_GROUP_FOUND,
};

/// A running subscription task; dropping it cancels the subscription.
struct SubscriptionHandle {
    label: String,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    fn new(label: String, task: JoinHandle<()>) -> Self {
        Self { label, task }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.task.abort();
        tracing::debug!(subscription = %self.label, "Subscription cancelled");
    }
}

#[derive(Default)]
struct Handles {
    user_id: Option<String>,
    user: Option<SubscriptionHandle>,
    group: Option<SubscriptionHandle>,
}

impl Handles {
    fn active(&self) -> usize {
        usize::from(self.user.is_some()) + usize::from(self.group.is_some())
    }
}

#[derive(Clone)]
pub struct Synchronizer {
    store: Arc<dyn DocumentStore>,
    shell: Arc<dyn HostShell>,
    state: Arc<Mutex<ViewState>>,
    handles: Arc<Mutex<Handles>>,
}

impl Synchronizer {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        shell: Arc<dyn HostShell>,
        state: Arc<Mutex<ViewState>>,
    ) -> Self {
        Self {
            store,
            shell,
            state,
            handles: Arc::new(Mutex::new(Handles::default())),
        }
    }

    /// Subscribes to `users/{user_id}`. A running session is stopped first.
    pub async fn start(&self, user_id: &str) {
        self.stop().await;
        tracing::info!(user_id, "Starting view-state sync");

        self.state.lock().await.reset();
        self.shell.set_loading(true);

        // Held until the handle is stored so the first snapshot sees a live session
        let mut handles = self.handles.lock().await;
        let mut snapshots = self.store.watch_document(&DocumentPath::user(user_id));
        let this = self.clone();
        let owner = user_id.to_string();
        let task = tokio::spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                this.on_user_snapshot(&owner, snapshot).await;
            }
            tracing::debug!(user_id = %owner, "User subscription closed by store");
        });

        handles.user_id = Some(user_id.to_string());
        handles.user = Some(SubscriptionHandle::new(format!("users/{user_id}"), task));
    }

    /// Cancels every subscription. Safe to call any number of times.
    pub async fn stop(&self) {
        let mut handles = self.handles.lock().await;
        let had_any = handles.active() > 0;
        handles.group.take();
        handles.user.take();
        handles.user_id = None;
        if had_any {
            tracing::info!("View-state sync stopped");
        }
    }

    pub async fn active_subscriptions(&self) -> usize {
        self.handles.lock().await.active()
    }

    pub async fn user_id(&self) -> Option<String> {
        self.handles.lock().await.user_id.clone()
    }

    async fn on_user_snapshot(&self, user_id: &str, snapshot: gateway::Result<Option<Document>>) {
        let record = snapshot.and_then(|doc| UserRecord::from_document(user_id, doc.as_ref()));
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(user_id, error = %e, "User subscription failed");
                self.state.lock().await.set_user_error();
                self.shell.set_loading(false);
                return;
            }
        };

        let change = self.state.lock().await.apply_user(record);
        match change {
            GroupChange::Unchanged => {}
            GroupChange::Cleared => {
                tracing::info!(user_id, "No group selected");
                self.handles.lock().await.group.take();
                self.shell.set_loading(false);
            }
            GroupChange::Switched(tag) => {
                tracing::info!(
                    user_id,
                    group_id = %tag.group_id,
                    generation = tag.generation,
                    "Selected group changed"
                );
                self.switch_group(tag).await;
            }
        }
    }

    async fn switch_group(&self, tag: GroupTag) {
        let mut handles = self.handles.lock().await;
        // Old chain goes first so two groups never deliver at once
        handles.group.take();
        if handles.user.is_none() {
            return;
        }

        self.shell.set_loading(true);
        let this = self.clone();
        let label = format!("groups/{}", tag.group_id);
        let task = tokio::spawn(async move {
            let lookup = this.store.get(&DocumentPath::group(&tag.group_id)).await;
            if !this.on_group_resolved(&tag, lookup).await {
                return;
            }

            let mut snapshots = this.store.watch_collection(&CollectionPath::songs(&tag.group_id));
            while let Some(snapshot) = snapshots.recv().await {
                this.on_songs_snapshot(&tag, snapshot).await;
            }
        });
        handles.group = Some(SubscriptionHandle::new(label, task));
    }

    /// Stores the group name or a sentinel. Returns true when the group exists
    /// and is still the selected one, i.e. its songs should be subscribed.
    pub(crate) async fn on_group_resolved(
        &self,
        tag: &GroupTag,
        lookup: gateway::Result<Option<Document>>,
    ) -> bool {
        let (name, found) = match lookup.and_then(|doc| doc.map(|d| Group::from_document(&d)).transpose()) {
            Ok(Some(group)) => (Ok(group.name), true),
            Ok(None) => {
                tracing::warn!(group_id = %tag.group_id, "Selected group does not exist");
                (Err(NO_GROUP_FOUND), false)
            }
            Err(e) => {
                tracing::error!(group_id = %tag.group_id, error = %e, "Error fetching group");
                (Err(GROUP_FETCH_ERROR), false)
            }
        };

        let current = self.state.lock().await.resolve_group(tag, name);
        if !current {
            tracing::debug!(group_id = %tag.group_id, generation = tag.generation, "Discarding stale group lookup");
            return false;
        }
        self.shell.set_loading(false);
        found
    }

    pub(crate) async fn on_songs_snapshot(
        &self,
        tag: &GroupTag,
        snapshot: gateway::Result<Vec<Document>>,
    ) {
        let mut state = self.state.lock().await;
        if !state.is_current(tag) {
            tracing::debug!(group_id = %tag.group_id, "Discarding stale songs snapshot");
            return;
        }

        match snapshot {
            Ok(documents) => {
                let songs: Vec<Song> = documents
                    .iter()
                    .filter_map(|doc| match Song::from_document(&tag.group_id, doc) {
                        Ok(song) => Some(song),
                        Err(e) => {
                            tracing::warn!(song_id = %doc.id, error = %e, "Skipping malformed song");
                            None
                        }
                    })
                    .collect();
                tracing::debug!(group_id = %tag.group_id, songs = songs.len(), "Songs snapshot");
                state.replace_songs(tag, songs);
            }
            Err(e) => {
                tracing::error!(group_id = %tag.group_id, error = %e, "Songs subscription failed");
                state.fail_songs(tag);
            }
        }
        drop(state);
        self.shell.set_loading(false);
    }

    /// Writes `lastOpened.{song_id}` for the current user. Failures are
    /// logged and otherwise ignored; the local mirror only changes when the
    /// store echoes the write back through the user subscription.
    pub async fn record_opened(&self, song_id: &str) -> Option<DateTime<Utc>> {
        let Some(user_id) = self.user_id().await else {
            tracing::warn!(song_id, "Cannot record open without an active user");
            return None;
        };

        let previous = self.state.lock().await.last_opened(song_id);
        let stamp = next_open_stamp(previous, Utc::now());

        let mut fields = Map::new();
        fields.insert(format!("lastOpened.{song_id}"), Value::String(stamp.to_rfc3339()));

        log_gateway_request!("record_opened", user_id = %user_id, song_id);
        let result = self.store.update(&DocumentPath::user(&user_id), fields).await;
        log_gateway_result!("record_opened", result);
        Some(stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventually;
    use crate::gateway::MemoryStore;
    use crate::model::testing::RecordingShell;
    use crate::model::{NO_GROUP_SELECTED, SONGS_FETCH_ERROR};
    use serde_json::json;
    use std::time::Duration;

    struct Harness {
        store: MemoryStore,
        shell: Arc<RecordingShell>,
        state: Arc<Mutex<ViewState>>,
        sync: Synchronizer,
    }

    fn harness() -> Harness {
        let store = MemoryStore::from_fixture(&json!({
            "users": { "u1": { "selectedGroupId": "g1" } },
            "groups": {
                "g1": {
                    "name": "Chamber Choir",
                    "songs": {
                        "s1": { "name": "Ave Verum", "files": [] },
                        "s2": { "name": "Lux Aurumque", "files": [] }
                    }
                },
                "g2": {
                    "name": "Youth Choir",
                    "songs": { "t1": { "name": "Shenandoah", "files": [] } }
                }
            }
        }))
        .unwrap();
        let shell = Arc::new(RecordingShell::default());
        let state = Arc::new(Mutex::new(ViewState::default()));
        let sync = Synchronizer::new(Arc::new(store.clone()), shell.clone(), state.clone());
        Harness { store, shell, state, sync }
    }

    async fn song_ids(state: &Arc<Mutex<ViewState>>) -> Vec<String> {
        state.lock().await.songs.iter().map(|s| s.song_id.clone()).collect()
    }

    async fn select_group(store: &MemoryStore, group: Value) {
        store
            .set_document(&DocumentPath::user("u1"), json!({ "selectedGroupId": group }))
            .await;
    }

    #[tokio::test]
    async fn start_mirrors_group_and_songs() {
        let h = harness();
        h.sync.start("u1").await;

        eventually!(h.state.lock().await.songs.len() == 2);
        let state = h.state.lock().await.clone();
        assert_eq!(state.selected_group_id.as_deref(), Some("g1"));
        assert_eq!(state.group_name, "Chamber Choir");
        assert_eq!(h.shell.loading(), Some(false));
        assert_eq!(h.sync.active_subscriptions().await, 2);
    }

    #[tokio::test]
    async fn malformed_last_opened_entry_does_not_block_group_selection() {
        let h = harness();
        h.store
            .set_document(
                &DocumentPath::user("u1"),
                json!({ "selectedGroupId": "g1", "lastOpened": { "s1": 1714900000 } }),
            )
            .await;
        h.sync.start("u1").await;

        eventually!(h.state.lock().await.songs.len() == 2);
        let state = h.state.lock().await.clone();
        assert_eq!(state.selected_group_id.as_deref(), Some("g1"));
        assert_eq!(state.user_error, None);
        assert!(state.last_opened("s1").is_none());

        h.store
            .set_document(
                &DocumentPath::user("u1"),
                json!({ "selectedGroupId": "g2", "lastOpened": { "t1": { "seconds": 1 } } }),
            )
            .await;
        eventually!(song_ids(&h.state).await == vec!["t1".to_string()]);
        assert_eq!(h.state.lock().await.selected_group_id.as_deref(), Some("g2"));
        eventually!(h.store.active_watchers("groups/g1/songs").await == 0);
    }

    #[tokio::test]
    async fn song_list_is_replaced_on_every_snapshot() {
        let h = harness();
        h.sync.start("u1").await;
        eventually!(h.state.lock().await.songs.len() == 2);

        h.store
            .set_document(&DocumentPath::song("g1", "s3"), json!({ "name": "Sure on this Shining Night" }))
            .await;
        eventually!(h.state.lock().await.songs.len() == 3);

        h.store.remove_document(&DocumentPath::song("g1", "s1")).await;
        eventually!(song_ids(&h.state).await == vec!["s2".to_string(), "s3".to_string()]);
    }

    #[tokio::test]
    async fn switching_group_leaves_exactly_one_song_subscription() {
        let h = harness();
        h.sync.start("u1").await;
        eventually!(h.store.active_watchers("groups/g1/songs").await == 1);

        select_group(&h.store, json!("g2")).await;
        eventually!(song_ids(&h.state).await == vec!["t1".to_string()]);
        eventually!(h.store.active_watchers("groups/g1/songs").await == 0);
        assert_eq!(h.store.active_watchers("groups/g2/songs").await, 1);

        let state = h.state.lock().await.clone();
        assert_eq!(state.selected_group_id.as_deref(), Some("g2"));
        assert_eq!(state.group_name, "Youth Choir");

        // Writes to the old group no longer reach the mirror
        h.store
            .set_document(&DocumentPath::song("g1", "late"), json!({ "name": "Late" }))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(song_ids(&h.state).await, vec!["t1".to_string()]);
    }

    #[tokio::test]
    async fn slow_lookup_for_superseded_group_is_discarded() {
        let h = harness();
        h.store.delay("groups/g1", Duration::from_millis(150)).await;
        h.sync.start("u1").await;

        // Switch while the g1 lookup is still in flight
        tokio::time::sleep(Duration::from_millis(20)).await;
        select_group(&h.store, json!("g2")).await;

        eventually!(h.state.lock().await.group_name == "Youth Choir");
        tokio::time::sleep(Duration::from_millis(200)).await;

        let state = h.state.lock().await.clone();
        assert_eq!(state.group_name, "Youth Choir");
        assert_eq!(song_ids(&h.state).await, vec!["t1".to_string()]);
        assert_eq!(h.store.active_watchers("groups/g1/songs").await, 0);
    }

    #[tokio::test]
    async fn stale_tag_results_never_land() {
        let h = harness();
        h.sync.start("u1").await;
        eventually!(h.state.lock().await.songs.len() == 2);

        let stale = GroupTag { generation: 0, group_id: "g1".into() };
        let doc = Document::new("g1", Map::new());
        assert!(!h.sync.on_group_resolved(&stale, Ok(Some(doc))).await);
        h.sync.on_songs_snapshot(&stale, Ok(vec![])).await;
        assert_eq!(h.state.lock().await.songs.len(), 2);
    }

    #[tokio::test]
    async fn clearing_selection_empties_songs_and_sets_sentinel() {
        let h = harness();
        h.sync.start("u1").await;
        eventually!(h.state.lock().await.songs.len() == 2);

        select_group(&h.store, Value::Null).await;
        eventually!(h.state.lock().await.group_name == NO_GROUP_SELECTED);
        assert!(h.state.lock().await.songs.is_empty());
        eventually!(h.store.active_watchers("groups/g1/songs").await == 0);
        assert_eq!(h.sync.active_subscriptions().await, 1);
        assert_eq!(h.shell.loading(), Some(false));
    }

    #[tokio::test]
    async fn missing_user_document_means_no_group() {
        let h = harness();
        h.sync.start("nobody").await;
        eventually!(h.state.lock().await.group_name == NO_GROUP_SELECTED);
        assert_eq!(h.shell.loading(), Some(false));
    }

    #[tokio::test]
    async fn group_lookup_failure_resolves_to_sentinel() {
        let h = harness();
        h.store.fail_get(&DocumentPath::group("g1"), true).await;
        h.sync.start("u1").await;

        eventually!(h.state.lock().await.group_name == GROUP_FETCH_ERROR);
        assert!(h.state.lock().await.songs.is_empty());
        assert_eq!(h.shell.loading(), Some(false));
        assert_eq!(h.store.active_watchers("groups/g1/songs").await, 0);
    }

    #[tokio::test]
    async fn deleted_group_is_a_valid_state() {
        let h = harness();
        h.store.remove_document(&DocumentPath::group("g1")).await;
        h.sync.start("u1").await;

        eventually!(h.state.lock().await.group_name == NO_GROUP_FOUND);
        assert_eq!(h.shell.loading(), Some(false));
    }

    #[tokio::test]
    async fn songs_subscription_error_flags_sentinel_and_clears_loading() {
        let h = harness();
        h.sync.start("u1").await;
        eventually!(h.store.active_watchers("groups/g1/songs").await == 1);

        h.store.break_collection(&CollectionPath::songs("g1"), "backend down").await;
        eventually!(h.state.lock().await.songs_error.as_deref() == Some(SONGS_FETCH_ERROR));
        assert_eq!(h.shell.loading(), Some(false));
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_releases_everything() {
        let h = harness();
        h.sync.start("u1").await;
        eventually!(h.store.active_watchers("groups/g1/songs").await == 1);

        h.sync.stop().await;
        h.sync.stop().await;

        assert_eq!(h.sync.active_subscriptions().await, 0);
        eventually!(h.store.active_watchers("users/u1").await == 0);
        eventually!(h.store.active_watchers("groups/g1/songs").await == 0);
    }

    #[tokio::test]
    async fn record_opened_writes_monotonic_timestamp() {
        let h = harness();
        let future: DateTime<Utc> = Utc::now() + chrono::Duration::hours(1);
        h.store
            .set_document(
                &DocumentPath::user("u1"),
                json!({ "selectedGroupId": "g1", "lastOpened": { "s1": future.to_rfc3339() } }),
            )
            .await;
        h.sync.start("u1").await;
        eventually!(h.state.lock().await.last_opened("s1").is_some());

        let stamp = h.sync.record_opened("s1").await.unwrap();
        assert!(stamp >= future);

        let fresh = h.sync.record_opened("s2").await.unwrap();
        eventually!(h.state.lock().await.last_opened("s2") == Some(fresh));
    }

    #[tokio::test]
    async fn record_opened_failure_leaves_mirror_unchanged() {
        let h = harness();
        h.sync.start("u1").await;
        eventually!(h.state.lock().await.songs.len() == 2);

        h.store.fail_updates(true).await;
        assert!(h.sync.record_opened("s1").await.is_some());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(h.state.lock().await.last_opened("s1").is_none());
    }

    #[tokio::test]
    async fn record_opened_without_user_is_skipped() {
        let h = harness();
        assert!(h.sync.record_opened("s1").await.is_none());
    }
}
