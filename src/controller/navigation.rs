//! Song selection, back navigation, paging and zoom

use std::time::Instant;

use crate::config::ZOOM_STEP_FACTOR;
use crate::model::{Mode, SelectionTicket, Song, ViewableItem, ZoomState};
use super::AppController;

impl AppController {
    /// Browsing → Viewing. Ignored while a song is already open.
    ///
    /// The mode flips before anything else happens. Recording the open and
    /// resolving file URLs run in the background and may finish in any order.
    pub async fn select_song(&self, song: &Song) -> Option<SelectionTicket> {
        let Some(ticket) = self.model.selection.lock().await.select(song) else {
            tracing::debug!(song_id = %song.song_id, "Ignoring select while viewing");
            return None;
        };
        tracing::info!(song_id = %song.song_id, name = %song.name, files = song.files.len(), "Song selected");

        self.model.viewer.lock().await.reset();
        self.model.spin.lock().await.stop(Instant::now());
        self.shell.set_chrome_visible(false);

        let synchronizer = self.synchronizer.clone();
        let song_id = song.song_id.clone();
        tokio::spawn(async move {
            synchronizer.record_opened(&song_id).await;
        });

        let controller = self.clone();
        let files = song.without_urls().files;
        let for_resolution = ticket.clone();
        tokio::spawn(async move {
            controller.resolve_selected_files(for_resolution, files).await;
        });

        Some(ticket)
    }

    /// Selects the song under the carousel's current page, if any.
    pub async fn select_current_song(&self) -> Option<SelectionTicket> {
        if self.model.mode().await != Mode::Browsing {
            return None;
        }
        let index = self.model.sync_carousel().await;
        let song = self.model.view_state.lock().await.song(index).cloned()?;
        self.select_song(&song).await
    }

    /// Viewing → Browsing. No-op while browsing.
    pub async fn back(&self) {
        if !self.model.selection.lock().await.back() {
            return;
        }
        tracing::debug!("Back to song list");
        self.model.viewer.lock().await.reset();
        self.model.spin.lock().await.start(Instant::now());
        self.shell.set_chrome_visible(true);
    }

    pub async fn next_page(&self) {
        self.step_page(true).await;
    }

    pub async fn prev_page(&self) {
        self.step_page(false).await;
    }

    /// Previous/Next controls. The step lands through the configured paging
    /// callback, exactly like a swipe that settled on the neighbouring page.
    async fn step_page(&self, forward: bool) {
        self.model.sync_carousel().await;
        let viewer = self.model.viewer.lock().await;
        let mut selection = self.model.selection.lock().await;
        let pager = selection.active_pager_mut();
        let target = if forward {
            pager.index().saturating_add(1)
        } else {
            pager.index().saturating_sub(1)
        };
        if target != pager.index() {
            viewer.settle_on(pager, target);
        }
    }

    /// Horizontal scroll callback of the active pager.
    pub async fn on_scroll(&self, content_offset: f32) {
        self.model.sync_carousel().await;
        let viewer = self.model.viewer.lock().await;
        let mut selection = self.model.selection.lock().await;
        viewer.on_scroll(selection.active_pager_mut(), content_offset);
    }

    /// Visibility callback of the active pager.
    pub async fn on_viewable_items(&self, items: &[ViewableItem]) {
        self.model.sync_carousel().await;
        let viewer = self.model.viewer.lock().await;
        let mut selection = self.model.selection.lock().await;
        viewer.on_viewable_items(selection.active_pager_mut(), items);
    }

    /// One discrete zoom step; a full pinch gesture under the pinch strategy.
    pub async fn zoom(&self, zoom_in: bool) {
        if self.model.mode().await != Mode::Viewing {
            return;
        }
        let factor = if zoom_in { ZOOM_STEP_FACTOR } else { 1.0 / ZOOM_STEP_FACTOR };
        let mut viewer = self.model.viewer.lock().await;
        match viewer.zoom_state_mut() {
            ZoomState::PinchPan(pinch) => {
                pinch.pinch_began();
                pinch.pinch_changed(factor);
                pinch.pinch_ended(Instant::now());
            }
            ZoomState::Zoomable(zoomable) => zoomable.zoom_by(factor),
        }
    }

    /// One discrete pan step.
    pub async fn pan(&self, dx: f32, dy: f32) {
        if self.model.mode().await != Mode::Viewing {
            return;
        }
        let mut viewer = self.model.viewer.lock().await;
        match viewer.zoom_state_mut() {
            ZoomState::PinchPan(pinch) => {
                pinch.pan_changed(dx, dy);
                pinch.pan_ended();
            }
            ZoomState::Zoomable(zoomable) => zoomable.pan_by(dx, dy),
        }
    }

    pub async fn reset_zoom(&self) {
        self.model.viewer.lock().await.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use crate::eventually;
    use crate::gateway::{DocumentPath, MemoryStore};
    use crate::model::testing::RecordingShell;
    use crate::model::{AppModel, PagingStrategy, Transform, ZoomStrategy};
    use super::*;

    struct Harness {
        store: MemoryStore,
        shell: Arc<RecordingShell>,
        model: Arc<AppModel>,
        controller: AppController,
    }

    async fn harness(zoom: ZoomStrategy) -> Harness {
        harness_with(zoom, PagingStrategy::Offset).await
    }

    async fn harness_with(zoom: ZoomStrategy, paging: PagingStrategy) -> Harness {
        let store = MemoryStore::from_fixture(&json!({
            "users": { "u1": { "selectedGroupId": "g1" } },
            "groups": {
                "g1": {
                    "name": "Chamber Choir",
                    "songs": {
                        "s1": {
                            "name": "Ave Verum",
                            "files": [
                                { "name": "page 1", "url": "ave/1.png" },
                                { "name": "page 2", "url": "ave/2.png" },
                                { "name": "page 3", "url": "ave/3.png" }
                            ]
                        },
                        "s2": {
                            "name": "Lux Aurumque",
                            "files": [ { "name": "score", "url": "lux/score.pdf" } ]
                        }
                    }
                }
            },
            "blobs": {
                "ave/1.png": "https://cdn/ave/1.png",
                "ave/2.png": "https://cdn/ave/2.png",
                "ave/3.png": "https://cdn/ave/3.png",
                "lux/score.pdf": "https://cdn/lux/score.pdf"
            }
        }))
        .unwrap();
        let shell = Arc::new(RecordingShell::default());
        let model = Arc::new(AppModel::new(zoom, paging, 400.0));
        let controller = AppController::new(
            model.clone(),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            shell.clone(),
        );
        controller.mount("u1").await;
        eventually!(model.view_state.lock().await.songs.len() == 2);
        Harness { store, shell, model, controller }
    }

    async fn song(h: &Harness, id: &str) -> Song {
        h.model
            .view_state
            .lock()
            .await
            .songs
            .iter()
            .find(|s| s.song_id == id)
            .cloned()
            .unwrap()
    }

    async fn resolved(h: &Harness) -> Vec<Option<String>> {
        h.model
            .selection
            .lock()
            .await
            .selected_song
            .as_ref()
            .map(|s| s.files.iter().map(|f| f.resolved_url.clone()).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn selecting_a_song_enters_viewing_and_hides_chrome() {
        let h = harness(ZoomStrategy::PinchPan).await;
        let s1 = song(&h, "s1").await;

        let ticket = h.controller.select_song(&s1).await.unwrap();

        let selection = h.model.get_selection().await;
        assert_eq!(selection.mode, Mode::Viewing);
        assert_eq!(selection.selected_song.as_ref().unwrap().song_id, "s1");
        assert_eq!(ticket.song_id, "s1");
        assert_eq!(h.shell.chrome_visible(), Some(false));
        assert!(!h.model.spin.lock().await.is_running());

        eventually!(h.model.view_state.lock().await.last_opened("s1").is_some());
        eventually!(resolved(&h).await.iter().all(Option::is_some));
    }

    #[tokio::test]
    async fn failed_file_stays_unavailable_while_siblings_resolve() {
        let h = harness(ZoomStrategy::PinchPan).await;
        h.store.fail_blob("ave/2.png").await;
        let s1 = song(&h, "s1").await;

        h.controller.select_song(&s1).await;
        eventually!(resolved(&h).await[0].is_some());
        eventually!(resolved(&h).await[2].is_some());

        let urls = resolved(&h).await;
        assert_eq!(urls[0].as_deref(), Some("https://cdn/ave/1.png"));
        assert_eq!(urls[1], None);
        assert_eq!(urls[2].as_deref(), Some("https://cdn/ave/3.png"));
        assert_eq!(h.model.mode().await, Mode::Viewing);
    }

    #[tokio::test]
    async fn back_restores_browsing_and_reselect_resolves_again() {
        let h = harness(ZoomStrategy::PinchPan).await;
        let s1 = song(&h, "s1").await;

        h.controller.select_song(&s1).await;
        eventually!(resolved(&h).await.iter().all(Option::is_some));

        h.controller.back().await;
        let selection = h.model.get_selection().await;
        assert_eq!(selection.mode, Mode::Browsing);
        assert!(selection.selected_song.is_none());
        assert_eq!(h.shell.chrome_visible(), Some(true));
        assert!(h.model.spin.lock().await.is_running());

        h.store.set_blob("ave/1.png", "https://cdn/ave/1-v2.png").await;
        h.store.delay("ave/3.png", Duration::from_millis(50)).await;
        h.controller.select_song(&s1).await;
        // Nothing carried over from the previous selection
        assert!(resolved(&h).await.iter().all(Option::is_none));
        eventually!(resolved(&h).await[0].as_deref() == Some("https://cdn/ave/1-v2.png"));
    }

    #[tokio::test]
    async fn slow_resolution_for_previous_song_is_discarded() {
        let h = harness(ZoomStrategy::PinchPan).await;
        h.store.delay("ave/1.png", Duration::from_millis(100)).await;
        let s1 = song(&h, "s1").await;
        let s2 = song(&h, "s2").await;

        h.controller.select_song(&s1).await;
        h.controller.back().await;
        h.controller.select_song(&s2).await;

        eventually!(resolved(&h).await == vec![Some("https://cdn/lux/score.pdf".to_string())]);
        tokio::time::sleep(Duration::from_millis(150)).await;

        let selection = h.model.get_selection().await;
        let selected = selection.selected_song.unwrap();
        assert_eq!(selected.song_id, "s2");
        assert_eq!(selected.files.len(), 1);
        assert_eq!(resolved(&h).await, vec![Some("https://cdn/lux/score.pdf".to_string())]);
    }

    #[tokio::test]
    async fn reopening_writes_a_newer_timestamp() {
        let h = harness(ZoomStrategy::PinchPan).await;
        let s1 = song(&h, "s1").await;

        h.controller.select_song(&s1).await;
        eventually!(h.model.view_state.lock().await.last_opened("s1").is_some());
        let first = h.model.view_state.lock().await.last_opened("s1").unwrap();

        h.controller.back().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        h.controller.select_song(&s1).await;
        eventually!(h.model.view_state.lock().await.last_opened("s1").unwrap() > first);

        let user = h.store.document(&DocumentPath::user("u1")).await.unwrap();
        assert!(user.fields["lastOpened"]["s1"].is_string());
    }

    #[tokio::test]
    async fn write_failure_does_not_block_viewing() {
        let h = harness(ZoomStrategy::PinchPan).await;
        h.store.fail_updates(true).await;
        let s1 = song(&h, "s1").await;

        h.controller.select_song(&s1).await;
        eventually!(resolved(&h).await.iter().all(Option::is_some));
        assert_eq!(h.model.mode().await, Mode::Viewing);
        assert!(h.model.view_state.lock().await.last_opened("s1").is_none());
    }

    #[tokio::test]
    async fn carousel_paging_clamps_to_song_count() {
        let h = harness(ZoomStrategy::PinchPan).await;
        h.controller.prev_page().await;
        assert_eq!(h.model.get_selection().await.carousel.index(), 0);

        for _ in 0..5 {
            h.controller.next_page().await;
        }
        assert_eq!(h.model.get_selection().await.carousel.index(), 1);

        let ticket = h.controller.select_current_song().await.unwrap();
        assert_eq!(ticket.song_id, "s2");
    }

    #[tokio::test]
    async fn viewer_paging_follows_scroll_offset() {
        let h = harness(ZoomStrategy::PinchPan).await;
        let s1 = song(&h, "s1").await;
        h.controller.select_song(&s1).await;

        h.controller.on_scroll(800.0).await;
        assert_eq!(h.model.get_selection().await.pages.index(), 2);
        h.controller.next_page().await;
        assert_eq!(h.model.get_selection().await.pages.index(), 2);
        h.controller.on_scroll(0.0).await;
        h.controller.prev_page().await;
        assert_eq!(h.model.get_selection().await.pages.index(), 0);
    }

    #[tokio::test]
    async fn selecting_another_song_while_viewing_is_ignored() {
        let h = harness(ZoomStrategy::PinchPan).await;
        let s1 = song(&h, "s1").await;
        let s2 = song(&h, "s2").await;

        h.controller.select_song(&s1).await.unwrap();
        assert!(h.controller.select_song(&s2).await.is_none());

        let selection = h.model.get_selection().await;
        assert_eq!(selection.selected_song.unwrap().song_id, "s1");
        assert_eq!(selection.pages.count(), 3);
        eventually!(resolved(&h).await.iter().all(Option::is_some));
        assert!(h.model.view_state.lock().await.last_opened("s2").is_none());
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn arrow_keys_page_through_visibility_callbacks() {
        let h = harness_with(ZoomStrategy::PinchPan, PagingStrategy::Visibility).await;

        h.controller.handle_key_event(press(KeyCode::Right)).await.unwrap();
        assert_eq!(h.model.get_selection().await.carousel.index(), 1);
        h.controller.handle_key_event(press(KeyCode::Right)).await.unwrap();
        assert_eq!(h.model.get_selection().await.carousel.index(), 1);

        h.controller.handle_key_event(press(KeyCode::Enter)).await.unwrap();
        let selection = h.model.get_selection().await;
        assert_eq!(selection.mode, Mode::Viewing);
        assert_eq!(selection.selected_song.unwrap().song_id, "s2");

        h.controller.handle_key_event(press(KeyCode::Esc)).await.unwrap();
        h.controller.handle_key_event(press(KeyCode::Left)).await.unwrap();
        h.controller.handle_key_event(press(KeyCode::Enter)).await.unwrap();
        h.controller.handle_key_event(press(KeyCode::Char('l'))).await.unwrap();
        h.controller.handle_key_event(press(KeyCode::Char('l'))).await.unwrap();
        h.controller.handle_key_event(press(KeyCode::Char('l'))).await.unwrap();
        assert_eq!(h.model.get_selection().await.pages.index(), 2);
        h.controller.handle_key_event(press(KeyCode::Char('h'))).await.unwrap();
        assert_eq!(h.model.get_selection().await.pages.index(), 1);
    }

    #[tokio::test]
    async fn visibility_paging_ignores_scroll_offsets() {
        let h = harness_with(ZoomStrategy::PinchPan, PagingStrategy::Visibility).await;
        let s1 = song(&h, "s1").await;
        h.controller.select_song(&s1).await.unwrap();

        h.controller.on_scroll(800.0).await;
        assert_eq!(h.model.get_selection().await.pages.index(), 0);

        h.controller
            .on_viewable_items(&[
                ViewableItem { index: 1, visible_fraction: 0.4 },
                ViewableItem { index: 2, visible_fraction: 0.6 },
            ])
            .await;
        assert_eq!(h.model.get_selection().await.pages.index(), 2);

        // Nothing past the threshold: the page stays put
        h.controller
            .on_viewable_items(&[ViewableItem { index: 0, visible_fraction: 0.2 }])
            .await;
        assert_eq!(h.model.get_selection().await.pages.index(), 2);
    }

    #[tokio::test]
    async fn select_current_song_is_ignored_while_viewing() {
        let h = harness(ZoomStrategy::PinchPan).await;
        h.controller.select_current_song().await.unwrap();
        assert!(h.controller.select_current_song().await.is_none());
    }

    #[tokio::test]
    async fn zoom_steps_follow_chosen_strategy() {
        let h = harness(ZoomStrategy::Zoomable).await;
        let s1 = song(&h, "s1").await;

        h.controller.zoom(true).await;
        assert_eq!(h.model.viewer.lock().await.transform_at(Instant::now()), Transform::REST);

        h.controller.select_song(&s1).await;
        h.controller.zoom(true).await;
        h.controller.zoom(true).await;
        let scale = h.model.viewer.lock().await.transform_at(Instant::now()).scale;
        assert!((scale - ZOOM_STEP_FACTOR * ZOOM_STEP_FACTOR).abs() < 1e-4);

        h.controller.back().await;
        assert_eq!(h.model.viewer.lock().await.transform_at(Instant::now()), Transform::REST);
    }

    #[tokio::test]
    async fn pinch_zoom_out_snaps_back_and_locks_pan() {
        let h = harness(ZoomStrategy::PinchPan).await;
        let s1 = song(&h, "s1").await;
        h.controller.select_song(&s1).await;

        h.controller.zoom(false).await;
        h.controller.pan(30.0, 0.0).await;
        let later = Instant::now() + Duration::from_secs(1);
        assert_eq!(h.model.viewer.lock().await.transform_at(later), Transform::REST);

        h.controller.zoom(true).await;
        h.controller.pan(30.0, 0.0).await;
        let t = h.model.viewer.lock().await.transform_at(later);
        assert_eq!(t.translate_x, 30.0);
    }

    #[tokio::test]
    async fn unmount_twice_leaves_no_subscription() {
        let h = harness(ZoomStrategy::PinchPan).await;
        h.controller.unmount().await;
        h.controller.unmount().await;
        assert_eq!(h.controller.synchronizer.active_subscriptions().await, 0);
        eventually!(h.store.active_watchers("users/u1").await == 0);
        eventually!(h.store.active_watchers("groups/g1/songs").await == 0);
    }
}
