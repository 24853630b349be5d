//! Main application model with state management

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use super::animation::SpinAnimation;
use super::selection::SelectionState;
use super::shell::ShellState;
use super::types::{Mode, Song};
use super::view_state::ViewState;
use super::viewer::{ImageViewer, PagingStrategy, Transform, ZoomStrategy};

/// Everything the view needs for one frame
#[derive(Clone, Debug)]
pub struct Screen {
    pub view: ViewState,
    pub selection: SelectionState,
    pub transform: Transform,
    pub zoom_strategy: ZoomStrategy,
    pub spin_degrees: f32,
    pub loading: bool,
    pub chrome_visible: bool,
}

impl Screen {
    /// Song under the carousel's current page.
    pub fn current_song(&self) -> Option<&Song> {
        self.view.song(self.selection.carousel.index())
    }
}

/// Main application model containing all state
pub struct AppModel {
    pub view_state: Arc<Mutex<ViewState>>,
    pub selection: Arc<Mutex<SelectionState>>,
    pub viewer: Arc<Mutex<ImageViewer>>,
    pub spin: Arc<Mutex<SpinAnimation>>,
    pub shell: Arc<ShellState>,
    pub should_quit: Arc<Mutex<bool>>,
}

impl AppModel {
    pub fn new(zoom: ZoomStrategy, paging: PagingStrategy, page_width: f32) -> Self {
        Self {
            view_state: Arc::new(Mutex::new(ViewState::default())),
            selection: Arc::new(Mutex::new(SelectionState::default())),
            viewer: Arc::new(Mutex::new(ImageViewer::new(zoom, paging, page_width))),
            spin: Arc::new(Mutex::new(SpinAnimation::default())),
            shell: Arc::new(ShellState::default()),
            should_quit: Arc::new(Mutex::new(false)),
        }
    }

    pub async fn get_view_state(&self) -> ViewState {
        self.view_state.lock().await.clone()
    }

    pub async fn get_selection(&self) -> SelectionState {
        self.selection.lock().await.clone()
    }

    pub async fn mode(&self) -> Mode {
        self.selection.lock().await.mode
    }

    /// Keeps the carousel pager in step with the song list, which the
    /// synchronizer may replace at any time.
    pub async fn sync_carousel(&self) -> usize {
        let count = self.view_state.lock().await.songs.len();
        let mut selection = self.selection.lock().await;
        selection.carousel.set_count(count);
        selection.carousel.index()
    }

    pub async fn should_quit(&self) -> bool {
        *self.should_quit.lock().await
    }

    pub async fn set_should_quit(&self, quit: bool) {
        *self.should_quit.lock().await = quit;
    }

    pub async fn get_screen(&self, now: Instant) -> Screen {
        self.sync_carousel().await;
        let view = self.get_view_state().await;
        let selection = self.get_selection().await;
        let (transform, zoom_strategy) = {
            let viewer = self.viewer.lock().await;
            (viewer.transform_at(now), viewer.strategy())
        };
        let spin_degrees = self.spin.lock().await.degrees_at(now);

        Screen {
            view,
            selection,
            transform,
            zoom_strategy,
            spin_degrees,
            loading: self.shell.is_loading(),
            chrome_visible: self.shell.is_chrome_visible(),
        }
    }
}
