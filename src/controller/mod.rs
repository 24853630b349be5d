//! Controller module - Application logic and event handling
//!
//! This module contains the application controller that handles user input,
//! keeps the model in sync with the remote store and drives song selection.
//! It is organized into submodules by responsibility:
//!
//! - `synchronizer`: Live user/group/song subscriptions feeding the view state
//! - `resolution`: Download URL lookup for the selected song's files
//! - `navigation`: Song selection, back, paging, zoom and pan
//! - `input`: Key event handling

mod synchronizer;
mod resolution;
mod navigation;
mod input;

use std::sync::Arc;

use crate::gateway::{BlobStore, DocumentStore};
use crate::model::{AppModel, HostShell};

pub use synchronizer::Synchronizer;

#[derive(Clone)]
pub struct AppController {
    pub(crate) model: Arc<AppModel>,
    pub(crate) synchronizer: Synchronizer,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) shell: Arc<dyn HostShell>,
}

impl AppController {
    pub fn new(
        model: Arc<AppModel>,
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        shell: Arc<dyn HostShell>,
    ) -> Self {
        let synchronizer = Synchronizer::new(store, shell.clone(), model.view_state.clone());
        Self {
            model,
            synchronizer,
            blobs,
            shell,
        }
    }

    /// Mounts the screen for a user: starts the subscriptions and the
    /// carousel animation.
    pub async fn mount(&self, user_id: &str) {
        self.shell.set_chrome_visible(true);
        self.model.spin.lock().await.start(std::time::Instant::now());
        self.synchronizer.start(user_id).await;
    }

    /// Tears everything down. Safe to call more than once.
    pub async fn unmount(&self) {
        self.synchronizer.stop().await;
        self.model.spin.lock().await.stop(std::time::Instant::now());
    }
}
