//! Download URL resolution for the selected song's files

use futures::future::join_all;

use crate::gateway::BlobStore;
use crate::model::{FileRef, SelectionTicket};
use super::AppController;

/// Resolves every file concurrently. A failed lookup yields `None` for that
/// file only; siblings are unaffected.
pub async fn resolve_file_urls(blobs: &dyn BlobStore, files: &[FileRef]) -> Vec<Option<String>> {
    let lookups = files.iter().map(|file| async move {
        match blobs.resolve_download_url(&file.storage_path).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(
                    file = %file.name,
                    storage_path = %file.storage_path,
                    error = %e,
                    "Could not resolve download URL"
                );
                None
            }
        }
    });
    join_all(lookups).await
}

impl AppController {
    /// Resolves the files of the selection identified by `ticket` and commits
    /// the URLs, unless the user has since selected something else.
    pub async fn resolve_selected_files(&self, ticket: SelectionTicket, files: Vec<FileRef>) -> bool {
        let urls = resolve_file_urls(self.blobs.as_ref(), &files).await;
        let resolved = urls.iter().filter(|u| u.is_some()).count();

        let committed = self.model.selection.lock().await.apply_resolved(&ticket, urls);
        if committed {
            tracing::info!(
                song_id = %ticket.song_id,
                resolved,
                total = files.len(),
                "File URLs resolved"
            );
        } else {
            tracing::debug!(song_id = %ticket.song_id, "Discarding URLs for a previous selection");
        }
        committed
    }
}
