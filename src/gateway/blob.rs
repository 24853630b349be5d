//! Local directory blob store

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::{BlobStore, GatewayError, Result};

/// Resolves storage paths to `file://` URLs under a root directory
#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn locate(&self, storage_path: &str) -> Result<PathBuf> {
        let relative = Path::new(storage_path.trim_start_matches('/'));
        // Storage paths are always relative to the bucket root
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(GatewayError::PermissionDenied(storage_path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn resolve_download_url(&self, storage_path: &str) -> Result<String> {
        let candidate = self.locate(storage_path)?;
        if !tokio::fs::try_exists(&candidate).await? {
            return Err(GatewayError::NotFound(storage_path.to_string()));
        }
        let absolute = tokio::fs::canonicalize(&candidate).await?;
        Ok(format!("file://{}", absolute.display()))
    }
}
