//! Filesystem storage for uploaded post images.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::application::posts::{MediaStore, MediaStoreError};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Outcome of writing an upload to disk.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub stored_path: String,
    pub checksum: String,
    pub size_bytes: usize,
}

/// Image storage rooted at the configured media directory. Stored
/// paths are relative and date-partitioned, e.g.
/// `posts/2025/01/<uuid>-vacation.png`.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    /// Initialise storage rooted at the provided directory, creating it
    /// if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub async fn store(
        &self,
        bytes: &[u8],
        original_name: &str,
        extension: &str,
    ) -> Result<StoredImage, MediaError> {
        let stored_path = build_stored_path(original_name, extension);
        let absolute = self.resolve(&stored_path)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&absolute, bytes).await?;

        let checksum = hex::encode(Sha256::digest(bytes));
        Ok(StoredImage {
            stored_path,
            checksum,
            size_bytes: bytes.len(),
        })
    }

    /// Reads a stored file back. `Ok(None)` means the path is valid but
    /// nothing is stored there.
    pub async fn load(&self, stored_path: &str) -> Result<Option<Bytes>, MediaError> {
        let absolute = self.resolve(stored_path)?;
        match fs::read(&absolute).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(stored_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(MediaError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStore for MediaStorage {
    async fn store_image(
        &self,
        bytes: &[u8],
        original_name: &str,
        extension: &str,
    ) -> Result<String, MediaStoreError> {
        let stored = self
            .store(bytes, original_name, extension)
            .await
            .map_err(|err| MediaStoreError(err.to_string()))?;
        debug!(
            path = %stored.stored_path,
            checksum = %stored.checksum,
            size_bytes = stored.size_bytes,
            "stored uploaded image"
        );
        Ok(stored.stored_path)
    }
}

fn build_stored_path(original_name: &str, extension: &str) -> String {
    let (year, month, _) = time::OffsetDateTime::now_utc().to_calendar_date();
    let token = Uuid::new_v4().simple();
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(slug::slugify)
        .unwrap_or_default();
    if stem.is_empty() {
        format!("posts/{year}/{:02}/{token}.{extension}", month as u8)
    } else {
        format!("posts/{year}/{:02}/{token}-{stem}.{extension}", month as u8)
    }
}
