//! Filesystem-backed note repository and image loader.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use lumen_core::{Attachment, Error, ImageLoader, Note, NoteRepository, Result};
use tokio::fs;
use tracing::debug;

/// Notes stored as a JSON array in a single file.
pub struct JsonNoteRepository {
    path: PathBuf,
}

impl JsonNoteRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl NoteRepository for JsonNoteRepository {
    async fn fetch_all_notes(&self) -> Result<Vec<Note>> {
        let bytes = fs::read(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("notes file {}", self.path.display()))
            } else {
                Error::Io(e)
            }
        })?;
        let notes: Vec<Note> = serde_json::from_slice(&bytes)?;
        debug!(path = %self.path.display(), result_count = notes.len(), "Loaded notes");
        Ok(notes)
    }
}

/// Reads attachment bytes from files under a base directory.
///
/// Storage paths are relative to the base directory and may not climb out of it.
pub struct FsImageLoader {
    base_path: PathBuf,
}

impl FsImageLoader {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, storage_path: &str) -> Result<PathBuf> {
        let relative = Path::new(storage_path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if storage_path.is_empty() || escapes {
            return Err(Error::InvalidInput(format!(
                "storage path must stay inside the image directory: {}",
                storage_path
            )));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl ImageLoader for FsImageLoader {
    async fn load(&self, attachment: &Attachment) -> Result<Vec<u8>> {
        let full_path = self.full_path(&attachment.storage_path)?;
        debug!(
            attachment_id = %attachment.id,
            full_path = %full_path.display(),
            "Reading attachment"
        );
        Ok(fs::read(full_path).await?)
    }
}
