//! Test helpers for search engine integration tests.
//!
//! Provides an in-memory image store and a fixed note repository.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lumen_core::{Attachment, Error, ImageLoader, Note, NoteRepository, Result};

/// Image bytes keyed by storage path.
///
/// Images are rendered at caller-chosen sizes so the mock vision provider can
/// script a distinct answer for each one.
#[derive(Default)]
pub struct InMemoryImageLoader {
    images: HashMap<String, Vec<u8>>,
    loads: AtomicUsize,
}

impl InMemoryImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a solid-color PNG of `width` x `height` at `path`.
    pub fn with_png(mut self, path: &str, width: u32, height: u32) -> Self {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 144, 255])));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("PNG encoding should succeed");
        self.images.insert(path.to_string(), bytes);
        self
    }

    /// Store raw bytes at `path`, e.g. something that is not an image.
    pub fn with_bytes(mut self, path: &str, bytes: &[u8]) -> Self {
        self.images.insert(path.to_string(), bytes.to_vec());
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageLoader for InMemoryImageLoader {
    async fn load(&self, attachment: &Attachment) -> Result<Vec<u8>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.images
            .get(&attachment.storage_path)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("image {}", attachment.storage_path)))
    }
}

/// Repository returning a fixed note list.
pub struct StaticRepository(pub Vec<Note>);

#[async_trait]
impl NoteRepository for StaticRepository {
    async fn fetch_all_notes(&self) -> Result<Vec<Note>> {
        Ok(self.0.clone())
    }
}

/// A note with a single image attachment stored at `path`.
pub fn note_with_image(title: &str, content: &str, filename: &str, path: &str) -> Note {
    let mut note = Note::new(title, content);
    note.attachments.push(Attachment::image(filename, path));
    note
}
