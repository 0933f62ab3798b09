//! Core traits for lumen abstractions.
//!
//! These traits define the external collaborators the search engine and the
//! classifier consume, enabling pluggable backends and testability.

use async_trait::async_trait;
use image::DynamicImage;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// VISION PROVIDER
// =============================================================================

/// Vision analysis capability (object detection, OCR, scene labels, text boxes).
///
/// Every call is independent; an implementation failing one call must not
/// poison the others.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Detect objects with their confidence.
    async fn detect_objects(&self, image: &DynamicImage) -> Result<Vec<DetectedObject>>;

    /// Recognize text, one string per line.
    async fn recognize_text(&self, image: &DynamicImage) -> Result<Vec<String>>;

    /// Top scene classification label, if any.
    async fn classify_scene(&self, image: &DynamicImage) -> Result<Option<String>>;

    /// Locate text regions without reading them.
    async fn detect_text_regions(&self, image: &DynamicImage) -> Result<Vec<BoundingBox>>;

    /// Check if the provider is available.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// STORAGE TRAITS
// =============================================================================

/// Loads the raw bytes behind an attachment.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, attachment: &Attachment) -> Result<Vec<u8>>;
}

/// Source of candidate notes when a search names none.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Fetch every note visible to the engine.
    async fn fetch_all_notes(&self) -> Result<Vec<Note>>;
}
