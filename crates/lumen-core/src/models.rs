//! Data models for notes, image attachments, search hits and classifications.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A text note with its attachments. Owned by the caller; lumen only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Unique tag names; order carries no meaning.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Note {
    /// Create a note with a title and body and nothing else.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            ai_summary: None,
            key_points: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Attachments of kind `image`, in note order.
    pub fn image_attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter().filter(|a| a.is_image())
    }
}

/// Kind of file attached to a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    #[default]
    Image,
    Audio,
    Pdf,
    Other,
}

impl std::fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Audio => write!(f, "audio"),
            Self::Pdf => write!(f, "pdf"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for AttachmentKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "audio" => Ok(Self::Audio),
            "pdf" => Ok(Self::Pdf),
            "other" => Ok(Self::Other),
            _ => Err(format!("Invalid attachment kind: {}", s)),
        }
    }
}

/// A file attached to a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Stable identifier, unique within the owning note.
    pub id: Uuid,
    pub filename: String,
    #[serde(default)]
    pub kind: AttachmentKind,
    /// Where the image loader finds the bytes (path or storage key).
    pub storage_path: String,
}

impl Attachment {
    /// Create an image attachment whose bytes live at `storage_path`.
    pub fn image(filename: impl Into<String>, storage_path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            kind: AttachmentKind::Image,
            storage_path: storage_path.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == AttachmentKind::Image
    }
}

// =============================================================================
// IMAGE ANALYSIS TYPES
// =============================================================================

/// An RGB color with channels normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RgbColor {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Perceived luminance (ITU-R BT.601 weights).
    pub fn luminance(&self) -> f32 {
        0.299 * self.r + 0.587 * self.g + 0.114 * self.b
    }

    /// Sum of pairwise channel differences; 0 for pure greys.
    pub fn channel_spread(&self) -> f32 {
        (self.r - self.g).abs() + (self.g - self.b).abs() + (self.r - self.b).abs()
    }

    /// `#rrggbb` representation.
    pub fn to_hex(&self) -> String {
        let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            to_byte(self.r),
            to_byte(self.g),
            to_byte(self.b)
        )
    }
}

/// An object label reported by the vision provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub label: String,
    pub confidence: f32,
}

impl DetectedObject {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// A text bounding box in normalized image coordinates (`[0, 1]` on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Fraction of the image covered by this box.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// Derived signals for one image attachment, computed once and cached.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageSearchContext {
    /// Object labels above the detector confidence cutoff, in detector order.
    pub objects: Vec<String>,
    /// Recognized text lines joined with single spaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_text: Option<String>,
    /// Top scene classification label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_description: Option<String>,
    #[serde(default)]
    pub dominant_colors: Vec<RgbColor>,
    pub confidence: f32,
    pub analyzed_at: DateTime<Utc>,
}

impl ImageSearchContext {
    /// Context recorded when an image could not be loaded or decoded.
    pub fn empty() -> Self {
        Self {
            analyzed_at: Utc::now(),
            ..Default::default()
        }
    }

    /// True when no signal was extracted.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
            && self.ocr_text.is_none()
            && self.scene_description.is_none()
            && self.dominant_colors.is_empty()
    }
}

// =============================================================================
// SEARCH TYPES
// =============================================================================

/// Signal that produced a search hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    ObjectDetection,
    OcrText,
    Filename,
    NoteContent,
    SemanticContent,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ObjectDetection => write!(f, "object_detection"),
            Self::OcrText => write!(f, "ocr_text"),
            Self::Filename => write!(f, "filename"),
            Self::NoteContent => write!(f, "note_content"),
            Self::SemanticContent => write!(f, "semantic_content"),
        }
    }
}

/// One scored match between a query and an image attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub note: Arc<Note>,
    pub attachment: Attachment,
    /// Relevance in `[0, 1]`.
    pub score: f32,
    pub match_type: MatchType,
    pub snippet: String,
    pub context: ImageSearchContext,
}

impl SearchHit {
    pub fn attachment_id(&self) -> Uuid {
        self.attachment.id
    }
}

// =============================================================================
// CLASSIFICATION TYPES
// =============================================================================

/// Document type of an image, decided before text extraction runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    BusinessCard,
    Receipt,
    Invoice,
    Handwritten,
    Photo,
    Screenshot,
    Whiteboard,
    PrintedDocument,
    Unknown,
}

impl DocumentCategory {
    /// Extraction path recommended for this category.
    pub fn ocr_strategy(&self) -> OcrStrategy {
        match self {
            Self::Photo => OcrStrategy::Minimal,
            Self::Screenshot | Self::PrintedDocument | Self::Unknown => OcrStrategy::Standard,
            Self::BusinessCard => OcrStrategy::BusinessCard,
            Self::Receipt => OcrStrategy::Receipt,
            Self::Invoice => OcrStrategy::Structured,
            Self::Handwritten | Self::Whiteboard => OcrStrategy::Handwritten,
        }
    }
}

impl std::fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BusinessCard => write!(f, "business_card"),
            Self::Receipt => write!(f, "receipt"),
            Self::Invoice => write!(f, "invoice"),
            Self::Handwritten => write!(f, "handwritten"),
            Self::Photo => write!(f, "photo"),
            Self::Screenshot => write!(f, "screenshot"),
            Self::Whiteboard => write!(f, "whiteboard"),
            Self::PrintedDocument => write!(f, "printed_document"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Text-extraction path a caller should take for a classified image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrStrategy {
    Minimal,
    Standard,
    Structured,
    BusinessCard,
    Receipt,
    Handwritten,
}

impl std::fmt::Display for OcrStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minimal => write!(f, "minimal"),
            Self::Standard => write!(f, "standard"),
            Self::Structured => write!(f, "structured"),
            Self::BusinessCard => write!(f, "business_card"),
            Self::Receipt => write!(f, "receipt"),
            Self::Handwritten => write!(f, "handwritten"),
        }
    }
}

/// Result of classifying one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentClassification {
    pub category: DocumentCategory,
    pub confidence: f32,
    pub aspect_ratio: f32,
    pub dominant_colors: Vec<RgbColor>,
    pub has_text: bool,
    /// Sum of text box areas; exceeds 1.0 when boxes overlap.
    pub text_density: f32,
    pub ocr_strategy: OcrStrategy,
    /// `width`, `height`, `text_region_count`, `is_monochrome`.
    pub metadata: BTreeMap<String, JsonValue>,
}
