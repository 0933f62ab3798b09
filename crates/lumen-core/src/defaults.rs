//! Centralized default constants for lumen.
//!
//! **This module is the single source of truth** for shared default values and
//! the heuristic thresholds used by search scoring and document classification.
//! The thresholds were tuned against real attachments; keep the exact values.

// =============================================================================
// IMAGE ANALYSIS
// =============================================================================

/// Object labels at or below this detector confidence are discarded.
pub const OBJECT_CONFIDENCE_THRESHOLD: f32 = 0.3;

/// Confidence recorded for a context whose image was decoded and analyzed.
pub const ANALYZED_CONTEXT_CONFIDENCE: f32 = 0.8;

/// Side length of the square an image is downsampled to before color sampling.
pub const COLOR_SAMPLE_SIZE: u32 = 50;

/// Only every Nth pixel of the downsampled image is counted.
pub const COLOR_SAMPLE_STRIDE: usize = 4;

/// Quantization step for 8-bit channels when ranking dominant colors.
pub const COLOR_QUANTIZE_STEP: u8 = 64;

/// Maximum dominant colors stored on an `ImageSearchContext`.
pub const CONTEXT_DOMINANT_COLORS: usize = 3;

/// Default number of vision analyses allowed in flight at once.
pub const MAX_CONCURRENT_ANALYSES: usize = 4;

// =============================================================================
// SEARCH SCORING
// =============================================================================

/// Similarity above which an object label counts as a partial match.
pub const OBJECT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Weight of an exact object-label match.
pub const OBJECT_EXACT_WEIGHT: f32 = 1.0;

/// Weight of a partial object-label match.
pub const OBJECT_PARTIAL_WEIGHT: f32 = 0.7;

/// Filename score when the filename equals the query.
pub const FILENAME_EXACT_SCORE: f32 = 1.0;

/// Filename score when the filename starts with the query.
pub const FILENAME_PREFIX_SCORE: f32 = 0.9;

/// Filename score when the filename contains the query.
pub const FILENAME_CONTAINS_SCORE: f32 = 0.8;

/// Note-content field weights.
pub const NOTE_TITLE_WEIGHT: f32 = 0.3;
pub const NOTE_BODY_WEIGHT: f32 = 0.2;
pub const NOTE_TAG_WEIGHT: f32 = 0.2;
pub const NOTE_SUMMARY_WEIGHT: f32 = 0.2;
pub const NOTE_KEY_POINT_WEIGHT: f32 = 0.1;

/// Note-content hits rank below direct image signals.
pub const NOTE_CONTENT_DAMPING: f32 = 0.8;

/// Default snippet length in characters for search hits.
pub const SNIPPET_LENGTH: usize = 120;

// =============================================================================
// DOCUMENT CLASSIFICATION
// =============================================================================

/// Maximum dominant colors considered by the color profile.
pub const PROFILE_DOMINANT_COLORS: usize = 5;

/// Quantization step for normalized channels in the color profile.
pub const PROFILE_QUANTIZE_STEP: f32 = 0.1;

/// Maximum channel spread (`|r-g| + |g-b| + |r-b|`) of a grey color.
pub const MONOCHROME_TOLERANCE: f32 = 0.15;

/// Luminance gap between the two top colors that counts as high contrast.
pub const HIGH_CONTRAST_DELTA: f32 = 0.5;

/// Background luminance above which the background counts as light.
pub const LIGHT_BACKGROUND_LUMINANCE: f32 = 0.7;

/// Starting confidence for every category except photo.
pub const BASE_CLASSIFICATION_CONFIDENCE: f32 = 0.5;

/// Confidence of a photo with no detected text at all.
pub const PHOTO_CONFIDENCE: f32 = 0.9;

/// Business card aspect ratio squarely inside the card range.
pub const BUSINESS_CARD_ASPECT_BOOST: f32 = 0.3;

/// Business card with a typical number of text lines (5 to 12).
pub const BUSINESS_CARD_REGION_BOOST: f32 = 0.2;

/// Strong category-specific evidence.
pub const STRONG_EVIDENCE_BOOST: f32 = 0.2;

/// Supporting category-specific evidence.
pub const WEAK_EVIDENCE_BOOST: f32 = 0.1;

/// Side of the square the color profile samples from.
pub const PROFILE_SAMPLE_SIZE: u32 = 50;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Environment variable for the vision model name.
pub const ENV_OLLAMA_VISION_MODEL: &str = "OLLAMA_VISION_MODEL";

/// Default vision model for image analysis.
pub const DEFAULT_OLLAMA_VISION_MODEL: &str = "qwen3-vl:8b";

/// Environment variable overriding the vision request timeout.
pub const ENV_VISION_TIMEOUT_SECS: &str = "LUMEN_VISION_TIMEOUT_SECS";

/// Timeout for vision requests in seconds.
pub const VISION_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// SEARCH CONFIGURATION
// =============================================================================

/// Environment variable for the analysis concurrency bound.
pub const ENV_MAX_CONCURRENT_ANALYSES: &str = "LUMEN_MAX_CONCURRENT_ANALYSES";

/// Environment variable for the snippet length.
pub const ENV_SNIPPET_LENGTH: &str = "LUMEN_SNIPPET_LENGTH";
