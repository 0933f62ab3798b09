//! # lumen-classify
//!
//! Fast heuristic document-type classification of images.
//!
//! The classifier looks at image shape, detected text boxes and a coarse color
//! profile to label an image (business card, receipt, invoice, handwritten
//! page, photo, screenshot, whiteboard, printed document or unknown) and
//! recommends an OCR strategy before any expensive text extraction runs.
//!
//! ## Example
//!
//! ```ignore
//! use lumen_classify::DocumentClassifier;
//!
//! let classifier = DocumentClassifier::new(provider);
//! let classification = classifier.classify_bytes(&bytes).await?;
//! println!("{} -> {}", classification.category, classification.ocr_strategy);
//! ```

pub mod classifier;
pub mod decision;
pub mod features;

pub use classifier::DocumentClassifier;
pub use decision::{decide, ClassificationFeatures};
pub use features::{ColorProfile, ImageProperties, TextMetrics};

// Re-export core types
pub use lumen_core::{DocumentCategory, DocumentClassification, OcrStrategy};
