//! # lumen-search
//!
//! Multi-signal search over the image attachments of notes.
//!
//! This crate provides:
//! - Five independent matching strategies (objects, OCR text, filename,
//!   note content, scene description) run concurrently per query
//! - An analysis cache that computes each image's context at most once
//! - Deduplication and ranking of hits across strategies
//! - Normalized edit-distance similarity for fuzzy matching
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lumen_search::{ImageSearchEngine, SearchConfig};
//!
//! let engine = ImageSearchEngine::new(provider, loader, SearchConfig::from_env())
//!     .with_repository(Arc::new(repository));
//!
//! // Search the repository's notes
//! let hits = engine.search("receipt", None).await?;
//!
//! // Pre-analyze images so later searches are cache hits
//! engine.index_images(&notes).await;
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod engine;
pub mod merge;
pub mod similarity;
pub mod strategies;

// Re-export core types
pub use lumen_core::*;

pub use cache::{AnalysisCache, CacheStats};
pub use config::SearchConfig;
pub use context::{dominant_colors, ImageContextBuilder};
pub use engine::ImageSearchEngine;
pub use merge::merge_hits;
pub use similarity::{edit_distance, similarity};
pub use strategies::{
    FilenameSearcher, NoteContentSearcher, ObjectDetectionSearcher, OcrTextSearcher,
    SceneSearcher, StrategyContext, StrategySearcher,
};
