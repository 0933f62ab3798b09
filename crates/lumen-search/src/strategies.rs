//! The five matching strategies.
//!
//! Every searcher takes an already normalized (trimmed, lowercased) query and
//! the candidate notes, looks only at image attachments, and returns raw hits
//! for its own signal. Merging across strategies happens in `merge`.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use lumen_core::defaults::{
    FILENAME_CONTAINS_SCORE, FILENAME_EXACT_SCORE, FILENAME_PREFIX_SCORE, NOTE_BODY_WEIGHT,
    NOTE_CONTENT_DAMPING, NOTE_KEY_POINT_WEIGHT, NOTE_SUMMARY_WEIGHT, NOTE_TAG_WEIGHT,
    NOTE_TITLE_WEIGHT, OBJECT_EXACT_WEIGHT, OBJECT_PARTIAL_WEIGHT, OBJECT_SIMILARITY_THRESHOLD,
};
use lumen_core::{Attachment, ImageSearchContext, MatchType, Note, SearchHit};
use tracing::{debug, instrument};

use crate::context::ImageContextBuilder;
use crate::similarity::similarity;

/// One independent matching signal.
#[async_trait]
pub trait StrategySearcher: Send + Sync {
    /// Match type attached to every hit this searcher produces.
    fn match_type(&self) -> MatchType;

    /// Raw, unmerged hits for `query` over the image attachments of `notes`.
    async fn search(&self, query: &str, notes: &[Arc<Note>]) -> Vec<SearchHit>;
}

/// Shared state for all searchers.
#[derive(Clone)]
pub struct StrategyContext {
    pub contexts: Arc<ImageContextBuilder>,
    /// Per-searcher limit on in-flight context lookups.
    pub lookahead: usize,
    pub snippet_length: usize,
}

impl StrategyContext {
    /// Image attachments with their (possibly freshly computed) contexts, in note order.
    async fn analyzed_images(
        &self,
        notes: &[Arc<Note>],
    ) -> Vec<(Arc<Note>, Attachment, ImageSearchContext)> {
        let contexts = self.contexts.as_ref();
        stream::iter(image_attachments(notes))
            .map(|(note, attachment)| async move {
                let context = contexts.context_for(&note, &attachment).await;
                (note, attachment, context)
            })
            .buffered(self.lookahead.max(1))
            .collect()
            .await
    }

    /// Image attachments with whatever context is already cached.
    fn cached_images(&self, notes: &[Arc<Note>]) -> Vec<(Arc<Note>, Attachment, ImageSearchContext)> {
        image_attachments(notes)
            .into_iter()
            .map(|(note, attachment)| {
                let context = self.contexts.cached(attachment.id).unwrap_or_default();
                (note, attachment, context)
            })
            .collect()
    }
}

fn image_attachments(notes: &[Arc<Note>]) -> Vec<(Arc<Note>, Attachment)> {
    notes
        .iter()
        .flat_map(|note| {
            note.image_attachments()
                .map(move |attachment| (note.clone(), attachment.clone()))
        })
        .collect()
}

fn hit(
    note: Arc<Note>,
    attachment: Attachment,
    context: ImageSearchContext,
    score: f32,
    match_type: MatchType,
    snippet: String,
) -> SearchHit {
    SearchHit {
        note,
        attachment,
        score: score.clamp(0.0, 1.0),
        match_type,
        snippet,
        context,
    }
}

// =============================================================================
// OBJECT DETECTION
// =============================================================================

pub struct ObjectDetectionSearcher {
    ctx: StrategyContext,
}

impl ObjectDetectionSearcher {
    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl StrategySearcher for ObjectDetectionSearcher {
    fn match_type(&self) -> MatchType {
        MatchType::ObjectDetection
    }

    #[instrument(skip_all, fields(subsystem = "search", component = "strategy", op = "object_detection"))]
    async fn search(&self, query: &str, notes: &[Arc<Note>]) -> Vec<SearchHit> {
        let hits: Vec<SearchHit> = self
            .ctx
            .analyzed_images(notes)
            .await
            .into_iter()
            .filter_map(|(note, attachment, context)| {
                let (score, matched) = object_score(query, &context.objects)?;
                let snippet = truncate_chars(&matched.join(", "), self.ctx.snippet_length);
                Some(hit(note, attachment, context, score, self.match_type(), snippet))
            })
            .collect();
        debug!(hit_count = hits.len(), "Object detection search complete");
        hits
    }
}

/// Score a label list against the query, returning the matched labels too.
///
/// `None` when no label matches.
pub(crate) fn object_score(query: &str, labels: &[String]) -> Option<(f32, Vec<String>)> {
    let mut exact = 0usize;
    let mut partial = 0usize;
    let mut matched = Vec::new();

    for label in labels {
        let label_lower = label.trim().to_lowercase();
        if label_lower.is_empty() {
            continue;
        }
        if label_lower == query {
            exact += 1;
        } else if label_lower.contains(query)
            || query.contains(label_lower.as_str())
            || similarity(&label_lower, query) > OBJECT_SIMILARITY_THRESHOLD
        {
            partial += 1;
        } else {
            continue;
        }
        matched.push(label.clone());
    }

    if matched.is_empty() {
        return None;
    }

    let score = (exact as f32 * OBJECT_EXACT_WEIGHT + partial as f32 * OBJECT_PARTIAL_WEIGHT)
        / labels.len().max(1) as f32;
    Some((score.min(1.0), matched))
}

// =============================================================================
// OCR TEXT
// =============================================================================

pub struct OcrTextSearcher {
    ctx: StrategyContext,
}

impl OcrTextSearcher {
    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl StrategySearcher for OcrTextSearcher {
    fn match_type(&self) -> MatchType {
        MatchType::OcrText
    }

    #[instrument(skip_all, fields(subsystem = "search", component = "strategy", op = "ocr_text"))]
    async fn search(&self, query: &str, notes: &[Arc<Note>]) -> Vec<SearchHit> {
        let hits: Vec<SearchHit> = self
            .ctx
            .analyzed_images(notes)
            .await
            .into_iter()
            .filter_map(|(note, attachment, context)| {
                let text = context.ocr_text.as_deref()?;
                let score = ocr_score(query, text)?;
                let snippet = excerpt(text, query, self.ctx.snippet_length);
                Some(hit(note, attachment, context, score, self.match_type(), snippet))
            })
            .collect();
        debug!(hit_count = hits.len(), "OCR text search complete");
        hits
    }
}

/// Fraction of query tokens found inside some OCR token.
///
/// `None` unless the OCR text contains the whole query.
pub(crate) fn ocr_score(query: &str, ocr_text: &str) -> Option<f32> {
    let text = ocr_text.to_lowercase();
    if !text.contains(query) {
        return None;
    }

    let text_tokens: Vec<&str> = text.split_whitespace().collect();
    let query_tokens: Vec<&str> = query.split_whitespace().collect();
    let found = query_tokens
        .iter()
        .filter(|q| text_tokens.iter().any(|t| t.contains(*q)))
        .count();

    Some(found as f32 / query_tokens.len().max(1) as f32)
}

// =============================================================================
// FILENAME
// =============================================================================

pub struct FilenameSearcher {
    ctx: StrategyContext,
}

impl FilenameSearcher {
    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl StrategySearcher for FilenameSearcher {
    fn match_type(&self) -> MatchType {
        MatchType::Filename
    }

    #[instrument(skip_all, fields(subsystem = "search", component = "strategy", op = "filename"))]
    async fn search(&self, query: &str, notes: &[Arc<Note>]) -> Vec<SearchHit> {
        let hits: Vec<SearchHit> = self
            .ctx
            .cached_images(notes)
            .into_iter()
            .filter_map(|(note, attachment, context)| {
                if !attachment.filename.to_lowercase().contains(query) {
                    return None;
                }
                let score = filename_score(query, &attachment.filename);
                let snippet = truncate_chars(&attachment.filename, self.ctx.snippet_length);
                Some(hit(note, attachment, context, score, self.match_type(), snippet))
            })
            .collect();
        debug!(hit_count = hits.len(), "Filename search complete");
        hits
    }
}

/// Filename relevance: exact 1.0, prefix 0.9, substring 0.8, otherwise plain
/// string similarity. The extension is part of the name.
pub(crate) fn filename_score(query: &str, filename: &str) -> f32 {
    let name = filename.to_lowercase();

    if name == query {
        FILENAME_EXACT_SCORE
    } else if name.starts_with(query) {
        FILENAME_PREFIX_SCORE
    } else if name.contains(query) {
        FILENAME_CONTAINS_SCORE
    } else {
        similarity(query, &name) as f32
    }
}

// =============================================================================
// NOTE CONTENT
// =============================================================================

pub struct NoteContentSearcher {
    ctx: StrategyContext,
}

impl NoteContentSearcher {
    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl StrategySearcher for NoteContentSearcher {
    fn match_type(&self) -> MatchType {
        MatchType::NoteContent
    }

    #[instrument(skip_all, fields(subsystem = "search", component = "strategy", op = "note_content"))]
    async fn search(&self, query: &str, notes: &[Arc<Note>]) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        for note in notes {
            let Some((score, snippet_source)) = note_content_score(query, note) else {
                continue;
            };
            let snippet = excerpt(snippet_source, query, self.ctx.snippet_length);
            for attachment in note.image_attachments() {
                let context = self.ctx.contexts.cached(attachment.id).unwrap_or_default();
                hits.push(hit(
                    note.clone(),
                    attachment.clone(),
                    context,
                    score,
                    self.match_type(),
                    snippet.clone(),
                ));
            }
        }
        debug!(hit_count = hits.len(), "Note content search complete");
        hits
    }
}

/// Weighted field-match score, damped below direct image signals.
///
/// Also returns the first matching field's text for the snippet.
pub(crate) fn note_content_score<'a>(query: &str, note: &'a Note) -> Option<(f32, &'a str)> {
    let fields: [(f32, Option<&'a str>); 5] = [
        (
            NOTE_TITLE_WEIGHT,
            Some(note.title.as_str()).filter(|t| contains_folded(t, query)),
        ),
        (
            NOTE_BODY_WEIGHT,
            Some(note.content.as_str()).filter(|b| contains_folded(b, query)),
        ),
        (
            NOTE_TAG_WEIGHT,
            note.tags
                .iter()
                .map(String::as_str)
                .find(|t| contains_folded(t, query)),
        ),
        (
            NOTE_SUMMARY_WEIGHT,
            note.ai_summary
                .as_deref()
                .filter(|s| contains_folded(s, query)),
        ),
        (
            NOTE_KEY_POINT_WEIGHT,
            note.key_points
                .iter()
                .map(String::as_str)
                .find(|p| contains_folded(p, query)),
        ),
    ];

    let source = fields.iter().find_map(|(_, text)| *text)?;
    let score: f32 = fields
        .iter()
        .filter(|(_, text)| text.is_some())
        .map(|(weight, _)| weight)
        .sum();
    Some((score.min(1.0) * NOTE_CONTENT_DAMPING, source))
}

fn contains_folded(text: &str, query: &str) -> bool {
    text.to_lowercase().contains(query)
}

// =============================================================================
// SCENE DESCRIPTION
// =============================================================================

pub struct SceneSearcher {
    ctx: StrategyContext,
}

impl SceneSearcher {
    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl StrategySearcher for SceneSearcher {
    fn match_type(&self) -> MatchType {
        MatchType::SemanticContent
    }

    #[instrument(skip_all, fields(subsystem = "search", component = "strategy", op = "scene"))]
    async fn search(&self, query: &str, notes: &[Arc<Note>]) -> Vec<SearchHit> {
        let hits: Vec<SearchHit> = self
            .ctx
            .analyzed_images(notes)
            .await
            .into_iter()
            .filter_map(|(note, attachment, context)| {
                let description = context.scene_description.as_deref()?;
                let score = scene_score(query, description)?;
                let snippet = truncate_chars(description, self.ctx.snippet_length);
                Some(hit(note, attachment, context, score, self.match_type(), snippet))
            })
            .collect();
        debug!(hit_count = hits.len(), "Scene search complete");
        hits
    }
}

pub(crate) fn scene_score(query: &str, description: &str) -> Option<f32> {
    let description = description.to_lowercase();
    description
        .contains(query)
        .then(|| similarity(query, &description) as f32)
}

// =============================================================================
// SNIPPETS
// =============================================================================

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Window of at most `max_chars` characters around the first match of `query`.
///
/// Falls back to the start of the text when the match cannot be located.
fn excerpt(text: &str, query: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.trim().to_string();
    }

    // Some characters fold to several; remember where each folded char came from.
    let mut folded = String::with_capacity(text.len());
    let mut origin = Vec::with_capacity(chars.len());
    for (idx, c) in chars.iter().enumerate() {
        for lower in c.to_lowercase() {
            folded.push(lower);
            origin.push(idx);
        }
    }
    let match_start = folded
        .find(query)
        .and_then(|byte_idx| origin.get(folded[..byte_idx].chars().count()).copied())
        .unwrap_or(0);

    let query_len = query.chars().count();
    let lead = max_chars.saturating_sub(query_len) / 2;
    let start = match_start
        .saturating_sub(lead)
        .min(chars.len() - max_chars);

    chars[start..start + max_chars]
        .iter()
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_object_score_exact_and_partial() {
        let (score, matched) = object_score("dog", &labels(&["dog", "hotdog", "tree"])).unwrap();
        // (1.0 + 0.7) / 3
        assert!((score - 1.7 / 3.0).abs() < 1e-6);
        assert_eq!(matched, vec!["dog", "hotdog"]);
    }

    #[test]
    fn test_object_score_fuzzy_label() {
        let (score, _) = object_score("laptop", &labels(&["Labtop"])).unwrap();
        assert!((score - 0.7).abs() < 1e-6);
        assert!(object_score("car", &labels(&["tree", "cloud"])).is_none());
    }

    #[test]
    fn test_object_score_case_normalized_exact() {
        let (score, _) = object_score("cat", &labels(&["Cat"])).unwrap();
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_ocr_score() {
        assert_eq!(ocr_score("invoice", "Invoice #102 Total"), Some(1.0));
        assert_eq!(ocr_score("102 total", "Invoice #102 Total"), Some(1.0));
        assert_eq!(ocr_score("receipt", "Invoice #102 Total"), None);
    }

    #[test]
    fn test_filename_score_tiers() {
        assert_eq!(filename_score("scan.png", "scan.png"), FILENAME_EXACT_SCORE);
        assert_eq!(filename_score("scan", "Scan.PNG"), FILENAME_PREFIX_SCORE);
        assert_eq!(filename_score("scan", "scan.png"), FILENAME_PREFIX_SCORE);
        assert_eq!(filename_score("sca", "scan.png"), FILENAME_PREFIX_SCORE);
        assert_eq!(filename_score("can", "scan.png"), FILENAME_CONTAINS_SCORE);

        let fallback = filename_score("scam.png", "scan.png");
        assert!(fallback > 0.8 && fallback < 1.0);
    }

    #[test]
    fn test_note_content_score_weights() {
        let mut note = Note::new("Invoice March", "paid the invoice");
        note.tags = vec!["finance".to_string(), "invoices".to_string()];
        note.key_points = vec!["invoice due".to_string()];

        let (score, source) = note_content_score("invoice", &note).unwrap();
        // title 0.3 + body 0.2 + tag 0.2 + key point 0.1, damped by 0.8
        assert!((score - 0.8 * 0.8).abs() < 1e-6);
        assert_eq!(source, "Invoice March");

        assert!(note_content_score("receipt", &note).is_none());
    }

    #[test]
    fn test_note_content_score_clamps_before_damping() {
        let mut note = Note::new("x", "x");
        note.tags = vec!["x".to_string()];
        note.ai_summary = Some("x".to_string());
        note.key_points = vec!["x".to_string()];

        let (score, _) = note_content_score("x", &note).unwrap();
        assert!((score - NOTE_CONTENT_DAMPING).abs() < 1e-6);
    }

    #[test]
    fn test_scene_score() {
        assert_eq!(scene_score("beach", "Beach"), Some(1.0));
        let partial = scene_score("beach", "sunny beach").unwrap();
        assert!(partial > 0.0 && partial < 1.0);
        assert!(scene_score("forest", "sunny beach").is_none());
    }

    #[test]
    fn test_excerpt_centers_on_match() {
        let text = format!("{} needle {}", "a".repeat(100), "b".repeat(100));
        let snippet = excerpt(&text, "needle", 20);
        assert_eq!(snippet.chars().count(), 20);
        assert!(snippet.contains("needle"));
    }

    #[test]
    fn test_excerpt_short_text_and_multibyte() {
        assert_eq!(excerpt("  short  ", "short", 20), "short");
        let text = "ééééééééééééééééééééééééé café";
        let snippet = excerpt(text, "café", 10);
        assert!(snippet.ends_with("café"));
    }

    #[test]
    fn test_excerpt_with_expanding_case_fold() {
        // 'İ' lowercases to two chars, which must not shift the window.
        let text = format!("{} needle {}", "İ".repeat(30), "x".repeat(40));
        let snippet = excerpt(&text, "needle", 20);
        assert_eq!(snippet.chars().count(), 20);
        assert!(snippet.contains("needle"), "got {:?}", snippet);
    }
}
