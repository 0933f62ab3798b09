//! Multi-signal image search engine.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use lumen_core::{
    Attachment, Error, ImageLoader, ImageSearchContext, Note, NoteRepository, Result, SearchHit,
    VisionProvider,
};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, Instrument};
use uuid::Uuid;

use crate::cache::{AnalysisCache, CacheStats};
use crate::config::SearchConfig;
use crate::context::ImageContextBuilder;
use crate::merge::merge_hits;
use crate::strategies::{
    FilenameSearcher, NoteContentSearcher, ObjectDetectionSearcher, OcrTextSearcher,
    SceneSearcher, StrategyContext, StrategySearcher,
};

/// Search engine over the image attachments of notes.
///
/// Owns its analysis cache; two engines never share analysis results.
pub struct ImageSearchEngine {
    contexts: Arc<ImageContextBuilder>,
    /// Fixed order: object, OCR, filename, note content, scene.
    searchers: Vec<Arc<dyn StrategySearcher>>,
    repository: Option<Arc<dyn NoteRepository>>,
    config: SearchConfig,
}

impl ImageSearchEngine {
    pub fn new(
        provider: Arc<dyn VisionProvider>,
        loader: Arc<dyn ImageLoader>,
        config: SearchConfig,
    ) -> Self {
        let cache = Arc::new(AnalysisCache::new());
        let contexts = Arc::new(ImageContextBuilder::new(
            provider,
            loader,
            cache,
            config.max_concurrent_analyses,
        ));

        let ctx = StrategyContext {
            contexts: contexts.clone(),
            lookahead: config.max_concurrent_analyses,
            snippet_length: config.snippet_length,
        };
        let searchers: Vec<Arc<dyn StrategySearcher>> = vec![
            Arc::new(ObjectDetectionSearcher::new(ctx.clone())),
            Arc::new(OcrTextSearcher::new(ctx.clone())),
            Arc::new(FilenameSearcher::new(ctx.clone())),
            Arc::new(NoteContentSearcher::new(ctx.clone())),
            Arc::new(SceneSearcher::new(ctx)),
        ];

        Self {
            contexts,
            searchers,
            repository: None,
            config,
        }
    }

    /// Default candidate source for searches that pass no notes.
    pub fn with_repository(mut self, repository: Arc<dyn NoteRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search image attachments for `query`.
    ///
    /// With `notes` of `None` the candidates come from the configured
    /// repository. An empty or whitespace-only query returns no hits without
    /// doing any work. Failures analyzing individual images never fail the
    /// search; only a missing candidate source or a repository error does.
    #[instrument(
        skip(self, notes),
        fields(subsystem = "search", component = "engine", op = "search")
    )]
    pub async fn search(&self, query: &str, notes: Option<Vec<Note>>) -> Result<Vec<SearchHit>> {
        let start = Instant::now();
        let query = normalize_query(query);
        if query.is_empty() {
            debug!("Empty query, nothing to search");
            return Ok(Vec::new());
        }

        let notes = self.candidates(notes).await?;
        let raw = self.collect_strategy_hits(&query, notes).await;
        let raw_count = raw.len();
        let hits = merge_hits(raw);

        info!(
            hit_count = raw_count,
            result_count = hits.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Image search complete"
        );
        Ok(hits)
    }

    /// Unmerged hits from every strategy, concatenated in strategy order.
    ///
    /// Same normalization and empty-query handling as `search`.
    pub async fn raw_hits(&self, query: &str, notes: Vec<Note>) -> Vec<SearchHit> {
        let query = normalize_query(query);
        if query.is_empty() {
            return Vec::new();
        }
        self.collect_strategy_hits(&query, notes).await
    }

    /// Analyze every image attachment not yet in the cache.
    #[instrument(skip_all, fields(subsystem = "search", component = "engine", op = "index_images"))]
    pub async fn index_images(&self, notes: &[Note]) {
        let start = Instant::now();
        let cache = self.contexts.cache();
        let pending: Vec<(&Note, &Attachment)> = notes
            .iter()
            .flat_map(|note| note.image_attachments().map(move |a| (note, a)))
            .filter(|(_, attachment)| !cache.contains(attachment.id))
            .collect();
        let pending_count = pending.len();

        let contexts = self.contexts.as_ref();
        stream::iter(pending)
            .for_each_concurrent(self.config.max_concurrent_analyses, |(note, attachment)| async move {
                contexts.context_for(note, attachment).await;
            })
            .await;

        info!(
            result_count = pending_count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Image indexing complete"
        );
    }

    /// Cached context for an attachment. Never triggers analysis.
    pub fn get_context(&self, attachment_id: Uuid) -> Option<ImageSearchContext> {
        self.contexts.cached(attachment_id)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.contexts.cache().stats()
    }

    async fn candidates(&self, notes: Option<Vec<Note>>) -> Result<Vec<Note>> {
        match (notes, &self.repository) {
            (Some(notes), _) => Ok(notes),
            (None, Some(repository)) => repository.fetch_all_notes().await,
            (None, None) => Err(Error::Config(
                "no candidate notes given and no note repository configured".to_string(),
            )),
        }
    }

    /// Run all strategies concurrently and wait for every one of them.
    ///
    /// Results are reassembled in strategy order regardless of completion
    /// order. A strategy task that panics contributes no hits.
    async fn collect_strategy_hits(&self, query: &str, notes: Vec<Note>) -> Vec<SearchHit> {
        let notes: Arc<[Arc<Note>]> = notes.into_iter().map(Arc::new).collect();
        let query: Arc<str> = Arc::from(query);

        let mut tasks = JoinSet::new();
        for (idx, searcher) in self.searchers.iter().enumerate() {
            let searcher = searcher.clone();
            let notes = notes.clone();
            let query = query.clone();
            tasks.spawn(
                async move {
                    let hits = searcher.search(&query, &notes).await;
                    (idx, hits)
                }
                .in_current_span(),
            );
        }

        let mut per_strategy: Vec<Vec<SearchHit>> = vec![Vec::new(); self.searchers.len()];
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok((idx, hits)) => {
                    debug!(
                        match_type = %self.searchers[idx].match_type(),
                        hit_count = hits.len(),
                        "Strategy finished"
                    );
                    per_strategy[idx] = hits;
                }
                Err(e) => {
                    error!(error = ?e, "Strategy task panicked");
                }
            }
        }

        per_strategy.into_iter().flatten().collect()
    }
}

fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  Invoice "), "invoice");
        assert_eq!(normalize_query("   "), "");
    }
}
