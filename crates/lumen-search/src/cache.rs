//! In-process analysis cache keyed by attachment id.
//!
//! Each key owns a `tokio::sync::OnceCell`, so concurrent first requests for
//! the same attachment await one computation instead of racing the vision
//! provider. Entries are never evicted or replaced.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lumen_core::ImageSearchContext;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::trace;
use uuid::Uuid;

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Completed entries.
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Times a compute function actually ran.
    pub computations: u64,
}

/// Attachment id → `ImageSearchContext`, with at-most-once computation per key.
#[derive(Default)]
pub struct AnalysisCache {
    entries: Mutex<HashMap<Uuid, Arc<OnceCell<ImageSearchContext>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached context, if its computation has completed. Never computes.
    pub fn get(&self, attachment_id: Uuid) -> Option<ImageSearchContext> {
        let cell = self.entries.lock().get(&attachment_id).cloned()?;
        cell.get().cloned()
    }

    /// Whether a completed context exists for this attachment.
    pub fn contains(&self, attachment_id: Uuid) -> bool {
        self.entries
            .lock()
            .get(&attachment_id)
            .is_some_and(|cell| cell.initialized())
    }

    /// Return the cached context or run `compute` to produce it.
    ///
    /// Concurrent callers for the same missing key share one run of `compute`
    /// and all observe its result. The first completed value is kept forever.
    pub async fn get_or_compute<F, Fut>(&self, attachment_id: Uuid, compute: F) -> ImageSearchContext
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ImageSearchContext>,
    {
        let cell = {
            let mut entries = self.entries.lock();
            entries
                .entry(attachment_id)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        if let Some(context) = cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(%attachment_id, "Analysis cache hit");
            return context.clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(%attachment_id, "Analysis cache miss");
        cell.get_or_init(move || async move {
            self.computations.fetch_add(1, Ordering::Relaxed);
            compute().await
        })
        .await
        .clone()
    }

    /// Number of completed entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
        }
    }
}
