//! Builds `ImageSearchContext` values for image attachments.
//!
//! Loading, decoding and every provider call may fail independently. A load
//! or decode failure yields an empty context; a failed provider call only
//! leaves its own field empty. Nothing here returns an error to the caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use image::imageops::FilterType;
use image::DynamicImage;
use lumen_core::defaults::{
    ANALYZED_CONTEXT_CONFIDENCE, COLOR_QUANTIZE_STEP, COLOR_SAMPLE_SIZE, COLOR_SAMPLE_STRIDE,
    CONTEXT_DOMINANT_COLORS, OBJECT_CONFIDENCE_THRESHOLD,
};
use lumen_core::{
    Attachment, Error, ImageLoader, ImageSearchContext, Note, Result, RgbColor, VisionProvider,
};
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::cache::AnalysisCache;

/// Orchestrates image loading and vision calls, writing results through the cache.
pub struct ImageContextBuilder {
    provider: Arc<dyn VisionProvider>,
    loader: Arc<dyn ImageLoader>,
    cache: Arc<AnalysisCache>,
    permits: Semaphore,
}

impl ImageContextBuilder {
    /// `max_concurrent_analyses` bounds how many images are analyzed at once
    /// across every caller sharing this builder.
    pub fn new(
        provider: Arc<dyn VisionProvider>,
        loader: Arc<dyn ImageLoader>,
        cache: Arc<AnalysisCache>,
        max_concurrent_analyses: usize,
    ) -> Self {
        Self {
            provider,
            loader,
            cache,
            permits: Semaphore::new(max_concurrent_analyses.max(1)),
        }
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Cached context only; never triggers analysis.
    pub fn cached(&self, attachment_id: Uuid) -> Option<ImageSearchContext> {
        self.cache.get(attachment_id)
    }

    /// Cached context, or analyze the attachment and cache the result.
    ///
    /// The note is carried for log context only.
    #[instrument(skip_all, fields(
        subsystem = "search",
        component = "context_builder",
        note_id = %note.id,
        attachment_id = %attachment.id,
    ))]
    pub async fn context_for(&self, note: &Note, attachment: &Attachment) -> ImageSearchContext {
        self.cache
            .get_or_compute(attachment.id, || self.analyze(attachment))
            .await
    }

    async fn analyze(&self, attachment: &Attachment) -> ImageSearchContext {
        // The semaphore is never closed, so acquire only fails if that changes.
        let _permit = self.permits.acquire().await.ok();
        let start = Instant::now();

        let image = match self.load_image(attachment).await {
            Ok(image) => Arc::new(image),
            Err(e) => {
                warn!(
                    filename = %attachment.filename,
                    error = %e,
                    "Image unavailable, caching empty context"
                );
                return ImageSearchContext::empty();
            }
        };

        let colors_image = image.clone();
        let colors_task = tokio::task::spawn_blocking(move || dominant_colors(&colors_image));

        let (objects, lines, scene, colors) = tokio::join!(
            self.provider.detect_objects(&image),
            self.provider.recognize_text(&image),
            self.provider.classify_scene(&image),
            colors_task,
        );

        let objects = match objects {
            Ok(objects) => objects
                .into_iter()
                .filter(|o| o.confidence > OBJECT_CONFIDENCE_THRESHOLD)
                .map(|o| o.label)
                .collect(),
            Err(e) => {
                warn!(error = %e, "Object detection failed");
                Vec::new()
            }
        };

        let ocr_text = match lines {
            Ok(lines) => join_lines(&lines),
            Err(e) => {
                warn!(error = %e, "Text recognition failed");
                None
            }
        };

        let scene_description = match scene {
            Ok(scene) => scene,
            Err(e) => {
                warn!(error = %e, "Scene classification failed");
                None
            }
        };

        let dominant_colors = colors.unwrap_or_else(|e| {
            warn!(error = %e, "Color sampling task failed");
            Vec::new()
        });

        let context = ImageSearchContext {
            objects,
            ocr_text,
            scene_description,
            dominant_colors,
            confidence: ANALYZED_CONTEXT_CONFIDENCE,
            analyzed_at: Utc::now(),
        };

        debug!(
            object_count = context.objects.len(),
            has_ocr_text = context.ocr_text.is_some(),
            has_scene = context.scene_description.is_some(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Image analysis complete"
        );
        context
    }

    async fn load_image(&self, attachment: &Attachment) -> Result<DynamicImage> {
        let bytes = self.loader.load(attachment).await?;
        tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| Error::Internal(format!("Image decode task failed: {}", e)))?
            .map_err(Error::from)
    }
}

/// Join recognized lines with single spaces; `None` when nothing was read.
fn join_lines(lines: &[String]) -> Option<String> {
    let joined = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// Up to three most frequent colors of an image.
///
/// The image is squashed to a square of at most 50×50, every 4th pixel is
/// sampled, and channels are quantized to steps of 64 before counting.
/// Ties are broken by the quantized value so the result is deterministic.
pub fn dominant_colors(image: &DynamicImage) -> Vec<RgbColor> {
    if image.width() == 0 || image.height() == 0 {
        return Vec::new();
    }

    let side = COLOR_SAMPLE_SIZE.min(image.width().max(image.height()));
    let sample = image.resize_exact(side, side, FilterType::Triangle).to_rgb8();

    let quantize = |c: u8| (c / COLOR_QUANTIZE_STEP) * COLOR_QUANTIZE_STEP;
    let mut counts: HashMap<[u8; 3], usize> = HashMap::new();
    for pixel in sample.pixels().step_by(COLOR_SAMPLE_STRIDE) {
        let key = [quantize(pixel[0]), quantize(pixel[1]), quantize(pixel[2])];
        *counts.entry(key).or_default() += 1;
    }

    let mut ranked: Vec<([u8; 3], usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(CONTEXT_DOMINANT_COLORS)
        .map(|([r, g, b], _)| RgbColor::from_u8(r, g, b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_join_lines() {
        let lines = vec![
            "Invoice #102".to_string(),
            "  ".to_string(),
            " Total ".to_string(),
        ];
        assert_eq!(join_lines(&lines), Some("Invoice #102 Total".to_string()));
        assert_eq!(join_lines(&[]), None);
    }

    #[test]
    fn test_dominant_colors_solid_image() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(80, 40, Rgb([250, 10, 130])));
        let colors = dominant_colors(&image);
        assert_eq!(colors, vec![RgbColor::from_u8(192, 0, 128)]);
    }

    #[test]
    fn test_dominant_colors_ranks_by_frequency() {
        // Left three quarters white, right quarter black.
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(100, 100, |x, _| {
            if x < 75 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        }));
        let colors = dominant_colors(&image);
        assert!(!colors.is_empty() && colors.len() <= CONTEXT_DOMINANT_COLORS);
        assert_eq!(colors[0], RgbColor::from_u8(192, 192, 192));
        assert!(colors.contains(&RgbColor::from_u8(0, 0, 0)));
    }

    #[test]
    fn test_dominant_colors_empty_image() {
        let image = DynamicImage::new_rgb8(0, 0);
        assert!(dominant_colors(&image).is_empty());
    }
}
