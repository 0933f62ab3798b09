//! Document classifier pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use lumen_core::{DocumentClassification, Error, Result, VisionProvider};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::decision::{decide, ClassificationFeatures};
use crate::features::{ColorProfile, ImageProperties, TextMetrics};

/// Classifies images into document categories before any text extraction.
///
/// Only the provider's detection-only text-region call is used; no OCR runs
/// here and nothing is cached.
pub struct DocumentClassifier {
    provider: Arc<dyn VisionProvider>,
}

impl DocumentClassifier {
    pub fn new(provider: Arc<dyn VisionProvider>) -> Self {
        Self { provider }
    }

    /// Classify a decoded image.
    ///
    /// A failed text-region detection is treated as "no text".
    #[instrument(
        skip_all,
        fields(
            subsystem = "classify",
            component = "document_classifier",
            op = "classify",
            width = image.width(),
            height = image.height(),
        )
    )]
    pub async fn classify(&self, image: &DynamicImage) -> DocumentClassification {
        let start = Instant::now();
        let properties = ImageProperties::of(image);

        let regions = match self.provider.detect_text_regions(image).await {
            Ok(regions) => regions,
            Err(e) => {
                warn!(
                    error = %e,
                    model = self.provider.model_name(),
                    "Text region detection failed, classifying as textless"
                );
                Vec::new()
            }
        };
        let text = TextMetrics::from_regions(&regions);
        let colors = ColorProfile::of(image);

        let features = ClassificationFeatures::new(&properties, &text, &colors);
        debug!(?features, "Classification features");
        let (category, confidence) = decide(&features);

        let mut metadata = BTreeMap::new();
        metadata.insert("width".to_string(), json!(properties.width));
        metadata.insert("height".to_string(), json!(properties.height));
        metadata.insert("text_region_count".to_string(), json!(text.region_count));
        metadata.insert("is_monochrome".to_string(), json!(colors.is_monochrome));

        info!(
            category = %category,
            confidence,
            duration_ms = start.elapsed().as_millis() as u64,
            "Image classified"
        );

        DocumentClassification {
            category,
            confidence,
            aspect_ratio: properties.aspect_ratio,
            dominant_colors: colors.dominant_colors,
            has_text: text.has_text,
            text_density: text.density,
            ocr_strategy: category.ocr_strategy(),
            metadata,
        }
    }

    /// Decode `bytes` and classify the result.
    ///
    /// Returns `Error::InvalidInput` when the bytes are not a supported image.
    pub async fn classify_bytes(&self, bytes: &[u8]) -> Result<DocumentClassification> {
        let owned = bytes.to_vec();
        let image = tokio::task::spawn_blocking(move || image::load_from_memory(&owned))
            .await
            .map_err(|e| Error::Internal(format!("Image decode task failed: {}", e)))?
            .map_err(|e| Error::InvalidInput(format!("Unsupported image data: {}", e)))?;
        Ok(self.classify(&image).await)
    }
}
