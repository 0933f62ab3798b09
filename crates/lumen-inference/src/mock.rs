//! Mock vision provider for deterministic testing.
//!
//! Responses are scripted per image size so a test can give each attachment
//! its own answer by rendering it at a distinct resolution.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lumen_inference::mock::{MockAnalysis, MockVisionProvider};
//!
//! let provider = MockVisionProvider::new()
//!     .with_image(64, 48, MockAnalysis::new().with_objects(&[("dog", 0.9)]))
//!     .with_latency_ms(20);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use lumen_core::{BoundingBox, DetectedObject, Error, Result, VisionProvider};
use parking_lot::Mutex;

/// Provider operations, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    DetectObjects,
    RecognizeText,
    ClassifyScene,
    DetectTextRegions,
}

/// Scripted answers for one image.
#[derive(Debug, Clone, Default)]
pub struct MockAnalysis {
    pub objects: Vec<DetectedObject>,
    pub text_lines: Vec<String>,
    pub scene: Option<String>,
    pub text_regions: Vec<BoundingBox>,
}

impl MockAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(mut self, objects: &[(&str, f32)]) -> Self {
        self.objects = objects
            .iter()
            .map(|(label, confidence)| DetectedObject::new(*label, *confidence))
            .collect();
        self
    }

    pub fn with_text_lines(mut self, lines: &[&str]) -> Self {
        self.text_lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_scene(mut self, scene: &str) -> Self {
        self.scene = Some(scene.to_string());
        self
    }

    pub fn with_text_regions(mut self, regions: Vec<BoundingBox>) -> Self {
        self.text_regions = regions;
        self
    }
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: MockOperation,
    pub width: u32,
    pub height: u32,
    pub timestamp: std::time::Instant,
}

#[derive(Debug, Clone, Default)]
struct MockConfig {
    by_size: HashMap<(u32, u32), MockAnalysis>,
    default_analysis: MockAnalysis,
    failing: HashSet<MockOperation>,
    latency_ms: u64,
}

/// Mock vision provider.
#[derive(Clone)]
pub struct MockVisionProvider {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl MockVisionProvider {
    /// Create a new mock provider that finds nothing in any image.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer for images without a size-specific script.
    pub fn with_default(mut self, analysis: MockAnalysis) -> Self {
        Arc::make_mut(&mut self.config).default_analysis = analysis;
        self
    }

    /// Answer for images of exactly `width` x `height`.
    pub fn with_image(mut self, width: u32, height: u32, analysis: MockAnalysis) -> Self {
        Arc::make_mut(&mut self.config)
            .by_size
            .insert((width, height), analysis);
        self
    }

    /// Make every call of `operation` fail.
    pub fn with_failing(mut self, operation: MockOperation) -> Self {
        Arc::make_mut(&mut self.config).failing.insert(operation);
        self
    }

    /// Set simulated latency for all operations.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().clone()
    }

    /// Number of calls made for one operation.
    pub fn call_count(&self, operation: MockOperation) -> usize {
        self.call_log
            .lock()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.call_log.lock().clear()
    }

    async fn respond(
        &self,
        operation: MockOperation,
        image: &DynamicImage,
    ) -> Result<&MockAnalysis> {
        self.call_log.lock().push(MockCall {
            operation,
            width: image.width(),
            height: image.height(),
            timestamp: std::time::Instant::now(),
        });

        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }

        if self.config.failing.contains(&operation) {
            return Err(Error::Inference(format!(
                "Simulated {:?} failure",
                operation
            )));
        }

        Ok(self
            .config
            .by_size
            .get(&(image.width(), image.height()))
            .unwrap_or(&self.config.default_analysis))
    }
}

impl Default for MockVisionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisionProvider for MockVisionProvider {
    async fn detect_objects(&self, image: &DynamicImage) -> Result<Vec<DetectedObject>> {
        Ok(self
            .respond(MockOperation::DetectObjects, image)
            .await?
            .objects
            .clone())
    }

    async fn recognize_text(&self, image: &DynamicImage) -> Result<Vec<String>> {
        Ok(self
            .respond(MockOperation::RecognizeText, image)
            .await?
            .text_lines
            .clone())
    }

    async fn classify_scene(&self, image: &DynamicImage) -> Result<Option<String>> {
        Ok(self
            .respond(MockOperation::ClassifyScene, image)
            .await?
            .scene
            .clone())
    }

    async fn detect_text_regions(&self, image: &DynamicImage) -> Result<Vec<BoundingBox>> {
        Ok(self
            .respond(MockOperation::DetectTextRegions, image)
            .await?
            .text_regions
            .clone())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn model_name(&self) -> &str {
        "mock-vision"
    }
}
