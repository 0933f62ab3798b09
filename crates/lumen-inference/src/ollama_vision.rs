//! Ollama-backed vision provider (e.g., qwen3-vl, llava).
//!
//! Each `VisionProvider` call is one `/api/generate` request carrying the
//! image as base64 PNG and a prompt that asks for a JSON answer. Ollama's
//! `format: "json"` mode keeps the reply parseable.

use std::io::Cursor;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use lumen_core::defaults::{
    ENV_OLLAMA_VISION_MODEL, ENV_VISION_TIMEOUT_SECS, OLLAMA_URL, VISION_TIMEOUT_SECS,
};
use lumen_core::{BoundingBox, DetectedObject, Error, Result, VisionProvider};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Longest image side sent to the model; larger images are downscaled first.
const MAX_UPLOAD_DIMENSION: u32 = 1536;

const OBJECTS_PROMPT: &str = "List the distinct physical objects visible in this image. \
Respond with JSON only: {\"objects\": [{\"label\": \"<lowercase noun>\", \"confidence\": <0.0-1.0>}]}";

const TEXT_PROMPT: &str = "Transcribe every line of text visible in this image, top to bottom. \
Respond with JSON only: {\"lines\": [\"<line>\"]}. Use an empty list when there is no text.";

const SCENE_PROMPT: &str = "Give one short lowercase label for the overall scene of this image \
(for example \"beach\", \"office\", \"kitchen\", \"document\"). \
Respond with JSON only: {\"scene\": \"<label>\"} or {\"scene\": null} if unsure.";

const TEXT_REGIONS_PROMPT: &str = "Locate every block of text in this image without reading it. \
Respond with JSON only: {\"regions\": [{\"x\": <left>, \"y\": <top>, \"width\": <w>, \"height\": <h>}]} \
using coordinates normalized to 0.0-1.0 of the image size.";

/// Vision provider that prompts a local Ollama vision model.
pub struct OllamaVisionBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OllamaVisionBackend {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            timeout_secs: VISION_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables.
    /// Returns None if OLLAMA_VISION_MODEL is not set.
    pub fn from_env() -> Option<Self> {
        let model = std::env::var(ENV_OLLAMA_VISION_MODEL).ok()?;
        if model.is_empty() {
            return None;
        }
        let base_url = std::env::var("OLLAMA_BASE")
            .or_else(|_| std::env::var("OLLAMA_URL"))
            .unwrap_or_else(|_| OLLAMA_URL.to_string());
        let timeout_secs = std::env::var(ENV_VISION_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(VISION_TIMEOUT_SECS);
        Some(Self::new(base_url, model).with_timeout_secs(timeout_secs))
    }

    /// Set the per-request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Send one image + prompt and return the model's raw JSON answer.
    async fn generate_json(&self, image: &DynamicImage, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let request = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            images: vec![encode_png_base64(image)?],
            stream: false,
            format: "json".to_string(),
        };

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Vision request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Vision API returned {}: {}",
                status, body
            )));
        }

        let result: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse vision response: {}", e)))?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            duration_ms = elapsed,
            response_len = result.response.len(),
            "Vision generation complete"
        );
        if elapsed > 30_000 {
            warn!(duration_ms = elapsed, slow = true, "Slow vision request");
        }
        Ok(result.response)
    }
}

#[derive(Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    images: Vec<String>, // base64 encoded
    stream: bool,
    format: String,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct ObjectsAnswer {
    #[serde(default)]
    objects: Vec<ObjectEntry>,
}

#[derive(Deserialize)]
struct ObjectEntry {
    label: String,
    #[serde(default = "default_object_confidence")]
    confidence: f32,
}

fn default_object_confidence() -> f32 {
    1.0
}

#[derive(Deserialize)]
struct LinesAnswer {
    #[serde(default)]
    lines: Vec<String>,
}

#[derive(Deserialize)]
struct SceneAnswer {
    #[serde(default)]
    scene: Option<String>,
}

#[derive(Deserialize)]
struct RegionsAnswer {
    #[serde(default)]
    regions: Vec<BoundingBox>,
}

/// Encode an image as base64 PNG, downscaling oversized images.
fn encode_png_base64(image: &DynamicImage) -> Result<String> {
    let mut buf = Vec::new();
    if image.width() > MAX_UPLOAD_DIMENSION || image.height() > MAX_UPLOAD_DIMENSION {
        image
            .thumbnail(MAX_UPLOAD_DIMENSION, MAX_UPLOAD_DIMENSION)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    } else {
        image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    }
    Ok(base64::engine::general_purpose::STANDARD.encode(&buf))
}

fn parse_answer<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<T> {
    serde_json::from_str(raw.trim())
        .map_err(|e| Error::Inference(format!("Malformed vision answer: {}", e)))
}

pub(crate) fn parse_objects(raw: &str) -> Result<Vec<DetectedObject>> {
    let answer: ObjectsAnswer = parse_answer(raw)?;
    Ok(answer
        .objects
        .into_iter()
        .filter(|o| !o.label.trim().is_empty())
        .map(|o| DetectedObject::new(o.label.trim(), o.confidence.clamp(0.0, 1.0)))
        .collect())
}

pub(crate) fn parse_lines(raw: &str) -> Result<Vec<String>> {
    let answer: LinesAnswer = parse_answer(raw)?;
    Ok(answer
        .lines
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

pub(crate) fn parse_scene(raw: &str) -> Result<Option<String>> {
    let answer: SceneAnswer = parse_answer(raw)?;
    Ok(answer
        .scene
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

pub(crate) fn parse_regions(raw: &str) -> Result<Vec<BoundingBox>> {
    let answer: RegionsAnswer = parse_answer(raw)?;
    Ok(answer
        .regions
        .into_iter()
        .filter(|b| b.width > 0.0 && b.height > 0.0)
        .collect())
}

#[async_trait]
impl VisionProvider for OllamaVisionBackend {
    #[instrument(skip(self, image), fields(subsystem = "inference", component = "ollama_vision", op = "detect_objects", model = %self.model))]
    async fn detect_objects(&self, image: &DynamicImage) -> Result<Vec<DetectedObject>> {
        let raw = self.generate_json(image, OBJECTS_PROMPT).await?;
        parse_objects(&raw)
    }

    #[instrument(skip(self, image), fields(subsystem = "inference", component = "ollama_vision", op = "recognize_text", model = %self.model))]
    async fn recognize_text(&self, image: &DynamicImage) -> Result<Vec<String>> {
        let raw = self.generate_json(image, TEXT_PROMPT).await?;
        parse_lines(&raw)
    }

    #[instrument(skip(self, image), fields(subsystem = "inference", component = "ollama_vision", op = "classify_scene", model = %self.model))]
    async fn classify_scene(&self, image: &DynamicImage) -> Result<Option<String>> {
        let raw = self.generate_json(image, SCENE_PROMPT).await?;
        parse_scene(&raw)
    }

    #[instrument(skip(self, image), fields(subsystem = "inference", component = "ollama_vision", op = "detect_text_regions", model = %self.model))]
    async fn detect_text_regions(&self, image: &DynamicImage) -> Result<Vec<BoundingBox>> {
        let raw = self.generate_json(image, TEXT_REGIONS_PROMPT).await?;
        parse_regions(&raw)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
