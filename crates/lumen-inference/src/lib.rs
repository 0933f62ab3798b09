//! # lumen-inference
//!
//! Vision provider backends for lumen.
//!
//! This crate provides:
//! - Ollama vision backend (default feature `ollama`)
//! - Mock backend with scripted answers (feature `mock`)
//!
//! # Example
//!
//! ```rust,no_run
//! use lumen_inference::OllamaVisionBackend;
//! use lumen_core::VisionProvider;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OllamaVisionBackend::from_env().expect("OLLAMA_VISION_MODEL not set");
//!     let image = image::open("receipt.jpg").unwrap();
//!     let lines = backend.recognize_text(&image).await.unwrap();
//!     println!("{}", lines.join("\n"));
//! }
//! ```

#[cfg(feature = "ollama")]
pub mod ollama_vision;

// Mock vision backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use lumen_core::*;

#[cfg(feature = "ollama")]
pub use ollama_vision::OllamaVisionBackend;
