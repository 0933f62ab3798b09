//! # lumen-core
//!
//! Core types, traits, and abstractions for lumen image search.
//!
//! This crate provides the note/attachment data model, the search and
//! classification result types, and the collaborator traits (vision provider,
//! image loader, note repository) the other lumen crates depend on.

pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
