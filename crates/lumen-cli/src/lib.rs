//! # lumen-cli
//!
//! Storage adapters used by the `lumen` binary: a JSON-file note repository and
//! a filesystem image loader.

pub mod store;

pub use store::{FsImageLoader, JsonNoteRepository};
