//! # Notedex
//!
//! A small full-text search library for exported note pages.
//!
//! Pages are `(id, text)` pairs. They are indexed into a single local index
//! directory and searched with the Lucene classic query syntax.
//!
//! ## Features
//!
//! - Unicode-aware analysis with optional English stemming
//! - Immutable segments with checksummed files and atomic commits
//! - Deletion by id, merging and a single-writer lock
//! - Term, phrase, prefix and boolean queries scored with BM25
//! - Blocking sessions plus an async front end on tokio
pub mod analysis;
pub mod engine;
pub mod error;
pub mod lexical;
pub mod storage;
pub mod util;

// Re-exports for the public API
pub use analysis::Analyzer;
pub use engine::{
    CancellationToken, DEFAULT_INDEX_DIR, IndexConfig, IndexProgress, IndexingSession, SearchHit,
    SearchResults, SearchSession,
};
pub use error::{NotedexError, Result};
pub use lexical::index::OpenMode;
pub use storage::{Storage, StorageConfig, StorageFactory};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
