//! Note-page index sessions.
//!
//! An index directory holds `(id, text)` pairs: `id` is indexed verbatim,
//! `postBody` is analyzed. [`IndexingSession`] is the single writer of a
//! directory and [`SearchSession`] a read-only snapshot of its last commit.
//! [`tasks`] runs both on tokio's blocking pool.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use notedex::engine::{IndexConfig, IndexingSession, SearchSession};
//! use notedex::lexical::index::OpenMode;
//! use notedex::storage::memory::{MemoryStorage, MemoryStorageConfig};
//! use notedex::storage::Storage;
//!
//! let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new(MemoryStorageConfig::default()));
//!
//! let mut writer = IndexingSession::open(storage.clone(), IndexConfig::default(), OpenMode::Create).unwrap();
//! writer.add_document_list(&[("p1", "Weekly planning notes"), ("p2", "Travel checklist")]).unwrap();
//! writer.close().unwrap();
//!
//! let searcher = SearchSession::open(storage, IndexConfig::default()).unwrap();
//! let hits = searcher.search("planning").unwrap();
//! assert_eq!(hits[0].id, "p1");
//! ```

pub mod config;
pub mod indexing;
pub mod search;
pub mod tasks;

pub use config::{DEFAULT_INDEX_DIR, IndexConfig, IndexConfigBuilder};
pub use indexing::{IndexProgress, IndexingSession, ProgressCallback};
pub use search::{SearchHit, SearchResults, SearchSession};
pub use tasks::CancellationToken;
