//! Lexical search over an inverted index.
//!
//! # Module Structure
//!
//! - `core`: documents, fields and terms
//! - `index`: segments, commit points, the index writer and reader
//! - `query`: query types, matchers, BM25 scoring and the query string parser
//! - `search`: query execution and hit collection

pub mod core;
pub mod index;
pub mod query;
pub mod search;

pub use core::{Document, DocumentBuilder, Field, Indexing, Term};
pub use index::{IndexReader, IndexWriter, IndexWriterConfig, OpenMode};
pub use query::{Query, QueryParser};
pub use search::{Searcher, TopDocs};
