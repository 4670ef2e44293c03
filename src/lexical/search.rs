//! Query execution: searcher and hit collectors.

pub mod collector;
pub mod searcher;

pub use collector::{Collector, CountCollector, ScoreDoc, TopDocs, TopDocsCollector};
pub use searcher::Searcher;
