//! Search sessions over a committed index snapshot.

use std::collections::BTreeSet;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::engine::config::IndexConfig;
use crate::error::Result;
use crate::lexical::core::document::Document;
use crate::lexical::index::IndexReader;
use crate::lexical::query::Query;
use crate::lexical::query::parser::QueryParser;
use crate::lexical::search::{ScoreDoc, Searcher, TopDocs};
use crate::storage::Storage;

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub post_body: String,
    pub score: f32,
}

/// Hits of one search plus the number of matching documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub total_hits: u64,
    pub hits: Vec<SearchHit>,
}

/// Read-only view of the index as of the commit it was opened on.
///
/// Later commits are not visible; open a new session to see them.
#[derive(Debug, Clone)]
pub struct SearchSession {
    config: IndexConfig,
    searcher: Searcher,
    parser: QueryParser,
}

impl SearchSession {
    /// Open the latest commit. A directory without one is an empty index.
    pub fn open(storage: Arc<dyn Storage>, config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let reader = IndexReader::open(storage)?;
        debug!(
            "Opened search session at generation {}: {} docs ({} max)",
            reader.generation(),
            reader.num_docs(),
            reader.max_doc()
        );
        Ok(Self::from_reader(Arc::new(reader), config))
    }

    /// Session over an already opened snapshot.
    pub fn from_reader(reader: Arc<IndexReader>, config: IndexConfig) -> Self {
        SearchSession {
            searcher: Searcher::new(reader).with_bm25(config.bm25),
            parser: config.query_parser(),
            config,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn reader(&self) -> &Arc<IndexReader> {
        self.searcher.reader()
    }

    pub fn parser(&self) -> &QueryParser {
        &self.parser
    }

    /// Documents in the snapshot, deleted ones included.
    pub fn max_doc(&self) -> u64 {
        self.reader().max_doc()
    }

    pub fn num_docs(&self) -> u64 {
        self.reader().num_docs()
    }

    /// Parse `query_str` against the body field and return up to
    /// `search_limit` hits, best first.
    pub fn search(&self, query_str: &str) -> Result<Vec<SearchHit>> {
        Ok(self.search_with_total(query_str)?.hits)
    }

    pub fn search_with_total(&self, query_str: &str) -> Result<SearchResults> {
        let query = self.parser.parse(query_str)?;
        debug!("Parsed {query_str:?} as {}", query.description());
        self.search_query(query.as_ref(), self.config.search_limit)
    }

    /// Run a pre-built query.
    pub fn search_query(&self, query: &dyn Query, limit: usize) -> Result<SearchResults> {
        let top_docs = self.searcher.search(query, limit)?;
        let results = self.to_results(top_docs)?;
        debug!(
            "Found {} hits ({} returned), max_doc {}",
            results.total_hits,
            results.hits.len(),
            self.max_doc()
        );
        Ok(results)
    }

    fn to_results(&self, top_docs: TopDocs) -> Result<SearchResults> {
        let hits = top_docs
            .hits
            .iter()
            .map(|hit| self.to_hit(hit))
            .collect::<Result<Vec<_>>>()?;
        Ok(SearchResults {
            total_hits: top_docs.total_hits,
            hits,
        })
    }

    fn to_hit(&self, hit: &ScoreDoc) -> Result<SearchHit> {
        let doc = self.reader().document(hit.doc_id)?;
        Ok(SearchHit {
            id: doc.get(&self.config.id_field).unwrap_or_default().to_string(),
            post_body: doc.get(&self.config.body_field).unwrap_or_default().to_string(),
            score: hit.score,
        })
    }

    /// Every distinct term of `field`, found by walking all terms of the index.
    ///
    /// Terms of deleted documents stay listed until their segment is merged.
    pub fn all_values_by_field(&self, field: &str) -> Result<BTreeSet<String>> {
        let values: BTreeSet<String> = self
            .reader()
            .all_terms()?
            .into_iter()
            .filter(|term| term.field() == field)
            .map(|term| term.text().to_string())
            .collect();
        debug!("Field {field} has {} distinct values", values.len());
        Ok(values)
    }

    /// Stored fields of a document of this snapshot.
    pub fn document(&self, doc_id: u64) -> Result<Document> {
        self.reader().document(doc_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::indexing::IndexingSession;
    use crate::error::NotedexError;
    use crate::lexical::index::OpenMode;
    use crate::lexical::query::term::TermQuery;
    use crate::storage::memory::{MemoryStorage, MemoryStorageConfig};

    fn indexed(docs: &[(&str, &str)]) -> Arc<dyn Storage> {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new(MemoryStorageConfig::default()));
        let mut session =
            IndexingSession::open(storage.clone(), IndexConfig::default(), OpenMode::Create).unwrap();
        session.add_document_list(docs).unwrap();
        session.close().unwrap();
        storage
    }

    #[test]
    fn test_search_returns_hits() {
        let storage = indexed(&[("p1", "Meeting notes from Monday"), ("p2", "Grocery list")]);
        let session = SearchSession::open(storage, IndexConfig::default()).unwrap();
        let hits = session.search("meeting").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "p1");
        assert_eq!(hits[0].post_body, "Meeting notes from Monday");
        assert!(hits[0].score > 0.0);
    }

    #[test]
    fn test_limit_caps_hits() {
        let docs: Vec<(String, String)> = (0..30)
            .map(|i| (format!("p{i}"), format!("common word {i}")))
            .collect();
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new(MemoryStorageConfig::default()));
        let mut writer =
            IndexingSession::open(storage.clone(), IndexConfig::default(), OpenMode::Create).unwrap();
        writer.add_document_list(&docs).unwrap();
        writer.close().unwrap();

        let config = IndexConfig::builder().search_limit(10).build().unwrap();
        let session = SearchSession::open(storage, config).unwrap();
        let results = session.search_with_total("common").unwrap();
        assert_eq!(results.hits.len(), 10);
        assert_eq!(results.total_hits, 30);
    }

    #[test]
    fn test_empty_directory() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new(MemoryStorageConfig::default()));
        let session = SearchSession::open(storage, IndexConfig::default()).unwrap();
        assert_eq!(session.max_doc(), 0);
        assert!(session.search("anything").unwrap().is_empty());
        assert!(session.all_values_by_field("id").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_query() {
        let storage = indexed(&[("p1", "text")]);
        let session = SearchSession::open(storage, IndexConfig::default()).unwrap();
        let err = session.search("(unclosed").unwrap_err();
        assert!(matches!(err, NotedexError::QueryParse(_)));
    }

    #[test]
    fn test_all_values_and_document() {
        let storage = indexed(&[("b", "one"), ("a", "two"), ("b", "three")]);
        let session = SearchSession::open(storage, IndexConfig::default()).unwrap();
        let ids: Vec<String> = session.all_values_by_field("id").unwrap().into_iter().collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(session.document(1).unwrap().get("postBody"), Some("two"));
    }

    #[test]
    fn test_search_query() {
        let storage = indexed(&[("Page-1", "alpha"), ("Page-2", "beta")]);
        let session = SearchSession::open(storage, IndexConfig::default()).unwrap();
        let results = session
            .search_query(&TermQuery::new("id", "Page-2"), 5)
            .unwrap();
        assert_eq!(results.total_hits, 1);
        assert_eq!(results.hits[0].post_body, "beta");

        // Ids are matched exactly through the query parser as well.
        assert_eq!(session.search("id:Page-1").unwrap()[0].id, "Page-1");
    }
}
