//! Searcher implementation for executing queries against an index snapshot.

use std::sync::Arc;

use log::debug;

use crate::error::Result;
use crate::lexical::index::IndexReader;
use crate::lexical::query::Query;
use crate::lexical::query::scorer::Bm25Params;
use crate::lexical::search::collector::{Collector, CountCollector, TopDocs, TopDocsCollector};

/// Executes queries against one [`IndexReader`].
#[derive(Debug, Clone)]
pub struct Searcher {
    reader: Arc<IndexReader>,
    bm25: Bm25Params,
}

impl Searcher {
    pub fn new(reader: Arc<IndexReader>) -> Self {
        Searcher {
            reader,
            bm25: Bm25Params::default(),
        }
    }

    pub fn with_bm25(mut self, bm25: Bm25Params) -> Self {
        self.bm25 = bm25;
        self
    }

    pub fn reader(&self) -> &Arc<IndexReader> {
        &self.reader
    }

    pub fn bm25(&self) -> &Bm25Params {
        &self.bm25
    }

    /// Feed every match of `query` to `collector`.
    pub fn search_with_collector<C: Collector>(
        &self,
        query: &dyn Query,
        mut collector: C,
    ) -> Result<C> {
        let mut matcher = query.matcher(&self.reader, &self.bm25)?;

        while !matcher.is_exhausted() {
            collector.collect(matcher.doc_id(), matcher.score())?;
            if !collector.needs_more() || !matcher.next()? {
                break;
            }
        }

        Ok(collector)
    }

    /// The `limit` best hits, highest score first, ties by ascending doc id.
    pub fn search(&self, query: &dyn Query, limit: usize) -> Result<TopDocs> {
        let collector = self.search_with_collector(query, TopDocsCollector::new(limit))?;
        let top_docs = collector.into_top_docs();
        debug!(
            "Query {} matched {} docs, returning {}",
            query.description(),
            top_docs.total_hits,
            top_docs.hits.len()
        );
        Ok(top_docs)
    }

    /// Number of documents matching `query`.
    pub fn count(&self, query: &dyn Query) -> Result<u64> {
        Ok(self
            .search_with_collector(query, CountCollector::new())?
            .count())
    }
}
