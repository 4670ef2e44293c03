//! Query matching every live document.

use std::any::Any;

use crate::error::Result;
use crate::lexical::index::IndexReader;
use crate::lexical::query::matcher::{DocListMatcher, Matcher};
use crate::lexical::query::scorer::Bm25Params;
use crate::lexical::query::{Query, boost_suffix};

/// `*:*`. Every live document scores the query boost.
#[derive(Debug, Clone)]
pub struct MatchAllQuery {
    boost: f32,
}

impl MatchAllQuery {
    pub fn new() -> Self {
        MatchAllQuery { boost: 1.0 }
    }
}

impl Default for MatchAllQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl Query for MatchAllQuery {
    fn matcher(&self, reader: &IndexReader, _bm25: &Bm25Params) -> Result<Box<dyn Matcher>> {
        Ok(Box::new(DocListMatcher::constant(
            reader.live_doc_ids(),
            self.boost,
        )))
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        format!("*:*{}", boost_suffix(self.boost))
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
