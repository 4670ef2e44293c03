use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::{Analyzer, EnglishAnalyzer, KeywordAnalyzer, PerFieldAnalyzer, StandardAnalyzer};
use crate::error::{NotedexError, Result};
use crate::lexical::query::parser::{DefaultOperator, QueryParser};
use crate::lexical::query::scorer::Bm25Params;

/// Directory name used for the index when the caller does not pick one.
pub const DEFAULT_INDEX_DIR: &str = "LuceneIndex";

pub const DEFAULT_ID_FIELD: &str = "id";
pub const DEFAULT_BODY_FIELD: &str = "postBody";
pub const DEFAULT_SEARCH_LIMIT: usize = 1000;
pub const DEFAULT_MAX_BUFFERED_DOCS: usize = 10_000;

/// Configuration shared by indexing and search sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Exact-match identifier field.
    pub id_field: String,
    /// Analyzed full-text field, also the default search field.
    pub body_field: String,
    /// Maximum number of hits returned by a search.
    pub search_limit: usize,
    /// Buffered documents that trigger a segment flush.
    pub max_buffered_docs: usize,
    /// Stem English words in the body field.
    pub stemming: bool,
    /// Occurrence of query clauses written without an operator.
    pub default_operator: DefaultOperator,
    pub bm25: Bm25Params,
}

impl IndexConfig {
    pub fn new() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            body_field: DEFAULT_BODY_FIELD.to_string(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            max_buffered_docs: DEFAULT_MAX_BUFFERED_DOCS,
            stemming: false,
            default_operator: DefaultOperator::Or,
            bm25: Bm25Params::default(),
        }
    }

    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::default()
    }

    /// Parse and validate a JSON config. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: IndexConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            NotedexError::invalid_config(format!(
                "Failed to read config {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id_field.is_empty() || self.body_field.is_empty() {
            return Err(NotedexError::invalid_config("Field names must not be empty"));
        }
        if self.id_field == self.body_field {
            return Err(NotedexError::invalid_config(format!(
                "id_field and body_field must differ, both are {:?}",
                self.id_field
            )));
        }
        if self.search_limit == 0 {
            return Err(NotedexError::invalid_config("search_limit must be positive"));
        }
        if self.max_buffered_docs == 0 {
            return Err(NotedexError::invalid_config(
                "max_buffered_docs must be positive",
            ));
        }
        self.bm25.validate()
    }

    /// Body analyzer as default, keyword analyzer for the id field.
    pub fn analyzer(&self) -> Arc<dyn Analyzer> {
        let body: Arc<dyn Analyzer> = if self.stemming {
            Arc::new(EnglishAnalyzer::new())
        } else {
            Arc::new(StandardAnalyzer::new())
        };
        Arc::new(
            PerFieldAnalyzer::new(body)
                .with_analyzer(self.id_field.as_str(), Arc::new(KeywordAnalyzer::new())),
        )
    }

    /// Parser over the body field, sharing the indexing analyzer.
    pub fn query_parser(&self) -> QueryParser {
        QueryParser::new(self.body_field.as_str(), self.analyzer())
            .with_default_operator(self.default_operator)
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    pub fn id_field(mut self, name: impl Into<String>) -> Self {
        self.config.id_field = name.into();
        self
    }

    pub fn body_field(mut self, name: impl Into<String>) -> Self {
        self.config.body_field = name.into();
        self
    }

    pub fn search_limit(mut self, limit: usize) -> Self {
        self.config.search_limit = limit;
        self
    }

    pub fn max_buffered_docs(mut self, docs: usize) -> Self {
        self.config.max_buffered_docs = docs;
        self
    }

    pub fn stemming(mut self, stemming: bool) -> Self {
        self.config.stemming = stemming;
        self
    }

    pub fn default_operator(mut self, operator: DefaultOperator) -> Self {
        self.config.default_operator = operator;
        self
    }

    pub fn bm25(mut self, bm25: Bm25Params) -> Self {
        self.config.bm25 = bm25;
        self
    }

    /// Validate and return the config.
    pub fn build(self) -> Result<IndexConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
