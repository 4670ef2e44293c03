use std::any::Any;
use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Dispatches to a field-specific analyzer, falling back to a default.
#[derive(Debug, Clone)]
pub struct PerFieldAnalyzer {
    default: Arc<dyn Analyzer>,
    fields: AHashMap<String, Arc<dyn Analyzer>>,
}

impl PerFieldAnalyzer {
    pub fn new(default: Arc<dyn Analyzer>) -> Self {
        PerFieldAnalyzer {
            default,
            fields: AHashMap::new(),
        }
    }

    pub fn add_analyzer<S: Into<String>>(&mut self, field: S, analyzer: Arc<dyn Analyzer>) {
        self.fields.insert(field.into(), analyzer);
    }

    pub fn with_analyzer<S: Into<String>>(mut self, field: S, analyzer: Arc<dyn Analyzer>) -> Self {
        self.add_analyzer(field, analyzer);
        self
    }

    /// Analyzer used for `field`.
    pub fn analyzer_for(&self, field: &str) -> &Arc<dyn Analyzer> {
        self.fields.get(field).unwrap_or(&self.default)
    }

    pub fn default_analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.default
    }
}

impl Analyzer for PerFieldAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.default.analyze(text)
    }

    fn analyze_field(&self, field: &str, text: &str) -> Result<TokenStream> {
        self.analyzer_for(field).analyze(text)
    }

    fn name(&self) -> &'static str {
        "per_field"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
