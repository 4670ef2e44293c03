use std::any::Any;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::tokenizer::{Tokenizer, WholeTokenizer};
use crate::error::Result;

/// Indexes the whole value as one term, untouched. Used for identifiers.
#[derive(Debug, Clone, Default)]
pub struct KeywordAnalyzer {
    tokenizer: WholeTokenizer,
}

impl KeywordAnalyzer {
    pub fn new() -> Self {
        KeywordAnalyzer::default()
    }
}

impl Analyzer for KeywordAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.tokenizer.tokenize(text)
    }

    fn name(&self) -> &'static str {
        "keyword"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
