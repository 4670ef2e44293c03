use std::any::Any;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::filter::{
    LengthFilter, LowercaseFilter, NormalizationFilter, StopFilter, TokenFilter,
};
use crate::analysis::token::TokenStream;
use crate::analysis::tokenizer::{Tokenizer, UnicodeWordTokenizer};
use crate::error::Result;

/// Unicode word segmentation, NFKC, lowercasing, a 255-byte length cap and
/// English stop words.
#[derive(Debug, Clone)]
pub struct StandardAnalyzer {
    tokenizer: UnicodeWordTokenizer,
    normalize: NormalizationFilter,
    lowercase: LowercaseFilter,
    length: LengthFilter,
    stop: Option<StopFilter>,
}

impl StandardAnalyzer {
    pub fn new() -> Self {
        StandardAnalyzer {
            tokenizer: UnicodeWordTokenizer::new(),
            normalize: NormalizationFilter::new(),
            lowercase: LowercaseFilter::new(),
            length: LengthFilter::default(),
            stop: Some(StopFilter::english()),
        }
    }

    /// Replace the stop word set. `None` keeps every token.
    pub fn with_stop_filter(mut self, stop: Option<StopFilter>) -> Self {
        self.stop = stop;
        self
    }
}

impl Default for StandardAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let tokens = self.tokenizer.tokenize(text)?;
        let tokens = self.normalize.filter(tokens)?;
        let tokens = self.lowercase.filter(tokens)?;
        let tokens = self.length.filter(tokens)?;
        match &self.stop {
            Some(stop) => stop.filter(tokens),
            None => Ok(tokens),
        }
    }

    fn name(&self) -> &'static str {
        "standard"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
