use std::any::Any;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::standard::StandardAnalyzer;
use crate::analysis::filter::{StemFilter, TokenFilter};
use crate::analysis::token::TokenStream;
use crate::error::Result;

/// [`StandardAnalyzer`] followed by Snowball English stemming.
#[derive(Debug, Clone)]
pub struct EnglishAnalyzer {
    standard: StandardAnalyzer,
    stemmer: StemFilter,
}

impl EnglishAnalyzer {
    pub fn new() -> Self {
        EnglishAnalyzer {
            standard: StandardAnalyzer::new(),
            stemmer: StemFilter::english(),
        }
    }
}

impl Default for EnglishAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for EnglishAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let tokens = self.standard.analyze(text)?;
        self.stemmer.filter(tokens)
    }

    fn name(&self) -> &'static str {
        "english"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stems_after_stop_words() {
        let texts: Vec<String> = EnglishAnalyzer::new()
            .analyze("The meetings were running")
            .unwrap()
            .map(|t| t.text)
            .collect();
        assert_eq!(texts, vec!["meet", "were", "run"]);
    }
}
