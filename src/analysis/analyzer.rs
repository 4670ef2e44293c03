//! Analyzers combine a tokenizer with a filter chain.

pub mod english;
pub mod keyword;
pub mod per_field;
pub mod standard;

use std::any::Any;

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Turns text into a stream of index terms.
pub trait Analyzer: Send + Sync + std::fmt::Debug {
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Analyze text destined for `field`. Analyzers that dispatch on the
    /// field name override this; everything else ignores the name.
    fn analyze_field(&self, _field: &str, text: &str) -> Result<TokenStream> {
        self.analyze(text)
    }

    fn name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// Collect the term texts of an analysis, mostly useful in tests and for
/// query construction.
pub fn analyze_to_terms(analyzer: &dyn Analyzer, field: &str, text: &str) -> Result<Vec<String>> {
    Ok(analyzer
        .analyze_field(field, text)?
        .map(|token| token.text)
        .collect())
}
