//! Token filters transform, drop or keep tokens from a stream.
//!
//! Dropping a token never renumbers the remaining ones, so phrase queries see
//! the gap left by a removed stop word.

use std::collections::HashSet;
use std::sync::Arc;

use lazy_static::lazy_static;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Lucene's classic English stop word set.
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

lazy_static! {
    static ref ENGLISH_STOP_SET: Arc<HashSet<String>> = Arc::new(
        ENGLISH_STOP_WORDS
            .iter()
            .map(|w| w.to_string())
            .collect()
    );
}

/// Longest token, in bytes, kept by [`LengthFilter::default`].
pub const DEFAULT_MAX_TOKEN_LENGTH: usize = 255;

pub trait TokenFilter: Send + Sync + std::fmt::Debug {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    fn name(&self) -> &'static str;
}

/// Lowercases token text.
#[derive(Debug, Clone, Default)]
pub struct LowercaseFilter;

impl LowercaseFilter {
    pub fn new() -> Self {
        LowercaseFilter
    }
}

impl TokenFilter for LowercaseFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(Box::new(tokens.map(|token| {
            let lowered = token.text.to_lowercase();
            token.with_text(lowered)
        })))
    }

    fn name(&self) -> &'static str {
        "lowercase"
    }
}

/// Applies Unicode NFKC normalization, folding compatibility forms such as
/// full-width letters and ligatures.
#[derive(Debug, Clone, Default)]
pub struct NormalizationFilter;

impl NormalizationFilter {
    pub fn new() -> Self {
        NormalizationFilter
    }
}

impl TokenFilter for NormalizationFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(Box::new(tokens.map(|token| {
            let normalized: String = token.text.nfkc().collect();
            token.with_text(normalized)
        })))
    }

    fn name(&self) -> &'static str {
        "nfkc"
    }
}

/// Drops tokens found in a stop word set.
#[derive(Debug, Clone)]
pub struct StopFilter {
    stop_words: Arc<HashSet<String>>,
}

impl StopFilter {
    /// Filter using [`ENGLISH_STOP_WORDS`].
    pub fn english() -> Self {
        StopFilter {
            stop_words: ENGLISH_STOP_SET.clone(),
        }
    }

    pub fn with_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StopFilter {
            stop_words: Arc::new(words.into_iter().map(Into::into).collect()),
        }
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }
}

impl Default for StopFilter {
    fn default() -> Self {
        Self::english()
    }
}

impl TokenFilter for StopFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let stop_words = self.stop_words.clone();
        Ok(Box::new(
            tokens.filter(move |token| !stop_words.contains(&token.text)),
        ))
    }

    fn name(&self) -> &'static str {
        "stop"
    }
}

/// Drops tokens outside a byte-length range.
#[derive(Debug, Clone)]
pub struct LengthFilter {
    min: usize,
    max: usize,
}

impl LengthFilter {
    pub fn new(min: usize, max: usize) -> Self {
        LengthFilter { min, max }
    }
}

impl Default for LengthFilter {
    fn default() -> Self {
        LengthFilter::new(1, DEFAULT_MAX_TOKEN_LENGTH)
    }
}

impl TokenFilter for LengthFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let (min, max) = (self.min, self.max);
        Ok(Box::new(tokens.filter(move |token| {
            let len = token.text.len();
            len >= min && len <= max
        })))
    }

    fn name(&self) -> &'static str {
        "length"
    }
}

/// Reduces tokens to their Snowball stem.
#[derive(Clone)]
pub struct StemFilter {
    stemmer: Arc<Stemmer>,
}

impl StemFilter {
    pub fn english() -> Self {
        StemFilter {
            stemmer: Arc::new(Stemmer::create(Algorithm::English)),
        }
    }
}

impl std::fmt::Debug for StemFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StemFilter").finish_non_exhaustive()
    }
}

impl TokenFilter for StemFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let stemmer = self.stemmer.clone();
        Ok(Box::new(tokens.map(move |token| {
            let stemmed = stemmer.stem(&token.text).into_owned();
            token.with_text(stemmed)
        })))
    }

    fn name(&self) -> &'static str {
        "stem"
    }
}
