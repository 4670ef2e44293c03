//! Tokenizers split text into positioned tokens.

use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::token::{Token, TokenStream};
use crate::error::Result;

/// Splits text into tokens.
pub trait Tokenizer: Send + Sync + std::fmt::Debug {
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    fn name(&self) -> &'static str;
}

/// Splits on Unicode word boundaries (UAX #29), dropping punctuation and
/// whitespace.
#[derive(Debug, Clone, Default)]
pub struct UnicodeWordTokenizer;

impl UnicodeWordTokenizer {
    pub fn new() -> Self {
        UnicodeWordTokenizer
    }
}

impl Tokenizer for UnicodeWordTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        let tokens: Vec<Token> = text
            .unicode_word_indices()
            .enumerate()
            .map(|(position, (offset, word))| {
                Token::new(word, position as u32, offset, offset + word.len())
            })
            .collect();
        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "unicode_word"
    }
}

/// Emits the entire input as a single token, even when it is empty.
#[derive(Debug, Clone, Default)]
pub struct WholeTokenizer;

impl WholeTokenizer {
    pub fn new() -> Self {
        WholeTokenizer
    }
}

impl Tokenizer for WholeTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        Ok(Box::new(std::iter::once(Token::new(text, 0, 0, text.len()))))
    }

    fn name(&self) -> &'static str {
        "whole"
    }
}
