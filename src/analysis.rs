//! Text analysis: turning raw text into normalized, positioned tokens.
//!
//! An [`analyzer::Analyzer`] is a [`tokenizer::Tokenizer`] followed by a chain
//! of [`filter::TokenFilter`]s. The same analyzer must be used at indexing and
//! at query time for a field, otherwise query terms will not line up with
//! indexed terms.

pub mod analyzer;
pub mod filter;
pub mod token;
pub mod tokenizer;

pub use analyzer::Analyzer;
pub use analyzer::english::EnglishAnalyzer;
pub use analyzer::keyword::KeywordAnalyzer;
pub use analyzer::per_field::PerFieldAnalyzer;
pub use analyzer::standard::StandardAnalyzer;
pub use token::{Token, TokenStream};
