//! Token type produced by tokenizers and transformed by filters.

/// A single token with its position and byte offsets in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The (possibly normalized) token text.
    pub text: String,
    /// Position in the token stream. Removed tokens leave gaps.
    pub position: u32,
    /// Byte offset of the first character in the original text.
    pub start_offset: usize,
    /// Byte offset one past the last character in the original text.
    pub end_offset: usize,
}

impl Token {
    pub fn new<S: Into<String>>(text: S, position: u32, start_offset: usize, end_offset: usize) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
        }
    }

    /// Replace the token text, keeping position and offsets.
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = text.into();
        self
    }
}

/// An owned stream of tokens.
pub type TokenStream = Box<dyn Iterator<Item = Token> + Send>;
