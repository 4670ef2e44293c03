//! Document fields.
//!
//! A field is a named string value plus two switches: whether the original
//! value is stored for retrieval, and how (or whether) it is indexed.

use serde::{Deserialize, Serialize};

use crate::error::{NotedexError, Result};

/// How a field value reaches the inverted index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Indexing {
    /// Passed through the field's analyzer.
    Analyzed,
    /// Indexed as a single exact term.
    NotAnalyzed,
    /// Not indexed at all.
    No,
}

impl Indexing {
    pub fn is_indexed(self) -> bool {
        !matches!(self, Indexing::No)
    }

    pub(crate) fn to_code(self) -> u8 {
        match self {
            Indexing::Analyzed => 0,
            Indexing::NotAnalyzed => 1,
            Indexing::No => 2,
        }
    }

    pub(crate) fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Indexing::Analyzed),
            1 => Ok(Indexing::NotAnalyzed),
            2 => Ok(Indexing::No),
            other => Err(NotedexError::corrupt(format!(
                "Unknown field indexing code {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub stored: bool,
    pub indexing: Indexing,
}

impl Field {
    pub fn new<N: Into<String>, V: Into<String>>(
        name: N,
        value: V,
        stored: bool,
        indexing: Indexing,
    ) -> Self {
        Field {
            name: name.into(),
            value: value.into(),
            stored,
            indexing,
        }
    }

    /// Stored and analyzed: full-text content.
    pub fn text<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self::new(name, value, true, Indexing::Analyzed)
    }

    /// Stored and indexed verbatim: identifiers.
    pub fn keyword<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self::new(name, value, true, Indexing::NotAnalyzed)
    }

    /// Stored only.
    pub fn stored<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self::new(name, value, true, Indexing::No)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let id = Field::keyword("id", "page-1");
        assert!(id.stored);
        assert_eq!(id.indexing, Indexing::NotAnalyzed);

        let body = Field::text("postBody", "hello");
        assert_eq!(body.indexing, Indexing::Analyzed);

        assert!(!Field::stored("raw", "x").indexing.is_indexed());
    }

    #[test]
    fn test_indexing_codes() {
        for indexing in [Indexing::Analyzed, Indexing::NotAnalyzed, Indexing::No] {
            assert_eq!(Indexing::from_code(indexing.to_code()).unwrap(), indexing);
        }
        assert!(Indexing::from_code(9).is_err());
    }
}
