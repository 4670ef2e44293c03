//! Terms: the unit of the inverted index.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NotedexError, Result};

/// Separates field name from term text in dictionary keys. Field names must
/// not contain it.
pub const FIELD_SEPARATOR: u8 = 0;

/// A `(field, text)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Term {
    field: String,
    text: String,
}

impl Term {
    pub fn new<F: Into<String>, T: Into<String>>(field: F, text: T) -> Self {
        Term {
            field: field.into(),
            text: text.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Dictionary key: `field`, a zero byte, then `text`. Keys sort by field
    /// first, then by term bytes.
    pub fn to_key(&self) -> Vec<u8> {
        encode_key(&self.field, &self.text)
    }

    pub fn from_key(key: &[u8]) -> Result<Self> {
        let split = key
            .iter()
            .position(|&b| b == FIELD_SEPARATOR)
            .ok_or_else(|| NotedexError::corrupt("Term key without field separator"))?;
        let field = std::str::from_utf8(&key[..split])
            .map_err(|e| NotedexError::corrupt(format!("Invalid field name in term key: {e}")))?;
        let text = std::str::from_utf8(&key[split + 1..])
            .map_err(|e| NotedexError::corrupt(format!("Invalid term text in term key: {e}")))?;
        Ok(Term::new(field, text))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.text)
    }
}

pub fn encode_key(field: &str, text: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(field.len() + 1 + text.len());
    key.extend_from_slice(field.as_bytes());
    key.push(FIELD_SEPARATOR);
    key.extend_from_slice(text.as_bytes());
    key
}

/// Key prefix shared by every term of `field`.
pub fn field_prefix(field: &str) -> Vec<u8> {
    encode_key(field, "")
}
