//! Wildcard query.

use std::any::Any;

use log::debug;
use regex::Regex;

use crate::error::{NotedexError, Result};
use crate::lexical::index::IndexReader;
use crate::lexical::query::matcher::Matcher;
use crate::lexical::query::multi_term::constant_score_matcher;
use crate::lexical::query::scorer::Bm25Params;
use crate::lexical::query::{Query, boost_suffix};

/// Matches documents containing a term of `field` that fits a pattern.
///
/// `*` matches any run of characters, `?` exactly one. `\*` and `\?` match
/// the literal characters. Every match scores the query boost.
#[derive(Debug, Clone)]
pub struct WildcardQuery {
    field: String,
    pattern: String,
    regex: Regex,
    /// Literal text before the first wildcard.
    literal_prefix: String,
    boost: f32,
}

impl WildcardQuery {
    pub fn new<F: Into<String>, P: Into<String>>(field: F, pattern: P) -> Result<Self> {
        let pattern = pattern.into();
        let (regex, literal_prefix) = compile_pattern(&pattern)?;
        Ok(WildcardQuery {
            field: field.into(),
            pattern,
            regex,
            literal_prefix,
            boost: 1.0,
        })
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether `text` fits the pattern.
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Anchored regex for `pattern` and the literal text before its first wildcard.
fn compile_pattern(pattern: &str) -> Result<(Regex, String)> {
    let mut source = String::from("(?s)^");
    let mut literal_prefix = String::new();
    let mut in_prefix = true;
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                source.push_str(".*");
                in_prefix = false;
            }
            '?' => {
                source.push('.');
                in_prefix = false;
            }
            _ => {
                let literal = if c == '\\' { chars.next().unwrap_or('\\') } else { c };
                source.push_str(&regex::escape(literal.encode_utf8(&mut [0u8; 4])));
                if in_prefix {
                    literal_prefix.push(literal);
                }
            }
        }
    }
    source.push('$');

    let regex = Regex::new(&source).map_err(|e| {
        NotedexError::invalid_argument(format!("Invalid wildcard pattern {pattern:?}: {e}"))
    })?;
    Ok((regex, literal_prefix))
}

impl Query for WildcardQuery {
    fn matcher(&self, reader: &IndexReader, _bm25: &Bm25Params) -> Result<Box<dyn Matcher>> {
        let texts: Vec<String> = reader
            .terms_with_prefix(&self.field, &self.literal_prefix)?
            .into_iter()
            .filter(|text| self.matches(text))
            .collect();
        debug!(
            "Wildcard {}:{} expanded to {} terms",
            self.field,
            self.pattern,
            texts.len()
        );
        constant_score_matcher(reader, &self.field, &texts, self.boost)
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        format!("{}:{}{}", self.field, self.pattern, boost_suffix(self.boost))
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn field(&self) -> Option<&str> {
        Some(&self.field)
    }
}
