//! Term range query.

use std::any::Any;
use std::ops::Bound;

use log::debug;

use crate::error::Result;
use crate::lexical::index::IndexReader;
use crate::lexical::query::matcher::Matcher;
use crate::lexical::query::multi_term::constant_score_matcher;
use crate::lexical::query::scorer::Bm25Params;
use crate::lexical::query::{Query, boost_suffix};

/// Matches documents containing a term of `field` that sorts between two
/// bounds. A missing bound leaves that side open. Every match scores the
/// query boost.
#[derive(Debug, Clone)]
pub struct TermRangeQuery {
    field: String,
    lower: Option<String>,
    upper: Option<String>,
    include_lower: bool,
    include_upper: bool,
    boost: f32,
}

impl TermRangeQuery {
    pub fn new<F: Into<String>>(
        field: F,
        lower: Option<String>,
        upper: Option<String>,
        include_lower: bool,
        include_upper: bool,
    ) -> Self {
        TermRangeQuery {
            field: field.into(),
            lower,
            upper,
            include_lower,
            include_upper,
            boost: 1.0,
        }
    }

    /// Both bounds included.
    pub fn inclusive<F: Into<String>>(field: F, lower: Option<String>, upper: Option<String>) -> Self {
        Self::new(field, lower, upper, true, true)
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn lower(&self) -> Option<&str> {
        self.lower.as_deref()
    }

    pub fn upper(&self) -> Option<&str> {
        self.upper.as_deref()
    }
}

fn bound(text: Option<&str>, inclusive: bool) -> Bound<&str> {
    match text {
        None => Bound::Unbounded,
        Some(text) if inclusive => Bound::Included(text),
        Some(text) => Bound::Excluded(text),
    }
}

impl Query for TermRangeQuery {
    fn matcher(&self, reader: &IndexReader, _bm25: &Bm25Params) -> Result<Box<dyn Matcher>> {
        let texts = reader.terms_in_range(
            &self.field,
            bound(self.lower(), self.include_lower),
            bound(self.upper(), self.include_upper),
        )?;
        debug!("Range {} expanded to {} terms", self.description(), texts.len());
        constant_score_matcher(reader, &self.field, &texts, self.boost)
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        format!(
            "{}:{}{} TO {}{}{}",
            self.field,
            if self.include_lower { '[' } else { '{' },
            self.lower().unwrap_or("*"),
            self.upper().unwrap_or("*"),
            if self.include_upper { ']' } else { '}' },
            boost_suffix(self.boost)
        )
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
