//! Query types, matchers and the query string parser.
//!
//! A [`Query`] is a reusable description of what to find. Executing it
//! against an [`IndexReader`] produces a [`Matcher`] that walks the matching
//! documents in ascending id order and scores each one with BM25.
//!
//! Prefix, wildcard, fuzzy and range queries expand to the matching terms of
//! their field before matching.

pub mod boolean;
pub mod fuzzy;
pub mod match_all;
pub mod matcher;
pub mod multi_term;
pub mod parser;
pub mod phrase;
pub mod prefix;
pub mod range;
pub mod scorer;
pub mod term;
pub mod wildcard;

use std::any::Any;
use std::fmt::Debug;

use crate::error::Result;
use crate::lexical::index::IndexReader;

pub use self::boolean::{BooleanClause, BooleanQuery, BooleanQueryBuilder, Occur};
pub use self::fuzzy::FuzzyQuery;
pub use self::match_all::MatchAllQuery;
pub use self::matcher::{Matcher, NO_MORE_DOCS};
pub use self::parser::{DefaultOperator, QueryParser};
pub use self::phrase::PhraseQuery;
pub use self::prefix::PrefixQuery;
pub use self::range::TermRangeQuery;
pub use self::scorer::Bm25Params;
pub use self::term::TermQuery;
pub use self::wildcard::WildcardQuery;

/// A query that can be executed against an index snapshot.
pub trait Query: Send + Sync + Debug {
    /// Build a matcher positioned on the first matching document.
    fn matcher(&self, reader: &IndexReader, bm25: &Bm25Params) -> Result<Box<dyn Matcher>>;

    fn boost(&self) -> f32;

    fn set_boost(&mut self, boost: f32);

    /// Human readable form, close to the query syntax.
    fn description(&self) -> String;

    fn clone_box(&self) -> Box<dyn Query>;

    fn as_any(&self) -> &dyn Any;

    /// The field this query targets, if it targets exactly one.
    fn field(&self) -> Option<&str> {
        None
    }
}

impl Clone for Box<dyn Query> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// `description` suffix for a non-default boost.
pub(crate) fn boost_suffix(boost: f32) -> String {
    if boost == 1.0 {
        String::new()
    } else {
        format!("^{boost}")
    }
}
