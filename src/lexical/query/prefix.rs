//! Prefix query.

use std::any::Any;

use log::debug;

use crate::error::Result;
use crate::lexical::index::IndexReader;
use crate::lexical::query::matcher::Matcher;
use crate::lexical::query::multi_term::constant_score_matcher;
use crate::lexical::query::scorer::Bm25Params;
use crate::lexical::query::{Query, boost_suffix};

/// Matches documents containing any term of `field` that starts with `prefix`.
///
/// Every match scores the query boost.
#[derive(Debug, Clone)]
pub struct PrefixQuery {
    field: String,
    prefix: String,
    boost: f32,
}

impl PrefixQuery {
    pub fn new<F: Into<String>, P: Into<String>>(field: F, prefix: P) -> Self {
        PrefixQuery {
            field: field.into(),
            prefix: prefix.into(),
            boost: 1.0,
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Query for PrefixQuery {
    fn matcher(&self, reader: &IndexReader, _bm25: &Bm25Params) -> Result<Box<dyn Matcher>> {
        let texts = reader.terms_with_prefix(&self.field, &self.prefix)?;
        debug!(
            "Prefix {}:{}* expanded to {} terms",
            self.field,
            self.prefix,
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
        format!("{}:{}*{}", self.field, self.prefix, boost_suffix(self.boost))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::query::test_support::{ids, reader};

    #[test]
    fn test_prefix_expansion() {
        let reader = reader(&[
            &[("a", "searching notes"), ("b", "research paper")],
            &[("c", "search engine"), ("d", "seal")],
        ]);
        let query = PrefixQuery::new("postBody", "search");
        let mut matcher = query.matcher(&reader, &Bm25Params::default()).unwrap();
        assert_eq!(matcher.score(), 1.0);
        assert_eq!(matcher.cost(), 2);
        matcher.next().unwrap();
        assert_eq!(reader.document(matcher.doc_id()).unwrap().get("id"), Some("c"));

        let all = PrefixQuery::new("postBody", "se");
        assert_eq!(
            ids(&reader, all.matcher(&reader, &Bm25Params::default()).unwrap()),
            vec!["a", "c", "d"]
        );
    }

    #[test]
    fn test_no_expansion() {
        let reader = reader(&[&[("a", "notes")]]);
        let query = PrefixQuery::new("postBody", "zz").with_boost(3.0);
        assert!(query
            .matcher(&reader, &Bm25Params::default())
            .unwrap()
            .is_exhausted());
        assert_eq!(query.description(), "postBody:zz*^3");
    }
}
