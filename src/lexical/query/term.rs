//! Single-term query.

use std::any::Any;

use crate::error::Result;
use crate::lexical::core::term::Term;
use crate::lexical::index::IndexReader;
use crate::lexical::query::matcher::{DocListMatcher, EmptyMatcher, Matcher};
use crate::lexical::query::scorer::Bm25Params;
use crate::lexical::query::{Query, boost_suffix};

/// Matches documents containing an exact term.
///
/// The text is not analyzed; [`crate::lexical::query::QueryParser`] analyzes
/// query strings before building term queries.
#[derive(Debug, Clone)]
pub struct TermQuery {
    term: Term,
    boost: f32,
}

impl TermQuery {
    pub fn new<F: Into<String>, T: Into<String>>(field: F, text: T) -> Self {
        TermQuery {
            term: Term::new(field, text),
            boost: 1.0,
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn term(&self) -> &Term {
        &self.term
    }
}

impl Query for TermQuery {
    fn matcher(&self, reader: &IndexReader, bm25: &Bm25Params) -> Result<Box<dyn Matcher>> {
        let postings = reader.postings(&self.term)?;
        if postings.is_empty() {
            return Ok(Box::new(EmptyMatcher::new()));
        }

        let field = self.term.field();
        let idf = bm25.idf(reader.doc_freq(&self.term), reader.max_doc());
        let weight = bm25.weight(idf, self.boost, reader.avg_field_length(field));

        let docs = postings
            .iter()
            .map(|p| {
                let length = reader.field_length(p.doc_id, field);
                (p.doc_id, weight.score(p.freq() as f32, length))
            })
            .collect();
        Ok(Box::new(DocListMatcher::new(docs)))
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        format!("{}{}", self.term, boost_suffix(self.boost))
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn field(&self) -> Option<&str> {
        Some(self.term.field())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::query::test_support::{ids, reader};

    #[test]
    fn test_matches_across_segments() {
        let reader = reader(&[
            &[("a", "red apple"), ("b", "green pear")],
            &[("c", "red cherry")],
        ]);
        let query = TermQuery::new("postBody", "red");
        let matcher = query.matcher(&reader, &Bm25Params::default()).unwrap();
        assert_eq!(ids(&reader, matcher), vec!["a", "c"]);

        let missing = TermQuery::new("postBody", "plum");
        assert!(missing
            .matcher(&reader, &Bm25Params::default())
            .unwrap()
            .is_exhausted());
    }

    #[test]
    fn test_shorter_field_scores_higher() {
        let reader = reader(&[&[
            ("short", "kiwi"),
            ("long", "kiwi banana mango papaya guava"),
        ]]);
        let query = TermQuery::new("postBody", "kiwi");
        let mut matcher = query.matcher(&reader, &Bm25Params::default()).unwrap();
        let first = matcher.score();
        matcher.next().unwrap();
        let second = matcher.score();
        assert!(first > second);
        assert!(second > 0.0);
    }

    #[test]
    fn test_boost_scales_score() {
        let reader = reader(&[&[("a", "lemon"), ("b", "lime")]]);
        let bm25 = Bm25Params::default();
        let plain = TermQuery::new("postBody", "lemon")
            .matcher(&reader, &bm25)
            .unwrap()
            .score();
        let boosted = TermQuery::new("postBody", "lemon")
            .with_boost(2.0)
            .matcher(&reader, &bm25)
            .unwrap()
            .score();
        assert!((boosted - 2.0 * plain).abs() < 1e-5);
    }

    #[test]
    fn test_description() {
        assert_eq!(TermQuery::new("id", "p1").description(), "id:p1");
        assert_eq!(
            TermQuery::new("postBody", "x").with_boost(2.0).description(),
            "postBody:x^2"
        );
    }
}
