//! Expansion helpers for queries that match many terms of one field.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::error::Result;
use crate::lexical::core::term::Term;
use crate::lexical::index::IndexReader;
use crate::lexical::query::matcher::{DocListMatcher, EmptyMatcher, Matcher};

/// Matches every document containing one of `texts`, each scoring `boost`.
pub(crate) fn constant_score_matcher(
    reader: &IndexReader,
    field: &str,
    texts: &[String],
    boost: f32,
) -> Result<Box<dyn Matcher>> {
    if texts.is_empty() {
        return Ok(Box::new(EmptyMatcher::new()));
    }

    let mut docs = Vec::new();
    for text in texts {
        let term = Term::new(field, text.as_str());
        docs.extend(reader.postings(&term)?.into_iter().map(|p| p.doc_id));
    }
    docs.sort_unstable();
    docs.dedup();
    Ok(Box::new(DocListMatcher::constant(docs, boost)))
}

/// An expanded term with its expansion score.
#[derive(Debug, Clone)]
pub(crate) struct ScoredTerm {
    pub text: String,
    pub score: f32,
}

impl PartialEq for ScoredTerm {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredTerm {}

impl PartialOrd for ScoredTerm {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredTerm {
    /// Higher score first, then the smaller text.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.text.cmp(&self.text))
    }
}

/// The `max` best terms, best first.
pub(crate) fn top_terms<I>(terms: I, max: usize) -> Vec<ScoredTerm>
where
    I: IntoIterator<Item = ScoredTerm>,
{
    let mut heap = BinaryHeap::with_capacity(max + 1);
    for term in terms {
        heap.push(Reverse(term));
        if heap.len() > max {
            heap.pop();
        }
    }

    let mut best: Vec<ScoredTerm> = heap.into_iter().map(|Reverse(term)| term).collect();
    best.sort_by(|a, b| b.cmp(a));
    best
}
