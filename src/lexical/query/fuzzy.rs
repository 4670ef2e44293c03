//! Fuzzy query for approximate term matching.

use std::any::Any;

use log::debug;

use crate::error::{NotedexError, Result};
use crate::lexical::index::IndexReader;
use crate::lexical::query::boolean::BooleanQuery;
use crate::lexical::query::matcher::{EmptyMatcher, Matcher};
use crate::lexical::query::multi_term::{ScoredTerm, top_terms};
use crate::lexical::query::scorer::Bm25Params;
use crate::lexical::query::term::TermQuery;
use crate::lexical::query::{Query, boost_suffix};
use crate::util::levenshtein;

pub const DEFAULT_MIN_SIMILARITY: f32 = 0.5;
pub const DEFAULT_MAX_EXPANSIONS: usize = 50;

/// Matches terms of `field` similar to `text`.
///
/// Similarity is `1 - distance / min(len(text), len(term))` over characters,
/// where `distance` is the Levenshtein distance. A term matches when its
/// similarity is strictly above `min_similarity`. The best `max_expansions`
/// terms are searched as a disjunction, each boosted by how far its
/// similarity clears the minimum.
#[derive(Debug, Clone)]
pub struct FuzzyQuery {
    field: String,
    text: String,
    min_similarity: f32,
    /// Leading characters that must match exactly.
    prefix_length: usize,
    max_expansions: usize,
    boost: f32,
}

impl FuzzyQuery {
    pub fn new<F: Into<String>, T: Into<String>>(field: F, text: T) -> Self {
        FuzzyQuery {
            field: field.into(),
            text: text.into(),
            min_similarity: DEFAULT_MIN_SIMILARITY,
            prefix_length: 0,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            boost: 1.0,
        }
    }

    /// `min_similarity` must lie in `[0, 1)`.
    pub fn with_min_similarity(mut self, min_similarity: f32) -> Result<Self> {
        if !(0.0..1.0).contains(&min_similarity) {
            return Err(NotedexError::invalid_argument(format!(
                "Minimum similarity must be in [0, 1), got {min_similarity}"
            )));
        }
        self.min_similarity = min_similarity;
        Ok(self)
    }

    pub fn with_prefix_length(mut self, prefix_length: usize) -> Self {
        self.prefix_length = prefix_length;
        self
    }

    pub fn with_max_expansions(mut self, max_expansions: usize) -> Self {
        self.max_expansions = max_expansions;
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn min_similarity(&self) -> f32 {
        self.min_similarity
    }

    /// Matching terms with their expansion scores, best first.
    fn expand(&self, reader: &IndexReader) -> Result<Vec<ScoredTerm>> {
        let chars: Vec<char> = self.text.chars().collect();
        let prefix_len = self.prefix_length.min(chars.len());
        let prefix: String = chars[..prefix_len].iter().collect();
        let rest = &chars[prefix_len..];
        let scale = 1.0 / (1.0 - self.min_similarity);

        let candidates = reader.terms_with_prefix(&self.field, &prefix)?;
        let matches = candidates.into_iter().filter_map(|text| {
            let target: Vec<char> = text.chars().skip(prefix_len).collect();
            let similarity = similarity(rest, &target, prefix_len, self.min_similarity);
            (similarity > self.min_similarity).then(|| ScoredTerm {
                text,
                score: (similarity - self.min_similarity) * scale,
            })
        });
        Ok(top_terms(matches, self.max_expansions))
    }
}

/// Similarity of `target` to `text`, both without their shared prefix of
/// `prefix_len` characters. Zero when the distance is too large to matter.
fn similarity(text: &[char], target: &[char], prefix_len: usize, min_similarity: f32) -> f32 {
    let (n, m) = (text.len(), target.len());
    if n == 0 || m == 0 {
        return if prefix_len == 0 {
            0.0
        } else {
            1.0 - n.max(m) as f32 / prefix_len as f32
        };
    }

    let shortest = prefix_len + n.min(m);
    let max_distance = ((1.0 - min_similarity) * shortest as f32) as usize;
    match levenshtein::bounded_distance(text, target, max_distance) {
        Some(distance) => 1.0 - distance as f32 / shortest as f32,
        None => 0.0,
    }
}

impl Query for FuzzyQuery {
    fn matcher(&self, reader: &IndexReader, bm25: &Bm25Params) -> Result<Box<dyn Matcher>> {
        let terms = self.expand(reader)?;
        debug!(
            "Fuzzy {}:{}~{} expanded to {} terms",
            self.field,
            self.text,
            self.min_similarity,
            terms.len()
        );
        if terms.is_empty() {
            return Ok(Box::new(EmptyMatcher::new()));
        }

        let mut rewritten = BooleanQuery::new();
        for term in terms {
            let query = TermQuery::new(self.field.as_str(), term.text)
                .with_boost(self.boost * term.score);
            rewritten.add_should(Box::new(query));
        }
        rewritten.matcher(reader, bm25)
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        format!(
            "{}:{}~{}{}",
            self.field,
            self.text,
            self.min_similarity,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::query::test_support::{ids, reader};

    fn run(reader: &IndexReader, query: &FuzzyQuery) -> Vec<String> {
        ids(reader, query.matcher(reader, &Bm25Params::default()).unwrap())
    }

    #[test]
    fn test_similar_terms_match() {
        let reader = reader(&[
            &[("a", "roam the hills"), ("b", "foam party")],
            &[("c", "roads north"), ("d", "rim")],
        ]);
        // foam is one edit from roam, rim and roads are two.
        assert_eq!(run(&reader, &FuzzyQuery::new("postBody", "roam")), vec!["a", "b"]);
        assert_eq!(run(&reader, &FuzzyQuery::new("postBody", "road")), vec!["a", "c"]);
    }

    #[test]
    fn test_exact_term_scores_highest() {
        let reader = reader(&[&[("a", "foam"), ("b", "roam")]]);
        let query = FuzzyQuery::new("postBody", "roam");
        let mut matcher = query.matcher(&reader, &Bm25Params::default()).unwrap();
        let foam = matcher.score();
        matcher.next().unwrap();
        let roam = matcher.score();
        assert!(roam > foam);
    }

    #[test]
    fn test_min_similarity() {
        let reader = reader(&[&[("a", "roam"), ("b", "foam")]]);
        let strict = FuzzyQuery::new("postBody", "roam").with_min_similarity(0.8).unwrap();
        assert_eq!(run(&reader, &strict), vec!["a"]);

        assert!(FuzzyQuery::new("postBody", "roam").with_min_similarity(1.0).is_err());
        assert!(FuzzyQuery::new("postBody", "roam").with_min_similarity(-0.1).is_err());
    }

    #[test]
    fn test_prefix_length_and_expansion_cap() {
        let reader = reader(&[&[("a", "roam"), ("b", "foam"), ("c", "loam")]]);
        let query = FuzzyQuery::new("postBody", "roam").with_prefix_length(1);
        assert_eq!(run(&reader, &query), vec!["a"]);

        let capped = FuzzyQuery::new("postBody", "roam").with_max_expansions(1);
        assert_eq!(run(&reader, &capped), vec!["a"]);
    }

    #[test]
    fn test_similarity() {
        let chars = |s: &str| s.chars().collect::<Vec<char>>();
        assert_eq!(similarity(&chars("roam"), &chars("roam"), 0, 0.5), 1.0);
        assert_eq!(similarity(&chars("roam"), &chars("foam"), 0, 0.5), 0.75);
        assert_eq!(similarity(&chars("roam"), &chars("xyzw"), 0, 0.5), 0.0);
        assert_eq!(similarity(&chars(""), &chars("abc"), 0, 0.5), 0.0);
    }

    #[test]
    fn test_description() {
        let query = FuzzyQuery::new("postBody", "roam").with_boost(2.0);
        assert_eq!(query.description(), "postBody:roam~0.5^2");
    }
}
