//! Phrase query with optional slop.

use std::any::Any;

use crate::error::Result;
use crate::lexical::core::term::Term;
use crate::lexical::index::IndexReader;
use crate::lexical::index::reader::DocPositions;
use crate::lexical::query::matcher::{DocListMatcher, EmptyMatcher, Matcher};
use crate::lexical::query::scorer::Bm25Params;
use crate::lexical::query::{Query, boost_suffix};

/// Matches documents containing terms at given relative positions.
///
/// With a slop of zero every term must sit exactly at its offset. A positive
/// slop allows the terms to be spread over a window up to `slop` positions
/// wider than the phrase, in any order; closer matches score higher.
#[derive(Debug, Clone)]
pub struct PhraseQuery {
    field: String,
    /// `(text, offset)` pairs; offsets start at 0.
    terms: Vec<(String, u32)>,
    slop: u32,
    boost: f32,
}

impl PhraseQuery {
    /// Consecutive terms.
    pub fn new<F: Into<String>>(field: F, terms: Vec<String>) -> Self {
        let terms = terms
            .into_iter()
            .enumerate()
            .map(|(i, text)| (text, i as u32))
            .collect();
        Self::with_positions(field, terms)
    }

    /// Terms at explicit positions, e.g. with gaps left by removed stop words.
    pub fn with_positions<F: Into<String>>(field: F, mut terms: Vec<(String, u32)>) -> Self {
        terms.sort_by_key(|(_, position)| *position);
        let first = terms.first().map_or(0, |(_, position)| *position);
        for (_, position) in &mut terms {
            *position -= first;
        }
        PhraseQuery {
            field: field.into(),
            terms,
            slop: 0,
            boost: 1.0,
        }
    }

    pub fn with_slop(mut self, slop: u32) -> Self {
        self.slop = slop;
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn terms(&self) -> &[(String, u32)] {
        &self.terms
    }

    pub fn slop(&self) -> u32 {
        self.slop
    }

    /// Phrase frequency of one document, given the positions of each term.
    fn phrase_freq(&self, positions: &[&[u32]]) -> f32 {
        if self.slop == 0 {
            exact_freq(&self.terms, positions)
        } else {
            sloppy_freq(&self.terms, positions, self.slop)
        }
    }
}

/// Occurrences where every term sits exactly at its offset.
fn exact_freq(terms: &[(String, u32)], positions: &[&[u32]]) -> f32 {
    let mut freq = 0u32;
    'start: for &first in positions[0] {
        let Some(start) = first.checked_sub(terms[0].1) else {
            continue;
        };
        for (i, (_, offset)) in terms.iter().enumerate().skip(1) {
            if positions[i].binary_search(&(start + offset)).is_err() {
                continue 'start;
            }
        }
        freq += 1;
    }
    freq as f32
}

/// Sum of `1 / (1 + span)` over the minimal windows covering every term,
/// where `span` is the distance between the offset-adjusted positions.
///
/// Terms with the same text must be matched at different positions.
fn sloppy_freq(terms: &[(String, u32)], positions: &[&[u32]], slop: u32) -> f32 {
    // (offset-adjusted position, term index, document position)
    let mut events: Vec<(i64, usize, u32)> = Vec::new();
    for (i, (_, offset)) in terms.iter().enumerate() {
        events.extend(
            positions[i]
                .iter()
                .map(|&p| (p as i64 - *offset as i64, i, p)),
        );
    }
    events.sort_unstable();

    let repeated = has_repeated_text(terms);
    let mut counts = vec![0u32; terms.len()];
    let mut covered = 0usize;
    let mut left = 0usize;
    let mut freq = 0.0f32;

    for right in 0..events.len() {
        let term = events[right].1;
        if counts[term] == 0 {
            covered += 1;
        }
        counts[term] += 1;

        if covered < terms.len() {
            continue;
        }
        // Shrink from the left while the window still covers every term.
        while counts[events[left].1] > 1 {
            counts[events[left].1] -= 1;
            left += 1;
        }
        let span = (events[right].0 - events[left].0) as u64;
        if span <= slop as u64
            && (!repeated || distinct_assignment(&events[left..=right], terms.len()))
        {
            freq += 1.0 / (1.0 + span as f32);
        }
        // Drop the leftmost event so the next window is a new one.
        counts[events[left].1] -= 1;
        covered -= 1;
        left += 1;
    }
    freq
}

fn has_repeated_text(terms: &[(String, u32)]) -> bool {
    terms
        .iter()
        .enumerate()
        .any(|(i, (text, _))| terms[..i].iter().any(|(other, _)| other == text))
}

/// Whether every term can take its own document position from `window`.
fn distinct_assignment(window: &[(i64, usize, u32)], term_count: usize) -> bool {
    let mut candidates: Vec<Vec<u32>> = vec![Vec::new(); term_count];
    for &(_, term, position) in window {
        candidates[term].push(position);
    }
    let mut used = Vec::with_capacity(term_count);
    assign(&candidates, 0, &mut used)
}

fn assign(candidates: &[Vec<u32>], term: usize, used: &mut Vec<u32>) -> bool {
    let Some(options) = candidates.get(term) else {
        return true;
    };
    for &position in options {
        if used.contains(&position) {
            continue;
        }
        used.push(position);
        if assign(candidates, term + 1, used) {
            return true;
        }
        used.pop();
    }
    false
}

/// Documents present in every posting list, with each list's positions.
fn intersect(lists: &[Vec<DocPositions>]) -> Vec<(u64, Vec<&[u32]>)> {
    let Some((driver, rest)) = lists.split_first() else {
        return Vec::new();
    };
    let mut cursors = vec![0usize; rest.len()];
    let mut result = Vec::new();

    'docs: for posting in driver {
        let mut positions: Vec<&[u32]> = Vec::with_capacity(lists.len());
        positions.push(&posting.positions);
        for (list, cursor) in rest.iter().zip(cursors.iter_mut()) {
            *cursor += list[*cursor..].partition_point(|p| p.doc_id < posting.doc_id);
            match list.get(*cursor) {
                Some(p) if p.doc_id == posting.doc_id => positions.push(&p.positions),
                Some(_) => continue 'docs,
                None => break 'docs,
            }
        }
        result.push((posting.doc_id, positions));
    }
    result
}

impl Query for PhraseQuery {
    fn matcher(&self, reader: &IndexReader, bm25: &Bm25Params) -> Result<Box<dyn Matcher>> {
        if self.terms.is_empty() {
            return Ok(Box::new(EmptyMatcher::new()));
        }

        let mut lists = Vec::with_capacity(self.terms.len());
        let mut idf = 0.0f32;
        for (text, _) in &self.terms {
            let term = Term::new(self.field.as_str(), text.as_str());
            let postings = reader.postings(&term)?;
            if postings.is_empty() {
                return Ok(Box::new(EmptyMatcher::new()));
            }
            idf += bm25.idf(reader.doc_freq(&term), reader.max_doc());
            lists.push(postings);
        }

        let weight = bm25.weight(idf, self.boost, reader.avg_field_length(&self.field));
        let docs = intersect(&lists)
            .into_iter()
            .filter_map(|(doc_id, positions)| {
                let freq = self.phrase_freq(&positions);
                (freq > 0.0).then(|| {
                    let length = reader.field_length(doc_id, &self.field);
                    (doc_id, weight.score(freq, length))
                })
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
        let texts: Vec<&str> = self.terms.iter().map(|(text, _)| text.as_str()).collect();
        let slop = if self.slop > 0 {
            format!("~{}", self.slop)
        } else {
            String::new()
        };
        format!(
            "{}:\"{}\"{}{}",
            self.field,
            texts.join(" "),
            slop,
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

    fn phrase(words: &[&str]) -> PhraseQuery {
        PhraseQuery::new("postBody", words.iter().map(|w| w.to_string()).collect())
    }

    fn run(reader: &IndexReader, query: &PhraseQuery) -> Vec<String> {
        ids(reader, query.matcher(reader, &Bm25Params::default()).unwrap())
    }

    #[test]
    fn test_exact_phrase_requires_adjacency() {
        let reader = reader(&[&[
            ("a", "quick brown fox"),
            ("b", "brown quick fox"),
            ("c", "quick red brown fox"),
        ]]);
        assert_eq!(run(&reader, &phrase(&["quick", "brown"])), vec!["a"]);
        assert_eq!(run(&reader, &phrase(&["brown", "fox"])), vec!["a", "c"]);
        assert!(run(&reader, &phrase(&["quick", "plum"])).is_empty());
    }

    #[test]
    fn test_slop_allows_gaps() {
        let reader = reader(&[&[("a", "quick brown fox"), ("c", "quick red brown fox")]]);
        let query = phrase(&["quick", "brown"]).with_slop(1);
        assert_eq!(run(&reader, &query), vec!["a", "c"]);

        // Swapping two terms costs two positions.
        let reversed = phrase(&["brown", "quick"]);
        assert!(run(&reader, &reversed.clone().with_slop(1)).is_empty());
        assert_eq!(run(&reader, &reversed.with_slop(2)), vec!["a"]);
    }

    #[test]
    fn test_closer_match_scores_higher() {
        let reader = reader(&[&[("near", "quick brown fox"), ("far", "quick red brown fox")]]);
        let query = phrase(&["quick", "brown"]).with_slop(3);
        let mut matcher = query.matcher(&reader, &Bm25Params::default()).unwrap();
        let near = matcher.score();
        matcher.next().unwrap();
        let far = matcher.score();
        assert!(near > far);
    }

    #[test]
    fn test_positions_with_gaps() {
        // "fox and dog" keeps a gap where the stop word was removed.
        let reader = reader(&[&[("a", "fox and dog"), ("b", "fox dog")]]);
        let query = PhraseQuery::with_positions(
            "postBody",
            vec![("fox".to_string(), 0), ("dog".to_string(), 2)],
        );
        assert_eq!(run(&reader, &query), vec!["a"]);
    }

    #[test]
    fn test_repeated_term() {
        let reader = reader(&[&[("a", "knock knock"), ("b", "knock once")]]);
        assert_eq!(run(&reader, &phrase(&["knock", "knock"])), vec!["a"]);
    }

    #[test]
    fn test_sloppy_repeated_term_needs_two_positions() {
        let reader = reader(&[&[
            ("a", "knock knock"),
            ("b", "knock once"),
            ("c", "knock twice knock"),
        ]]);
        let query = phrase(&["knock", "knock"]);
        assert_eq!(run(&reader, &query.clone().with_slop(1)), vec!["a", "c"]);
        assert_eq!(run(&reader, &query.with_slop(5)), vec!["a", "c"]);
    }

    #[test]
    fn test_description() {
        let query = phrase(&["quick", "brown"]).with_slop(2);
        assert_eq!(query.description(), "postBody:\"quick brown\"~2");
    }
}
