//! Document-at-a-time matchers.
//!
//! A matcher walks the documents a query matches in ascending id order. A
//! freshly built matcher is already positioned on its first document;
//! [`Matcher::doc_id`] returns [`NO_MORE_DOCS`] once it is exhausted.

use crate::error::Result;

/// Sentinel doc id of an exhausted matcher.
pub const NO_MORE_DOCS: u64 = u64::MAX;

pub trait Matcher: Send + std::fmt::Debug {
    /// Current document, or [`NO_MORE_DOCS`].
    fn doc_id(&self) -> u64;

    /// Advance to the next document. Returns `false` once exhausted.
    fn next(&mut self) -> Result<bool>;

    /// Advance to the first document `>= target`. Does nothing if already
    /// there. Returns `false` once exhausted.
    fn skip_to(&mut self, target: u64) -> Result<bool>;

    /// Score of the current document.
    fn score(&self) -> f32;

    /// Upper bound of the number of documents this matcher visits.
    fn cost(&self) -> u64;

    fn is_exhausted(&self) -> bool {
        self.doc_id() == NO_MORE_DOCS
    }
}

/// Matches nothing.
#[derive(Debug, Clone, Default)]
pub struct EmptyMatcher;

impl EmptyMatcher {
    pub fn new() -> Self {
        EmptyMatcher
    }
}

impl Matcher for EmptyMatcher {
    fn doc_id(&self) -> u64 {
        NO_MORE_DOCS
    }

    fn next(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn skip_to(&mut self, _target: u64) -> Result<bool> {
        Ok(false)
    }

    fn score(&self) -> f32 {
        0.0
    }

    fn cost(&self) -> u64 {
        0
    }
}

/// Walks a precomputed, ascending list of `(doc_id, score)` pairs.
#[derive(Debug, Clone)]
pub struct DocListMatcher {
    docs: Vec<(u64, f32)>,
    index: usize,
}

impl DocListMatcher {
    /// `docs` must be sorted by doc id without duplicates.
    pub fn new(docs: Vec<(u64, f32)>) -> Self {
        DocListMatcher { docs, index: 0 }
    }

    /// Every document scores `score`.
    pub fn constant(doc_ids: Vec<u64>, score: f32) -> Self {
        Self::new(doc_ids.into_iter().map(|doc| (doc, score)).collect())
    }
}

impl Matcher for DocListMatcher {
    fn doc_id(&self) -> u64 {
        self.docs
            .get(self.index)
            .map_or(NO_MORE_DOCS, |&(doc, _)| doc)
    }

    fn next(&mut self) -> Result<bool> {
        if self.index < self.docs.len() {
            self.index += 1;
        }
        Ok(self.index < self.docs.len())
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        let rest = &self.docs[self.index.min(self.docs.len())..];
        self.index += rest.partition_point(|&(doc, _)| doc < target);
        Ok(self.index < self.docs.len())
    }

    fn score(&self) -> f32 {
        self.docs.get(self.index).map_or(0.0, |&(_, score)| score)
    }

    fn cost(&self) -> u64 {
        self.docs.len() as u64
    }
}

/// Intersection of sub-matchers; scores add up.
#[derive(Debug)]
pub struct ConjunctionMatcher {
    matchers: Vec<Box<dyn Matcher>>,
    current: u64,
}

impl ConjunctionMatcher {
    pub fn new(mut matchers: Vec<Box<dyn Matcher>>) -> Result<Self> {
        // Cheapest first: it drives the others.
        matchers.sort_by_key(|m| m.cost());
        let mut matcher = ConjunctionMatcher {
            matchers,
            current: NO_MORE_DOCS,
        };
        if !matcher.matchers.is_empty() {
            matcher.align()?;
        }
        Ok(matcher)
    }

    /// Move every sub-matcher onto a common document.
    fn align(&mut self) -> Result<bool> {
        loop {
            let mut target = 0u64;
            for matcher in &self.matchers {
                if matcher.is_exhausted() {
                    self.current = NO_MORE_DOCS;
                    return Ok(false);
                }
                target = target.max(matcher.doc_id());
            }

            let mut aligned = true;
            for matcher in &mut self.matchers {
                if matcher.doc_id() < target {
                    if !matcher.skip_to(target)? {
                        self.current = NO_MORE_DOCS;
                        return Ok(false);
                    }
                    if matcher.doc_id() != target {
                        aligned = false;
                    }
                }
            }

            if aligned {
                self.current = target;
                return Ok(true);
            }
        }
    }
}

impl Matcher for ConjunctionMatcher {
    fn doc_id(&self) -> u64 {
        self.current
    }

    fn next(&mut self) -> Result<bool> {
        if self.current == NO_MORE_DOCS {
            return Ok(false);
        }
        self.matchers[0].next()?;
        self.align()
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        if self.current == NO_MORE_DOCS {
            return Ok(false);
        }
        if target <= self.current {
            return Ok(true);
        }
        self.matchers[0].skip_to(target)?;
        self.align()
    }

    fn score(&self) -> f32 {
        self.matchers.iter().map(|m| m.score()).sum()
    }

    fn cost(&self) -> u64 {
        self.matchers.first().map_or(0, |m| m.cost())
    }
}

/// Union of sub-matchers; scores of the matchers on the current document add up.
#[derive(Debug)]
pub struct DisjunctionMatcher {
    matchers: Vec<Box<dyn Matcher>>,
    current: u64,
}

impl DisjunctionMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        let mut matcher = DisjunctionMatcher {
            matchers,
            current: NO_MORE_DOCS,
        };
        matcher.update_current();
        matcher
    }

    fn update_current(&mut self) {
        self.current = self
            .matchers
            .iter()
            .map(|m| m.doc_id())
            .min()
            .unwrap_or(NO_MORE_DOCS);
    }
}

impl Matcher for DisjunctionMatcher {
    fn doc_id(&self) -> u64 {
        self.current
    }

    fn next(&mut self) -> Result<bool> {
        if self.current == NO_MORE_DOCS {
            return Ok(false);
        }
        let current = self.current;
        for matcher in &mut self.matchers {
            if matcher.doc_id() == current {
                matcher.next()?;
            }
        }
        self.update_current();
        Ok(self.current != NO_MORE_DOCS)
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        if self.current == NO_MORE_DOCS {
            return Ok(false);
        }
        if target <= self.current {
            return Ok(true);
        }
        for matcher in &mut self.matchers {
            if matcher.doc_id() < target {
                matcher.skip_to(target)?;
            }
        }
        self.update_current();
        Ok(self.current != NO_MORE_DOCS)
    }

    fn score(&self) -> f32 {
        self.matchers
            .iter()
            .filter(|m| m.doc_id() == self.current)
            .map(|m| m.score())
            .sum()
    }

    fn cost(&self) -> u64 {
        self.matchers.iter().map(|m| m.cost()).sum()
    }
}

/// Documents of `positive` that no `negative` matcher matches.
#[derive(Debug)]
pub struct ConjunctionNotMatcher {
    positive: Box<dyn Matcher>,
    negatives: Vec<Box<dyn Matcher>>,
}

impl ConjunctionNotMatcher {
    pub fn new(positive: Box<dyn Matcher>, negatives: Vec<Box<dyn Matcher>>) -> Result<Self> {
        let mut matcher = ConjunctionNotMatcher {
            positive,
            negatives,
        };
        matcher.skip_excluded()?;
        Ok(matcher)
    }

    fn skip_excluded(&mut self) -> Result<bool> {
        while !self.positive.is_exhausted() {
            let doc = self.positive.doc_id();
            let mut excluded = false;
            for negative in &mut self.negatives {
                if negative.doc_id() < doc {
                    negative.skip_to(doc)?;
                }
                if negative.doc_id() == doc {
                    excluded = true;
                    break;
                }
            }
            if !excluded {
                return Ok(true);
            }
            self.positive.next()?;
        }
        Ok(false)
    }
}

impl Matcher for ConjunctionNotMatcher {
    fn doc_id(&self) -> u64 {
        self.positive.doc_id()
    }

    fn next(&mut self) -> Result<bool> {
        if !self.positive.next()? {
            return Ok(false);
        }
        self.skip_excluded()
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        if !self.positive.skip_to(target)? {
            return Ok(false);
        }
        self.skip_excluded()
    }

    fn score(&self) -> f32 {
        self.positive.score()
    }

    fn cost(&self) -> u64 {
        self.positive.cost()
    }
}

/// Documents of `required`; `optional` only adds to the score.
#[derive(Debug)]
pub struct ReqOptMatcher {
    required: Box<dyn Matcher>,
    optional: Box<dyn Matcher>,
}

impl ReqOptMatcher {
    pub fn new(required: Box<dyn Matcher>, optional: Box<dyn Matcher>) -> Result<Self> {
        let mut matcher = ReqOptMatcher { required, optional };
        matcher.sync_optional()?;
        Ok(matcher)
    }

    fn sync_optional(&mut self) -> Result<()> {
        let doc = self.required.doc_id();
        if doc != NO_MORE_DOCS && self.optional.doc_id() < doc {
            self.optional.skip_to(doc)?;
        }
        Ok(())
    }
}

impl Matcher for ReqOptMatcher {
    fn doc_id(&self) -> u64 {
        self.required.doc_id()
    }

    fn next(&mut self) -> Result<bool> {
        let more = self.required.next()?;
        self.sync_optional()?;
        Ok(more)
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        let more = self.required.skip_to(target)?;
        self.sync_optional()?;
        Ok(more)
    }

    fn score(&self) -> f32 {
        let doc = self.required.doc_id();
        let mut score = self.required.score();
        if self.optional.doc_id() == doc {
            score += self.optional.score();
        }
        score
    }

    fn cost(&self) -> u64 {
        self.required.cost()
    }
}

/// Multiplies the score of another matcher.
#[derive(Debug)]
pub struct BoostMatcher {
    inner: Box<dyn Matcher>,
    boost: f32,
}

impl BoostMatcher {
    pub fn new(inner: Box<dyn Matcher>, boost: f32) -> Self {
        BoostMatcher { inner, boost }
    }
}

impl Matcher for BoostMatcher {
    fn doc_id(&self) -> u64 {
        self.inner.doc_id()
    }

    fn next(&mut self) -> Result<bool> {
        self.inner.next()
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        self.inner.skip_to(target)
    }

    fn score(&self) -> f32 {
        self.inner.score() * self.boost
    }

    fn cost(&self) -> u64 {
        self.inner.cost()
    }
}
