//! Boolean query implementation for combining multiple queries.

use std::any::Any;

use crate::error::Result;
use crate::lexical::index::IndexReader;
use crate::lexical::query::matcher::{
    BoostMatcher, ConjunctionMatcher, ConjunctionNotMatcher, DisjunctionMatcher, EmptyMatcher,
    Matcher, ReqOptMatcher,
};
use crate::lexical::query::scorer::Bm25Params;
use crate::lexical::query::{Query, boost_suffix};

/// Occurrence requirements for boolean clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// The clause must match (equivalent to AND).
    Must,
    /// The clause should match (equivalent to OR).
    Should,
    /// The clause must not match (equivalent to NOT).
    MustNot,
}

/// A clause in a boolean query.
#[derive(Debug, Clone)]
pub struct BooleanClause {
    pub query: Box<dyn Query>,
    pub occur: Occur,
}

impl BooleanClause {
    pub fn new(query: Box<dyn Query>, occur: Occur) -> Self {
        BooleanClause { query, occur }
    }

    pub fn must(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Must)
    }

    pub fn should(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Should)
    }

    pub fn must_not(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::MustNot)
    }
}

/// A boolean query that combines multiple queries with boolean logic.
///
/// A document matches when it matches every `Must` clause, no `MustNot`
/// clause and, if there are no `Must` clauses, at least one `Should` clause.
/// Its score is the sum of the scores of the matching `Must` and `Should`
/// clauses. A query made only of `MustNot` clauses matches nothing.
#[derive(Debug, Clone)]
pub struct BooleanQuery {
    clauses: Vec<BooleanClause>,
    boost: f32,
}

impl BooleanQuery {
    /// Create a new empty boolean query.
    pub fn new() -> Self {
        BooleanQuery {
            clauses: Vec::new(),
            boost: 1.0,
        }
    }

    pub fn builder() -> BooleanQueryBuilder {
        BooleanQueryBuilder::new()
    }

    pub fn add_clause(&mut self, clause: BooleanClause) {
        self.clauses.push(clause);
    }

    pub fn add_must(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::must(query));
    }

    pub fn add_should(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::should(query));
    }

    pub fn add_must_not(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::must_not(query));
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    /// Take the clauses out, leaving the query empty.
    pub fn into_clauses(self) -> Vec<BooleanClause> {
        self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Get clauses by occurrence type.
    pub fn clauses_by_occur(&self, occur: Occur) -> Vec<&BooleanClause> {
        self.clauses.iter().filter(|c| c.occur == occur).collect()
    }

    /// Matchers of the clauses with `occur` that match at least one document.
    fn live_matchers(
        &self,
        occur: Occur,
        reader: &IndexReader,
        bm25: &Bm25Params,
    ) -> Result<Vec<Box<dyn Matcher>>> {
        let mut matchers = Vec::new();
        for clause in self.clauses_by_occur(occur) {
            let matcher = clause.query.matcher(reader, bm25)?;
            if !matcher.is_exhausted() {
                matchers.push(matcher);
            }
        }
        Ok(matchers)
    }
}

impl Default for BooleanQuery {
    fn default() -> Self {
        Self::new()
    }
}

fn disjunction(mut matchers: Vec<Box<dyn Matcher>>) -> Box<dyn Matcher> {
    match matchers.len() {
        0 => Box::new(EmptyMatcher::new()),
        1 => matchers.remove(0),
        _ => Box::new(DisjunctionMatcher::new(matchers)),
    }
}

impl Query for BooleanQuery {
    fn matcher(&self, reader: &IndexReader, bm25: &Bm25Params) -> Result<Box<dyn Matcher>> {
        let must_count = self.clauses_by_occur(Occur::Must).len();
        let must = self.live_matchers(Occur::Must, reader, bm25)?;
        if must.len() < must_count {
            // A required clause matches nothing.
            return Ok(Box::new(EmptyMatcher::new()));
        }
        let should = self.live_matchers(Occur::Should, reader, bm25)?;

        let positive: Box<dyn Matcher> = if !must.is_empty() {
            let required: Box<dyn Matcher> = if must.len() == 1 {
                must.into_iter().next().unwrap_or_else(|| Box::new(EmptyMatcher::new()))
            } else {
                Box::new(ConjunctionMatcher::new(must)?)
            };
            if should.is_empty() {
                required
            } else {
                Box::new(ReqOptMatcher::new(required, disjunction(should))?)
            }
        } else if !should.is_empty() {
            disjunction(should)
        } else {
            return Ok(Box::new(EmptyMatcher::new()));
        };

        let must_not = self.live_matchers(Occur::MustNot, reader, bm25)?;
        let matcher: Box<dyn Matcher> = if must_not.is_empty() {
            positive
        } else {
            Box::new(ConjunctionNotMatcher::new(positive, must_not)?)
        };

        if self.boost == 1.0 {
            Ok(matcher)
        } else {
            Ok(Box::new(BoostMatcher::new(matcher, self.boost)))
        }
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| match clause.occur {
                Occur::Must => format!("+{}", clause.query.description()),
                Occur::Should => clause.query.description(),
                Occur::MustNot => format!("-{}", clause.query.description()),
            })
            .collect();
        format!("({}){}", parts.join(" "), boost_suffix(self.boost))
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builder for creating boolean queries.
#[derive(Debug, Default)]
pub struct BooleanQueryBuilder {
    query: BooleanQuery,
}

impl BooleanQueryBuilder {
    pub fn new() -> Self {
        BooleanQueryBuilder {
            query: BooleanQuery::new(),
        }
    }

    pub fn must(mut self, query: Box<dyn Query>) -> Self {
        self.query.add_must(query);
        self
    }

    pub fn should(mut self, query: Box<dyn Query>) -> Self {
        self.query.add_should(query);
        self
    }

    pub fn must_not(mut self, query: Box<dyn Query>) -> Self {
        self.query.add_must_not(query);
        self
    }

    pub fn boost(mut self, boost: f32) -> Self {
        self.query = self.query.with_boost(boost);
        self
    }

    pub fn build(self) -> BooleanQuery {
        self.query
    }
}
