//! Query string parser for the Lucene classic syntax.
//!
//! Supported syntax:
//!
//! - terms: `word`, `field:word`, escaped specials `c\+\+`
//! - phrases: `"two words"`, with slop `"two words"~3`
//! - prefixes: `wor*`
//! - wildcards: `te?t`, `te*t`
//! - fuzzy terms: `roam~`, `roam~0.8`
//! - term ranges: `[a TO c]`, `{a TO c}`, `[a TO *]`
//! - boolean operators: `AND`, `OR`, `NOT`, `&&`, `||`, `!`, `+required`, `-prohibited`
//! - grouping: `(a OR b)`, `field:(a OR b)`
//! - boosts: `word^2`, `"a phrase"^0.5`, `(a b)^3`
//! - every document: `*:*`
//!
//! Terms and phrases go through the analyzer of their field. A term that
//! analyzes to nothing is dropped and one that analyzes to several tokens
//! becomes a phrase. Prefix, wildcard, fuzzy and range terms are lowercased
//! but not analyzed. A pattern may not start with a wildcard.

use std::sync::Arc;

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use serde::{Deserialize, Serialize};

use crate::analysis::Analyzer;
use crate::error::{NotedexError, Result};
use crate::lexical::query::boolean::{BooleanClause, BooleanQuery, Occur};
use crate::lexical::query::fuzzy::{DEFAULT_MIN_SIMILARITY, FuzzyQuery};
use crate::lexical::query::match_all::MatchAllQuery;
use crate::lexical::query::phrase::PhraseQuery;
use crate::lexical::query::prefix::PrefixQuery;
use crate::lexical::query::range::TermRangeQuery;
use crate::lexical::query::term::TermQuery;
use crate::lexical::query::wildcard::WildcardQuery;
use crate::lexical::query::Query;

#[derive(Parser)]
#[grammar = "lexical/query/parser.pest"]
struct QueryStringParser;

/// Occurrence given to clauses written without an operator or modifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultOperator {
    #[default]
    Or,
    And,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conjunction {
    None,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    None,
    Required,
    Prohibited,
}

/// Parses query strings into [`Query`] trees.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use notedex::analysis::StandardAnalyzer;
/// use notedex::lexical::query::QueryParser;
///
/// let parser = QueryParser::new("postBody", Arc::new(StandardAnalyzer::new()));
/// let query = parser.parse("+notes -draft").unwrap();
/// assert_eq!(query.description(), "(+postBody:notes -postBody:draft)");
/// ```
#[derive(Debug, Clone)]
pub struct QueryParser {
    default_field: String,
    analyzer: Arc<dyn Analyzer>,
    default_operator: DefaultOperator,
}

impl QueryParser {
    pub fn new<S: Into<String>>(default_field: S, analyzer: Arc<dyn Analyzer>) -> Self {
        QueryParser {
            default_field: default_field.into(),
            analyzer,
            default_operator: DefaultOperator::Or,
        }
    }

    pub fn with_default_operator(mut self, operator: DefaultOperator) -> Self {
        self.default_operator = operator;
        self
    }

    pub fn default_field(&self) -> &str {
        &self.default_field
    }

    pub fn default_operator(&self) -> DefaultOperator {
        self.default_operator
    }

    /// Parse `query_str`. Empty input is an error. A query without any
    /// clause left after analysis is an empty [`BooleanQuery`], which matches
    /// nothing.
    pub fn parse(&self, query_str: &str) -> Result<Box<dyn Query>> {
        let pairs = QueryStringParser::parse(Rule::query, query_str).map_err(|e| {
            NotedexError::query_parse(format!("Failed to parse query {query_str:?}: {e}"))
        })?;

        for pair in pairs {
            if pair.as_rule() != Rule::query {
                continue;
            }
            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::expression
                    && let Some(query) = self.build_expression(inner, &self.default_field)?
                {
                    return Ok(query);
                }
            }
        }
        Ok(Box::new(BooleanQuery::new()))
    }

    fn build_expression(&self, pair: Pair<Rule>, field: &str) -> Result<Option<Box<dyn Query>>> {
        let mut clauses = Vec::new();
        let mut conjunction = Conjunction::None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::and_op => conjunction = Conjunction::And,
                Rule::or_op => conjunction = Conjunction::Or,
                Rule::clause => {
                    let (modifier, query) = self.build_clause(inner, field)?;
                    self.add_clause(&mut clauses, conjunction, modifier, query);
                    conjunction = Conjunction::None;
                }
                _ => {}
            }
        }

        if clauses.len() == 1 && clauses[0].occur != Occur::MustNot {
            return Ok(clauses.pop().map(|clause| clause.query));
        }
        if clauses.is_empty() {
            return Ok(None);
        }
        let mut query = BooleanQuery::new();
        for clause in clauses {
            query.add_clause(clause);
        }
        Ok(Some(Box::new(query)))
    }

    /// Append a clause, letting an explicit `AND`/`OR` also change the
    /// occurrence of the clause before it.
    fn add_clause(
        &self,
        clauses: &mut Vec<BooleanClause>,
        conjunction: Conjunction,
        modifier: Modifier,
        query: Option<Box<dyn Query>>,
    ) {
        if let Some(last) = clauses.last_mut()
            && last.occur != Occur::MustNot
        {
            match (conjunction, self.default_operator) {
                (Conjunction::And, _) => last.occur = Occur::Must,
                (Conjunction::Or, DefaultOperator::And) => last.occur = Occur::Should,
                _ => {}
            }
        }

        let Some(query) = query else {
            return;
        };

        let prohibited = modifier == Modifier::Prohibited;
        let required = match self.default_operator {
            DefaultOperator::Or => {
                modifier == Modifier::Required || (conjunction == Conjunction::And && !prohibited)
            }
            DefaultOperator::And => !prohibited && conjunction != Conjunction::Or,
        };

        let occur = if prohibited {
            Occur::MustNot
        } else if required {
            Occur::Must
        } else {
            Occur::Should
        };
        clauses.push(BooleanClause::new(query, occur));
    }

    fn build_clause(&self, pair: Pair<Rule>, field: &str) -> Result<(Modifier, Option<Box<dyn Query>>)> {
        let mut modifier = Modifier::None;
        let mut field = field.to_string();
        let mut query: Option<Box<dyn Query>> = None;
        let mut boost = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::modifier => {
                    modifier = if inner.as_str() == "+" {
                        Modifier::Required
                    } else {
                        Modifier::Prohibited
                    };
                }
                Rule::match_all => query = Some(Box::new(MatchAllQuery::new())),
                Rule::field_prefix => {
                    field = inner.as_str().trim_end_matches(':').to_string();
                }
                Rule::group => {
                    for expression in inner.into_inner() {
                        if expression.as_rule() == Rule::expression {
                            query = self.build_expression(expression, &field)?;
                        }
                    }
                }
                Rule::phrase => query = self.build_phrase(inner, &field)?,
                Rule::prefix_term => {
                    let text = inner
                        .into_inner()
                        .find(|p| p.as_rule() == Rule::term_text)
                        .map_or("", |p| p.as_str());
                    let prefix = unescape(text).to_lowercase();
                    query = Some(Box::new(PrefixQuery::new(field.as_str(), prefix)));
                }
                Rule::wildcard_term => query = Some(build_wildcard(inner.as_str(), &field)?),
                Rule::fuzzy_term => query = Some(build_fuzzy(inner, &field)?),
                Rule::range_inclusive => query = Some(build_range(inner, &field, true)),
                Rule::range_exclusive => query = Some(build_range(inner, &field, false)),
                Rule::term => query = self.build_text(&field, &unescape(inner.as_str()), 0)?,
                Rule::boost => boost = Some(parse_boost(inner.as_str())?),
                _ => {}
            }
        }

        if let (Some(query), Some(boost)) = (query.as_mut(), boost) {
            let boosted = query.boost() * boost;
            query.set_boost(boosted);
        }
        Ok((modifier, query))
    }

    fn build_phrase(&self, pair: Pair<Rule>, field: &str) -> Result<Option<Box<dyn Query>>> {
        let mut text = String::new();
        let mut slop = 0u32;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::phrase_text => text = unescape(inner.as_str()),
                Rule::slop => {
                    let value = inner.as_str().trim_start_matches('~');
                    slop = value.parse().map_err(|e| {
                        NotedexError::query_parse(format!("Invalid slop {value:?}: {e}"))
                    })?;
                }
                _ => {}
            }
        }
        self.build_text(field, &text, slop)
    }

    /// Analyze `text` for `field` and build the matching term or phrase query.
    fn build_text(&self, field: &str, text: &str, slop: u32) -> Result<Option<Box<dyn Query>>> {
        let mut tokens: Vec<(String, u32)> = self
            .analyzer
            .analyze_field(field, text)?
            .map(|token| (token.text, token.position))
            .collect();

        match tokens.len() {
            0 => Ok(None),
            1 => {
                let (text, _) = tokens.remove(0);
                Ok(Some(Box::new(TermQuery::new(field, text))))
            }
            _ => Ok(Some(Box::new(
                PhraseQuery::with_positions(field, tokens).with_slop(slop),
            ))),
        }
    }
}

fn build_wildcard(pattern: &str, field: &str) -> Result<Box<dyn Query>> {
    if pattern.starts_with(['*', '?']) {
        return Err(NotedexError::query_parse(format!(
            "Leading wildcard not allowed in {pattern:?}"
        )));
    }
    let query = WildcardQuery::new(field, pattern.to_lowercase())
        .map_err(|e| NotedexError::query_parse(e.to_string()))?;
    Ok(Box::new(query))
}

fn build_fuzzy(pair: Pair<Rule>, field: &str) -> Result<Box<dyn Query>> {
    let mut text = String::new();
    let mut min_similarity = DEFAULT_MIN_SIMILARITY;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::term_text => text = unescape(inner.as_str()).to_lowercase(),
            Rule::fuzzy_value => {
                let value = inner.as_str();
                min_similarity = value.parse().map_err(|e| {
                    NotedexError::query_parse(format!("Invalid similarity {value:?}: {e}"))
                })?;
            }
            _ => {}
        }
    }
    let query = FuzzyQuery::new(field, text)
        .with_min_similarity(min_similarity)
        .map_err(|e| NotedexError::query_parse(e.to_string()))?;
    Ok(Box::new(query))
}

fn build_range(pair: Pair<Rule>, field: &str, inclusive: bool) -> Box<dyn Query> {
    let mut bounds = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::range_bound)
        .map(|p| range_bound(p.as_str()));
    let lower = bounds.next().flatten();
    let upper = bounds.next().flatten();
    Box::new(TermRangeQuery::new(field, lower, upper, inclusive, inclusive))
}

/// `*` leaves the bound open.
fn range_bound(text: &str) -> Option<String> {
    if text == "*" {
        return None;
    }
    let text = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    Some(unescape(text).to_lowercase())
}

fn parse_boost(text: &str) -> Result<f32> {
    let value = text.trim_start_matches('^');
    value
        .parse::<f32>()
        .map_err(|e| NotedexError::query_parse(format!("Invalid boost {value:?}: {e}")))
}

/// Drop the backslash of every escape sequence.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{KeywordAnalyzer, PerFieldAnalyzer, StandardAnalyzer};

    fn parser() -> QueryParser {
        let analyzer = PerFieldAnalyzer::new(Arc::new(StandardAnalyzer::new()))
            .with_analyzer("id", Arc::new(KeywordAnalyzer::new()));
        QueryParser::new("postBody", Arc::new(analyzer))
    }

    fn parse(query: &str) -> String {
        parser().parse(query).unwrap().description()
    }

    #[test]
    fn test_terms() {
        assert_eq!(parse("apple"), "postBody:apple");
        assert_eq!(parse("Apple"), "postBody:apple");
        assert_eq!(parse("apple banana"), "(postBody:apple postBody:banana)");
        assert_eq!(parse("title:apple"), "title:apple");
        assert_eq!(parse("id:Page-1"), "id:Page-1");
        assert_eq!(parse(r"id:a\:b"), "id:a:b");
    }

    #[test]
    fn test_operators() {
        assert_eq!(parse("apple AND banana"), "(+postBody:apple +postBody:banana)");
        assert_eq!(parse("apple && banana"), "(+postBody:apple +postBody:banana)");
        assert_eq!(parse("apple OR banana"), "(postBody:apple postBody:banana)");
        assert_eq!(parse("+apple -banana"), "(+postBody:apple -postBody:banana)");
        assert_eq!(parse("apple NOT banana"), "(postBody:apple -postBody:banana)");
        assert_eq!(parse("apple !banana"), "(postBody:apple -postBody:banana)");
        assert_eq!(
            parse("alpha OR beta AND gamma"),
            "(postBody:alpha +postBody:beta +postBody:gamma)"
        );
        assert_eq!(parse("apple AND NOT banana"), "(+postBody:apple -postBody:banana)");
    }

    #[test]
    fn test_keywords_inside_words() {
        assert_eq!(parse("android"), "postBody:android");
        assert_eq!(parse("ORANGE NOTES"), "(postBody:orange postBody:notes)");
    }

    #[test]
    fn test_default_and() {
        let parser = parser().with_default_operator(DefaultOperator::And);
        let parse = |q: &str| parser.parse(q).unwrap().description();
        assert_eq!(parse("apple banana"), "(+postBody:apple +postBody:banana)");
        assert_eq!(parse("apple OR banana"), "(postBody:apple postBody:banana)");
        assert_eq!(parse("apple -banana"), "(+postBody:apple -postBody:banana)");
    }

    #[test]
    fn test_phrases() {
        assert_eq!(parse("\"quick brown\""), "postBody:\"quick brown\"");
        assert_eq!(parse("\"quick brown\"~2"), "postBody:\"quick brown\"~2");
        assert_eq!(parse("\"the quick\""), "postBody:quick");
        // Several tokens from one term make a phrase.
        assert_eq!(parse("Wi-Fi"), "postBody:\"wi fi\"");
    }

    #[test]
    fn test_groups_and_boosts() {
        assert_eq!(parse("title:(red OR blue)"), "(title:red title:blue)");
        assert_eq!(parse("(red blue)^3 green"), "((postBody:red postBody:blue)^3 postBody:green)");
        assert_eq!(parse("red^2"), "postBody:red^2");
        assert_eq!(parse("\"red car\"^0.5"), "postBody:\"red car\"^0.5");
        assert_eq!(parse("(red)^2"), "postBody:red^2");
    }

    #[test]
    fn test_prefix_and_match_all() {
        assert_eq!(parse("wor*"), "postBody:wor*");
        assert_eq!(parse("WOR*"), "postBody:wor*");
        assert_eq!(parse("*:*"), "*:*");
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(parse("te?t"), "postBody:te?t");
        assert_eq!(parse("Te*T"), "postBody:te*t");
        assert_eq!(parse("title:wor?d*"), "title:wor?d*");
        assert_eq!(parse("te?t^2"), "postBody:te?t^2");
    }

    #[test]
    fn test_fuzzy() {
        assert_eq!(parse("roam~"), "postBody:roam~0.5");
        assert_eq!(parse("Roam~0.8"), "postBody:roam~0.8");
        assert_eq!(parse("roam~.7^2"), "postBody:roam~0.7^2");
        assert_eq!(
            parse("roam~ AND hills"),
            "(+postBody:roam~0.5 +postBody:hills)"
        );
    }

    #[test]
    fn test_ranges() {
        assert_eq!(parse("[a TO c]"), "postBody:[a TO c]");
        assert_eq!(parse("title:{Apple TO Cherry}"), "title:{apple TO cherry}");
        assert_eq!(parse("[b TO *]"), "postBody:[b TO *]");
        assert_eq!(parse("[\"big apple\" TO c]^2"), "postBody:[big apple TO c]^2");
    }

    #[test]
    fn test_stop_words_are_dropped() {
        assert_eq!(parse("the"), "()");
        assert_eq!(parse("the apple"), "postBody:apple");
    }

    #[test]
    fn test_only_prohibited_stays_boolean() {
        assert_eq!(parse("-apple"), "(-postBody:apple)");
    }

    #[test]
    fn test_malformed_queries() {
        for query in [
            "\"unbalanced",
            "(open",
            "close)",
            "apple AND",
            "AND apple",
            ":apple",
            "title:",
            "",
            "   ",
            "apple~2",
            "roam~1.5",
            "*foo",
            "?oo",
            "[a TO b}",
            "[a b]",
            "()",
            "apple^",
        ] {
            let err = parser().parse(query).unwrap_err();
            assert!(err.is_query_parse(), "{query:?} gave {err:?}");
        }
    }
}
