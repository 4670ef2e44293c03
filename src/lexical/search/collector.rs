//! Hit collectors.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A scored document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDoc {
    pub doc_id: u64,
    pub score: f32,
}

impl ScoreDoc {
    /// Higher score first, then lower doc id.
    fn rank(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.doc_id.cmp(&self.doc_id))
    }
}

/// Best hits of a search, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopDocs {
    /// Number of matching documents, including those beyond the limit.
    pub total_hits: u64,
    pub hits: Vec<ScoreDoc>,
}

impl TopDocs {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

/// Receives every matching document of a search.
pub trait Collector {
    fn collect(&mut self, doc_id: u64, score: f32) -> Result<()>;

    /// Whether the search should keep feeding documents.
    fn needs_more(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Ranked(ScoreDoc);

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank(&other.0)
    }
}

/// Keeps the `limit` best hits in a min-heap.
#[derive(Debug, Clone)]
pub struct TopDocsCollector {
    limit: usize,
    heap: BinaryHeap<Reverse<Ranked>>,
    total_hits: u64,
}

impl TopDocsCollector {
    pub fn new(limit: usize) -> Self {
        TopDocsCollector {
            limit,
            heap: BinaryHeap::with_capacity(limit.min(4096) + 1),
            total_hits: 0,
        }
    }

    pub fn total_hits(&self) -> u64 {
        self.total_hits
    }

    pub fn into_top_docs(self) -> TopDocs {
        let mut hits: Vec<ScoreDoc> = self.heap.into_iter().map(|Reverse(r)| r.0).collect();
        hits.sort_by(|a, b| b.rank(a));
        TopDocs {
            total_hits: self.total_hits,
            hits,
        }
    }
}

impl Collector for TopDocsCollector {
    fn collect(&mut self, doc_id: u64, score: f32) -> Result<()> {
        self.total_hits += 1;
        if self.limit == 0 {
            return Ok(());
        }

        let candidate = Ranked(ScoreDoc { doc_id, score });
        if self.heap.len() < self.limit {
            self.heap.push(Reverse(candidate));
        } else if let Some(Reverse(worst)) = self.heap.peek()
            && candidate > *worst
        {
            self.heap.pop();
            self.heap.push(Reverse(candidate));
        }
        Ok(())
    }
}

/// Counts matches without keeping them.
#[derive(Debug, Clone, Default)]
pub struct CountCollector {
    count: u64,
}

impl CountCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Collector for CountCollector {
    fn collect(&mut self, _doc_id: u64, _score: f32) -> Result<()> {
        self.count += 1;
        Ok(())
    }
}
