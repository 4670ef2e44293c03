//! Point-in-time index readers.
//!
//! An [`IndexReader`] opens the segments of the latest commit point and loads
//! them fully into memory, so nothing a writer does afterwards (new commits,
//! merges, file removal) changes what the reader sees. Global document ids
//! are the segment's base (the sum of the preceding segments' doc counts)
//! plus the segment-local id.

use std::collections::BTreeSet;
use std::ops::Bound;
use std::sync::Arc;

use log::debug;

use crate::error::{NotedexError, Result};
use crate::lexical::core::document::Document;
use crate::lexical::core::term::Term;
use crate::lexical::index::deletion::LiveDocs;
use crate::lexical::index::metadata::{IndexMetadata, SegmentInfo};
use crate::lexical::index::segment::{FieldStats, SegmentCore};
use crate::storage::Storage;

/// Postings of one live document, addressed by global doc id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPositions {
    pub doc_id: u64,
    pub positions: Vec<u32>,
}

impl DocPositions {
    pub fn freq(&self) -> u32 {
        self.positions.len() as u32
    }
}

/// One segment of a snapshot.
#[derive(Debug, Clone)]
pub struct SegmentReader {
    info: SegmentInfo,
    base: u64,
    core: Arc<SegmentCore>,
    live_docs: Arc<LiveDocs>,
}

impl SegmentReader {
    pub fn open(storage: &dyn Storage, info: &SegmentInfo, base: u64) -> Result<Self> {
        let core = SegmentCore::load(storage, info)?;
        let live_docs = match info.del_file_name() {
            Some(name) => LiveDocs::read(storage, &name, info.doc_count)?,
            None => LiveDocs::all_live(info.doc_count),
        };
        if live_docs.num_deleted() != info.del_count {
            return Err(NotedexError::corrupt(format!(
                "Segment {}: {} deletions recorded, {} found",
                info.name,
                info.del_count,
                live_docs.num_deleted()
            )));
        }
        Ok(SegmentReader {
            info: info.clone(),
            base,
            core: Arc::new(core),
            live_docs: Arc::new(live_docs),
        })
    }

    pub fn info(&self) -> &SegmentInfo {
        &self.info
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn core(&self) -> &SegmentCore {
        &self.core
    }

    pub fn live_docs(&self) -> &LiveDocs {
        &self.live_docs
    }

    pub fn max_doc(&self) -> u32 {
        self.info.doc_count
    }

    pub fn num_docs(&self) -> u32 {
        self.live_docs.num_live()
    }
}

/// A read-only snapshot of a committed index.
#[derive(Debug)]
pub struct IndexReader {
    generation: u64,
    segments: Vec<SegmentReader>,
    max_doc: u64,
    num_docs: u64,
}

impl IndexReader {
    /// Open the latest commit point. A directory without one opens as an
    /// empty index.
    pub fn open(storage: Arc<dyn Storage>) -> Result<Self> {
        match IndexMetadata::load(storage.as_ref())? {
            Some(metadata) => Self::from_metadata(storage.as_ref(), &metadata),
            None => {
                debug!("No commit point found, opening an empty index");
                Ok(Self::empty())
            }
        }
    }

    pub fn from_metadata(storage: &dyn Storage, metadata: &IndexMetadata) -> Result<Self> {
        let mut segments = Vec::with_capacity(metadata.segments.len());
        let mut base = 0u64;
        for info in &metadata.segments {
            let segment = SegmentReader::open(storage, info, base)?;
            base += segment.max_doc() as u64;
            segments.push(segment);
        }

        let num_docs = segments.iter().map(|s| s.num_docs() as u64).sum();
        debug!(
            "Opened index generation {} with {} segments, {} docs ({} live)",
            metadata.generation,
            segments.len(),
            base,
            num_docs
        );

        Ok(IndexReader {
            generation: metadata.generation,
            segments,
            max_doc: base,
            num_docs,
        })
    }

    pub fn empty() -> Self {
        IndexReader {
            generation: 0,
            segments: Vec::new(),
            max_doc: 0,
            num_docs: 0,
        }
    }

    /// Commit generation of the snapshot, zero for an empty directory.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn segments(&self) -> &[SegmentReader] {
        &self.segments
    }

    /// One greater than the largest document id, deleted documents included.
    pub fn max_doc(&self) -> u64 {
        self.max_doc
    }

    /// Number of live documents.
    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    pub fn has_deletions(&self) -> bool {
        self.num_docs < self.max_doc
    }

    fn locate(&self, doc_id: u64) -> Option<(&SegmentReader, u32)> {
        let index = self
            .segments
            .partition_point(|segment| segment.base + segment.max_doc() as u64 <= doc_id);
        let segment = self.segments.get(index)?;
        (doc_id >= segment.base).then(|| (segment, (doc_id - segment.base) as u32))
    }

    pub fn is_deleted(&self, doc_id: u64) -> bool {
        match self.locate(doc_id) {
            Some((segment, local)) => !segment.live_docs.is_live(local),
            None => true,
        }
    }

    /// Stored fields of a live document.
    pub fn document(&self, doc_id: u64) -> Result<Document> {
        let (segment, local) = self
            .locate(doc_id)
            .ok_or_else(|| NotedexError::not_found(format!("Document {doc_id} does not exist")))?;
        if !segment.live_docs.is_live(local) {
            return Err(NotedexError::not_found(format!("Document {doc_id} is deleted")));
        }
        segment
            .core
            .document(local)
            .cloned()
            .ok_or_else(|| NotedexError::corrupt(format!("Document {doc_id} has no stored fields")))
    }

    /// Number of documents containing `term`, deleted ones included.
    pub fn doc_freq(&self, term: &Term) -> u64 {
        self.segments
            .iter()
            .filter_map(|segment| segment.core.term_info(term))
            .map(|info| info.doc_freq as u64)
            .sum()
    }

    /// Postings of `term` over live documents, in ascending doc id order.
    pub fn postings(&self, term: &Term) -> Result<Vec<DocPositions>> {
        let mut result = Vec::new();
        for segment in &self.segments {
            let Some(info) = segment.core.term_info(term) else {
                continue;
            };
            for posting in segment.core.postings_for(&info)? {
                if segment.live_docs.is_live(posting.doc_id) {
                    result.push(DocPositions {
                        doc_id: segment.base + posting.doc_id as u64,
                        positions: posting.positions,
                    });
                }
            }
        }
        Ok(result)
    }

    /// Token count of `field` in a document.
    pub fn field_length(&self, doc_id: u64, field: &str) -> u32 {
        self.locate(doc_id)
            .map(|(segment, local)| segment.core.field_length(field, local))
            .unwrap_or(0)
    }

    /// Length statistics of `field` over every document in the snapshot.
    pub fn field_stats(&self, field: &str) -> FieldStats {
        self.segments
            .iter()
            .map(|segment| segment.core.field_stats(field))
            .fold(FieldStats::default(), |acc, stats| FieldStats {
                total_length: acc.total_length + stats.total_length,
                doc_count: acc.doc_count + stats.doc_count,
            })
    }

    /// Average token count of `field` among documents that have it.
    pub fn avg_field_length(&self, field: &str) -> f32 {
        let stats = self.field_stats(field);
        if stats.doc_count == 0 {
            1.0
        } else {
            stats.total_length as f32 / stats.doc_count as f32
        }
    }

    /// Ids of every live document, ascending.
    pub fn live_doc_ids(&self) -> Vec<u64> {
        let mut ids = Vec::with_capacity(self.num_docs as usize);
        for segment in &self.segments {
            ids.extend(segment.live_docs.live_ids().map(|local| segment.base + local as u64));
        }
        ids
    }

    /// Every term of every segment, deduplicated and sorted.
    pub fn all_terms(&self) -> Result<Vec<Term>> {
        let mut terms = BTreeSet::new();
        for segment in &self.segments {
            for (term, _) in segment.core.dictionary().all_terms()? {
                terms.insert(term);
            }
        }
        Ok(terms.into_iter().collect())
    }

    /// Distinct term texts of `field`, sorted.
    pub fn field_terms(&self, field: &str) -> Result<Vec<String>> {
        let mut texts = BTreeSet::new();
        for segment in &self.segments {
            for (term, _) in segment.core.dictionary().field_terms(field)? {
                texts.insert(term.text().to_string());
            }
        }
        Ok(texts.into_iter().collect())
    }

    /// Distinct term texts of `field` between `lower` and `upper`, sorted.
    pub fn terms_in_range(
        &self,
        field: &str,
        lower: Bound<&str>,
        upper: Bound<&str>,
    ) -> Result<Vec<String>> {
        let mut texts = BTreeSet::new();
        for segment in &self.segments {
            for (term, _) in segment.core.dictionary().terms_in_range(field, lower, upper)? {
                texts.insert(term.text().to_string());
            }
        }
        Ok(texts.into_iter().collect())
    }

    /// Distinct term texts of `field` starting with `prefix`, sorted.
    pub fn terms_with_prefix(&self, field: &str, prefix: &str) -> Result<Vec<String>> {
        let mut texts = BTreeSet::new();
        for segment in &self.segments {
            for (term, _) in segment.core.dictionary().terms_with_prefix(field, prefix)? {
                texts.insert(term.text().to_string());
            }
        }
        Ok(texts.into_iter().collect())
    }
}
