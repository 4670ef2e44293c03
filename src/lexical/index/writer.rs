//! Index writer.
//!
//! Documents are analyzed and inverted into an in-memory [`SegmentBuilder`],
//! flushed to an immutable segment when the buffer is full, and become
//! visible to readers on [`IndexWriter::commit`]. Only one writer may hold a
//! directory at a time; the `write.lock` file enforces that.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::{Analyzer, StandardAnalyzer};
use crate::error::{NotedexError, Result};
use crate::lexical::core::document::Document;
use crate::lexical::core::term::Term;
use crate::lexical::index::deletion::LiveDocs;
use crate::lexical::index::merge::{MergeSource, merge_segments};
use crate::lexical::index::metadata::{IndexMetadata, METADATA_FILE, SegmentInfo};
use crate::lexical::index::segment::{AnalyzedDocument, SegmentBuilder, SegmentCore, write_segment};
use crate::storage::Storage;
use crate::storage::lock::{IndexLock, WRITE_LOCK_NAME};

/// What to do with an existing index when a writer opens a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenMode {
    /// Start an empty index. The previous one stays readable until the
    /// first commit replaces it.
    Create,
    /// Add to the existing index. Fails if there is none.
    Append,
    /// Append when an index exists, create one otherwise.
    #[default]
    CreateOrAppend,
}

/// Index writer configuration.
#[derive(Clone)]
pub struct IndexWriterConfig {
    /// Maximum number of documents to buffer before flushing a segment.
    pub max_buffered_docs: usize,

    pub open_mode: OpenMode,

    /// Analyzer for analyzed fields (usually a `PerFieldAnalyzer`).
    pub analyzer: Arc<dyn Analyzer>,
}

impl std::fmt::Debug for IndexWriterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexWriterConfig")
            .field("max_buffered_docs", &self.max_buffered_docs)
            .field("open_mode", &self.open_mode)
            .field("analyzer", &self.analyzer.name())
            .finish()
    }
}

impl Default for IndexWriterConfig {
    fn default() -> Self {
        IndexWriterConfig {
            max_buffered_docs: 10000,
            open_mode: OpenMode::default(),
            analyzer: Arc::new(StandardAnalyzer::new()),
        }
    }
}

/// Statistics about the writing process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub docs_added: u64,
    /// Documents newly marked deleted by delete calls.
    pub docs_deleted: u64,
    pub segments_flushed: u32,
    pub segments_merged: u32,
    pub commits: u32,
}

/// A segment as the writer sees it: committed or flushed, with its pending
/// deletions.
#[derive(Debug)]
struct WriterSegment {
    info: SegmentInfo,
    core: Option<Arc<SegmentCore>>,
    live_docs: Option<LiveDocs>,
    /// Deletions not yet written to a live-docs file.
    dirty: bool,
}

impl WriterSegment {
    fn new(info: SegmentInfo) -> Self {
        WriterSegment {
            info,
            core: None,
            live_docs: None,
            dirty: false,
        }
    }

    fn load(&mut self, storage: &dyn Storage) -> Result<()> {
        if self.core.is_none() {
            self.core = Some(Arc::new(SegmentCore::load(storage, &self.info)?));
        }
        if self.live_docs.is_none() {
            self.live_docs = Some(match self.info.del_file_name() {
                Some(name) => LiveDocs::read(storage, &name, self.info.doc_count)?,
                None => LiveDocs::all_live(self.info.doc_count),
            });
        }
        Ok(())
    }

    fn num_docs(&self) -> u32 {
        match &self.live_docs {
            Some(live) => live.num_live(),
            None => self.info.live_count(),
        }
    }
}

/// Writes documents to an index directory.
pub struct IndexWriter {
    storage: Arc<dyn Storage>,
    config: IndexWriterConfig,
    lock: IndexLock,

    /// The commit point on disk, if any.
    committed: Option<IndexMetadata>,
    created_at: DateTime<Utc>,
    segments: Vec<WriterSegment>,
    segment_counter: u64,
    buffer: SegmentBuilder,

    /// Whether anything differs from `committed`.
    has_changes: bool,
    closed: bool,
    stats: WriterStats,
}

impl std::fmt::Debug for IndexWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexWriter")
            .field("config", &self.config)
            .field("segments", &self.segments.len())
            .field("buffered_docs", &self.buffer.doc_count())
            .field("closed", &self.closed)
            .field("stats", &self.stats)
            .finish()
    }
}

impl IndexWriter {
    /// Obtain the write lock and open the directory according to
    /// `config.open_mode`.
    pub fn open(storage: Arc<dyn Storage>, config: IndexWriterConfig) -> Result<Self> {
        if config.max_buffered_docs == 0 {
            return Err(NotedexError::invalid_argument(
                "max_buffered_docs must be greater than zero",
            ));
        }

        let lock = IndexLock::obtain(storage.clone(), WRITE_LOCK_NAME)?;
        let existing = IndexMetadata::load(storage.as_ref())?;

        let (segments, segment_counter, has_changes) = match (config.open_mode, &existing) {
            (OpenMode::Append, None) => {
                return Err(NotedexError::not_found(
                    "No index found to append to",
                ));
            }
            (OpenMode::Append | OpenMode::CreateOrAppend, Some(metadata)) => (
                metadata
                    .segments
                    .iter()
                    .cloned()
                    .map(WriterSegment::new)
                    .collect(),
                metadata.segment_counter,
                false,
            ),
            (OpenMode::Create, Some(metadata)) => (Vec::new(), metadata.segment_counter, true),
            (OpenMode::Create | OpenMode::CreateOrAppend, None) => (Vec::new(), 0, true),
        };

        let created_at = match (&existing, config.open_mode) {
            (Some(metadata), OpenMode::Append | OpenMode::CreateOrAppend) => metadata.created_at,
            _ => Utc::now(),
        };

        let mut writer = IndexWriter {
            storage,
            config,
            lock,
            committed: existing,
            created_at,
            segments,
            segment_counter,
            buffer: SegmentBuilder::new(),
            has_changes,
            closed: false,
            stats: WriterStats::default(),
        };
        // Leftovers of a crashed writer could collide with new segment names.
        writer.remove_unreferenced_files()?;

        debug!(
            "Opened index writer ({:?}, {} existing segments)",
            writer.config.open_mode,
            writer.segments.len()
        );
        Ok(writer)
    }

    pub fn config(&self) -> &IndexWriterConfig {
        &self.config
    }

    pub fn analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.config.analyzer
    }

    /// Analyze and add one document.
    pub fn add_document(&mut self, doc: &Document) -> Result<()> {
        self.check_closed()?;
        let analyzed = AnalyzedDocument::analyze(doc, self.config.analyzer.as_ref())?;
        self.add_analyzed_document(analyzed)
    }

    /// Analyze documents in parallel. The result keeps input order.
    pub fn analyze_documents(&self, docs: &[Document]) -> Result<Vec<AnalyzedDocument>> {
        let analyzer = self.config.analyzer.as_ref();
        docs.par_iter()
            .map(|doc| AnalyzedDocument::analyze(doc, analyzer))
            .collect()
    }

    /// Add a document analyzed with [`IndexWriter::analyze_documents`] or
    /// [`AnalyzedDocument::analyze`].
    pub fn add_analyzed_document(&mut self, doc: AnalyzedDocument) -> Result<()> {
        self.check_closed()?;
        self.buffer.add_document(doc);
        self.has_changes = true;
        self.stats.docs_added += 1;

        if self.should_flush() {
            self.flush_segment()?;
        }
        Ok(())
    }

    /// Delete every document containing `term` that was added before this
    /// call, committed or not. Returns the number of documents deleted.
    pub fn delete_documents(&mut self, term: &Term) -> Result<u32> {
        self.check_closed()?;

        let mut deleted = self.buffer.delete_term(term);
        for segment in &mut self.segments {
            segment.load(self.storage.as_ref())?;
            let (Some(core), Some(live_docs)) = (&segment.core, &mut segment.live_docs) else {
                continue;
            };
            let Some(term_info) = core.term_info(term) else {
                continue;
            };
            for posting in core.postings_for(&term_info)? {
                if live_docs.delete(posting.doc_id) {
                    deleted += 1;
                    segment.dirty = true;
                }
            }
        }

        if deleted > 0 {
            self.has_changes = true;
            self.stats.docs_deleted += deleted as u64;
        }
        debug!("Deleted {deleted} documents matching {term}");
        Ok(deleted)
    }

    fn should_flush(&self) -> bool {
        self.buffer.doc_count() as usize >= self.config.max_buffered_docs
    }

    /// Write buffered documents to a new segment. The segment becomes
    /// visible at the next commit.
    pub fn flush_segment(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let buffer = std::mem::take(&mut self.buffer);
        if buffer.num_deleted() == buffer.doc_count() {
            debug!("Dropped flush of {} documents, all deleted", buffer.doc_count());
            return Ok(());
        }

        let name = self.next_segment_name();
        let info = write_segment(self.storage.as_ref(), &name, &buffer)?;

        let mut live_docs = LiveDocs::all_live(info.doc_count);
        for doc_id in buffer.deleted_docs() {
            live_docs.delete(doc_id);
        }
        let dirty = live_docs.has_deletions();

        debug!(
            "Flushed segment {name}: {} docs, {} terms, {} deleted",
            info.doc_count,
            buffer.num_terms(),
            live_docs.num_deleted()
        );
        self.segments.push(WriterSegment {
            info,
            core: None,
            live_docs: Some(live_docs),
            dirty,
        });
        self.stats.segments_flushed += 1;
        Ok(())
    }

    /// Flush, write pending deletions and publish a new commit point.
    pub fn commit(&mut self) -> Result<()> {
        self.check_closed()?;
        self.flush_segment()?;

        if !self.has_changes {
            debug!("Nothing to commit");
            return Ok(());
        }

        for segment in &mut self.segments {
            if !segment.dirty {
                continue;
            }
            let Some(live_docs) = &segment.live_docs else {
                continue;
            };
            let del_gen = segment.info.del_gen + 1;
            live_docs.write(
                self.storage.as_ref(),
                &segment.info.del_file_name_for(del_gen),
            )?;
            segment.info.del_gen = del_gen;
            segment.info.del_count = live_docs.num_deleted();
        }

        let now = Utc::now();
        let metadata = IndexMetadata {
            generation: self.committed.as_ref().map_or(0, |m| m.generation) + 1,
            segment_counter: self.segment_counter,
            segments: self.segments.iter().map(|s| s.info.clone()).collect(),
            created_at: self.created_at,
            updated_at: now,
            ..IndexMetadata::new()
        };
        metadata.store(self.storage.as_ref())?;

        for segment in &mut self.segments {
            segment.dirty = false;
        }
        info!(
            "Committed generation {}: {} segments, {} docs ({} live)",
            metadata.generation,
            metadata.segments.len(),
            metadata.max_doc(),
            metadata.num_docs()
        );
        self.committed = Some(metadata);
        self.has_changes = false;
        self.stats.commits += 1;

        self.remove_unreferenced_files()
    }

    /// Merge every segment into one, dropping deleted documents. The result
    /// becomes visible at the next commit.
    pub fn force_merge(&mut self) -> Result<()> {
        self.check_closed()?;
        self.flush_segment()?;

        let needs_merge = self.segments.len() > 1
            || self.segments.iter().any(|s| s.num_docs() < s.info.doc_count);
        if !needs_merge {
            return Ok(());
        }

        for segment in &mut self.segments {
            segment.load(self.storage.as_ref())?;
        }
        let name = self.next_segment_name();
        let merged = {
            let sources: Vec<MergeSource<'_>> = self
                .segments
                .iter()
                .filter_map(|s| match (&s.core, &s.live_docs) {
                    (Some(core), Some(live_docs)) => Some(MergeSource {
                        core: core.as_ref(),
                        live_docs,
                    }),
                    _ => None,
                })
                .collect();
            merge_segments(self.storage.as_ref(), &sources, &name)?
        };

        info!(
            "Merged {} segments into {}",
            self.segments.len(),
            merged.as_ref().map_or("nothing", |info| info.name.as_str())
        );
        self.stats.segments_merged += self.segments.len() as u32;
        self.segments = merged.into_iter().map(WriterSegment::new).collect();
        self.has_changes = true;
        Ok(())
    }

    /// Discard every change since the last commit and close the writer,
    /// releasing the lock.
    pub fn rollback(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.buffer = SegmentBuilder::new();
        self.segments = self
            .committed
            .iter()
            .flat_map(|m| m.segments.iter().cloned())
            .map(WriterSegment::new)
            .collect();
        self.has_changes = false;
        self.closed = true;

        let cleanup = self.remove_unreferenced_files();
        self.lock.release()?;
        debug!("Rolled back index writer");
        cleanup
    }

    /// Commit, merge down to one segment, commit again and release the lock.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.commit()?;
        self.force_merge()?;
        self.commit()?;

        self.closed = true;
        self.lock.release()?;
        info!(
            "Closed index writer: {} added, {} deleted",
            self.stats.docs_added, self.stats.docs_deleted
        );
        Ok(())
    }

    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Documents buffered in memory, not yet flushed.
    pub fn pending_docs(&self) -> u32 {
        self.buffer.doc_count()
    }

    /// Documents in the writer's current view, deleted ones included.
    pub fn max_doc(&self) -> u64 {
        self.segments
            .iter()
            .map(|s| s.info.doc_count as u64)
            .sum::<u64>()
            + self.buffer.doc_count() as u64
    }

    /// Live documents in the writer's current view.
    pub fn num_docs(&self) -> u64 {
        self.segments.iter().map(|s| s.num_docs() as u64).sum::<u64>()
            + (self.buffer.doc_count() - self.buffer.num_deleted()) as u64
    }

    fn check_closed(&self) -> Result<()> {
        if self.closed {
            Err(NotedexError::InvalidOperation("Writer is closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn next_segment_name(&mut self) -> String {
        let mut metadata = IndexMetadata {
            segment_counter: self.segment_counter,
            ..IndexMetadata::new()
        };
        let name = metadata.next_segment_name();
        self.segment_counter = metadata.segment_counter;
        name
    }

    /// Delete index files that neither the commit point nor the writer's
    /// current segments reference. Other files in the directory are left alone.
    fn remove_unreferenced_files(&self) -> Result<()> {
        let mut referenced: Vec<String> = self
            .committed
            .iter()
            .flat_map(|m| m.referenced_files())
            .collect();
        for segment in &self.segments {
            referenced.extend(segment.info.data_files());
        }

        for file in self.storage.list_files()? {
            let ours = file.starts_with('_') || file == format!("{METADATA_FILE}.tmp");
            if !ours || file == WRITE_LOCK_NAME || referenced.contains(&file) {
                continue;
            }
            match self.storage.delete_file(&file) {
                Ok(()) => debug!("Removed unreferenced file {file}"),
                Err(e) => warn!("Failed to remove unreferenced file {file}: {e}"),
            }
        }
        Ok(())
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if !self.closed {
            warn!("Index writer dropped without close; rolling back uncommitted changes");
            if let Err(e) = self.rollback() {
                warn!("Rollback on drop failed: {e}");
            }
        }
    }
}
