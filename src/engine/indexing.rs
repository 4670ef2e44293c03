//! Indexing sessions over `(id, text)` pairs.

use std::sync::Arc;

use log::{debug, info};

use crate::engine::config::IndexConfig;
use crate::engine::tasks::CancellationToken;
use crate::error::Result;
use crate::lexical::core::document::Document;
use crate::lexical::core::term::Term;
use crate::lexical::index::{IndexWriter, IndexWriterConfig, OpenMode, WriterStats};
use crate::storage::Storage;

/// Documents analyzed together before being appended.
const ANALYSIS_BATCH: usize = 256;

/// Progress of [`IndexingSession::add_document_list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexProgress {
    pub processed: usize,
    pub total: usize,
}

pub type ProgressCallback = Arc<dyn Fn(IndexProgress) + Send + Sync>;

/// The single writer of an index directory.
///
/// Holds the directory's write lock from [`IndexingSession::open`] until
/// [`IndexingSession::close`] or [`IndexingSession::rollback`]. Dropping a
/// session without closing it discards uncommitted changes and releases
/// the lock.
pub struct IndexingSession {
    writer: IndexWriter,
    config: IndexConfig,
    progress: Option<ProgressCallback>,
    cancel: Option<CancellationToken>,
}

impl std::fmt::Debug for IndexingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexingSession")
            .field("writer", &self.writer)
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl IndexingSession {
    /// Obtain the write lock. `OpenMode::Create` replaces the existing index
    /// at the next commit, `OpenMode::Append` requires one.
    pub fn open(storage: Arc<dyn Storage>, config: IndexConfig, mode: OpenMode) -> Result<Self> {
        config.validate()?;
        let writer = IndexWriter::open(
            storage,
            IndexWriterConfig {
                max_buffered_docs: config.max_buffered_docs,
                open_mode: mode,
                analyzer: config.analyzer(),
            },
        )?;
        Ok(IndexingSession {
            writer,
            config,
            progress: None,
            cancel: None,
        })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    /// Checked between documents of [`IndexingSession::add_document_list`].
    pub fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.cancel = Some(token);
    }

    fn make_document(&self, id: &str, text: &str) -> Document {
        Document::builder()
            .add_keyword(self.config.id_field.as_str(), id)
            .add_text(self.config.body_field.as_str(), text)
            .build()
    }

    /// Add every `(id, text)` pair in order and return how many were added.
    ///
    /// Documents are analyzed in parallel. Ids are not deduplicated. Stops
    /// with `Cancelled` between two documents once the cancellation token
    /// fires; documents added before that stay buffered until commit or
    /// rollback.
    pub fn add_document_list<I: AsRef<str>, T: AsRef<str>>(&mut self, docs: &[(I, T)]) -> Result<usize> {
        let total = docs.len();
        let mut processed = 0;

        for chunk in docs.chunks(ANALYSIS_BATCH) {
            self.check_cancelled()?;
            let documents: Vec<Document> = chunk
                .iter()
                .map(|(id, text)| self.make_document(id.as_ref(), text.as_ref()))
                .collect();
            let analyzed = self.writer.analyze_documents(&documents)?;

            for doc in analyzed {
                self.check_cancelled()?;
                self.writer.add_analyzed_document(doc)?;
                processed += 1;
                if let Some(progress) = &self.progress {
                    progress(IndexProgress { processed, total });
                }
            }
        }

        debug!("Added {processed} documents");
        Ok(processed)
    }

    pub fn add_document(&mut self, id: &str, text: &str) -> Result<()> {
        let doc = self.make_document(id, text);
        self.writer.add_document(&doc)
    }

    /// Delete every document added so far whose id is exactly `id`.
    pub fn delete_document_by_id(&mut self, id: &str) -> Result<u32> {
        let term = Term::new(self.config.id_field.as_str(), id);
        self.writer.delete_documents(&term)
    }

    /// Make every change so far visible to new search sessions.
    pub fn commit(&mut self) -> Result<()> {
        self.writer.commit()
    }

    /// Commit, merge the index into one segment and release the lock.
    pub fn close(mut self) -> Result<()> {
        self.writer.close()?;
        info!(
            "Closed indexing session: {} documents live",
            self.writer.num_docs()
        );
        Ok(())
    }

    /// Discard changes since the last commit and release the lock.
    pub fn rollback(mut self) -> Result<()> {
        self.writer.rollback()
    }

    pub fn stats(&self) -> &WriterStats {
        self.writer.stats()
    }

    pub fn pending_docs(&self) -> u32 {
        self.writer.pending_docs()
    }

    pub fn max_doc(&self) -> u64 {
        self.writer.max_doc()
    }

    pub fn num_docs(&self) -> u64 {
        self.writer.num_docs()
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }
}
