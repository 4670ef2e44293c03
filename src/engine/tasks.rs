//! Async front end: indexing and search on tokio's blocking pool.
//!
//! Both entry points move the blocking work onto
//! [`tokio::task::spawn_blocking`] so they can be awaited from an async
//! runtime without stalling it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};

use crate::engine::config::IndexConfig;
use crate::engine::indexing::{IndexingSession, ProgressCallback};
use crate::engine::search::{SearchHit, SearchSession};
use crate::error::{NotedexError, Result};
use crate::lexical::index::OpenMode;
use crate::storage::Storage;

/// Shared flag asking a running task to stop.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`CancellationToken::cancel`] was called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(NotedexError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Index `docs` and close the writer, merging the index into one segment.
///
/// Returns the number of documents added. On error or cancellation nothing
/// is committed and the write lock is released.
pub async fn index_documents(
    storage: Arc<dyn Storage>,
    config: IndexConfig,
    mode: OpenMode,
    docs: Vec<(String, String)>,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
) -> Result<usize> {
    tokio::task::spawn_blocking(move || {
        cancel.check()?;
        let mut session = IndexingSession::open(storage, config, mode)?;
        if let Some(progress) = progress {
            session.set_progress_callback(progress);
        }
        session.set_cancellation_token(cancel);

        match session.add_document_list(&docs) {
            Ok(added) => {
                session.close()?;
                info!("Indexing task finished: {added} documents");
                Ok(added)
            }
            Err(e) => {
                debug!("Indexing task stopped: {e}");
                session.rollback()?;
                Err(e)
            }
        }
    })
    .await
    .map_err(|e| NotedexError::other(format!("Indexing task failed: {e}")))?
}

/// Open a fresh snapshot and run `query`.
pub async fn search(
    storage: Arc<dyn Storage>,
    config: IndexConfig,
    query: String,
    cancel: CancellationToken,
) -> Result<Vec<SearchHit>> {
    tokio::task::spawn_blocking(move || {
        cancel.check()?;
        let session = SearchSession::open(storage, config)?;
        cancel.check()?;
        session.search(&query)
    })
    .await
    .map_err(|e| NotedexError::other(format!("Search task failed: {e}")))?
}
