//! Exclusive write lock for an index directory.
//!
//! The lock is a marker file created with exclusive-create semantics. It
//! holds a random owner token and the process id. The lock is released when
//! [`IndexLock::release`] is called or the guard is dropped.

use std::io::Write;
use std::sync::Arc;

use log::{debug, warn};
use uuid::Uuid;

use crate::error::{NotedexError, Result};
use crate::storage::{Storage, is_already_exists};

/// Name of the lock file held by an open index writer.
pub const WRITE_LOCK_NAME: &str = "write.lock";

/// Guard for an obtained lock file.
#[derive(Debug)]
pub struct IndexLock {
    storage: Arc<dyn Storage>,
    name: String,
    token: Uuid,
    released: bool,
}

impl IndexLock {
    /// Obtain `name` or fail immediately with `LockObtainFailed`.
    pub fn obtain(storage: Arc<dyn Storage>, name: &str) -> Result<Self> {
        let mut output = match storage.create_output_exclusive(name) {
            Ok(output) => output,
            Err(e) if is_already_exists(&e) => {
                return Err(NotedexError::lock_obtain_failed(format!(
                    "{name} is held by another writer"
                )));
            }
            Err(e) => return Err(e),
        };

        let token = Uuid::new_v4();
        let written = writeln!(output, "{token} pid={}", std::process::id())
            .map_err(NotedexError::from)
            .and_then(|()| output.close());
        if let Err(e) = written {
            drop(output);
            if let Err(cleanup) = storage.delete_file(name) {
                warn!("Failed to remove half-written lock {name}: {cleanup}");
            }
            return Err(e);
        }

        debug!("Obtained lock {name} ({token})");

        Ok(IndexLock {
            storage,
            name: name.to_string(),
            token,
            released: false,
        })
    }

    /// Whether a lock file named `name` currently exists.
    pub fn is_locked(storage: &dyn Storage, name: &str) -> bool {
        storage.file_exists(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Delete the lock file. Releasing twice is a no-op.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        match self.storage.delete_file(&self.name) {
            Ok(()) | Err(NotedexError::NotFound(_)) => {
                debug!("Released lock {} ({})", self.name, self.token);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to release lock {}: {e}", self.name);
        }
    }
}
