//! Storage abstraction for index files.
//!
//! An index lives in a flat namespace of named files. [`Storage`] hides
//! whether that namespace is a directory on disk ([`file::FileStorage`]) or a
//! map in memory ([`memory::MemoryStorage`]).
//!
//! # Example
//!
//! ```
//! use notedex::storage::memory::MemoryStorageConfig;
//! use notedex::storage::{StorageConfig, StorageFactory};
//!
//! let storage = StorageFactory::create(StorageConfig::Memory(MemoryStorageConfig::default())).unwrap();
//! assert!(storage.list_files().unwrap().is_empty());
//! ```

pub mod file;
pub mod lock;
pub mod memory;
pub mod structured;

use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::Result;

use self::file::{FileStorage, FileStorageConfig};
use self::memory::{MemoryStorage, MemoryStorageConfig};

/// A readable file handle.
pub trait StorageInput: Read + Send + std::fmt::Debug {
    /// Total size of the file in bytes.
    fn size(&self) -> Result<u64>;
}

/// A writable file handle.
pub trait StorageOutput: Write + Send + std::fmt::Debug {
    /// Flush buffered bytes and make them durable.
    fn flush_and_sync(&mut self) -> Result<()>;

    /// Flush, sync and release the handle. Further writes are an error.
    fn close(&mut self) -> Result<()>;
}

/// A flat namespace of named files.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Open an existing file for reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create (or truncate) a file for writing.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Create a file that must not exist yet.
    ///
    /// Fails with an `AlreadyExists` I/O error when the file is present; the
    /// check and the creation are a single atomic step.
    fn create_output_exclusive(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    fn file_exists(&self, name: &str) -> bool;

    fn delete_file(&self, name: &str) -> Result<()>;

    /// Atomically replace `to` with `from`.
    fn rename_file(&self, from: &str, to: &str) -> Result<()>;

    fn list_files(&self) -> Result<Vec<String>>;

    /// Read a whole file into memory.
    fn read_all(&self, name: &str) -> Result<Vec<u8>> {
        let mut input = self.open_input(name)?;
        let mut buffer = Vec::with_capacity(input.size()? as usize);
        input.read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

/// Selects and configures a storage backend.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    File(FileStorageConfig),
    Memory(MemoryStorageConfig),
}

/// Creates storage backends from a [`StorageConfig`].
pub struct StorageFactory;

impl StorageFactory {
    pub fn create(config: StorageConfig) -> Result<Arc<dyn Storage>> {
        match config {
            StorageConfig::File(file_config) => Ok(Arc::new(FileStorage::new(file_config)?)),
            StorageConfig::Memory(memory_config) => Ok(Arc::new(MemoryStorage::new(memory_config))),
        }
    }
}

/// Whether an error is the `AlreadyExists` failure of
/// [`Storage::create_output_exclusive`].
pub fn is_already_exists(err: &crate::error::NotedexError) -> bool {
    matches!(err, crate::error::NotedexError::Io(io) if io.kind() == std::io::ErrorKind::AlreadyExists)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_memory() {
        let storage =
            StorageFactory::create(StorageConfig::Memory(MemoryStorageConfig::default())).unwrap();

        let mut out = storage.create_output("a.bin").unwrap();
        out.write_all(b"abc").unwrap();
        out.close().unwrap();

        assert_eq!(storage.read_all("a.bin").unwrap(), b"abc");
    }

    #[test]
    fn test_factory_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            StorageFactory::create(StorageConfig::File(FileStorageConfig::new(dir.path())))
                .unwrap();

        let mut out = storage.create_output("a.bin").unwrap();
        out.write_all(b"xyz").unwrap();
        out.close().unwrap();

        assert_eq!(storage.read_all("a.bin").unwrap(), b"xyz");
    }
}
