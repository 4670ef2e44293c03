//! In-memory storage, used by tests and throwaway indexes.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{NotedexError, Result};
use crate::storage::{Storage, StorageInput, StorageOutput};

type FileMap = Arc<RwLock<HashMap<String, Arc<Vec<u8>>>>>;

#[derive(Debug, Clone)]
pub struct MemoryStorageConfig {
    /// Expected number of files, used to pre-size the file map.
    pub initial_capacity: usize,
}

impl Default for MemoryStorageConfig {
    fn default() -> Self {
        MemoryStorageConfig {
            initial_capacity: 16,
        }
    }
}

/// Storage that keeps every file as a byte vector in a shared map.
///
/// Clones share the same files, so a writer and a reader built from clones
/// see each other's committed files.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    files: FileMap,
}

impl MemoryStorage {
    pub fn new(config: MemoryStorageConfig) -> Self {
        MemoryStorage {
            files: Arc::new(RwLock::new(HashMap::with_capacity(
                config.initial_capacity,
            ))),
        }
    }

    /// Total number of bytes held.
    pub fn total_size(&self) -> usize {
        self.files.read().values().map(|data| data.len()).sum()
    }

    /// Overwrite a file's bytes in place. Test helper for corruption checks.
    pub fn replace_file_bytes(&self, name: &str, bytes: Vec<u8>) {
        self.files.write().insert(name.to_string(), Arc::new(bytes));
    }
}

impl Storage for MemoryStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let data = self
            .files
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| NotedexError::not_found(format!("File not found: {name}")))?;
        Ok(Box::new(MemoryInput { data, position: 0 }))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        Ok(Box::new(MemoryOutput::new(name, self.files.clone())))
    }

    fn create_output_exclusive(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let mut files = self.files.write();
        if files.contains_key(name) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{name} already exists"),
            )
            .into());
        }
        // Reserve the name before the output is written.
        files.insert(name.to_string(), Arc::new(Vec::new()));
        Ok(Box::new(MemoryOutput::new(name, self.files.clone())))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.files.read().contains_key(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        match self.files.write().remove(name) {
            Some(_) => Ok(()),
            None => Err(NotedexError::not_found(format!("File not found: {name}"))),
        }
    }

    fn rename_file(&self, from: &str, to: &str) -> Result<()> {
        let mut files = self.files.write();
        let data = files
            .remove(from)
            .ok_or_else(|| NotedexError::not_found(format!("File not found: {from}")))?;
        files.insert(to.to_string(), data);
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.files.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[derive(Debug)]
struct MemoryInput {
    data: Arc<Vec<u8>>,
    position: usize,
}

impl Read for MemoryInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = &self.data[self.position.min(self.data.len())..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}

impl StorageInput for MemoryInput {
    fn size(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }
}

/// Buffers writes and publishes the buffer to the file map on sync, close or drop.
#[derive(Debug)]
struct MemoryOutput {
    name: String,
    buffer: Vec<u8>,
    files: FileMap,
    closed: bool,
}

impl MemoryOutput {
    fn new(name: &str, files: FileMap) -> Self {
        MemoryOutput {
            name: name.to_string(),
            buffer: Vec::new(),
            files,
            closed: false,
        }
    }

    fn publish(&self) {
        self.files
            .write()
            .insert(self.name.clone(), Arc::new(self.buffer.clone()));
    }
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.closed {
            return Err(std::io::Error::other(format!(
                "{} is already closed",
                self.name
            )));
        }
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl StorageOutput for MemoryOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.publish();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.publish();
            self.closed = true;
        }
        Ok(())
    }
}

impl Drop for MemoryOutput {
    fn drop(&mut self) {
        if !self.closed {
            self.publish();
        }
    }
}
