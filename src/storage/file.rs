//! Directory-backed storage.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{NotedexError, Result};
use crate::storage::{Storage, StorageInput, StorageOutput};

#[derive(Debug, Clone)]
pub struct FileStorageConfig {
    /// Directory holding the index files. Created if missing.
    pub path: PathBuf,
    /// Whether `flush_and_sync` calls `fsync`.
    pub sync_writes: bool,
}

impl FileStorageConfig {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileStorageConfig {
            path: path.as_ref().to_path_buf(),
            sync_writes: true,
        }
    }

    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }
}

/// Storage over a single filesystem directory.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
    sync_writes: bool,
}

impl FileStorage {
    pub fn new(config: FileStorageConfig) -> Result<Self> {
        fs::create_dir_all(&config.path).map_err(|e| {
            NotedexError::storage(format!(
                "Failed to create index directory {}: {e}",
                config.path.display()
            ))
        })?;

        Ok(FileStorage {
            root: config.path,
            sync_writes: config.sync_writes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
            return Err(NotedexError::invalid_argument(format!(
                "Invalid file name: {name:?}"
            )));
        }
        Ok(self.root.join(name))
    }
}

impl Storage for FileStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let path = self.path_of(name)?;
        let file = File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                NotedexError::not_found(format!("File not found: {name}"))
            }
            _ => NotedexError::Io(e),
        })?;
        let size = file.metadata()?.len();
        Ok(Box::new(FileInput {
            reader: BufReader::new(file),
            size,
        }))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let path = self.path_of(name)?;
        let file = File::create(&path)?;
        Ok(Box::new(FileOutput::new(file, self.sync_writes)))
    }

    fn create_output_exclusive(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let path = self.path_of(name)?;
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        Ok(Box::new(FileOutput::new(file, self.sync_writes)))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.path_of(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.path_of(name)?;
        fs::remove_file(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                NotedexError::not_found(format!("File not found: {name}"))
            }
            _ => NotedexError::Io(e),
        })
    }

    fn rename_file(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.path_of(from)?;
        let to_path = self.path_of(to)?;
        fs::rename(from_path, to_path)?;
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[derive(Debug)]
struct FileInput {
    reader: BufReader<File>,
    size: u64,
}

impl Read for FileInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl StorageInput for FileInput {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }
}

#[derive(Debug)]
struct FileOutput {
    writer: Option<BufWriter<File>>,
    sync_writes: bool,
}

impl FileOutput {
    fn new(file: File, sync_writes: bool) -> Self {
        FileOutput {
            writer: Some(BufWriter::new(file)),
            sync_writes,
        }
    }

    fn writer(&mut self) -> std::io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("output is already closed"))
    }
}

impl Write for FileOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer()?.flush()
    }
}

impl StorageOutput for FileOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        let sync_writes = self.sync_writes;
        let writer = self.writer()?;
        writer.flush()?;
        if sync_writes {
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.writer.is_some() {
            self.flush_and_sync()?;
            self.writer = None;
        }
        Ok(())
    }
}
