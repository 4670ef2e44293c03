//! Commit points.
//!
//! `metadata.json` names the segments that make up the index. It is replaced
//! atomically on every commit by writing `metadata.json.tmp` and renaming it.
//! Files not referenced by the current commit point belong to no snapshot
//! and may be deleted.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{NotedexError, Result};
use crate::storage::Storage;

pub const METADATA_FILE: &str = "metadata.json";
const METADATA_TMP_FILE: &str = "metadata.json.tmp";

/// Index format written by this version.
pub const FORMAT_VERSION: u32 = 1;

pub const DICT_EXT: &str = "dict";
pub const POSTINGS_EXT: &str = "post";
pub const DOCS_EXT: &str = "docs";
pub const LENGTHS_EXT: &str = "lens";
pub const DELETES_EXT: &str = "del";

/// A committed segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentInfo {
    /// File name stem, e.g. `_a`.
    pub name: String,
    pub doc_count: u32,
    pub del_count: u32,
    /// Deletion generation. Zero means no deletion file.
    pub del_gen: u64,
}

impl SegmentInfo {
    pub fn new<S: Into<String>>(name: S, doc_count: u32) -> Self {
        SegmentInfo {
            name: name.into(),
            doc_count,
            del_count: 0,
            del_gen: 0,
        }
    }

    pub fn live_count(&self) -> u32 {
        self.doc_count - self.del_count
    }

    pub fn file_name(&self, ext: &str) -> String {
        format!("{}.{ext}", self.name)
    }

    /// Live-docs file for the current deletion generation.
    pub fn del_file_name(&self) -> Option<String> {
        (self.del_gen > 0).then(|| self.del_file_name_for(self.del_gen))
    }

    pub fn del_file_name_for(&self, del_gen: u64) -> String {
        format!("{}_{}.{DELETES_EXT}", self.name, radix36(del_gen))
    }

    /// The segment's immutable data files.
    pub fn data_files(&self) -> Vec<String> {
        [DICT_EXT, POSTINGS_EXT, DOCS_EXT, LENGTHS_EXT]
            .iter()
            .map(|ext| self.file_name(ext))
            .collect()
    }

    /// Every file this segment needs in the current generation.
    pub fn files(&self) -> Vec<String> {
        let mut files = self.data_files();
        files.extend(self.del_file_name());
        files
    }
}

/// Contents of a commit point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub format_version: u32,
    /// Incremented on every commit.
    pub generation: u64,
    /// Source of new segment names. Never reused, even across `Create`.
    pub segment_counter: u64,
    pub segments: Vec<SegmentInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IndexMetadata {
    pub fn new() -> Self {
        let now = Utc::now();
        IndexMetadata {
            format_version: FORMAT_VERSION,
            generation: 0,
            segment_counter: 0,
            segments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn exists(storage: &dyn Storage) -> bool {
        storage.file_exists(METADATA_FILE)
    }

    /// Load the latest commit point, or `None` if the directory holds none.
    pub fn load(storage: &dyn Storage) -> Result<Option<Self>> {
        if !Self::exists(storage) {
            return Ok(None);
        }
        let bytes = storage.read_all(METADATA_FILE)?;
        let metadata: IndexMetadata = serde_json::from_slice(&bytes)?;
        if metadata.format_version != FORMAT_VERSION {
            return Err(NotedexError::corrupt(format!(
                "Unsupported index format version {}",
                metadata.format_version
            )));
        }
        Ok(Some(metadata))
    }

    /// Write this commit point via temp file and rename.
    pub fn store(&self, storage: &dyn Storage) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        let mut output = storage.create_output(METADATA_TMP_FILE)?;
        output.write_all(&json)?;
        output.close()?;
        storage.rename_file(METADATA_TMP_FILE, METADATA_FILE)
    }

    /// Reserve the next segment name.
    pub fn next_segment_name(&mut self) -> String {
        let name = format!("_{}", radix36(self.segment_counter));
        self.segment_counter += 1;
        name
    }

    pub fn max_doc(&self) -> u64 {
        self.segments.iter().map(|s| s.doc_count as u64).sum()
    }

    pub fn num_docs(&self) -> u64 {
        self.segments.iter().map(|s| s.live_count() as u64).sum()
    }

    /// Files referenced by this commit point, the commit point included.
    pub fn referenced_files(&self) -> Vec<String> {
        let mut files = vec![METADATA_FILE.to_string()];
        for segment in &self.segments {
            files.extend(segment.files());
        }
        files
    }
}

impl Default for IndexMetadata {
    fn default() -> Self {
        Self::new()
    }
}

fn radix36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
