//! Per-segment live-docs bitmaps.
//!
//! Segments are never rewritten to record deletions. Instead each deletion
//! generation of a segment gets its own `<segment>_<gen>.del` file holding a
//! bitmap with one bit per document, set while the document is live.

use bit_vec::BitVec;

use crate::error::{NotedexError, Result};
use crate::storage::Storage;
use crate::storage::structured::{StructReader, StructWriter};

const LIVE_DOCS_MAGIC: u32 = 0x4C495645; // "LIVE"
const LIVE_DOCS_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveDocs {
    bits: BitVec,
    deleted: u32,
}

impl LiveDocs {
    /// Every document live.
    pub fn all_live(doc_count: u32) -> Self {
        LiveDocs {
            bits: BitVec::from_elem(doc_count as usize, true),
            deleted: 0,
        }
    }

    pub fn len(&self) -> u32 {
        self.bits.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn is_live(&self, doc_id: u32) -> bool {
        self.bits.get(doc_id as usize).unwrap_or(false)
    }

    /// Mark `doc_id` deleted. Returns `true` if it was live before.
    pub fn delete(&mut self, doc_id: u32) -> bool {
        if !self.is_live(doc_id) {
            return false;
        }
        self.bits.set(doc_id as usize, false);
        self.deleted += 1;
        true
    }

    pub fn num_deleted(&self) -> u32 {
        self.deleted
    }

    pub fn num_live(&self) -> u32 {
        self.len() - self.deleted
    }

    pub fn has_deletions(&self) -> bool {
        self.deleted > 0
    }

    /// Live document ids in ascending order.
    pub fn live_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, live)| *live)
            .map(|(doc_id, _)| doc_id as u32)
    }

    pub fn write(&self, storage: &dyn Storage, name: &str) -> Result<()> {
        let mut writer = StructWriter::new(storage.create_output(name)?);
        writer.write_u32(LIVE_DOCS_MAGIC)?;
        writer.write_u32(LIVE_DOCS_VERSION)?;
        writer.write_u32(self.len())?;
        writer.write_u32(self.deleted)?;
        writer.write_bytes(&self.bits.to_bytes())?;
        writer.close()
    }

    /// Load a bitmap and check it against the segment's document count.
    pub fn read(storage: &dyn Storage, name: &str, doc_count: u32) -> Result<Self> {
        let mut reader = StructReader::open(storage, name)?;
        if reader.read_u32()? != LIVE_DOCS_MAGIC {
            return Err(NotedexError::corrupt(format!("{name}: not a live-docs file")));
        }
        let version = reader.read_u32()?;
        if version != LIVE_DOCS_VERSION {
            return Err(NotedexError::corrupt(format!(
                "{name}: unsupported live-docs version {version}"
            )));
        }

        let len = reader.read_u32()?;
        let deleted = reader.read_u32()?;
        if len != doc_count {
            return Err(NotedexError::corrupt(format!(
                "{name}: bitmap covers {len} documents, segment has {doc_count}"
            )));
        }

        let mut bits = BitVec::from_bytes(&reader.read_bytes()?);
        if bits.len() < len as usize {
            return Err(NotedexError::corrupt(format!("{name}: bitmap too short")));
        }
        bits.truncate(len as usize);

        let live_docs = LiveDocs { bits, deleted };
        if live_docs.live_ids().count() as u32 != len - deleted {
            return Err(NotedexError::corrupt(format!(
                "{name}: deletion count does not match bitmap"
            )));
        }
        Ok(live_docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::{MemoryStorage, MemoryStorageConfig};

    #[test]
    fn test_delete() {
        let mut live = LiveDocs::all_live(4);
        assert!(live.delete(1));
        assert!(!live.delete(1));
        assert!(!live.delete(10));

        assert_eq!(live.num_deleted(), 1);
        assert_eq!(live.num_live(), 3);
        assert!(!live.is_live(1));
        assert_eq!(live.live_ids().collect::<Vec<_>>(), vec![0, 2, 3]);
    }

    #[test]
    fn test_write_read() {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        let mut live = LiveDocs::all_live(11);
        live.delete(0);
        live.delete(10);
        live.write(&storage, "_0_1.del").unwrap();

        let loaded = LiveDocs::read(&storage, "_0_1.del", 11).unwrap();
        assert_eq!(loaded, live);

        assert!(matches!(
            LiveDocs::read(&storage, "_0_1.del", 12),
            Err(NotedexError::Corrupt(_))
        ));
    }
}
