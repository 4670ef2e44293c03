//! Term dictionary backed by an `fst` map.
//!
//! Keys are `field\0term` byte strings (see [`crate::lexical::core::term`]),
//! values are term ordinals indexing a table of [`TermInfo`].

use std::ops::Bound;

use fst::automaton::{Automaton, Str};
use fst::{IntoStreamer, Map, MapBuilder, Streamer};

use crate::error::{NotedexError, Result};
use crate::lexical::core::term::{Term, encode_key, field_prefix};
use crate::storage::structured::{StructReader, StructWriter};

/// Statistics and postings location of one term within a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermInfo {
    /// Number of documents containing the term, deleted ones included.
    pub doc_freq: u32,
    pub total_term_freq: u64,
    /// Offset of the encoded posting list in the postings file.
    pub postings_offset: u64,
    pub postings_len: u64,
}

/// Collects terms in sorted order and produces a [`TermDictionary`].
pub struct TermDictionaryBuilder {
    builder: MapBuilder<Vec<u8>>,
    infos: Vec<TermInfo>,
}

impl std::fmt::Debug for TermDictionaryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermDictionaryBuilder")
            .field("terms", &self.infos.len())
            .finish()
    }
}

impl TermDictionaryBuilder {
    pub fn new() -> Self {
        TermDictionaryBuilder {
            builder: MapBuilder::memory(),
            infos: Vec::new(),
        }
    }

    /// Keys must be inserted in strictly ascending byte order.
    pub fn insert(&mut self, key: &[u8], info: TermInfo) -> Result<()> {
        self.builder.insert(key, self.infos.len() as u64)?;
        self.infos.push(info);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn finish(self) -> Result<TermDictionary> {
        let bytes = self.builder.into_inner()?;
        Ok(TermDictionary {
            map: Map::new(bytes)?,
            infos: self.infos,
        })
    }
}

impl Default for TermDictionaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable term dictionary of a segment.
pub struct TermDictionary {
    map: Map<Vec<u8>>,
    infos: Vec<TermInfo>,
}

impl std::fmt::Debug for TermDictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermDictionary")
            .field("terms", &self.infos.len())
            .finish()
    }
}

impl TermDictionary {
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn get(&self, term: &Term) -> Option<TermInfo> {
        self.get_key(&term.to_key())
    }

    pub fn get_key(&self, key: &[u8]) -> Option<TermInfo> {
        let ordinal = self.map.get(key)?;
        self.infos.get(ordinal as usize).copied()
    }

    /// Terms of `field` whose text starts with `prefix`, in byte order.
    pub fn terms_with_prefix(&self, field: &str, prefix: &str) -> Result<Vec<(Term, TermInfo)>> {
        let key_prefix = String::from_utf8(encode_key(field, prefix))
            .map_err(|e| NotedexError::invalid_argument(format!("Invalid term prefix: {e}")))?;
        let automaton = Str::new(&key_prefix).starts_with();
        let mut stream = self.map.search(automaton).into_stream();

        let mut terms = Vec::new();
        while let Some((key, ordinal)) = stream.next() {
            let info = self.info_at(ordinal)?;
            terms.push((Term::from_key(key)?, info));
        }
        Ok(terms)
    }

    /// Terms of `field` whose text lies between `lower` and `upper`, in byte order.
    pub fn terms_in_range(
        &self,
        field: &str,
        lower: Bound<&str>,
        upper: Bound<&str>,
    ) -> Result<Vec<(Term, TermInfo)>> {
        let prefix = field_prefix(field);
        let range = self.map.range();
        let range = match lower {
            Bound::Included(text) => range.ge(encode_key(field, text)),
            Bound::Excluded(text) => range.gt(encode_key(field, text)),
            Bound::Unbounded => range.ge(&prefix),
        };
        let range = match upper {
            Bound::Included(text) => range.le(encode_key(field, text)),
            Bound::Excluded(text) => range.lt(encode_key(field, text)),
            Bound::Unbounded => range,
        };

        let mut stream = range.into_stream();
        let mut terms = Vec::new();
        while let Some((key, ordinal)) = stream.next() {
            if !key.starts_with(&prefix) {
                break;
            }
            terms.push((Term::from_key(key)?, self.info_at(ordinal)?));
        }
        Ok(terms)
    }

    /// Every term of `field`, in byte order.
    pub fn field_terms(&self, field: &str) -> Result<Vec<(Term, TermInfo)>> {
        let prefix = field_prefix(field);
        let mut stream = self.map.range().ge(&prefix).into_stream();

        let mut terms = Vec::new();
        while let Some((key, ordinal)) = stream.next() {
            if !key.starts_with(&prefix) {
                break;
            }
            terms.push((Term::from_key(key)?, self.info_at(ordinal)?));
        }
        Ok(terms)
    }

    /// Every term of the segment, in key order.
    pub fn all_terms(&self) -> Result<Vec<(Term, TermInfo)>> {
        let mut stream = self.map.stream();
        let mut terms = Vec::with_capacity(self.infos.len());
        while let Some((key, ordinal)) = stream.next() {
            terms.push((Term::from_key(key)?, self.info_at(ordinal)?));
        }
        Ok(terms)
    }

    fn info_at(&self, ordinal: u64) -> Result<TermInfo> {
        self.infos.get(ordinal as usize).copied().ok_or_else(|| {
            NotedexError::corrupt(format!("Term ordinal {ordinal} out of range"))
        })
    }

    pub fn write(&self, writer: &mut StructWriter) -> Result<()> {
        writer.write_bytes(self.map.as_fst().as_bytes())?;
        writer.write_varint(self.infos.len() as u64)?;
        for info in &self.infos {
            writer.write_varint(info.doc_freq as u64)?;
            writer.write_varint(info.total_term_freq)?;
            writer.write_varint(info.postings_offset)?;
            writer.write_varint(info.postings_len)?;
        }
        Ok(())
    }

    pub fn read(reader: &mut StructReader) -> Result<Self> {
        let map = Map::new(reader.read_bytes()?)?;
        let count = reader.read_varint()? as usize;
        if count != map.len() {
            return Err(NotedexError::corrupt(format!(
                "{}: {} term infos for {} terms",
                reader.name(),
                count,
                map.len()
            )));
        }

        let mut infos = Vec::with_capacity(count);
        for _ in 0..count {
            infos.push(TermInfo {
                doc_freq: reader.read_varint()? as u32,
                total_term_freq: reader.read_varint()?,
                postings_offset: reader.read_varint()?,
                postings_len: reader.read_varint()?,
            });
        }
        Ok(TermDictionary { map, infos })
    }
}
