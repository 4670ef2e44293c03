//! Segments: immutable units of the index.
//!
//! A [`SegmentBuilder`] inverts documents in memory. [`write_segment`] turns
//! it into four checksummed files:
//!
//! - `.dict`: fst term dictionary plus term-info table
//! - `.post`: encoded posting lists
//! - `.docs`: stored fields
//! - `.lens`: per-field token counts, used for length normalization
//!
//! [`SegmentCore`] loads those files back into memory.

use ahash::{AHashMap, AHashSet};
use log::debug;

use crate::analysis::Analyzer;
use crate::error::{NotedexError, Result};
use crate::lexical::core::document::Document;
use crate::lexical::core::field::{Field, Indexing};
use crate::lexical::core::term::{FIELD_SEPARATOR, Term, encode_key};
use crate::lexical::index::dictionary::{TermDictionary, TermDictionaryBuilder, TermInfo};
use crate::lexical::index::metadata::{
    DICT_EXT, DOCS_EXT, LENGTHS_EXT, POSTINGS_EXT, SegmentInfo,
};
use crate::lexical::index::posting::{Posting, decode_postings, encode_postings, push_position};
use crate::storage::Storage;
use crate::storage::structured::{StructReader, StructWriter};

const DICT_MAGIC: u32 = 0x44494354; // "DICT"
const POSTINGS_MAGIC: u32 = 0x504F5354; // "POST"
const DOCS_MAGIC: u32 = 0x444F4353; // "DOCS"
const LENGTHS_MAGIC: u32 = 0x4C454E53; // "LENS"
const SEGMENT_VERSION: u32 = 1;

/// Indexed terms of one field value of an analyzed document.
#[derive(Debug, Clone)]
pub struct AnalyzedField {
    pub name: String,
    /// `(term, position)` pairs in position order.
    pub terms: Vec<(String, u32)>,
}

/// A document after analysis, ready to be inverted.
#[derive(Debug, Clone)]
pub struct AnalyzedDocument {
    pub stored: Document,
    pub fields: Vec<AnalyzedField>,
}

impl AnalyzedDocument {
    /// Analyze every indexed field of `doc`.
    ///
    /// Repeated values of one field continue the position sequence of the
    /// previous value.
    pub fn analyze(doc: &Document, analyzer: &dyn Analyzer) -> Result<Self> {
        let mut stored = Document::new();
        let mut fields = Vec::with_capacity(doc.len());
        let mut next_position: AHashMap<&str, u32> = AHashMap::new();

        for field in doc.fields() {
            if field.name.is_empty() || field.name.as_bytes().contains(&FIELD_SEPARATOR) {
                return Err(NotedexError::invalid_argument(format!(
                    "Invalid field name: {:?}",
                    field.name
                )));
            }
            if field.stored {
                stored.add_field(field.clone());
            }

            let base = next_position.get(field.name.as_str()).copied().unwrap_or(0);
            let terms: Vec<(String, u32)> = match field.indexing {
                Indexing::No => continue,
                // The empty string is a term too, so an empty id can be deleted.
                Indexing::NotAnalyzed => vec![(field.value.clone(), base)],
                Indexing::Analyzed => analyzer
                    .analyze_field(&field.name, &field.value)?
                    .map(|token| (token.text, base + token.position))
                    .collect(),
            };

            if let Some(&(_, last)) = terms.last() {
                next_position.insert(field.name.as_str(), last + 1);
            }
            fields.push(AnalyzedField {
                name: field.name.clone(),
                terms,
            });
        }

        Ok(AnalyzedDocument { stored, fields })
    }
}

/// In-memory inverted index of buffered documents.
#[derive(Debug, Default)]
pub struct SegmentBuilder {
    doc_count: u32,
    stored: Vec<Document>,
    lengths: AHashMap<String, Vec<u32>>,
    postings: AHashMap<Vec<u8>, Vec<Posting>>,
    deleted: AHashSet<u32>,
}

impl SegmentBuilder {
    pub fn new() -> Self {
        SegmentBuilder::default()
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    pub fn is_empty(&self) -> bool {
        self.doc_count == 0
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    /// Invert an analyzed document and return its segment-local id.
    pub fn add_document(&mut self, doc: AnalyzedDocument) -> u32 {
        let doc_id = self.doc_count;
        self.doc_count += 1;
        self.stored.push(doc.stored);

        for field in doc.fields {
            self.add_length(&field.name, doc_id, field.terms.len() as u32);
            for (text, position) in field.terms {
                let key = encode_key(&field.name, &text);
                push_position(self.postings.entry(key).or_default(), doc_id, position);
            }
        }
        doc_id
    }

    /// Delete every buffered document containing `term`. Returns how many
    /// were live.
    pub fn delete_term(&mut self, term: &Term) -> u32 {
        let Some(postings) = self.postings.get(&term.to_key()) else {
            return 0;
        };
        let mut count = 0;
        for posting in postings {
            if self.deleted.insert(posting.doc_id) {
                count += 1;
            }
        }
        count
    }

    pub fn deleted_docs(&self) -> impl Iterator<Item = u32> + '_ {
        self.deleted.iter().copied()
    }

    pub fn num_deleted(&self) -> u32 {
        self.deleted.len() as u32
    }

    pub(crate) fn append_document(&mut self, stored: Document, lengths: &[(String, u32)]) -> u32 {
        let doc_id = self.doc_count;
        self.doc_count += 1;
        self.stored.push(stored);
        for (field, length) in lengths {
            self.add_length(field, doc_id, *length);
        }
        doc_id
    }

    /// Postings must arrive in ascending doc id order per key.
    pub(crate) fn push_posting(&mut self, key: &[u8], posting: Posting) {
        match self.postings.get_mut(key) {
            Some(list) => list.push(posting),
            None => {
                self.postings.insert(key.to_vec(), vec![posting]);
            }
        }
    }

    fn add_length(&mut self, field: &str, doc_id: u32, length: u32) {
        let lengths = self.lengths.entry(field.to_string()).or_default();
        if lengths.len() <= doc_id as usize {
            lengths.resize(doc_id as usize + 1, 0);
        }
        lengths[doc_id as usize] += length;
    }
}

/// Write `builder` as segment `name` and return its info.
pub fn write_segment(storage: &dyn Storage, name: &str, builder: &SegmentBuilder) -> Result<SegmentInfo> {
    let info = SegmentInfo::new(name, builder.doc_count);

    let mut keys: Vec<&Vec<u8>> = builder.postings.keys().collect();
    keys.sort_unstable();

    let mut postings_writer = StructWriter::new(storage.create_output(&info.file_name(POSTINGS_EXT))?);
    postings_writer.write_u32(POSTINGS_MAGIC)?;
    postings_writer.write_u32(SEGMENT_VERSION)?;

    let mut dict_builder = TermDictionaryBuilder::new();
    let mut encoded = Vec::new();
    for key in keys {
        let postings = &builder.postings[key];
        encoded.clear();
        encode_postings(postings, &mut encoded);

        let term_info = TermInfo {
            doc_freq: postings.len() as u32,
            total_term_freq: postings.iter().map(|p| p.freq() as u64).sum(),
            postings_offset: postings_writer.position(),
            postings_len: encoded.len() as u64,
        };
        postings_writer.write_raw(&encoded)?;
        dict_builder.insert(key, term_info)?;
    }
    postings_writer.close()?;

    let dictionary = dict_builder.finish()?;
    let mut dict_writer = StructWriter::new(storage.create_output(&info.file_name(DICT_EXT))?);
    dict_writer.write_u32(DICT_MAGIC)?;
    dict_writer.write_u32(SEGMENT_VERSION)?;
    dictionary.write(&mut dict_writer)?;
    dict_writer.close()?;

    let mut docs_writer = StructWriter::new(storage.create_output(&info.file_name(DOCS_EXT))?);
    docs_writer.write_u32(DOCS_MAGIC)?;
    docs_writer.write_u32(SEGMENT_VERSION)?;
    docs_writer.write_varint(builder.stored.len() as u64)?;
    for doc in &builder.stored {
        docs_writer.write_varint(doc.len() as u64)?;
        for field in doc.fields() {
            docs_writer.write_string(&field.name)?;
            docs_writer.write_u8(field.indexing.to_code())?;
            docs_writer.write_string(&field.value)?;
        }
    }
    docs_writer.close()?;

    let mut fields: Vec<&String> = builder.lengths.keys().collect();
    fields.sort_unstable();
    let mut lens_writer = StructWriter::new(storage.create_output(&info.file_name(LENGTHS_EXT))?);
    lens_writer.write_u32(LENGTHS_MAGIC)?;
    lens_writer.write_u32(SEGMENT_VERSION)?;
    lens_writer.write_varint(builder.doc_count as u64)?;
    lens_writer.write_varint(fields.len() as u64)?;
    for field in fields {
        let lengths = &builder.lengths[field];
        lens_writer.write_string(field)?;
        for doc_id in 0..builder.doc_count as usize {
            lens_writer.write_varint(lengths.get(doc_id).copied().unwrap_or(0) as u64)?;
        }
    }
    lens_writer.close()?;

    debug!(
        "Wrote segment {name}: {} docs, {} terms",
        builder.doc_count,
        dictionary.len()
    );
    Ok(info)
}

/// Per-field length statistics of a segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldStats {
    /// Sum of the field's token counts over all documents.
    pub total_length: u64,
    /// Documents with at least one token in the field.
    pub doc_count: u64,
}

/// The immutable contents of a segment, loaded into memory.
#[derive(Debug)]
pub struct SegmentCore {
    name: String,
    doc_count: u32,
    dictionary: TermDictionary,
    postings: Vec<u8>,
    stored: Vec<Document>,
    lengths: AHashMap<String, Vec<u32>>,
}

impl SegmentCore {
    pub fn load(storage: &dyn Storage, info: &SegmentInfo) -> Result<Self> {
        let mut dict_reader = open_checked(storage, &info.file_name(DICT_EXT), DICT_MAGIC)?;
        let dictionary = TermDictionary::read(&mut dict_reader)?;

        let postings = open_checked(storage, &info.file_name(POSTINGS_EXT), POSTINGS_MAGIC)?
            .into_inner();

        let mut docs_reader = open_checked(storage, &info.file_name(DOCS_EXT), DOCS_MAGIC)?;
        let stored_count = docs_reader.read_varint()? as u32;
        if stored_count != info.doc_count {
            return Err(NotedexError::corrupt(format!(
                "{}: {stored_count} stored documents, expected {}",
                docs_reader.name(),
                info.doc_count
            )));
        }
        let mut stored = Vec::with_capacity(stored_count as usize);
        for _ in 0..stored_count {
            let field_count = docs_reader.read_varint()?;
            let mut doc = Document::new();
            for _ in 0..field_count {
                let name = docs_reader.read_string()?;
                let indexing = Indexing::from_code(docs_reader.read_u8()?)?;
                let value = docs_reader.read_string()?;
                doc.add_field(Field::new(name, value, true, indexing));
            }
            stored.push(doc);
        }

        let mut lens_reader = open_checked(storage, &info.file_name(LENGTHS_EXT), LENGTHS_MAGIC)?;
        let lens_docs = lens_reader.read_varint()? as u32;
        if lens_docs != info.doc_count {
            return Err(NotedexError::corrupt(format!(
                "{}: lengths for {lens_docs} documents, expected {}",
                lens_reader.name(),
                info.doc_count
            )));
        }
        let field_count = lens_reader.read_varint()?;
        let mut lengths = AHashMap::new();
        for _ in 0..field_count {
            let field = lens_reader.read_string()?;
            let mut values = Vec::with_capacity(lens_docs as usize);
            for _ in 0..lens_docs {
                values.push(lens_reader.read_varint()? as u32);
            }
            lengths.insert(field, values);
        }

        Ok(SegmentCore {
            name: info.name.clone(),
            doc_count: info.doc_count,
            dictionary,
            postings,
            stored,
            lengths,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    pub fn dictionary(&self) -> &TermDictionary {
        &self.dictionary
    }

    pub fn term_info(&self, term: &Term) -> Option<TermInfo> {
        self.dictionary.get(term)
    }

    /// Decode the posting list described by `info`.
    pub fn postings_for(&self, info: &TermInfo) -> Result<Vec<Posting>> {
        let start = info.postings_offset as usize;
        let end = start
            .checked_add(info.postings_len as usize)
            .filter(|&end| end <= self.postings.len())
            .ok_or_else(|| {
                NotedexError::corrupt(format!(
                    "{}: posting list out of bounds ({start}+{})",
                    self.name, info.postings_len
                ))
            })?;
        decode_postings(&self.postings[start..end])
    }

    /// Postings of `term`, empty if the segment lacks it.
    pub fn postings(&self, term: &Term) -> Result<Vec<Posting>> {
        match self.dictionary.get(term) {
            Some(info) => self.postings_for(&info),
            None => Ok(Vec::new()),
        }
    }

    pub fn document(&self, doc_id: u32) -> Option<&Document> {
        self.stored.get(doc_id as usize)
    }

    pub fn field_length(&self, field: &str, doc_id: u32) -> u32 {
        self.lengths
            .get(field)
            .and_then(|lengths| lengths.get(doc_id as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Token counts of every field of `doc_id`, fields with no tokens skipped.
    pub fn field_lengths_of(&self, doc_id: u32) -> Vec<(String, u32)> {
        let mut lengths: Vec<(String, u32)> = self
            .lengths
            .iter()
            .filter_map(|(field, values)| {
                let length = values.get(doc_id as usize).copied().unwrap_or(0);
                (length > 0).then(|| (field.clone(), length))
            })
            .collect();
        lengths.sort();
        lengths
    }

    pub fn field_stats(&self, field: &str) -> FieldStats {
        match self.lengths.get(field) {
            Some(lengths) => FieldStats {
                total_length: lengths.iter().map(|&l| l as u64).sum(),
                doc_count: lengths.iter().filter(|&&l| l > 0).count() as u64,
            },
            None => FieldStats::default(),
        }
    }
}

fn open_checked(storage: &dyn Storage, name: &str, magic: u32) -> Result<StructReader> {
    let mut reader = StructReader::open(storage, name)?;
    if reader.read_u32()? != magic {
        return Err(NotedexError::corrupt(format!("{name}: bad file header")));
    }
    let version = reader.read_u32()?;
    if version != SEGMENT_VERSION {
        return Err(NotedexError::corrupt(format!(
            "{name}: unsupported segment version {version}"
        )));
    }
    Ok(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StandardAnalyzer;
    use crate::storage::memory::{MemoryStorage, MemoryStorageConfig};

    fn analyzed(id: &str, body: &str) -> AnalyzedDocument {
        let doc = Document::builder()
            .add_keyword("id", id)
            .add_text("postBody", body)
            .build();
        AnalyzedDocument::analyze(&doc, &StandardAnalyzer::new()).unwrap()
    }

    #[test]
    fn test_analyze_document() {
        let doc = analyzed("p1", "The weekly sync");
        assert_eq!(doc.stored.get("id"), Some("p1"));
        assert_eq!(doc.fields[0].terms, vec![("p1".to_string(), 0)]);
        assert_eq!(
            doc.fields[1].terms,
            vec![("weekly".to_string(), 1), ("sync".to_string(), 2)]
        );
    }

    #[test]
    fn test_empty_keyword_is_indexed() {
        let doc = analyzed("", "orphan page");
        assert_eq!(doc.fields[0].terms, vec![(String::new(), 0)]);

        let mut builder = SegmentBuilder::new();
        builder.add_document(doc);
        builder.add_document(analyzed("p2", "other page"));
        assert_eq!(builder.delete_term(&Term::new("id", "")), 1);
    }

    #[test]
    fn test_repeated_field_positions_continue() {
        let doc = Document::builder()
            .add_text("tag", "alpha beta")
            .add_text("tag", "gamma")
            .build();
        let analyzed = AnalyzedDocument::analyze(&doc, &StandardAnalyzer::new()).unwrap();
        assert_eq!(analyzed.fields[1].terms, vec![("gamma".to_string(), 2)]);
    }

    #[test]
    fn test_invalid_field_name() {
        let doc = Document::builder().add_text("bad\0name", "x").build();
        assert!(AnalyzedDocument::analyze(&doc, &StandardAnalyzer::new()).is_err());
    }

    #[test]
    fn test_builder_delete_term() {
        let mut builder = SegmentBuilder::new();
        builder.add_document(analyzed("p1", "alpha"));
        builder.add_document(analyzed("p2", "alpha beta"));
        builder.add_document(analyzed("p1", "gamma"));

        assert_eq!(builder.delete_term(&Term::new("id", "p1")), 2);
        assert_eq!(builder.delete_term(&Term::new("id", "p1")), 0);
        assert_eq!(builder.delete_term(&Term::new("id", "zzz")), 0);
        let mut deleted: Vec<u32> = builder.deleted_docs().collect();
        deleted.sort();
        assert_eq!(deleted, vec![0, 2]);
    }

    #[test]
    fn test_write_and_load() {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        let mut builder = SegmentBuilder::new();
        builder.add_document(analyzed("p1", "rust search engine"));
        builder.add_document(analyzed("p2", "search notes"));

        let info = write_segment(&storage, "_0", &builder).unwrap();
        assert_eq!(info.doc_count, 2);
        for file in info.files() {
            assert!(storage.file_exists(&file), "missing {file}");
        }

        let core = SegmentCore::load(&storage, &info).unwrap();
        let postings = core.postings(&Term::new("postBody", "search")).unwrap();
        assert_eq!(postings, vec![Posting::new(0, vec![1]), Posting::new(1, vec![0])]);
        assert!(core.postings(&Term::new("postBody", "missing")).unwrap().is_empty());

        assert_eq!(core.document(1).unwrap().get("id"), Some("p2"));
        assert_eq!(core.field_length("postBody", 0), 3);
        assert_eq!(
            core.field_stats("postBody"),
            FieldStats {
                total_length: 5,
                doc_count: 2
            }
        );
        assert_eq!(core.term_info(&Term::new("postBody", "search")).unwrap().doc_freq, 2);
    }

    #[test]
    fn test_corrupt_postings_detected() {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        let mut builder = SegmentBuilder::new();
        builder.add_document(analyzed("p1", "alpha"));
        let info = write_segment(&storage, "_0", &builder).unwrap();

        let mut bytes = storage.read_all("_0.post").unwrap();
        let last = bytes.len() - 5;
        bytes[last] ^= 0x01;
        storage.replace_file_bytes("_0.post", bytes);

        assert!(matches!(
            SegmentCore::load(&storage, &info),
            Err(NotedexError::Corrupt(_))
        ));
    }
}
