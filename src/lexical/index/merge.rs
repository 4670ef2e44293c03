//! Segment merging.
//!
//! Merging copies the live documents of several segments, in segment order,
//! into one new segment. Deleted documents and terms that only they used are
//! dropped, and document ids are renumbered densely.

use log::debug;

use crate::error::{NotedexError, Result};
use crate::lexical::index::deletion::LiveDocs;
use crate::lexical::index::metadata::SegmentInfo;
use crate::lexical::index::posting::Posting;
use crate::lexical::index::segment::{SegmentBuilder, SegmentCore, write_segment};
use crate::storage::Storage;

/// A segment taking part in a merge.
#[derive(Debug, Clone, Copy)]
pub struct MergeSource<'a> {
    pub core: &'a SegmentCore,
    pub live_docs: &'a LiveDocs,
}

/// Merge `sources` into a new segment `name`.
///
/// Returns `None` when no source has a live document; nothing is written then.
pub fn merge_segments(
    storage: &dyn Storage,
    sources: &[MergeSource<'_>],
    name: &str,
) -> Result<Option<SegmentInfo>> {
    let mut builder = SegmentBuilder::new();

    for source in sources {
        let core = source.core;
        let mut doc_map: Vec<Option<u32>> = vec![None; core.doc_count() as usize];

        for local in source.live_docs.live_ids() {
            let stored = core.document(local).cloned().ok_or_else(|| {
                NotedexError::corrupt(format!(
                    "Segment {}: no stored fields for document {local}",
                    core.name()
                ))
            })?;
            let lengths = core.field_lengths_of(local);
            doc_map[local as usize] = Some(builder.append_document(stored, &lengths));
        }

        for (term, info) in core.dictionary().all_terms()? {
            let key = term.to_key();
            for posting in core.postings_for(&info)? {
                if let Some(Some(new_id)) = doc_map.get(posting.doc_id as usize) {
                    builder.push_posting(&key, Posting::new(*new_id, posting.positions));
                }
            }
        }
    }

    if builder.is_empty() {
        debug!("Merge into {name} skipped: no live documents");
        return Ok(None);
    }

    let info = write_segment(storage, name, &builder)?;
    debug!(
        "Merged {} segments into {name} ({} docs)",
        sources.len(),
        info.doc_count
    );
    Ok(Some(info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StandardAnalyzer;
    use crate::lexical::core::document::Document;
    use crate::lexical::core::term::Term;
    use crate::lexical::index::segment::AnalyzedDocument;
    use crate::storage::memory::{MemoryStorage, MemoryStorageConfig};

    fn segment(storage: &MemoryStorage, name: &str, docs: &[(&str, &str)]) -> SegmentCore {
        let analyzer = StandardAnalyzer::new();
        let mut builder = SegmentBuilder::new();
        for (id, body) in docs {
            let doc = Document::builder()
                .add_keyword("id", *id)
                .add_text("postBody", *body)
                .build();
            builder.add_document(AnalyzedDocument::analyze(&doc, &analyzer).unwrap());
        }
        let info = write_segment(storage, name, &builder).unwrap();
        SegmentCore::load(storage, &info).unwrap()
    }

    #[test]
    fn test_merge_drops_deleted_and_renumbers() {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        let first = segment(&storage, "_0", &[("a", "alpha beta"), ("b", "beta")]);
        let second = segment(&storage, "_1", &[("c", "beta gamma")]);

        let mut first_live = LiveDocs::all_live(2);
        first_live.delete(0);
        let second_live = LiveDocs::all_live(1);

        let info = merge_segments(
            &storage,
            &[
                MergeSource {
                    core: &first,
                    live_docs: &first_live,
                },
                MergeSource {
                    core: &second,
                    live_docs: &second_live,
                },
            ],
            "_2",
        )
        .unwrap()
        .unwrap();
        assert_eq!(info.doc_count, 2);

        let merged = SegmentCore::load(&storage, &info).unwrap();
        assert_eq!(merged.document(0).unwrap().get("id"), Some("b"));
        assert_eq!(merged.document(1).unwrap().get("id"), Some("c"));
        assert!(merged.term_info(&Term::new("postBody", "alpha")).is_none());
        assert!(merged.term_info(&Term::new("id", "a")).is_none());

        let beta = merged.postings(&Term::new("postBody", "beta")).unwrap();
        assert_eq!(beta, vec![Posting::new(0, vec![0]), Posting::new(1, vec![0])]);
        assert_eq!(merged.field_length("postBody", 1), 2);
    }

    #[test]
    fn test_merge_of_deleted_only_segment() {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        let core = segment(&storage, "_0", &[("a", "alpha")]);
        let mut live = LiveDocs::all_live(1);
        live.delete(0);

        let merged = merge_segments(
            &storage,
            &[MergeSource {
                core: &core,
                live_docs: &live,
            }],
            "_1",
        )
        .unwrap();
        assert!(merged.is_none());
        assert!(!storage.file_exists("_1.dict"));
    }
}
