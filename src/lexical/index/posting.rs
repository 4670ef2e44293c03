//! Postings: per-term lists of documents with term positions.
//!
//! Encoded layout of one posting list, all values varints:
//!
//! ```text
//! count
//! repeat count times:
//!   doc_delta  freq  pos_delta * freq
//! ```
//!
//! Doc ids and positions are delta-encoded against the previous value in the
//! same list (the first against zero).

use crate::error::{NotedexError, Result};
use crate::util::varint;

/// One document's entry in a posting list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// Segment-local document id.
    pub doc_id: u32,
    /// Ascending token positions of the term in the field.
    pub positions: Vec<u32>,
}

impl Posting {
    pub fn new(doc_id: u32, positions: Vec<u32>) -> Self {
        Posting { doc_id, positions }
    }

    pub fn freq(&self) -> u32 {
        self.positions.len() as u32
    }
}

/// Append `position` for `doc_id` to a list being built in doc order.
pub fn push_position(postings: &mut Vec<Posting>, doc_id: u32, position: u32) {
    match postings.last_mut() {
        Some(last) if last.doc_id == doc_id => last.positions.push(position),
        _ => postings.push(Posting::new(doc_id, vec![position])),
    }
}

pub fn encode_postings(postings: &[Posting], out: &mut Vec<u8>) {
    varint::encode_u64_into(postings.len() as u64, out);
    let mut last_doc = 0u32;
    for posting in postings {
        varint::encode_u64_into((posting.doc_id - last_doc) as u64, out);
        last_doc = posting.doc_id;

        varint::encode_u64_into(posting.positions.len() as u64, out);
        let mut last_pos = 0u32;
        for &pos in &posting.positions {
            varint::encode_u64_into((pos - last_pos) as u64, out);
            last_pos = pos;
        }
    }
}

pub fn decode_postings(data: &[u8]) -> Result<Vec<Posting>> {
    let mut offset = 0usize;
    let mut next = |data: &[u8]| -> Result<u32> {
        let (value, consumed) = varint::decode_u64(&data[offset.min(data.len())..])?;
        offset += consumed;
        u32::try_from(value)
            .map_err(|_| NotedexError::corrupt(format!("Posting value {value} out of range")))
    };

    let count = next(data)? as usize;
    let mut postings = Vec::with_capacity(count);
    let mut doc_id = 0u32;
    for _ in 0..count {
        doc_id = doc_id
            .checked_add(next(data)?)
            .ok_or_else(|| NotedexError::corrupt("Posting doc id overflow"))?;
        let freq = next(data)? as usize;
        let mut positions = Vec::with_capacity(freq);
        let mut pos = 0u32;
        for _ in 0..freq {
            pos = pos
                .checked_add(next(data)?)
                .ok_or_else(|| NotedexError::corrupt("Posting position overflow"))?;
            positions.push(pos);
        }
        postings.push(Posting::new(doc_id, positions));
    }
    Ok(postings)
}
