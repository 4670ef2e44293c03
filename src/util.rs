//! Shared utility modules used across notedex components.

pub mod levenshtein;
pub mod varint;
