//! Inverted index: segments, commit points, writer and reader.

pub mod deletion;
pub mod dictionary;
pub mod merge;
pub mod metadata;
pub mod posting;
pub mod reader;
pub mod segment;
pub mod writer;

pub use metadata::{IndexMetadata, SegmentInfo};
pub use reader::IndexReader;
pub use writer::{IndexWriter, IndexWriterConfig, OpenMode, WriterStats};
