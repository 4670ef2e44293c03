//! Documents, fields and terms.

pub mod document;
pub mod field;
pub mod term;

pub use document::{Document, DocumentBuilder};
pub use field::{Field, Indexing};
pub use term::Term;
