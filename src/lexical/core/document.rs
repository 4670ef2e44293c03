//! Documents: ordered lists of fields.

use serde::{Deserialize, Serialize};

use crate::lexical::core::field::{Field, Indexing};

/// An ordered list of fields. Field names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    fields: Vec<Field>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }

    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.add_field(field);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Value of the first field named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Values of every field named `name`, in document order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.name == name)
            .map(|f| f.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Only the fields that are kept in the stored-fields file.
    pub fn stored_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.stored)
    }
}

/// Fluent construction of a [`Document`].
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        DocumentBuilder::default()
    }

    pub fn add_text<S: Into<String>, T: Into<String>>(mut self, name: S, value: T) -> Self {
        self.document.add_field(Field::text(name, value));
        self
    }

    pub fn add_keyword<S: Into<String>, T: Into<String>>(mut self, name: S, value: T) -> Self {
        self.document.add_field(Field::keyword(name, value));
        self
    }

    pub fn add_stored<S: Into<String>, T: Into<String>>(mut self, name: S, value: T) -> Self {
        self.document.add_field(Field::stored(name, value));
        self
    }

    pub fn add_field<S: Into<String>, T: Into<String>>(
        mut self,
        name: S,
        value: T,
        stored: bool,
        indexing: Indexing,
    ) -> Self {
        self.document
            .add_field(Field::new(name, value, stored, indexing));
        self
    }

    pub fn build(self) -> Document {
        self.document
    }
}
