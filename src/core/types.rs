use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field holding the full text of a file.
pub const CONTENT_FIELD: &str = "content";
/// Field holding the bare file name, indexed as a keyword.
pub const FILENAME_FIELD: &str = "filename";
/// Field holding the absolute file path, indexed as a keyword.
pub const FILEPATH_FIELD: &str = "filepath";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u64);

impl DocId {
    pub fn new(id: u64) -> Self {
        DocId(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for DocId {
    fn from(id: u64) -> Self {
        DocId(id)
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a field value reaches the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Run through the analyzer; searchable by its normalized tokens
    Text,
    /// Indexed verbatim as a single term; exact-match only
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub kind: FieldKind,
    pub stored: bool,
}

impl Field {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Field { name: name.into(), value: value.into(), kind: FieldKind::Text, stored: true }
    }

    pub fn keyword(name: impl Into<String>, value: impl Into<String>) -> Self {
        Field { name: name.into(), value: value.into(), kind: FieldKind::Keyword, stored: true }
    }

    pub fn unstored(mut self) -> Self {
        self.stored = false;
        self
    }
}

/// Stored field values of one document, keyed by field name.
pub type StoredFields = BTreeMap<String, String>;

/// An ordered set of named fields. Adding a field whose name already exists
/// replaces the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub fields: Vec<Field>,
}

impl Document {
    pub fn new() -> Self {
        Document { fields: Vec::new() }
    }

    pub fn add_field(&mut self, field: Field) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_field(Field::text(name, value));
        self
    }

    pub fn with_keyword(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_field(Field::keyword(name, value));
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn stored_fields(&self) -> StoredFields {
        self.fields.iter()
            .filter(|f| f.stored)
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_existing_field_replaces_value_in_place() {
        let doc = Document::new()
            .with_text("content", "first")
            .with_keyword("filename", "a.txt")
            .with_text("content", "second");

        assert_eq!(doc.fields.len(), 2);
        assert_eq!(doc.fields[0].name, "content");
        assert_eq!(doc.get_field("content").unwrap().value, "second");
    }

    #[test]
    fn unstored_fields_are_left_out_of_stored_map() {
        let mut doc = Document::new().with_text("content", "body");
        doc.add_field(Field::keyword("tag", "x").unstored());

        let stored = doc.stored_fields();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.get("content").map(String::as_str), Some("body"));
    }
}
