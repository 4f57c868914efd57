//! Result types of a multipart/form-data parse.

use std::collections::HashMap;
use std::collections::hash_map;

use serde::Serialize;

use crate::protocol::FormError;

/// The terminal artifact of a form parse: either every field, or the error that stopped it.
pub type ParseResult = Result<FormFields, FormError>;

/// A file part whose bytes were streamed to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    pub file_name: String,
    pub content_type: Option<String>,
    pub byte_count: u64,
}

/// The value of one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    File(FileDescriptor),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileDescriptor> {
        match self {
            FieldValue::Text(_) => None,
            FieldValue::File(file) => Some(file),
        }
    }
}

/// Form fields keyed by field name. A repeated name keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormFields {
    inner: HashMap<String, FieldValue>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: String, value: FieldValue) -> Option<FieldValue> {
        self.inner.insert(name, value)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.inner.get(name)
    }

    /// Returns the value of a text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// Returns the descriptor of a file field.
    pub fn file(&self, name: &str) -> Option<&FileDescriptor> {
        self.get(name).and_then(FieldValue::as_file)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, FieldValue> {
        self.inner.iter()
    }
}

impl<'a> IntoIterator for &'a FormFields {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = hash_map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<(String, FieldValue)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self { inner: iter.into_iter().collect() }
    }
}
