//! Enumerations
//!
//! An [`Enum`] is an ordered, append-only list of string labels. A label's
//! index is its insertion position and is what goes on the wire, so labels
//! are never removed or reordered once assigned.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{PicobufError, Result};

#[derive(Debug, Default)]
struct Labels {
    values: Vec<String>,
    index: HashMap<String, usize>,
}

/// A named, append-only set of labels with index lookup in both directions
#[derive(Debug)]
pub struct Enum {
    name: String,
    labels: RwLock<Labels>,
}

impl Enum {
    /// Create an enum from its initial labels. Duplicate labels are rejected.
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let mut labels = Labels::default();
        for value in values {
            let value = value.into();
            if labels.index.contains_key(&value) {
                return Err(PicobufError::DuplicateEnumValue { name, value });
            }
            labels.index.insert(value.clone(), labels.values.len());
            labels.values.push(value);
        }
        Ok(Self {
            name,
            labels: RwLock::new(labels),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the labels in index order
    pub fn values(&self) -> Vec<String> {
        self.labels.read().values.clone()
    }

    pub fn len(&self) -> usize {
        self.labels.read().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_value(&self, value: &str) -> bool {
        self.labels.read().index.contains_key(value)
    }

    /// Index of a label
    pub fn get_index(&self, value: &str) -> Option<usize> {
        self.labels.read().index.get(value).copied()
    }

    /// Label at an index
    pub fn get_value(&self, index: usize) -> Option<String> {
        self.labels.read().values.get(index).cloned()
    }

    /// Look up a label by name, failing if the enum does not contain it
    pub fn label(&self, value: &str) -> Result<String> {
        if self.has_value(value) {
            Ok(value.to_string())
        } else {
            Err(PicobufError::UnknownEnumLabel(value.to_string()))
        }
    }

    /// Append a label, returning its new index
    pub fn add_value(&self, value: impl Into<String>) -> Result<usize> {
        let value = value.into();
        let mut labels = self.labels.write();
        if labels.index.contains_key(&value) {
            return Err(PicobufError::DuplicateEnumValue {
                name: self.name.clone(),
                value,
            });
        }
        let index = labels.values.len();
        labels.index.insert(value.clone(), index);
        labels.values.push(value);
        tracing::debug!(enum_name = %self.name, index, "appended enum label");
        Ok(index)
    }
}
