//! # Documents and write operations
//!
//! A [`Document`] is a path plus a flat map of top-level [`Fields`]. Field values
//! are plain JSON values; backends translate them to and from their own wire
//! representation.
//!
//! Writes are expressed as [`WriteOp`]s and grouped into atomic commits via
//! [`crate::DocumentStore::commit`]:
//!
//! | Op | Effect on an existing document | Effect on a missing document |
//! |----|-------------------------------|------------------------------|
//! | [`WriteOp::Merge`] | listed fields overwritten, others kept | created with the listed fields |
//! | [`WriteOp::DeleteFields`] | listed fields removed | commit fails with [`StoreError::NotFound`] |
//!
//! Merging never removes a field. Removing one always takes an explicit
//! [`WriteOp::DeleteFields`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::path::DocumentPath;

/// Top-level fields of a document.
pub type Fields = Map<String, Value>;

/// A document read from a collection snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub path: DocumentPath,
    pub fields: Fields,
}

impl Document {
    pub fn new(path: DocumentPath, fields: Fields) -> Self {
        Self { path, fields }
    }

    /// Document id (last path segment).
    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// True when the field is present, even if its value is `null`.
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

/// A single write inside a batch commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteOp {
    /// Set-with-merge of the given top-level fields.
    Merge {
        #[serde(with = "path_string")]
        path: DocumentPath,
        fields: Fields,
    },
    /// Remove the given top-level fields from an existing document.
    DeleteFields {
        #[serde(with = "path_string")]
        path: DocumentPath,
        fields: Vec<String>,
    },
}

impl WriteOp {
    pub fn merge(path: DocumentPath, fields: Fields) -> Self {
        Self::Merge { path, fields }
    }

    pub fn delete_fields<I, S>(path: DocumentPath, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::DeleteFields {
            path,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn path(&self) -> &DocumentPath {
        match self {
            Self::Merge { path, .. } | Self::DeleteFields { path, .. } => path,
        }
    }

    /// Apply this op to the current state of its document.
    pub fn apply(&self, current: Option<Fields>) -> Result<Fields, StoreError> {
        match self {
            Self::Merge { fields, .. } => {
                let mut doc = current.unwrap_or_default();
                for (key, value) in fields {
                    doc.insert(key.clone(), value.clone());
                }
                Ok(doc)
            }
            Self::DeleteFields { path, fields } => {
                let mut doc = current.ok_or_else(|| StoreError::NotFound(path.to_string()))?;
                for key in fields {
                    doc.remove(key);
                }
                Ok(doc)
            }
        }
    }
}

mod path_string {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    use crate::path::DocumentPath;

    pub fn serialize<S: Serializer>(path: &DocumentPath, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(path)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DocumentPath, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(D::Error::custom)
    }
}
