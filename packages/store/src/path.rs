//! # Document and collection paths
//!
//! Paths address documents the same way the hosted store does: alternating
//! collection and document ids separated by `/`.
//!
//! | Type | Segments | Example |
//! |------|----------|---------|
//! | [`CollectionPath`] | odd | `users`, `users/u1/my_movies` |
//! | [`DocumentPath`] | even | `movies/m1`, `users/u1/my_movies/m1` |
//!
//! Every segment must be an id the hosted store accepts. Empty segments are
//! rejected, so neither type can hold a leading, trailing, or doubled slash.

use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Longest id the hosted store accepts, in bytes.
const MAX_ID_BYTES: usize = 1500;

fn split_segments(raw: &str) -> Result<Vec<String>, StoreError> {
    if raw.is_empty() {
        return Err(StoreError::InvalidPath(raw.to_string()));
    }
    let segments: Vec<String> = raw.split('/').map(str::to_string).collect();
    if segments.iter().any(|s| check_id(s).is_err()) {
        return Err(StoreError::InvalidPath(raw.to_string()));
    }
    Ok(segments)
}

/// Ids the hosted store refuses: empty, `/`, `.` or `..`, `__reserved__`, oversized.
fn check_id(id: &str) -> Result<(), StoreError> {
    let reserved = id.len() >= 4 && id.starts_with("__") && id.ends_with("__");
    if id.is_empty()
        || id.contains('/')
        || id == "."
        || id == ".."
        || reserved
        || id.len() > MAX_ID_BYTES
    {
        return Err(StoreError::InvalidPath(id.to_string()));
    }
    Ok(())
}

/// Path of a collection: `users` or `users/u1/my_movies`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    /// Top-level collection with the given id.
    pub fn root(id: &str) -> Result<Self, StoreError> {
        check_id(id)?;
        Ok(Self {
            segments: vec![id.to_string()],
        })
    }

    /// Path of the document `id` inside this collection.
    pub fn doc(&self, id: &str) -> Result<DocumentPath, StoreError> {
        check_id(id)?;
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        Ok(DocumentPath { segments })
    }

    /// Collection id (last segment).
    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl FromStr for CollectionPath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = split_segments(s)?;
        if segments.len() % 2 == 0 {
            return Err(StoreError::InvalidPath(s.to_string()));
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Path of a single document: `movies/m1` or `users/u1/my_movies/m1`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    /// Document id (last segment).
    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The collection this document lives in.
    pub fn parent(&self) -> CollectionPath {
        CollectionPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    /// Subcollection `id` nested under this document.
    pub fn collection(&self, id: &str) -> Result<CollectionPath, StoreError> {
        check_id(id)?;
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        Ok(CollectionPath { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl FromStr for DocumentPath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = split_segments(s)?;
        if segments.len() % 2 != 0 {
            return Err(StoreError::InvalidPath(s.to_string()));
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}
