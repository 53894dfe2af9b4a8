//! # Filesystem-backed document store
//!
//! [`FileStore`] is a [`DocumentStore`] implementation that keeps every document
//! as a pretty-printed JSON object on the local filesystem. It lets the
//! migration run against an exported copy of the data before touching the
//! hosted store.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! ├── movies/
//! │   └── m1.json                 # movies/m1
//! └── users/
//!     ├── u1.json                 # users/u1
//!     └── u1/
//!         └── my_movies/
//!             └── m1.json         # users/u1/my_movies/m1
//! ```
//!
//! A document's subcollections live in a directory named after the document
//! id, next to the document's own `.json` file.
//!
//! ## Commits
//!
//! Every op in a commit is applied to an in-memory staging copy of the touched
//! documents first. Files are written only once the whole batch has applied
//! cleanly, so a failing op (e.g. deleting fields of a missing document) leaves
//! the directory untouched.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::backend::{check_batch_len, DocumentStore, MAX_BATCH_SIZE};
use crate::error::StoreError;
use crate::models::{Document, Fields, WriteOp};
use crate::path::{CollectionPath, DocumentPath};

/// Filesystem-backed DocumentStore.
#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    fn collection_dir(&self, collection: &CollectionPath) -> PathBuf {
        let mut dir = self.base.clone();
        dir.extend(collection.segments());
        dir
    }

    fn document_file(&self, path: &DocumentPath) -> PathBuf {
        let mut file = self.collection_dir(&path.parent());
        file.push(format!("{}.json", path.id()));
        file
    }

    fn read_fields(&self, path: &DocumentPath) -> Result<Option<Fields>, StoreError> {
        match std::fs::read(self.document_file(path)) {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_fields(&self, path: &DocumentPath, fields: &Fields) -> Result<(), StoreError> {
        let file = self.document_file(path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(file, serde_json::to_vec_pretty(fields)?)?;
        Ok(())
    }
}

impl DocumentStore for FileStore {
    async fn list_documents(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<Document>, StoreError> {
        let dir = self.collection_dir(collection);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut docs = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            let path = collection.doc(id)?;
            let fields: Fields = serde_json::from_slice(&std::fs::read(entry.path())?)?;
            docs.push(Document::new(path, fields));
        }
        docs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(docs)
    }

    async fn get_document(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        Ok(self
            .read_fields(path)?
            .map(|fields| Document::new(path.clone(), fields)))
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        check_batch_len(ops.len(), MAX_BATCH_SIZE)?;

        let mut staged: BTreeMap<DocumentPath, Fields> = BTreeMap::new();
        for op in &ops {
            let current = match staged.remove(op.path()) {
                Some(fields) => Some(fields),
                None => self.read_fields(op.path())?,
            };
            staged.insert(op.path().clone(), op.apply(current)?);
        }

        for (path, fields) in &staged {
            self.write_fields(path, fields)?;
        }
        tracing::debug!(writes = ops.len(), documents = staged.len(), "file store commit");
        Ok(())
    }
}
