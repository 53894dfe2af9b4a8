use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::{check_batch_len, DocumentStore, MAX_BATCH_SIZE};
use crate::error::StoreError;
use crate::models::{Document, Fields, WriteOp};
use crate::path::{CollectionPath, DocumentPath};

/// In-memory DocumentStore for testing and dry experiments.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    docs: Arc<Mutex<BTreeMap<DocumentPath, Fields>>>,
    commits: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn docs(&self) -> MutexGuard<'_, BTreeMap<DocumentPath, Fields>> {
        self.docs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a document directly, bypassing commits.
    pub fn insert(&self, path: DocumentPath, fields: Fields) {
        self.docs().insert(path, fields);
    }

    /// Current fields of a document, if it exists.
    pub fn fields(&self, path: &DocumentPath) -> Option<Fields> {
        self.docs().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs().is_empty()
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl DocumentStore for MemoryStore {
    async fn list_documents(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .docs()
            .iter()
            .filter(|(path, _)| path.parent() == *collection)
            .map(|(path, fields)| Document::new(path.clone(), fields.clone()))
            .collect())
    }

    async fn get_document(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        Ok(self
            .docs()
            .get(path)
            .map(|fields| Document::new(path.clone(), fields.clone())))
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        check_batch_len(ops.len(), MAX_BATCH_SIZE)?;

        let mut docs = self.docs();
        // Stage on a copy so a failing op leaves the store untouched.
        let mut staged = docs.clone();
        for op in &ops {
            let current = staged.remove(op.path());
            let updated = op.apply(current)?;
            staged.insert(op.path().clone(), updated);
        }
        *docs = staged;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn path(raw: &str) -> DocumentPath {
        raw.parse().unwrap()
    }

    #[tokio::test]
    async fn test_list_only_direct_children() {
        let store = MemoryStore::new();
        store.insert(path("users/u1"), fields(json!({"name": "A"})));
        store.insert(path("users/u2"), fields(json!({"name": "B"})));
        store.insert(path("users/u1/my_movies/m1"), fields(json!({"rating": 5})));
        store.insert(path("movies/m1"), fields(json!({"title": "X"})));

        let users = store
            .list_documents(&"users".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id(), "u1");
        assert_eq!(users[1].id(), "u2");

        let notes = store
            .list_documents(&"users/u1/my_movies".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].get("rating"), Some(&json!(5)));
    }

    #[tokio::test]
    async fn test_commit_applies_in_order() {
        let store = MemoryStore::new();
        store.insert(path("users/u1"), fields(json!({"movies": [], "name": "A"})));

        store
            .commit(vec![
                WriteOp::merge(path("users/u1/my_movies/m1"), fields(json!({"rating": 1}))),
                WriteOp::merge(path("users/u1/my_movies/m1"), fields(json!({"rating": 2}))),
                WriteOp::delete_fields(path("users/u1"), ["movies"]),
            ])
            .await
            .unwrap();

        assert_eq!(
            store.fields(&path("users/u1/my_movies/m1")),
            Some(fields(json!({"rating": 2})))
        );
        assert_eq!(store.fields(&path("users/u1")), Some(fields(json!({"name": "A"}))));
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_commit_is_atomic() {
        let store = MemoryStore::new();

        let result = store
            .commit(vec![
                WriteOp::merge(path("movies/m1"), fields(json!({"title": "X"}))),
                WriteOp::delete_fields(path("users/missing"), ["movies"]),
            ])
            .await;

        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(store.is_empty());
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected() {
        let store = MemoryStore::new();
        let ops = (0..=MAX_BATCH_SIZE)
            .map(|i| WriteOp::merge(path(&format!("movies/m{i}")), Fields::new()))
            .collect();

        let result = store.commit(ops).await;
        assert!(matches!(result, Err(StoreError::BatchTooLarge { .. })));
    }
}
