use crate::error::StoreError;
use crate::models::{Document, WriteOp};
use crate::path::{CollectionPath, DocumentPath};

/// Largest number of writes the hosted store accepts in one commit.
pub const MAX_BATCH_SIZE: usize = 500;

/// Async interface to a document store.
pub trait DocumentStore {
    /// Read every document directly inside `collection`.
    fn list_documents(
        &self,
        collection: &CollectionPath,
    ) -> impl std::future::Future<Output = Result<Vec<Document>, StoreError>>;

    fn get_document(
        &self,
        path: &DocumentPath,
    ) -> impl std::future::Future<Output = Result<Option<Document>, StoreError>>;

    /// Apply all `ops` atomically, in order. Either every op lands or none does.
    fn commit(
        &self,
        ops: Vec<WriteOp>,
    ) -> impl std::future::Future<Output = Result<(), StoreError>>;

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }
}

pub(crate) fn check_batch_len(len: usize, max: usize) -> Result<(), StoreError> {
    if len > max {
        return Err(StoreError::BatchTooLarge { len, max });
    }
    Ok(())
}
