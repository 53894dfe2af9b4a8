pub mod backend;
pub mod batch;
pub mod error;
pub mod models;
pub mod path;

mod file_store;
mod memory;
pub use file_store::FileStore;
pub use memory::MemoryStore;

#[cfg(feature = "firestore")]
pub mod firestore;
#[cfg(feature = "firestore")]
pub use firestore::{FirestoreConfig, FirestoreStore};

pub use backend::{DocumentStore, MAX_BATCH_SIZE};
pub use batch::{BatchError, BatchWriter, CommitReport};
pub use error::StoreError;
pub use models::{Document, Fields, WriteOp};
pub use path::{CollectionPath, DocumentPath};
