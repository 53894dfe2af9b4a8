//! # Chunked batch writer
//!
//! The hosted store caps a single commit at [`MAX_BATCH_SIZE`](crate::MAX_BATCH_SIZE)
//! writes. [`BatchWriter`] hides that cap: ops are pushed one at a time and a
//! commit is sent every `chunk_size` ops, with [`BatchWriter::finish`] flushing
//! the remainder.
//!
//! Each chunk is atomic on its own; the run as a whole is not. The writer keeps a
//! [`CommitReport`] of what has actually landed, and a failed chunk surfaces as a
//! [`BatchError`] carrying that report so callers know exactly how far the run got.
//!
//! In dry-run mode chunks are counted but never sent.

use thiserror::Error;

use crate::backend::DocumentStore;
use crate::error::StoreError;
use crate::models::WriteOp;

/// Commits (or would-be commits, in dry-run mode) made by a [`BatchWriter`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub batches: usize,
    pub writes: usize,
}

/// A chunk commit failed. `committed` is everything that landed before it.
#[derive(Debug, Error)]
#[error(
    "batch commit failed after {} committed batches ({} writes)",
    .committed.batches,
    .committed.writes
)]
pub struct BatchError {
    pub committed: CommitReport,
    #[source]
    pub source: StoreError,
}

pub struct BatchWriter<'a, S: DocumentStore> {
    store: &'a S,
    chunk_size: usize,
    dry_run: bool,
    pending: Vec<WriteOp>,
    committed: CommitReport,
}

impl<'a, S: DocumentStore> BatchWriter<'a, S> {
    /// `chunk_size` must be between 1 and the store's batch limit.
    pub fn new(store: &'a S, chunk_size: usize) -> Result<Self, StoreError> {
        let max = store.max_batch_size();
        if chunk_size == 0 || chunk_size > max {
            return Err(StoreError::InvalidChunkSize {
                size: chunk_size,
                max,
            });
        }
        Ok(Self {
            store,
            chunk_size,
            dry_run: false,
            pending: Vec::with_capacity(chunk_size),
            committed: CommitReport::default(),
        })
    }

    /// Count chunks instead of committing them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn push(&mut self, op: WriteOp) -> Result<(), BatchError> {
        self.pending.push(op);
        if self.pending.len() >= self.chunk_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Commit whatever is pending as one chunk.
    pub async fn flush(&mut self) -> Result<(), BatchError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let ops = std::mem::replace(&mut self.pending, Vec::with_capacity(self.chunk_size));
        let len = ops.len();

        if !self.dry_run {
            self.store.commit(ops).await.map_err(|source| BatchError {
                committed: self.committed,
                source,
            })?;
        }

        self.committed.batches += 1;
        self.committed.writes += len;
        tracing::debug!(
            batch = self.committed.batches,
            writes = len,
            dry_run = self.dry_run,
            "committed chunk"
        );
        Ok(())
    }

    /// Flush the remainder and return the final report.
    pub async fn finish(mut self) -> Result<CommitReport, BatchError> {
        self.flush().await?;
        Ok(self.committed)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn committed(&self) -> CommitReport {
        self.committed
    }
}
