use std::fmt;

use store::{BatchError, CommitReport, StoreError};
use thiserror::Error;

/// Which write phase a commit belonged to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Strip,
    Relocate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Strip => f.write_str("strip personal fields"),
            Phase::Relocate => f.write_str("relocate notes"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("failed to read collection {collection}")]
    Read {
        collection: String,
        #[source]
        source: StoreError,
    },

    #[error(
        "commit failed during {phase} after {} batches ({} writes) had landed",
        .committed.batches,
        .committed.writes
    )]
    Commit {
        phase: Phase,
        committed: CommitReport,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

impl MigrateError {
    pub(crate) fn commit(phase: Phase, err: BatchError) -> Self {
        MigrateError::Commit {
            phase,
            committed: err.committed,
            source: err.source,
        }
    }
}
