//! # Migration procedure
//!
//! [`Migration::run`] is a straight line:
//!
//! 1. read the Shared Items and User Records once;
//! 2. plan the strip and relocation writes from those snapshots;
//! 3. commit the strip writes, then the relocation writes.
//!
//! Planning failures (an annotation id that cannot name a document) end the run
//! before the first commit.
//!
//! Both write phases go through their own [`BatchWriter`], so each is split into
//! chunks of `chunk_size` writes. Any read or commit failure ends the run; the
//! returned error says which phase failed and how much had already landed.
//!
//! Running the procedure again on its own output writes nothing: stripped items
//! have no personal fields left and cleared users have no embedded array.

use store::{BatchWriter, Document, DocumentStore, StoreError, WriteOp};
use tracing::{info, warn};

use crate::error::{MigrateError, Phase};
use crate::relocate::Relocation;
use crate::settings::{Layout, MigrationSettings};
use crate::strip;

/// Counts for one run. In dry-run mode they describe what would have been written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub items_scanned: usize,
    pub users_scanned: usize,
    pub items_stripped: usize,
    pub notes_written: usize,
    pub users_cleared: usize,
    pub legacy_items: usize,
    pub legacy_notes: usize,
    pub commits: usize,
    pub dry_run: bool,
}

impl MigrationReport {
    pub fn writes(&self) -> usize {
        self.items_stripped + self.notes_written + self.users_cleared
    }
}

pub struct Migration<'a, S: DocumentStore> {
    store: &'a S,
    layout: Layout,
    options: MigrationSettings,
}

impl<'a, S: DocumentStore> Migration<'a, S> {
    pub fn new(store: &'a S, layout: Layout, options: MigrationSettings) -> Self {
        Self {
            store,
            layout,
            options,
        }
    }

    pub async fn run(&self) -> Result<MigrationReport, MigrateError> {
        info!(dry_run = self.options.dry_run, "starting migration");

        let items = self
            .store
            .list_documents(&self.layout.items)
            .await
            .map_err(|source| MigrateError::Read {
                collection: self.layout.items.to_string(),
                source,
            })?;
        let users = self
            .store
            .list_documents(&self.layout.users)
            .await
            .map_err(|source| MigrateError::Read {
                collection: self.layout.users.to_string(),
                source,
            })?;
        info!(items = items.len(), users = users.len(), "loaded snapshots");

        let mut report = MigrationReport {
            items_scanned: items.len(),
            users_scanned: users.len(),
            dry_run: self.options.dry_run,
            ..MigrationReport::default()
        };

        // Plan both phases before anything is committed, so a bad annotation id
        // or the legacy warning surfaces while the items are still intact.
        let strip_ops = strip::plan(&items);
        let relocation = self.plan_relocation(&items, &users)?;

        report.items_stripped = strip_ops.len();
        report.notes_written = relocation.notes_written;
        report.users_cleared = relocation.users_cleared;
        report.legacy_items = relocation.legacy_items;
        report.legacy_notes = relocation.legacy_notes;

        report.commits += self.write(Phase::Strip, strip_ops).await?;
        info!(
            stripped = report.items_stripped,
            of = report.items_scanned,
            "cleared personal fields from {}",
            self.layout.items
        );

        report.commits += self.write(Phase::Relocate, relocation.ops).await?;
        info!(
            notes = report.notes_written,
            users_cleared = report.users_cleared,
            legacy_notes = report.legacy_notes,
            "moved notes into {}",
            self.layout.notes
        );

        info!(
            writes = report.writes(),
            commits = report.commits,
            dry_run = report.dry_run,
            "migration complete"
        );
        Ok(report)
    }

    fn plan_relocation(
        &self,
        items: &[Document],
        users: &[Document],
    ) -> Result<Relocation, MigrateError> {
        let mut relocation = Relocation::new();
        relocation.embedded_notes(users, &self.layout)?;
        if self.options.legacy_broadcast {
            relocation.legacy_broadcast(items, users, &self.layout)?;
        } else {
            relocation.count_legacy(items);
            if relocation.legacy_items > 0 {
                warn!(
                    items = relocation.legacy_items,
                    dry_run = self.options.dry_run,
                    "shared items carry personal values that this run discards; \
                     set migration.legacy_broadcast to copy them to every user instead"
                );
            }
        }
        Ok(relocation)
    }

    /// Push `ops` through a fresh chunked writer; returns the number of commits.
    async fn write(&self, phase: Phase, ops: Vec<WriteOp>) -> Result<usize, MigrateError> {
        let mut writer =
            BatchWriter::new(self.store, self.options.chunk_size)?.dry_run(self.options.dry_run);
        for op in ops {
            if self.options.dry_run {
                let planned = serde_json::to_string(&op).map_err(StoreError::from)?;
                tracing::debug!(%phase, op = %planned, "planned write");
            }
            writer
                .push(op)
                .await
                .map_err(|e| MigrateError::commit(phase, e))?;
        }
        let committed = writer
            .finish()
            .await
            .map_err(|e| MigrateError::commit(phase, e))?;
        Ok(committed.batches)
    }
}
