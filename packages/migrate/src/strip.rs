//! Personal-Field Stripper.
//!
//! Merging a cleaned copy back would leave the old values in place, so each
//! affected item gets an explicit field deletion instead.

use store::{Document, WriteOp};

use crate::notes::PERSONAL_FIELDS;

/// One delete op per item that holds any personal field, even a null one.
pub fn plan(items: &[Document]) -> Vec<WriteOp> {
    items
        .iter()
        .filter_map(|item| {
            let present: Vec<&str> = PERSONAL_FIELDS
                .iter()
                .copied()
                .filter(|field| item.has(field))
                .collect();
            if present.is_empty() {
                return None;
            }
            tracing::debug!(item = %item.path, fields = ?present, "stripping personal fields");
            Some(WriteOp::delete_fields(item.path.clone(), present))
        })
        .collect()
}
