//! # Note Relocator
//!
//! Moves legacy personal annotations into `users/{uid}/{notes}/{item}` documents.
//!
//! | Pass | Source | Writes |
//! |------|--------|--------|
//! | embedded | `users/{uid}.{embedded_field}` array | one merged note per annotation with an id, then a delete of the array field |
//! | legacy broadcast (opt-in) | Shared Items still holding `rating`/`review`/`favorite` | one merged note per item **per user** |
//!
//! The broadcast pass has no ownership information: it copies one item's values
//! to every known user. It only runs when explicitly enabled; otherwise the
//! candidates are counted so the caller can warn about them.
//!
//! Ops are emitted in pass order. Since commits apply in order, a broadcast note
//! overwrites an embedded note for the same (user, item).

use serde_json::Value;
use store::{Document, DocumentPath, StoreError, WriteOp};

use crate::notes::{annotation_item_id, has_legacy_values, personal_note};
use crate::settings::Layout;

/// Planned writes of the relocation phase plus what they amount to.
#[derive(Debug, Default, PartialEq)]
pub struct Relocation {
    pub ops: Vec<WriteOp>,
    pub notes_written: usize,
    pub users_cleared: usize,
    /// Shared Items that still carry legacy values.
    pub legacy_items: usize,
    /// Notes written by the broadcast pass (also counted in `notes_written`).
    pub legacy_notes: usize,
}

impl Relocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embedded pass over User Records.
    pub fn embedded_notes(&mut self, users: &[Document], layout: &Layout) -> Result<(), StoreError> {
        for user in users {
            let Some(Value::Array(annotations)) = user.get(&layout.embedded_field) else {
                continue;
            };

            for annotation in annotations {
                let (Some(source), Some(item_id)) =
                    (annotation.as_object(), annotation_item_id(annotation))
                else {
                    continue;
                };
                let path = note_path(user, &layout.notes, &item_id)?;
                self.ops.push(WriteOp::merge(path, personal_note(source)));
                self.notes_written += 1;
            }

            self.ops.push(WriteOp::delete_fields(
                user.path.clone(),
                [layout.embedded_field.as_str()],
            ));
            self.users_cleared += 1;
            tracing::debug!(user = user.id(), annotations = annotations.len(), "relocated embedded notes");
        }
        Ok(())
    }

    /// Legacy broadcast pass: every user receives the item's values.
    pub fn legacy_broadcast(
        &mut self,
        items: &[Document],
        users: &[Document],
        layout: &Layout,
    ) -> Result<(), StoreError> {
        for item in legacy_items(items) {
            self.legacy_items += 1;
            let note = personal_note(&item.fields);
            for user in users {
                let path = note_path(user, &layout.notes, item.id())?;
                self.ops.push(WriteOp::merge(path, note.clone()));
                self.notes_written += 1;
                self.legacy_notes += 1;
            }
        }
        Ok(())
    }

    /// Count broadcast candidates without planning any writes.
    pub fn count_legacy(&mut self, items: &[Document]) {
        self.legacy_items += legacy_items(items).count();
    }
}

fn legacy_items(items: &[Document]) -> impl Iterator<Item = &Document> {
    items.iter().filter(|item| has_legacy_values(&item.fields))
}

fn note_path(user: &Document, notes: &str, item_id: &str) -> Result<DocumentPath, StoreError> {
    user.path.collection(notes)?.doc(item_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CollectionSettings;
    use serde_json::json;

    fn doc(path: &str, value: Value) -> Document {
        Document::new(path.parse().unwrap(), value.as_object().cloned().unwrap())
    }

    fn layout() -> Layout {
        CollectionSettings::default().layout().unwrap()
    }

    fn merge(path: &str, value: Value) -> WriteOp {
        WriteOp::merge(path.parse().unwrap(), value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_embedded_notes() {
        let users = vec![
            doc(
                "users/u1",
                json!({"movies": [
                    {"id": "m1", "rating": 5, "favorite": true},
                    {"rating": 2},
                    {"id": "m2", "review": "great", "watched": true},
                ]}),
            ),
            doc("users/u2", json!({"name": "no legacy"})),
        ];

        let mut relocation = Relocation::new();
        relocation.embedded_notes(&users, &layout()).unwrap();

        assert_eq!(
            relocation.ops,
            vec![
                merge(
                    "users/u1/my_movies/m1",
                    json!({"rating": 5, "review": "", "favorite": true, "watched": false, "wantToWatch": false})
                ),
                merge(
                    "users/u1/my_movies/m2",
                    json!({"rating": null, "review": "great", "favorite": false, "watched": true, "wantToWatch": false})
                ),
                WriteOp::delete_fields("users/u1".parse().unwrap(), ["movies"]),
            ]
        );
        assert_eq!(relocation.notes_written, 2);
        assert_eq!(relocation.users_cleared, 1);
        assert_eq!(relocation.legacy_items, 0);
    }

    #[test]
    fn test_empty_array_is_still_cleared() {
        let users = vec![doc("users/u1", json!({"movies": []}))];
        let mut relocation = Relocation::new();
        relocation.embedded_notes(&users, &layout()).unwrap();

        assert_eq!(
            relocation.ops,
            vec![WriteOp::delete_fields("users/u1".parse().unwrap(), ["movies"])]
        );
        assert_eq!(relocation.notes_written, 0);
        assert_eq!(relocation.users_cleared, 1);
    }

    #[test]
    fn test_non_array_field_left_alone() {
        let users = vec![doc("users/u1", json!({"movies": "m1,m2"}))];
        let mut relocation = Relocation::new();
        relocation.embedded_notes(&users, &layout()).unwrap();
        assert_eq!(relocation, Relocation::new());
    }

    #[test]
    fn test_invalid_item_id_is_an_error() {
        let users = vec![doc("users/u1", json!({"movies": [{"id": "a/b"}]}))];
        let mut relocation = Relocation::new();
        let result = relocation.embedded_notes(&users, &layout());
        assert!(matches!(result, Err(StoreError::InvalidPath(_))));
    }

    #[test]
    fn test_legacy_broadcast_reaches_every_user() {
        let items = vec![
            doc("movies/m1", json!({"title": "X", "rating": 3})),
            doc("movies/m2", json!({"title": "Y", "watched": true})),
        ];
        let users = vec![doc("users/u1", json!({})), doc("users/u2", json!({}))];

        let mut relocation = Relocation::new();
        relocation
            .legacy_broadcast(&items, &users, &layout())
            .unwrap();

        let note = json!({"rating": 3, "review": "", "favorite": false, "watched": false, "wantToWatch": false});
        assert_eq!(
            relocation.ops,
            vec![
                merge("users/u1/my_movies/m1", note.clone()),
                merge("users/u2/my_movies/m1", note),
            ]
        );
        assert_eq!(relocation.legacy_items, 1);
        assert_eq!(relocation.legacy_notes, 2);
        assert_eq!(relocation.notes_written, 2);
    }

    #[test]
    fn test_count_legacy_plans_nothing() {
        let items = vec![doc("movies/m1", json!({"review": "old"}))];
        let mut relocation = Relocation::new();
        relocation.count_legacy(&items);

        assert_eq!(relocation.legacy_items, 1);
        assert!(relocation.ops.is_empty());
    }
}
