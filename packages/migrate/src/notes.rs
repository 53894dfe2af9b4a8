//! Personal fields and the Personal Note shape.

use serde_json::{Map, Value};
use store::Fields;

pub const RATING: &str = "rating";
pub const REVIEW: &str = "review";
pub const FAVORITE: &str = "favorite";
pub const WATCHED: &str = "watched";
pub const WANT_TO_WATCH: &str = "wantToWatch";

/// User-specific fields that must not live on Shared Items.
pub const PERSONAL_FIELDS: [&str; 5] = [RATING, REVIEW, FAVORITE, WATCHED, WANT_TO_WATCH];

/// A Shared Item with any of these set (non-null) still carries legacy notes.
pub const LEGACY_MARKERS: [&str; 3] = [RATING, REVIEW, FAVORITE];

/// Build a Personal Note from a source object, defaulting absent or null values:
/// `rating` to null, `review` to `""`, and the flags to `false`.
pub fn personal_note(source: &Map<String, Value>) -> Fields {
    let pick = |key: &str, default: Value| {
        source
            .get(key)
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or(default)
    };

    let mut note = Fields::new();
    note.insert(RATING.into(), pick(RATING, Value::Null));
    note.insert(REVIEW.into(), pick(REVIEW, Value::String(String::new())));
    for flag in [FAVORITE, WATCHED, WANT_TO_WATCH] {
        note.insert(flag.into(), pick(flag, Value::Bool(false)));
    }
    note
}

/// Shared-item id referenced by an embedded annotation, if it has a usable one.
pub fn annotation_item_id(annotation: &Value) -> Option<String> {
    match annotation.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(n) => n.as_i64().filter(|&i| i != 0).map(|i| i.to_string()),
        _ => None,
    }
}

/// True when the item still holds a non-null legacy note value.
pub fn has_legacy_values(fields: &Map<String, Value>) -> bool {
    LEGACY_MARKERS
        .iter()
        .any(|key| fields.get(*key).is_some_and(|v| !v.is_null()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_personal_note_defaults() {
        let source = json!({"id": "m1", "rating": 5, "favorite": true, "title": "X"});
        let note = personal_note(source.as_object().unwrap());

        assert_eq!(
            Value::Object(note),
            json!({
                "rating": 5,
                "review": "",
                "favorite": true,
                "watched": false,
                "wantToWatch": false,
            })
        );
    }

    #[test]
    fn test_personal_note_treats_null_as_absent() {
        let source = json!({"rating": null, "review": null, "watched": null});
        let note = personal_note(source.as_object().unwrap());

        assert_eq!(note.get("rating"), Some(&Value::Null));
        assert_eq!(note.get("review"), Some(&json!("")));
        assert_eq!(note.get("watched"), Some(&json!(false)));
    }

    #[test]
    fn test_annotation_item_id() {
        assert_eq!(annotation_item_id(&json!({"id": "m1"})), Some("m1".into()));
        assert_eq!(annotation_item_id(&json!({"id": 42})), Some("42".into()));
        assert_eq!(annotation_item_id(&json!({"id": ""})), None);
        assert_eq!(annotation_item_id(&json!({"id": 0})), None);
        assert_eq!(annotation_item_id(&json!({"id": null})), None);
        assert_eq!(annotation_item_id(&json!({"rating": 3})), None);
        assert_eq!(annotation_item_id(&json!("m1")), None);
    }

    #[test]
    fn test_has_legacy_values() {
        assert!(has_legacy_values(json!({"review": "meh"}).as_object().unwrap()));
        assert!(has_legacy_values(json!({"favorite": false}).as_object().unwrap()));
        assert!(!has_legacy_values(json!({"rating": null}).as_object().unwrap()));
        assert!(!has_legacy_values(json!({"watched": true}).as_object().unwrap()));
    }
}
