//! Schema migrations.
//!
//! Every upgrade is an explicit step keyed by the version it produces,
//! applied in order from the stored `schema_version` up to
//! [`SCHEMA_VERSION`]. Steps are additive and idempotent: they only insert
//! missing fields, never drop existing ones, so re-running a migration is a
//! no-op. Files tagged with a version *higher* than the current one pass
//! through unchanged — a downgraded process must not destroy newer data.
//!
//! Steps operate on the raw JSON map rather than the typed [`Record`],
//! because the whole point is that old files do not yet decode as one.

use crate::model::SCHEMA_VERSION;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::debug;

struct Migration {
    target: u32,
    apply: fn(&mut Map<String, Value>),
}

const MIGRATIONS: &[Migration] = &[Migration {
    target: 2,
    apply: migrate_to_v2,
}];

/// Upgrade `doc` in place to the current schema version. Returns whether
/// anything changed, so callers can skip the re-persist when nothing did.
pub fn migrate(doc: &mut Map<String, Value>) -> bool {
    let stored = doc
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(1) as u32;

    let mut changed = false;
    for step in MIGRATIONS {
        if stored < step.target {
            (step.apply)(doc);
            doc.insert("schema_version".to_string(), json!(step.target));
            debug!(target_version = step.target, "applied schema migration");
            changed = true;
        }
    }
    changed
}

/// v1 records predate trash, per-user settings, and the per-section
/// `favorite`/`updated_at` fields.
fn migrate_to_v2(doc: &mut Map<String, Value>) {
    if !doc.contains_key("trash") {
        doc.insert("trash".to_string(), json!([]));
    }

    match doc.get_mut("settings") {
        Some(Value::Object(settings)) => {
            if !settings.contains_key("theme") {
                settings.insert("theme".to_string(), json!("light"));
            }
        }
        _ => {
            doc.insert("settings".to_string(), json!({ "theme": "light" }));
        }
    }

    normalize_sections(doc);
}

/// Ensure every entry of `sections` and `trash` carries `updated_at` and
/// `favorite`. Trash entries additionally get `deleted_at`, which must be
/// non-null for as long as the entry is trashed. Shared with restore
/// validation, which accepts hand-edited payloads.
pub(crate) fn normalize_sections(doc: &mut Map<String, Value>) -> bool {
    let sections = normalize_list(doc, "sections", false);
    let trash = normalize_list(doc, "trash", true);
    sections || trash
}

fn normalize_list(doc: &mut Map<String, Value>, key: &str, trashed: bool) -> bool {
    let mut changed = false;
    if let Some(Value::Array(entries)) = doc.get_mut(key) {
        for entry in entries.iter_mut().filter_map(Value::as_object_mut) {
            if !entry.contains_key("updated_at") {
                entry.insert("updated_at".to_string(), json!(Utc::now()));
                changed = true;
            }
            if !entry.contains_key("favorite") {
                entry.insert("favorite".to_string(), json!(false));
                changed = true;
            }
            if trashed && !entry.get("deleted_at").is_some_and(|v| !v.is_null()) {
                entry.insert("deleted_at".to_string(), json!(Utc::now()));
                changed = true;
            }
        }
    }
    changed
}

/// The stored version, defaulting to 1 for files that predate the tag.
pub fn stored_version(doc: &Map<String, Value>) -> u32 {
    doc.get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(1) as u32
}

/// True when `doc` claims a version newer than this build understands.
pub fn is_from_future(doc: &Map<String, Value>) -> bool {
    stored_version(doc) > SCHEMA_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    fn as_map(value: serde_json::Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn v1_record_gains_all_v2_fields() {
        let mut doc = as_map(json!({
            "sections": [{ "title": "Old", "text": "body" }]
        }));

        assert!(migrate(&mut doc));
        assert_eq!(stored_version(&doc), 2);
        assert_eq!(doc["trash"], json!([]));
        assert_eq!(doc["settings"]["theme"], json!("light"));

        let section = doc["sections"][0].as_object().unwrap();
        assert_eq!(section["favorite"], json!(false));
        assert!(section["updated_at"].is_string());

        // The migrated document now decodes as a typed record.
        let record = codec::record_from_value(Value::Object(doc)).unwrap();
        assert_eq!(record.schema_version, 2);
        assert_eq!(record.sections[0].title, "Old");
    }

    #[test]
    fn migration_is_idempotent() {
        let mut doc = as_map(json!({
            "sections": [{ "title": "Old", "text": "body" }]
        }));
        assert!(migrate(&mut doc));
        let after_first = doc.clone();
        assert!(!migrate(&mut doc));
        assert_eq!(doc, after_first);
    }

    #[test]
    fn current_version_is_untouched() {
        let mut doc = as_map(json!({
            "schema_version": 2,
            "sections": [],
            "trash": [],
            "settings": { "theme": "dark" }
        }));
        assert!(!migrate(&mut doc));
        assert_eq!(doc["settings"]["theme"], json!("dark"));
    }

    #[test]
    fn future_version_passes_through_unchanged() {
        let mut doc = as_map(json!({
            "schema_version": 9,
            "sections": [],
            "sidecar": { "unknown": true }
        }));
        assert!(is_from_future(&doc));
        let before = doc.clone();
        assert!(!migrate(&mut doc));
        assert_eq!(doc, before);
    }

    #[test]
    fn trash_entries_are_normalized_too() {
        let mut doc = as_map(json!({
            "sections": [],
            "trash": [
                { "title": "T", "text": "t" },
                { "title": "U", "text": "u", "deleted_at": null }
            ]
        }));
        assert!(migrate(&mut doc));

        for entry in doc["trash"].as_array().unwrap() {
            let entry = entry.as_object().unwrap();
            assert!(entry["updated_at"].is_string());
            assert_eq!(entry["favorite"], json!(false));
            assert!(entry["deleted_at"].is_string());
        }

        let record = codec::record_from_value(Value::Object(doc)).unwrap();
        assert!(record.trash.iter().all(|s| s.deleted_at.is_some()));
    }

    #[test]
    fn existing_fields_are_never_overwritten() {
        let mut doc = as_map(json!({
            "schema_version": 1,
            "sections": [{
                "title": "Kept",
                "text": "body",
                "favorite": true,
                "updated_at": "2020-01-01T00:00:00Z"
            }],
            "trash": [{ "title": "T", "text": "t" }],
            "settings": { "theme": "dark" }
        }));
        assert!(migrate(&mut doc));
        assert_eq!(doc["settings"]["theme"], json!("dark"));
        let section = doc["sections"][0].as_object().unwrap();
        assert_eq!(section["favorite"], json!(true));
        assert_eq!(section["updated_at"], json!("2020-01-01T00:00:00Z"));
    }
}
