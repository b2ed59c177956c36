use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema version written to every new or migrated record.
pub const SCHEMA_VERSION: u32 = 2;

/// Title used when a foreign payload omits one.
pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One user-created content item. Lives in exactly one of a record's
/// `sections` or `trash` lists; `deleted_at` is set only while trashed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    pub text: String,
    #[serde(default)]
    pub favorite: bool,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Fields this build does not know about, typically written by a newer
    /// schema version. Carried through decode and encode untouched, so a
    /// downgraded process never strips them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn untitled() -> String {
    UNTITLED.to_string()
}

impl Section {
    pub fn new(title: String, image: Option<String>, text: String) -> Self {
        Self {
            title,
            image,
            text,
            favorite: false,
            updated_at: Utc::now(),
            deleted_at: None,
            extra: Map::new(),
        }
    }
}

/// The full persisted document for one entity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub schema_version: u32,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub trash: Vec<Section>,
    #[serde(default)]
    pub settings: Settings,
    /// See [`Section::extra`]: unknown record-level fields survive a
    /// round-trip instead of being dropped by a whole-record `put`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// The default structure written for a newly seen entity key.
    pub fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            sections: Vec::new(),
            trash: Vec::new(),
            settings: Settings::default(),
            extra: Map::new(),
        }
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_empty_at_current_version() {
        let record = Record::new();
        assert_eq!(record.schema_version, SCHEMA_VERSION);
        assert!(record.sections.is_empty());
        assert!(record.trash.is_empty());
        assert_eq!(record.settings.theme, Theme::Light);
    }

    #[test]
    fn theme_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Theme::Light).unwrap(), "\"light\"");
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
    }

    #[test]
    fn new_section_has_no_deleted_at() {
        let section = Section::new("A".into(), None, "hello".into());
        assert!(!section.favorite);
        assert!(section.deleted_at.is_none());
    }
}
