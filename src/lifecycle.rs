//! Pure record mutations.
//!
//! Nothing in this module touches the filesystem. Callers load a record,
//! apply one of these operations, and persist the result — the
//! read-modify-write span belongs to [`crate::store::DocumentStore`], which
//! serializes it per key.
//!
//! Positions in `sections` and `trash` are not stable identifiers: removing
//! an entry shifts everything after it. Every index-bearing operation
//! re-validates bounds against the record it is handed and fails with
//! [`VaultError::IndexOutOfBounds`] rather than clamping, so a stale index
//! from an earlier request can never silently hit the wrong entry.

use crate::error::{Result, VaultError};
use crate::model::{Record, Section};
use chrono::Utc;

/// A single-field edit applied to an active section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionEdit {
    Title(String),
    Image(Option<String>),
    Text(String),
}

/// Aggregate counts for a record, as shown by the caller's stats view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordStats {
    pub sections: usize,
    pub favorites: usize,
    pub trashed: usize,
    pub words: usize,
}

fn check_index(collection: &'static str, index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(VaultError::IndexOutOfBounds {
            collection,
            index,
            len,
        })
    }
}

/// Append a new section with `favorite = false` and a fresh `updated_at`.
pub fn add_section(record: &mut Record, title: String, image: Option<String>, text: String) {
    record.sections.push(Section::new(title, image, text));
}

/// Apply `edit` to `sections[index]`, refreshing `updated_at`.
pub fn update_section(record: &mut Record, index: usize, edit: SectionEdit) -> Result<()> {
    check_index("sections", index, record.sections.len())?;
    let section = &mut record.sections[index];
    match edit {
        SectionEdit::Title(title) => section.title = title,
        SectionEdit::Image(image) => section.image = image,
        SectionEdit::Text(text) => section.text = text,
    }
    section.updated_at = Utc::now();
    Ok(())
}

/// Flip the favorite flag on `sections[index]`. Returns the new state.
pub fn toggle_favorite(record: &mut Record, index: usize) -> Result<bool> {
    check_index("sections", index, record.sections.len())?;
    let section = &mut record.sections[index];
    section.favorite = !section.favorite;
    section.updated_at = Utc::now();
    Ok(section.favorite)
}

/// Move `sections[index]` to the end of `trash`, stamping `deleted_at`.
pub fn soft_delete(record: &mut Record, index: usize) -> Result<()> {
    check_index("sections", index, record.sections.len())?;
    let mut section = record.sections.remove(index);
    section.deleted_at = Some(Utc::now());
    record.trash.push(section);
    Ok(())
}

/// Move `trash[trash_index]` back to the end of `sections`, clearing
/// `deleted_at` and refreshing `updated_at`.
pub fn restore(record: &mut Record, trash_index: usize) -> Result<()> {
    check_index("trash", trash_index, record.trash.len())?;
    let mut section = record.trash.remove(trash_index);
    section.deleted_at = None;
    section.updated_at = Utc::now();
    record.sections.push(section);
    Ok(())
}

/// Permanently remove `trash[trash_index]`. Returns the removed section so
/// the caller can name it in a confirmation message.
pub fn purge_trash(record: &mut Record, trash_index: usize) -> Result<Section> {
    check_index("trash", trash_index, record.trash.len())?;
    Ok(record.trash.remove(trash_index))
}

/// Active sections marked favorite, with their current positions.
pub fn favorites(record: &Record) -> Vec<(usize, &Section)> {
    record
        .sections
        .iter()
        .enumerate()
        .filter(|(_, s)| s.favorite)
        .collect()
}

/// Case-insensitive substring search over title and text of active sections.
pub fn search<'a>(record: &'a Record, query: &str) -> Vec<(usize, &'a Section)> {
    let needle = query.to_lowercase();
    record
        .sections
        .iter()
        .enumerate()
        .filter(|(_, s)| {
            s.title.to_lowercase().contains(&needle) || s.text.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn stats(record: &Record) -> RecordStats {
    RecordStats {
        sections: record.sections.len(),
        favorites: record.sections.iter().filter(|s| s.favorite).count(),
        trashed: record.trash.len(),
        words: record
            .sections
            .iter()
            .map(|s| s.text.split_whitespace().count())
            .sum(),
    }
}
