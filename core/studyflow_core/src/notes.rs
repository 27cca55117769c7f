use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use time::{Date, OffsetDateTime};

use crate::clock::{next_id, rfc3339, unix_ms};
use crate::error::AppError;
use crate::progress::award_xp;
use crate::store::{self, StoreResult, NOTES_KEY, QUICK_NOTES_KEY};

pub const ADD_NOTE_XP: i64 = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub content: String,
    pub timestamp: String,
    pub date: String,
}

/// Saved from a page by the content script; grouped by date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickNote {
    pub note: String,
    #[serde(default)]
    pub page_info: Value,
    /// Unix milliseconds.
    pub timestamp: i64,
}

pub type QuickNotes = BTreeMap<String, Vec<QuickNote>>;

pub fn list(conn: &Connection) -> StoreResult<Vec<Note>> {
    store::kv_read_or_default(conn, NOTES_KEY)
}

pub fn add(
    conn: &mut Connection,
    content: &str,
    today: Date,
    now: OffsetDateTime,
) -> Result<Note, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::MissingContent);
    }
    store::transact(conn, |tx| {
        let mut notes: Vec<Note> = store::kv_get_or_default(tx, NOTES_KEY)?;
        let note = Note {
            id: next_id(notes.iter().map(|n| n.id), now),
            content: content.to_string(),
            timestamp: rfc3339(now),
            date: today.to_string(),
        };
        notes.insert(0, note.clone());
        store::kv_set(tx, NOTES_KEY, &notes)?;
        award_xp(tx, ADD_NOTE_XP)?;
        Ok(note)
    })
}

pub fn delete(conn: &mut Connection, id: i64) -> Result<(), AppError> {
    store::kv_try_update(conn, NOTES_KEY, |notes: &mut Vec<Note>| {
        let before = notes.len();
        notes.retain(|n| n.id != id);
        if notes.len() == before {
            Err(AppError::NotFound)
        } else {
            Ok(())
        }
    })
}

pub fn save_quick_note(
    conn: &mut Connection,
    note: &str,
    page_info: Value,
    today: Date,
    now: OffsetDateTime,
) -> Result<(), AppError> {
    let note = note.trim();
    if note.is_empty() {
        return Err(AppError::MissingContent);
    }
    let entry = QuickNote {
        note: note.to_string(),
        page_info,
        timestamp: unix_ms(now),
    };
    store::kv_update(conn, QUICK_NOTES_KEY, |all: &mut QuickNotes| {
        all.entry(today.to_string()).or_default().push(entry);
    })?;
    Ok(())
}

pub fn quick_notes(conn: &Connection) -> StoreResult<QuickNotes> {
    store::kv_read_or_default(conn, QUICK_NOTES_KEY)
}
