use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::{de::DeserializeOwned, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::error;

pub const BLOCKED_SITES_KEY: &str = "blockedSites";
pub const ACTIVITY_LOG_KEY: &str = "activityLog";
pub const XP_KEY: &str = "xp";
pub const STREAK_KEY: &str = "streak";
pub const LAST_ACTIVE_DATE_KEY: &str = "lastActiveDate";
pub const SITE_TIME_KEY: &str = "siteTime";
pub const REMINDERS_KEY: &str = "reminders";
pub const GOALS_KEY: &str = "goals";
pub const NOTES_KEY: &str = "notes";
pub const QUICK_NOTES_KEY: &str = "quickNotes";
pub const BOOKMARKS_KEY: &str = "productiveBookmarks";
pub const POMODORO_SETTINGS_KEY: &str = "pomodoroSettings";
pub const APP_SETTINGS_KEY: &str = "appSettings";
pub const LAST_AGGREGATED_DATE_KEY: &str = "lastAggregatedDate";

pub const TAB_KEY_PREFIX: &str = "tab_";
pub const DAILY_KEY_PREFIX: &str = "daily_";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub fn tab_key(tab_id: i64) -> String {
    format!("{TAB_KEY_PREFIX}{tab_id}")
}

pub fn daily_key(date: &str) -> String {
    format!("{DAILY_KEY_PREFIX}{date}")
}

/// File-backed databases only; in-memory connections keep the default journal.
pub fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
"#,
    )
}

pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS kv (
  key TEXT PRIMARY KEY,
  value_json TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
"#,
    )
}

pub fn kv_get<T: DeserializeOwned>(conn: &Connection, key: &str) -> StoreResult<Option<T>> {
    let raw: Option<String> = conn
        .query_row("SELECT value_json FROM kv WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn kv_get_or_default<T: DeserializeOwned + Default>(
    conn: &Connection,
    key: &str,
) -> StoreResult<T> {
    Ok(kv_get(conn, key)?.unwrap_or_default())
}

/// Read-path form of [`kv_get_or_default`]: a value that no longer decodes
/// is logged and read as `T::default()`. Transactional writers stay strict.
pub fn kv_read_or_default<T: DeserializeOwned + Default>(
    conn: &Connection,
    key: &str,
) -> StoreResult<T> {
    match kv_get(conn, key) {
        Ok(value) => Ok(value.unwrap_or_default()),
        Err(StoreError::Json(err)) => {
            error!("corrupt value under {key}, reading default: {err}");
            Ok(T::default())
        }
        Err(err) => Err(err),
    }
}

pub fn kv_set<T: Serialize + ?Sized>(conn: &Connection, key: &str, value: &T) -> StoreResult<()> {
    let value_json = serde_json::to_string(value)?;
    let updated_at = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    conn.execute(
        r#"
INSERT INTO kv (key, value_json, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
  value_json=excluded.value_json,
  updated_at=excluded.updated_at
"#,
        (key, value_json, updated_at),
    )?;
    Ok(())
}

/// Every entry whose key starts with `prefix`, ordered by key. Entries that
/// fail to decode are logged and skipped.
pub fn kv_scan_prefix<T: DeserializeOwned>(
    conn: &Connection,
    prefix: &str,
) -> StoreResult<Vec<(String, T)>> {
    let mut stmt = conn.prepare(
        "SELECT key, value_json FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
    )?;
    let rows = stmt.query_map([prefix], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut out = Vec::new();
    for r in rows {
        let (key, raw) = r?;
        match serde_json::from_str(&raw) {
            Ok(value) => out.push((key, value)),
            Err(err) => error!("skipping corrupt entry {key}: {err}"),
        }
    }
    Ok(out)
}

/// Runs `f` inside one IMMEDIATE transaction. An `Err` from `f` rolls back.
pub fn transact<R, E, F>(conn: &mut Connection, f: F) -> Result<R, E>
where
    E: From<StoreError>,
    F: FnOnce(&Transaction<'_>) -> Result<R, E>,
{
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(StoreError::from)?;
    let out = f(&tx)?;
    tx.commit().map_err(StoreError::from)?;
    Ok(out)
}

/// Atomic read-modify-write of one key. A missing value starts from `T::default()`.
pub fn kv_update<T, R, F>(conn: &mut Connection, key: &str, f: F) -> StoreResult<R>
where
    T: DeserializeOwned + Serialize + Default,
    F: FnOnce(&mut T) -> R,
{
    transact(conn, |tx| {
        let mut value: T = kv_get_or_default(tx, key)?;
        let out = f(&mut value);
        kv_set(tx, key, &value)?;
        Ok(out)
    })
}

/// Like [`kv_update`], but `f` may reject the change; nothing is written then.
pub fn kv_try_update<T, R, E, F>(conn: &mut Connection, key: &str, f: F) -> Result<R, E>
where
    T: DeserializeOwned + Serialize + Default,
    E: From<StoreError>,
    F: FnOnce(&mut T) -> Result<R, E>,
{
    transact(conn, |tx| {
        let mut value: T = kv_get_or_default(tx, key)?;
        let out = f(&mut value)?;
        kv_set(tx, key, &value)?;
        Ok(out)
    })
}

#[cfg(test)]
pub fn test_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    init_db(&conn).unwrap();
    conn
}
