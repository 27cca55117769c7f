use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::store::{self, StoreError, StoreResult, APP_SETTINGS_KEY};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Zero per-tab time and visit counts when the calendar day changes.
    pub reset_tabs_daily: bool,
    /// Minutes on a productive tab before it becomes a bookmark.
    pub bookmark_min_minutes: i64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            reset_tabs_daily: true,
            bookmark_min_minutes: 5,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default)]
    pub reset_tabs_daily: Option<bool>,
    #[serde(default)]
    pub bookmark_min_minutes: Option<i64>,
}

impl SettingsUpdate {
    /// Returns the error code for the first invalid field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(v) = self.bookmark_min_minutes {
            if v < 1 {
                return Err("invalid_bookmark_min_minutes");
            }
        }
        Ok(())
    }

    pub fn apply(&self, mut settings: AppSettings) -> AppSettings {
        if let Some(v) = self.reset_tabs_daily {
            settings.reset_tabs_daily = v;
        }
        if let Some(v) = self.bookmark_min_minutes {
            settings.bookmark_min_minutes = v;
        }
        settings
    }
}

pub fn load_or_init(conn: &Connection) -> StoreResult<AppSettings> {
    match store::kv_get::<AppSettings>(conn, APP_SETTINGS_KEY) {
        Ok(Some(existing)) => return Ok(existing),
        Ok(None) => {}
        Err(StoreError::Json(err)) => {
            error!("corrupt {APP_SETTINGS_KEY}, resetting to defaults: {err}");
        }
        Err(err) => return Err(err),
    }
    let defaults = AppSettings::default();
    store::kv_set(conn, APP_SETTINGS_KEY, &defaults)?;
    Ok(defaults)
}

pub fn save(conn: &Connection, settings: AppSettings) -> StoreResult<()> {
    store::kv_set(conn, APP_SETTINGS_KEY, &settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_persisted_once() {
        let conn = store::test_conn();
        let s = load_or_init(&conn).unwrap();
        assert_eq!(s, AppSettings::default());

        save(&conn, AppSettings { reset_tabs_daily: false, bookmark_min_minutes: 9 }).unwrap();
        let s = load_or_init(&conn).unwrap();
        assert!(!s.reset_tabs_daily);
        assert_eq!(s.bookmark_min_minutes, 9);
    }

    #[test]
    fn corrupt_settings_are_replaced_with_defaults() {
        let conn = store::test_conn();
        store::kv_set(&conn, APP_SETTINGS_KEY, &"garbage").unwrap();
        assert_eq!(load_or_init(&conn).unwrap(), AppSettings::default());
        let stored: Option<AppSettings> = store::kv_get(&conn, APP_SETTINGS_KEY).unwrap();
        assert_eq!(stored, Some(AppSettings::default()));
    }

    #[test]
    fn update_validation() {
        let bad = SettingsUpdate { bookmark_min_minutes: Some(0), ..Default::default() };
        assert_eq!(bad.validate(), Err("invalid_bookmark_min_minutes"));

        let ok = SettingsUpdate { reset_tabs_daily: Some(false), ..Default::default() };
        assert!(ok.validate().is_ok());
        let s = ok.apply(AppSettings::default());
        assert!(!s.reset_tabs_daily);
        assert_eq!(s.bookmark_min_minutes, 5);
    }
}
