use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::{Date, Duration, OffsetDateTime};
use tracing::info;

use crate::classify::hostname;
use crate::clock::{parse_date, unix_ms};
use crate::store::{
    self, StoreResult, ACTIVITY_LOG_KEY, LAST_ACTIVE_DATE_KEY, SITE_TIME_KEY, STREAK_KEY, XP_KEY,
};

pub const DAILY_ACTIVITY_XP: i64 = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub url: String,
    /// Unix milliseconds.
    pub timestamp: i64,
}

pub type ActivityLog = BTreeMap<String, Vec<ActivityEntry>>;
pub type SiteTime = BTreeMap<String, BTreeMap<String, i64>>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub xp: i64,
    pub streak: i64,
    pub activity_log: ActivityLog,
    pub site_time: SiteTime,
}

#[derive(Debug, PartialEq, Eq)]
pub struct StreakUpdate {
    pub streak: i64,
    pub xp: i64,
    /// False when today was already counted.
    pub advanced: bool,
}

/// Adds `amount` (possibly negative) and returns the new total.
pub fn add_xp(conn: &mut Connection, amount: i64) -> StoreResult<i64> {
    store::transact(conn, |tx| award_xp(tx, amount))
}

/// [`add_xp`] for callers that already hold a transaction.
pub fn award_xp(conn: &Connection, amount: i64) -> StoreResult<i64> {
    let xp: i64 = store::kv_get_or_default(conn, XP_KEY)?;
    let xp = xp.saturating_add(amount);
    store::kv_set(conn, XP_KEY, &xp)?;
    Ok(xp)
}

pub fn xp(conn: &Connection) -> StoreResult<i64> {
    store::kv_read_or_default(conn, XP_KEY)
}

/// First activity of a day: extend or restart the streak and award the
/// daily XP. Later calls on the same day change nothing.
pub fn update_streak_and_xp(conn: &mut Connection, today: Date) -> StoreResult<StreakUpdate> {
    let today_str = today.to_string();
    store::transact(conn, |tx| {
        let last: Option<String> = store::kv_get(tx, LAST_ACTIVE_DATE_KEY)?;
        let streak: i64 = store::kv_get_or_default(tx, STREAK_KEY)?;
        let xp: i64 = store::kv_get_or_default(tx, XP_KEY)?;

        if last.as_deref() == Some(today_str.as_str()) {
            return Ok(StreakUpdate { streak, xp, advanced: false });
        }

        let yesterday = today.checked_sub(Duration::days(1));
        let continued = last.as_deref().and_then(parse_date).is_some_and(|d| Some(d) == yesterday);
        let streak = if continued { streak + 1 } else { 1 };
        let xp = xp + DAILY_ACTIVITY_XP;

        store::kv_set(tx, STREAK_KEY, &streak)?;
        store::kv_set(tx, XP_KEY, &xp)?;
        store::kv_set(tx, LAST_ACTIVE_DATE_KEY, &today_str)?;
        info!("streak {streak} (xp {xp})");
        Ok::<_, store::StoreError>(StreakUpdate { streak, xp, advanced: true })
    })
}

pub fn log_activity(
    conn: &mut Connection,
    url: &str,
    today: Date,
    now: OffsetDateTime,
) -> StoreResult<()> {
    let entry = ActivityEntry {
        url: url.to_string(),
        timestamp: unix_ms(now),
    };
    store::kv_update(conn, ACTIVITY_LOG_KEY, |log: &mut ActivityLog| {
        log.entry(today.to_string()).or_default().push(entry);
    })
}

/// Bumps today's visit counter for the URL's host. Returns false for URLs
/// without a host.
pub fn track_site_visit(conn: &mut Connection, url: &str, today: Date) -> StoreResult<bool> {
    let Some(host) = hostname(url) else {
        return Ok(false);
    };
    store::kv_update(conn, SITE_TIME_KEY, |sites: &mut SiteTime| {
        *sites
            .entry(today.to_string())
            .or_default()
            .entry(host)
            .or_insert(0) += 1;
    })?;
    Ok(true)
}

pub fn stats(conn: &Connection) -> StoreResult<Stats> {
    Ok(Stats {
        xp: xp(conn)?,
        streak: store::kv_read_or_default(conn, STREAK_KEY)?,
        activity_log: store::kv_read_or_default(conn, ACTIVITY_LOG_KEY)?,
        site_time: store::kv_read_or_default(conn, SITE_TIME_KEY)?,
    })
}
