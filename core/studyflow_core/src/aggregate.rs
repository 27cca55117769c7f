use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime, UtcOffset};
use tracing::{info, warn};

use crate::classify::Category;
use crate::clock::{self, parse_date};
use crate::settings::AppSettings;
use crate::store::{self, StoreResult, LAST_AGGREGATED_DATE_KEY};
use crate::tracker::{persist_dirty, TabAccountant, TabRecord};

pub const DEFAULT_STATS_DAYS: i64 = 7;
const MAX_STATS_DAYS: i64 = 366;

/// One aggregate per calendar date. Times are whole minutes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: String,
    pub total_time: i64,
    pub productive_time: i64,
    pub distracting_time: i64,
    pub neutral_time: i64,
    pub tabs_switched: i64,
    pub focus_score: i64,
}

impl DailySummary {
    pub fn empty(date: &str) -> Self {
        Self {
            date: date.to_string(),
            ..Default::default()
        }
    }
}

pub fn seconds_to_minutes(seconds: i64) -> i64 {
    seconds.max(0) / 60
}

/// `round(clamp(p/t*100 - d/t*30, 0, 100))`, or 0 for an empty day.
pub fn focus_score(productive: i64, distracting: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    let t = total as f64;
    let raw = productive as f64 / t * 100.0 - distracting as f64 / t * 30.0;
    raw.clamp(0.0, 100.0).round() as i64
}

pub fn summarize<'a>(date: &str, records: impl IntoIterator<Item = &'a TabRecord>) -> DailySummary {
    let mut s = DailySummary::empty(date);
    for rec in records {
        let minutes = seconds_to_minutes(rec.time_spent);
        match rec.category {
            Category::Productive => s.productive_time += minutes,
            Category::Distracting => s.distracting_time += minutes,
            Category::Neutral => s.neutral_time += minutes,
        }
        s.total_time += minutes;
        s.tabs_switched += rec.visit_count.max(0);
    }
    s.focus_score = focus_score(s.productive_time, s.distracting_time, s.total_time);
    s
}

pub fn save_summary(conn: &Connection, summary: &DailySummary) -> StoreResult<()> {
    store::kv_set(conn, &store::daily_key(&summary.date), summary)
}

pub fn load_summary(conn: &Connection, date: &str) -> StoreResult<Option<DailySummary>> {
    store::kv_get(conn, &store::daily_key(date))
}

/// The last `days` summaries ending at `today`, oldest first, gaps zero-filled.
pub fn daily_stats(conn: &Connection, today: Date, days: i64) -> StoreResult<Vec<DailySummary>> {
    let days = days.clamp(1, MAX_STATS_DAYS);
    let mut out = Vec::with_capacity(days as usize);
    for back in (0..days).rev() {
        let Some(day) = today.checked_sub(Duration::days(back)) else {
            continue;
        };
        let date = day.to_string();
        out.push(load_summary(conn, &date)?.unwrap_or_else(|| DailySummary::empty(&date)));
    }
    Ok(out)
}

/// Remembers which calendar day the previous tick aggregated into.
#[derive(Debug, Default)]
pub struct Rollover {
    last_date: Option<Date>,
}

impl Rollover {
    pub fn load(conn: &Connection) -> StoreResult<Self> {
        let raw: Option<String> = store::kv_read_or_default(conn, LAST_AGGREGATED_DATE_KEY)?;
        let last_date = raw.as_deref().and_then(parse_date);
        if raw.is_some() && last_date.is_none() {
            warn!("ignoring malformed {LAST_AGGREGATED_DATE_KEY}");
        }
        Ok(Self { last_date })
    }

    pub fn last_date(&self) -> Option<Date> {
        self.last_date
    }
}

/// One aggregation pass: checkpoint the current tab, finalize the previous
/// day on rollover, then overwrite today's summary and persist touched tabs.
pub fn run_tick(
    conn: &mut Connection,
    acc: &mut TabAccountant,
    rollover: &mut Rollover,
    settings: AppSettings,
    now: OffsetDateTime,
    tz: UtcOffset,
) -> StoreResult<DailySummary> {
    acc.checkpoint(now);
    let today = clock::today(now, tz);

    if let Some(prev) = rollover.last_date.filter(|d| *d != today) {
        let closing = summarize(&prev.to_string(), acc.records());
        // Closing summary and the new marker commit together.
        store::transact(conn, |tx| {
            save_summary(tx, &closing)?;
            store::kv_set(tx, LAST_AGGREGATED_DATE_KEY, &today.to_string())
        })?;
        rollover.last_date = Some(today);
        info!(
            "day {} closed: {} min, focus score {}",
            closing.date, closing.total_time, closing.focus_score
        );
        if settings.reset_tabs_daily {
            acc.reset_daily();
        }
    }

    let summary = summarize(&today.to_string(), acc.records());
    save_summary(conn, &summary)?;

    if rollover.last_date != Some(today) {
        store::kv_set(conn, LAST_AGGREGATED_DATE_KEY, &today.to_string())?;
        rollover.last_date = Some(today);
    }

    persist_dirty(conn, acc)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::at;

    #[test]
    fn focus_score_bounds() {
        assert_eq!(focus_score(0, 0, 0), 0);
        assert_eq!(focus_score(10, 0, 10), 100);
        assert_eq!(focus_score(0, 10, 10), 0);
        assert_eq!(focus_score(5, 5, 10), 35);
        assert_eq!(focus_score(1, 0, 3), 33);
        for p in 0..=10 {
            for d in 0..=(10 - p) {
                let s = focus_score(p, d, 10);
                assert!((0..=100).contains(&s), "{p} {d} -> {s}");
            }
        }
    }

    #[test]
    fn thirty_seconds_is_zero_minutes_sixty_is_one() {
        let mut conn = store::test_conn();
        let t0 = at("2026-02-15T10:00:00Z");
        let mut acc = TabAccountant::new(t0);
        let mut rollover = Rollover::default();
        acc.activate(1, "https://www.khanacademy.org/", None, t0);

        let s = run_tick(
            &mut conn,
            &mut acc,
            &mut rollover,
            AppSettings::default(),
            t0 + Duration::seconds(30),
            UtcOffset::UTC,
        )
        .unwrap();
        assert_eq!(s.total_time, 0);
        assert_eq!(s.focus_score, 0);

        let s = run_tick(
            &mut conn,
            &mut acc,
            &mut rollover,
            AppSettings::default(),
            t0 + Duration::seconds(60),
            UtcOffset::UTC,
        )
        .unwrap();
        assert_eq!(s.total_time, 1);
        assert_eq!(s.productive_time, 1);
        assert_eq!(s.focus_score, 100);
        assert_eq!(s.tabs_switched, 1);
        assert!(acc.record(1).unwrap().is_active);

        let stored = load_summary(&conn, "2026-02-15").unwrap().unwrap();
        assert_eq!(stored, s);
    }

    #[test]
    fn summary_buckets_by_category() {
        let t0 = at("2026-02-15T10:00:00Z");
        let mut acc = TabAccountant::new(t0);
        acc.activate(1, "https://github.com", None, t0);
        acc.activate(2, "https://reddit.com", None, t0 + Duration::minutes(6));
        acc.activate(3, "https://example.org", None, t0 + Duration::minutes(8));
        acc.flush(t0 + Duration::minutes(10));

        let s = summarize("2026-02-15", acc.records());
        assert_eq!(s.productive_time, 6);
        assert_eq!(s.distracting_time, 2);
        assert_eq!(s.neutral_time, 2);
        assert_eq!(s.total_time, 10);
        assert_eq!(s.tabs_switched, 3);
        assert_eq!(s.focus_score, 54);
    }

    #[test]
    fn rollover_closes_previous_day_and_resets() {
        let mut conn = store::test_conn();
        let t0 = at("2026-02-15T23:58:00Z");
        let mut acc = TabAccountant::new(t0);
        let mut rollover = Rollover::default();
        acc.activate(1, "https://github.com", None, t0);
        run_tick(&mut conn, &mut acc, &mut rollover, AppSettings::default(), t0, UtcOffset::UTC)
            .unwrap();

        let next = at("2026-02-16T00:01:00Z");
        let s = run_tick(&mut conn, &mut acc, &mut rollover, AppSettings::default(), next, UtcOffset::UTC)
            .unwrap();
        assert_eq!(s.date, "2026-02-16");
        assert_eq!(s.total_time, 0);

        let closed = load_summary(&conn, "2026-02-15").unwrap().unwrap();
        assert_eq!(closed.total_time, 3);
        assert_eq!(Rollover::load(&conn).unwrap().last_date().unwrap().to_string(), "2026-02-16");
    }

    #[test]
    fn failed_write_after_rollover_keeps_closed_day() {
        let mut conn = store::test_conn();
        let t0 = at("2026-02-15T23:58:00Z");
        let mut acc = TabAccountant::new(t0);
        let mut rollover = Rollover::default();
        acc.activate(1, "https://github.com", None, t0);
        run_tick(&mut conn, &mut acc, &mut rollover, AppSettings::default(), t0, UtcOffset::UTC)
            .unwrap();

        conn.execute_batch(
            "CREATE TRIGGER fail_today BEFORE INSERT ON kv WHEN NEW.key = 'daily_2026-02-16' \
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();
        let next = at("2026-02-16T00:01:00Z");
        let res = run_tick(&mut conn, &mut acc, &mut rollover, AppSettings::default(), next, UtcOffset::UTC);
        assert!(res.is_err());
        assert_eq!(rollover.last_date().unwrap().to_string(), "2026-02-16");

        conn.execute_batch("DROP TRIGGER fail_today;").unwrap();
        let later = at("2026-02-16T00:02:00Z");
        let s = run_tick(&mut conn, &mut acc, &mut rollover, AppSettings::default(), later, UtcOffset::UTC)
            .unwrap();
        assert_eq!(s.total_time, 1);

        let closed = load_summary(&conn, "2026-02-15").unwrap().unwrap();
        assert_eq!(closed.total_time, 3);
        assert_eq!(Rollover::load(&conn).unwrap().last_date().unwrap().to_string(), "2026-02-16");
    }

    #[test]
    fn cumulative_mode_keeps_time_across_days() {
        let mut conn = store::test_conn();
        let settings = AppSettings { reset_tabs_daily: false, ..Default::default() };
        let t0 = at("2026-02-15T23:58:00Z");
        let mut acc = TabAccountant::new(t0);
        let mut rollover = Rollover::default();
        acc.activate(1, "https://github.com", None, t0);
        run_tick(&mut conn, &mut acc, &mut rollover, settings, t0, UtcOffset::UTC).unwrap();
        let s = run_tick(
            &mut conn,
            &mut acc,
            &mut rollover,
            settings,
            at("2026-02-16T00:01:00Z"),
            UtcOffset::UTC,
        )
        .unwrap();
        assert_eq!(s.total_time, 3);
    }

    #[test]
    fn daily_stats_zero_fills_oldest_first() {
        let conn = store::test_conn();
        let mut s = DailySummary::empty("2026-02-14");
        s.total_time = 42;
        save_summary(&conn, &s).unwrap();

        let today = parse_date("2026-02-15").unwrap();
        let stats = daily_stats(&conn, today, 3).unwrap();
        let dates: Vec<&str> = stats.iter().map(|s| s.date.as_str()).collect();
        assert_eq!(dates, vec!["2026-02-13", "2026-02-14", "2026-02-15"]);
        assert_eq!(stats[1].total_time, 42);
        assert_eq!(stats[2].total_time, 0);
        assert_eq!(daily_stats(&conn, today, 0).unwrap().len(), 1);
    }
}
