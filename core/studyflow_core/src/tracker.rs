use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::classify::{classify_domain, extract_domain, is_trackable_url, Category};
use crate::clock::rfc3339;
use crate::store::{self, StoreResult, TAB_KEY_PREFIX};

fn default_visit_count() -> i64 {
    1
}

/// Per-tab bookkeeping, persisted as `tab_<id>`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub id: String,
    pub title: String,
    pub url: String,
    pub domain: String,
    pub category: Category,
    /// Seconds.
    #[serde(rename = "timeSpent")]
    pub time_spent: i64,
    pub is_active: bool,
    pub last_accessed: String,
    #[serde(default = "default_visit_count")]
    pub visit_count: i64,
}

/// Display form of a record; `timeSpent` is in whole minutes.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabView {
    pub id: String,
    pub title: String,
    pub url: String,
    pub domain: String,
    pub category: Category,
    pub time_spent: i64,
    pub is_active: bool,
    pub last_accessed: String,
    pub visit_count: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleState {
    Active,
    Idle,
    Locked,
}

/// Owns every tab record and attributes foreground time to the current tab.
///
/// Time accrues only while a tab is current and accounting is not
/// suspended (window unfocused, or the machine idle/locked). Every flush
/// resets the reference timestamp, so back-to-back flushes never count the
/// same interval twice.
pub struct TabAccountant {
    tabs: HashMap<i64, TabRecord>,
    current: Option<i64>,
    last_active_at: OffsetDateTime,
    suspended: bool,
    dirty: BTreeSet<i64>,
}

fn elapsed_seconds(from: OffsetDateTime, to: OffsetDateTime) -> i64 {
    let ms = (to - from).whole_milliseconds();
    if ms <= 0 {
        return 0;
    }
    ((ms + 500) / 1000) as i64
}

impl TabAccountant {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            tabs: HashMap::new(),
            current: None,
            last_active_at: now,
            suspended: false,
            dirty: BTreeSet::new(),
        }
    }

    /// Rebuilds from persisted records. Nothing is current after a restart.
    pub fn from_records(records: Vec<(i64, TabRecord)>, now: OffsetDateTime) -> Self {
        let mut acc = Self::new(now);
        for (id, mut rec) in records {
            if rec.is_active {
                rec.is_active = false;
                acc.dirty.insert(id);
            }
            acc.tabs.insert(id, rec);
        }
        acc
    }

    pub fn current(&self) -> Option<i64> {
        self.current
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn record(&self, tab_id: i64) -> Option<&TabRecord> {
        self.tabs.get(&tab_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &TabRecord> {
        self.tabs.values()
    }

    fn upsert(&mut self, tab_id: i64, url: &str, title: Option<&str>, now: OffsetDateTime) {
        let domain = extract_domain(url);
        let category = classify_domain(&domain);
        let title = title.map(str::trim).filter(|t| !t.is_empty());
        let ts = rfc3339(now);

        match self.tabs.get_mut(&tab_id) {
            Some(rec) => {
                if let Some(t) = title {
                    rec.title = t.to_string();
                }
                rec.url = url.to_string();
                rec.domain = domain;
                rec.category = category;
                rec.visit_count = rec.visit_count.max(0) + 1;
                rec.last_accessed = ts;
            }
            None => {
                self.tabs.insert(
                    tab_id,
                    TabRecord {
                        id: tab_id.to_string(),
                        title: title.unwrap_or("Unknown").to_string(),
                        url: url.to_string(),
                        domain,
                        category,
                        time_spent: 0,
                        is_active: false,
                        last_accessed: ts,
                        visit_count: 1,
                    },
                );
            }
        }
        self.dirty.insert(tab_id);
    }

    /// Credits the current tab with the time since the last reset and resets
    /// the timestamp. Returns the seconds credited.
    pub fn flush(&mut self, now: OffsetDateTime) -> i64 {
        let elapsed = if self.suspended {
            0
        } else {
            elapsed_seconds(self.last_active_at, now)
        };
        self.last_active_at = now;

        let Some(id) = self.current else {
            return 0;
        };
        let Some(rec) = self.tabs.get_mut(&id) else {
            return 0;
        };
        rec.time_spent += elapsed;
        rec.is_active = false;
        self.dirty.insert(id);
        debug!(
            "flushed {elapsed}s to {} (total {}s)",
            rec.domain, rec.time_spent
        );
        elapsed
    }

    /// Periodic flush that keeps the current tab marked active.
    pub fn checkpoint(&mut self, now: OffsetDateTime) -> i64 {
        if self.suspended {
            return 0;
        }
        let credited = self.flush(now);
        if let Some(rec) = self.current.and_then(|id| self.tabs.get_mut(&id)) {
            rec.is_active = true;
        }
        credited
    }

    /// Returns whether the tab was trackable and is now current.
    pub fn activate(
        &mut self,
        tab_id: i64,
        url: &str,
        title: Option<&str>,
        now: OffsetDateTime,
    ) -> bool {
        if self.current.is_some() {
            self.flush(now);
        }

        if !is_trackable_url(url) {
            self.current = None;
            return false;
        }

        self.upsert(tab_id, url, title, now);
        if let Some(rec) = self.tabs.get_mut(&tab_id) {
            rec.is_active = true;
            info!("tab activated: {} ({})", rec.domain, rec.category.as_str());
        }
        self.current = Some(tab_id);
        self.last_active_at = now;
        self.suspended = false;
        true
    }

    /// Navigation finished in some tab: reclassify without touching time.
    pub fn update(
        &mut self,
        tab_id: i64,
        url: &str,
        title: Option<&str>,
        now: OffsetDateTime,
    ) -> bool {
        if !is_trackable_url(url) {
            return false;
        }
        self.upsert(tab_id, url, title, now);
        true
    }

    pub fn remove(&mut self, tab_id: i64, now: OffsetDateTime) {
        if self.current == Some(tab_id) {
            self.flush(now);
            self.current = None;
        }
        if let Some(rec) = self.tabs.get_mut(&tab_id) {
            rec.is_active = false;
            self.dirty.insert(tab_id);
        }
    }

    pub fn window_focus_changed(&mut self, focused: bool, now: OffsetDateTime) {
        if focused {
            self.resume(now);
        } else {
            self.suspend(now);
        }
    }

    pub fn idle_state_changed(&mut self, state: IdleState, now: OffsetDateTime) {
        match state {
            IdleState::Active => self.resume(now),
            IdleState::Idle | IdleState::Locked => self.suspend(now),
        }
    }

    fn suspend(&mut self, now: OffsetDateTime) {
        if self.suspended {
            return;
        }
        self.flush(now);
        self.suspended = true;
    }

    fn resume(&mut self, now: OffsetDateTime) {
        self.last_active_at = now;
        self.suspended = false;
        if let Some(id) = self.current {
            if let Some(rec) = self.tabs.get_mut(&id) {
                if !rec.is_active {
                    rec.is_active = true;
                    self.dirty.insert(id);
                }
            }
        }
    }

    /// Zeroes accumulated time and visit counts at day rollover.
    pub fn reset_daily(&mut self) {
        for (id, rec) in self.tabs.iter_mut() {
            rec.time_spent = 0;
            rec.visit_count = 0;
            self.dirty.insert(*id);
        }
    }

    /// Records sorted by minutes spent, then by most recent access.
    pub fn views(&self) -> Vec<TabView> {
        let mut out: Vec<TabView> = self
            .tabs
            .values()
            .map(|r| TabView {
                id: r.id.clone(),
                title: r.title.clone(),
                url: r.url.clone(),
                domain: r.domain.clone(),
                category: r.category,
                time_spent: r.time_spent.max(0) / 60,
                is_active: r.is_active,
                last_accessed: r.last_accessed.clone(),
                visit_count: r.visit_count,
            })
            .collect();
        out.sort_by(|a, b| {
            b.time_spent
                .cmp(&a.time_spent)
                .then_with(|| b.last_accessed.cmp(&a.last_accessed))
        });
        out
    }

    fn take_dirty(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }
}

pub fn load_accountant(conn: &Connection, now: OffsetDateTime) -> StoreResult<TabAccountant> {
    let mut records = Vec::new();
    for (key, rec) in store::kv_scan_prefix::<TabRecord>(conn, TAB_KEY_PREFIX)? {
        match key[TAB_KEY_PREFIX.len()..].parse::<i64>() {
            Ok(id) => records.push((id, rec)),
            Err(_) => warn!("ignoring malformed tab key {key}"),
        }
    }
    info!("loaded {} tab records", records.len());
    Ok(TabAccountant::from_records(records, now))
}

/// Writes every record touched since the last call. On failure the ids stay
/// queued for the next attempt.
pub fn persist_dirty(conn: &mut Connection, acc: &mut TabAccountant) -> StoreResult<usize> {
    let ids = acc.take_dirty();
    if ids.is_empty() {
        return Ok(0);
    }
    let res = store::transact(conn, |tx| {
        for id in &ids {
            if let Some(rec) = acc.tabs.get(id) {
                store::kv_set(tx, &store::tab_key(*id), rec)?;
            }
        }
        Ok::<_, store::StoreError>(ids.len())
    });
    if res.is_err() {
        acc.dirty.extend(ids);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::at;
    use time::Duration;

    fn t0() -> OffsetDateTime {
        at("2026-02-15T10:00:00Z")
    }

    #[test]
    fn switching_tabs_credits_previous_tab() {
        let mut acc = TabAccountant::new(t0());
        assert!(acc.activate(1, "https://www.khanacademy.org/", Some("Khan"), t0()));
        assert!(acc.activate(2, "https://reddit.com/r/rust", None, t0() + Duration::seconds(30)));

        let a = acc.record(1).unwrap();
        assert_eq!(a.time_spent, 30);
        assert!(!a.is_active);
        assert_eq!(a.category, Category::Productive);
        let b = acc.record(2).unwrap();
        assert_eq!(b.time_spent, 0);
        assert!(b.is_active);
        assert_eq!(b.title, "Unknown");
        assert_eq!(acc.current(), Some(2));
    }

    #[test]
    fn reactivating_current_tab_credits_it_once() {
        let mut acc = TabAccountant::new(t0());
        acc.activate(1, "https://github.com", None, t0());
        assert!(acc.activate(1, "https://github.com", None, t0() + Duration::seconds(40)));
        assert_eq!(acc.record(1).unwrap().time_spent, 40);
        assert_eq!(acc.checkpoint(t0() + Duration::seconds(50)), 10);
        assert_eq!(acc.record(1).unwrap().time_spent, 50);
        assert!(acc.record(1).unwrap().is_active);
    }

    #[test]
    fn second_flush_without_activity_adds_nothing() {
        let mut acc = TabAccountant::new(t0());
        acc.activate(1, "https://github.com", None, t0());
        assert_eq!(acc.flush(t0() + Duration::seconds(20)), 20);
        assert_eq!(acc.flush(t0() + Duration::seconds(20)), 0);
        assert_eq!(acc.record(1).unwrap().time_spent, 20);
    }

    #[test]
    fn untracked_pages_are_ignored_and_stop_accounting() {
        let mut acc = TabAccountant::new(t0());
        acc.activate(1, "https://github.com", None, t0());
        assert!(!acc.activate(2, "chrome://settings", None, t0() + Duration::seconds(10)));
        assert!(acc.record(2).is_none());
        assert_eq!(acc.current(), None);
        assert_eq!(acc.checkpoint(t0() + Duration::seconds(100)), 0);
        assert_eq!(acc.record(1).unwrap().time_spent, 10);
    }

    #[test]
    fn update_reclassifies_without_flushing() {
        let mut acc = TabAccountant::new(t0());
        acc.activate(1, "https://github.com", None, t0());
        assert!(acc.update(1, "https://www.netflix.com/browse", Some("Netflix"), t0() + Duration::seconds(40)));
        let rec = acc.record(1).unwrap();
        assert_eq!(rec.time_spent, 0);
        assert_eq!(rec.domain, "netflix.com");
        assert_eq!(rec.category, Category::Distracting);
        assert_eq!(rec.visit_count, 2);
    }

    #[test]
    fn removal_flushes_and_keeps_record() {
        let mut acc = TabAccountant::new(t0());
        acc.activate(7, "https://arxiv.org", None, t0());
        acc.remove(7, t0() + Duration::seconds(45));
        let rec = acc.record(7).unwrap();
        assert_eq!(rec.time_spent, 45);
        assert!(!rec.is_active);
        assert_eq!(acc.current(), None);
    }

    #[test]
    fn idle_time_is_not_counted() {
        let mut acc = TabAccountant::new(t0());
        acc.activate(1, "https://github.com", None, t0());
        acc.idle_state_changed(IdleState::Idle, t0() + Duration::seconds(60));
        assert!(acc.is_suspended());
        assert_eq!(acc.checkpoint(t0() + Duration::seconds(600)), 0);
        acc.idle_state_changed(IdleState::Active, t0() + Duration::seconds(900));
        assert!(acc.record(1).unwrap().is_active);
        assert_eq!(acc.checkpoint(t0() + Duration::seconds(915)), 15);
        assert_eq!(acc.record(1).unwrap().time_spent, 75);
    }

    #[test]
    fn unfocus_then_focus_resumes_same_tab() {
        let mut acc = TabAccountant::new(t0());
        acc.activate(1, "https://github.com", None, t0());
        acc.window_focus_changed(false, t0() + Duration::seconds(10));
        acc.window_focus_changed(false, t0() + Duration::seconds(20));
        acc.window_focus_changed(true, t0() + Duration::seconds(300));
        acc.remove(1, t0() + Duration::seconds(305));
        assert_eq!(acc.record(1).unwrap().time_spent, 15);
    }

    #[test]
    fn views_are_sorted_by_minutes() {
        let mut acc = TabAccountant::new(t0());
        acc.activate(1, "https://github.com", None, t0());
        acc.activate(2, "https://reddit.com", None, t0() + Duration::seconds(60));
        acc.activate(3, "https://example.org", None, t0() + Duration::seconds(240));
        acc.flush(t0() + Duration::seconds(300));
        let views = acc.views();
        let order: Vec<&str> = views.iter().map(|v| v.domain.as_str()).collect();
        // github and example tie at one minute; the later access wins
        assert_eq!(order, vec!["reddit.com", "example.org", "github.com"]);
        assert_eq!(views[0].time_spent, 3);
    }

    #[test]
    fn persist_and_reload() {
        let mut conn = store::test_conn();
        let mut acc = TabAccountant::new(t0());
        acc.activate(3, "https://github.com", Some("GitHub"), t0());
        acc.flush(t0() + Duration::seconds(90));
        assert_eq!(persist_dirty(&mut conn, &mut acc).unwrap(), 1);
        assert_eq!(persist_dirty(&mut conn, &mut acc).unwrap(), 0);

        let loaded = load_accountant(&conn, t0()).unwrap();
        let rec = loaded.record(3).unwrap();
        assert_eq!(rec.time_spent, 90);
        assert_eq!(rec.title, "GitHub");
        assert_eq!(loaded.current(), None);
    }
}
