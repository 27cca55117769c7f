use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::error;

use crate::classify::{is_trackable_url, Category};
use crate::error::AppError;
use crate::progress;
use crate::state::AppState;
use crate::tracker::{persist_dirty, IdleState};

/// Envelope posted by the browser extension for tab, window and idle changes.
#[derive(Debug, Deserialize)]
pub struct IngestEvent {
    pub v: i32,
    #[serde(flatten)]
    pub event: TabEvent,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TabEvent {
    TabActivated {
        #[serde(rename = "tabId")]
        tab_id: i64,
        #[serde(default)]
        url: String,
        #[serde(default)]
        title: Option<String>,
    },
    TabUpdated {
        #[serde(rename = "tabId")]
        tab_id: i64,
        #[serde(default)]
        url: String,
        #[serde(default)]
        title: Option<String>,
    },
    TabRemoved {
        #[serde(rename = "tabId")]
        tab_id: i64,
    },
    WindowFocus,
    WindowBlur,
    IdleState {
        state: IdleState,
    },
}

impl TabEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TabEvent::TabActivated { .. } => "tab_activated",
            TabEvent::TabUpdated { .. } => "tab_updated",
            TabEvent::TabRemoved { .. } => "tab_removed",
            TabEvent::WindowFocus => "window_focus",
            TabEvent::WindowBlur => "window_blur",
            TabEvent::IdleState { .. } => "idle_state",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOutcome {
    pub tracked: bool,
    pub current_tab: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub suspended: bool,
}

/// Applies one event to the accountant, persists touched records and, for
/// trackable navigation, records the visit.
pub async fn apply_event(
    state: &AppState,
    event: TabEvent,
    now: OffsetDateTime,
) -> Result<EventOutcome, AppError> {
    let today = state.today(now);
    let mut acc = state.tracker.lock().await;

    let (tracked, visited_url, activated) = match event {
        TabEvent::TabActivated { tab_id, url, title } => {
            let tracked = acc.activate(tab_id, &url, title.as_deref(), now);
            (tracked, tracked.then_some(url), tracked)
        }
        TabEvent::TabUpdated { tab_id, url, title } => {
            let tracked = acc.update(tab_id, &url, title.as_deref(), now);
            (tracked, tracked.then_some(url), false)
        }
        TabEvent::TabRemoved { tab_id } => {
            acc.remove(tab_id, now);
            (false, None, false)
        }
        TabEvent::WindowFocus => {
            acc.window_focus_changed(true, now);
            (false, None, false)
        }
        TabEvent::WindowBlur => {
            acc.window_focus_changed(false, now);
            (false, None, false)
        }
        TabEvent::IdleState { state: idle } => {
            acc.idle_state_changed(idle, now);
            (false, None, false)
        }
    };

    let mut conn = state.conn.lock().await;
    persist_dirty(&mut conn, &mut acc).map_err(|err| {
        error!("persist tab records failed: {err}");
        err
    })?;

    if let Some(url) = visited_url {
        record_visit(&mut conn, &url, today, now)?;
    }
    if activated {
        progress::update_streak_and_xp(&mut conn, today)?;
    }

    let current_tab = acc.current();
    Ok(EventOutcome {
        tracked,
        current_tab,
        category: current_tab.and_then(|id| acc.record(id)).map(|r| r.category),
        suspended: acc.is_suspended(),
    })
}

/// Activity log entry plus the per-host visit counter.
pub fn record_visit(
    conn: &mut rusqlite::Connection,
    url: &str,
    today: time::Date,
    now: OffsetDateTime,
) -> Result<(), AppError> {
    if !is_trackable_url(url) {
        return Ok(());
    }
    progress::log_activity(conn, url, today, now)?;
    progress::track_site_visit(conn, url, today)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::at;
    use crate::state::test_state;
    use crate::store;
    use crate::tracker::TabRecord;
    use time::Duration;

    #[test]
    fn event_envelope_parses() {
        let raw = serde_json::json!({
            "v": 1, "event": "tab_activated", "tabId": 4,
            "url": "https://github.com", "ts": "2026-02-15T10:00:00Z"
        });
        let e: IngestEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(e.v, 1);
        assert!(matches!(e.event, TabEvent::TabActivated { tab_id: 4, .. }));

        let raw = serde_json::json!({"v": 1, "event": "idle_state", "state": "locked"});
        let e: IngestEvent = serde_json::from_value(raw).unwrap();
        assert!(matches!(e.event, TabEvent::IdleState { state: IdleState::Locked }));

        let raw = serde_json::json!({"v": 1, "event": "teleport"});
        assert!(serde_json::from_value::<IngestEvent>(raw).is_err());
    }

    #[tokio::test]
    async fn activation_persists_and_logs_visit() {
        let t0 = at("2026-02-15T10:00:00Z");
        let state = test_state(t0);
        let ev = TabEvent::TabActivated {
            tab_id: 9,
            url: "https://www.khanacademy.org/math".to_string(),
            title: Some("Math".to_string()),
        };
        let out = apply_event(&state, ev, t0).await.unwrap();
        assert!(out.tracked);
        assert_eq!(out.current_tab, Some(9));

        let out = apply_event(&state, TabEvent::TabRemoved { tab_id: 9 }, t0 + Duration::seconds(42))
            .await
            .unwrap();
        assert_eq!(out.current_tab, None);

        let conn = state.conn.lock().await;
        let rec: TabRecord = store::kv_get(&conn, &store::tab_key(9)).unwrap().unwrap();
        assert_eq!(rec.time_spent, 42);
        assert!(!rec.is_active);
        let stats = progress::stats(&conn).unwrap();
        assert_eq!(stats.activity_log["2026-02-15"].len(), 1);
        assert_eq!(stats.site_time["2026-02-15"]["www.khanacademy.org"], 1);
    }

    #[tokio::test]
    async fn untracked_pages_are_not_logged() {
        let t0 = at("2026-02-15T10:00:00Z");
        let state = test_state(t0);
        let ev = TabEvent::TabActivated {
            tab_id: 1,
            url: "chrome://newtab".to_string(),
            title: None,
        };
        let out = apply_event(&state, ev, t0).await.unwrap();
        assert!(!out.tracked);
        let conn = state.conn.lock().await;
        assert!(progress::stats(&conn).unwrap().activity_log.is_empty());
    }
}
