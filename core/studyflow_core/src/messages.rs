use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::aggregate::{self, DEFAULT_STATS_DAYS};
use crate::bookmarks::{self, NewBookmark};
use crate::clock::parse_rfc3339;
use crate::error::AppError;
use crate::events::record_visit;
use crate::focus::{self, PomodoroPhase, PomodoroSettings};
use crate::goals::{self, NewGoal};
use crate::notes;
use crate::notify::NotificationKind;
use crate::progress;
use crate::reminders::{self, NewReminder};
use crate::state::AppState;

/// Every `type` the dispatcher understands.
pub const KNOWN_TYPES: &[&str] = &[
    "UPDATE_BLOCKED_SITES",
    "GET_BLOCKED_SITES",
    "GET_STATS",
    "UPDATE_XP",
    "SAVE_QUICK_NOTE",
    "PAGE_VISITED",
    "START_FOCUS_SESSION",
    "END_FOCUS_SESSION",
    "getTabData",
    "getDailyStats",
    "getCurrentStats",
    "saveData",
    "SET_REMINDER_ALARM",
    "UPDATE_BOOKMARKS",
    "REMOVE_BOOKMARK",
    "ADD_REMINDER",
    "GET_REMINDERS",
    "COMPLETE_REMINDER",
    "SNOOZE_REMINDER",
    "DELETE_REMINDER",
    "ADD_GOAL",
    "GET_GOALS",
    "UPDATE_GOAL_PROGRESS",
    "COMPLETE_GOAL",
    "DELETE_GOAL",
    "ADD_NOTE",
    "GET_NOTES",
    "DELETE_NOTE",
    "ADD_BOOKMARK",
    "GET_BOOKMARKS",
    "EXPORT_BOOKMARKS",
    "IMPORT_BOOKMARKS",
    "GET_POMODORO_SETTINGS",
    "SAVE_POMODORO_SETTINGS",
    "POMODORO_COMPLETE",
];

#[derive(Debug, Default, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmTarget {
    pub id: i64,
    pub reminder_date_time: String,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "UPDATE_BLOCKED_SITES")]
    UpdateBlockedSites {
        #[serde(default)]
        sites: Vec<String>,
    },
    #[serde(rename = "GET_BLOCKED_SITES")]
    GetBlockedSites,
    #[serde(rename = "GET_STATS")]
    GetStats,
    #[serde(rename = "UPDATE_XP")]
    UpdateXp {
        #[serde(default)]
        amount: i64,
    },
    #[serde(rename = "SAVE_QUICK_NOTE")]
    SaveQuickNote {
        #[serde(default)]
        note: String,
        #[serde(default, rename = "pageInfo")]
        page_info: Value,
    },
    #[serde(rename = "PAGE_VISITED")]
    PageVisited {
        #[serde(default, rename = "pageInfo")]
        page_info: PageInfo,
    },
    #[serde(rename = "START_FOCUS_SESSION")]
    StartFocusSession {
        #[serde(default, rename = "additionalSites")]
        additional_sites: Vec<String>,
    },
    #[serde(rename = "END_FOCUS_SESSION")]
    EndFocusSession,
    #[serde(rename = "getTabData")]
    GetTabData,
    #[serde(rename = "getDailyStats")]
    GetDailyStats {
        #[serde(default)]
        days: Option<i64>,
    },
    #[serde(rename = "getCurrentStats")]
    GetCurrentStats,
    #[serde(rename = "saveData")]
    SaveData,
    #[serde(rename = "SET_REMINDER_ALARM")]
    SetReminderAlarm { reminder: AlarmTarget },
    #[serde(rename = "UPDATE_BOOKMARKS")]
    UpdateBookmarks,
    #[serde(rename = "REMOVE_BOOKMARK")]
    RemoveBookmark {
        #[serde(rename = "bookmarkId")]
        bookmark_id: i64,
    },
    #[serde(rename = "ADD_REMINDER")]
    AddReminder { reminder: NewReminder },
    #[serde(rename = "GET_REMINDERS")]
    GetReminders,
    #[serde(rename = "COMPLETE_REMINDER")]
    CompleteReminder { id: i64 },
    #[serde(rename = "SNOOZE_REMINDER")]
    SnoozeReminder { id: i64 },
    #[serde(rename = "DELETE_REMINDER")]
    DeleteReminder { id: i64 },
    #[serde(rename = "ADD_GOAL")]
    AddGoal { goal: NewGoal },
    #[serde(rename = "GET_GOALS")]
    GetGoals,
    #[serde(rename = "UPDATE_GOAL_PROGRESS")]
    UpdateGoalProgress {
        id: i64,
        #[serde(default = "one")]
        increment: i64,
    },
    #[serde(rename = "COMPLETE_GOAL")]
    CompleteGoal { id: i64 },
    #[serde(rename = "DELETE_GOAL")]
    DeleteGoal { id: i64 },
    #[serde(rename = "ADD_NOTE")]
    AddNote {
        #[serde(default)]
        content: String,
    },
    #[serde(rename = "GET_NOTES")]
    GetNotes,
    #[serde(rename = "DELETE_NOTE")]
    DeleteNote { id: i64 },
    #[serde(rename = "ADD_BOOKMARK")]
    AddBookmark { bookmark: NewBookmark },
    #[serde(rename = "GET_BOOKMARKS")]
    GetBookmarks {
        #[serde(default)]
        category: Option<String>,
    },
    #[serde(rename = "EXPORT_BOOKMARKS")]
    ExportBookmarks,
    #[serde(rename = "IMPORT_BOOKMARKS")]
    ImportBookmarks {
        #[serde(default)]
        data: Value,
    },
    #[serde(rename = "GET_POMODORO_SETTINGS")]
    GetPomodoroSettings,
    #[serde(rename = "SAVE_POMODORO_SETTINGS")]
    SavePomodoroSettings {
        #[serde(default)]
        settings: PomodoroSettings,
    },
    #[serde(rename = "POMODORO_COMPLETE")]
    PomodoroComplete,
}

/// Response envelope for `POST /message`.
#[derive(Debug, Serialize)]
pub struct Reply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl Reply {
    fn status(status: &'static str) -> Self {
        Self {
            ok: true,
            status: Some(status),
            data: None,
            error: None,
        }
    }

    fn data<T: Serialize>(data: T) -> Self {
        Self {
            ok: true,
            status: None,
            data: Some(serde_json::to_value(data).unwrap_or(Value::Null)),
            error: None,
        }
    }

    fn with_data<T: Serialize>(mut self, data: T) -> Self {
        self.data = Some(serde_json::to_value(data).unwrap_or(Value::Null));
        self
    }

    pub fn unknown_type() -> Self {
        Self {
            ok: false,
            status: Some("unknown message type"),
            data: None,
            error: None,
        }
    }

    pub fn error(code: &'static str) -> Self {
        Self {
            ok: false,
            status: None,
            data: None,
            error: Some(code),
        }
    }
}

pub enum Parsed {
    Request(Request),
    Unknown(String),
    Invalid(serde_json::Error),
}

/// Unknown `type` values are told apart from malformed known ones.
pub fn parse(payload: Value) -> Parsed {
    let ty = payload
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if !KNOWN_TYPES.contains(&ty.as_str()) {
        return Parsed::Unknown(ty);
    }
    match serde_json::from_value(payload) {
        Ok(req) => Parsed::Request(req),
        Err(err) => Parsed::Invalid(err),
    }
}

pub async fn dispatch(
    state: &AppState,
    req: Request,
    now: OffsetDateTime,
) -> Result<Reply, AppError> {
    let today = state.today(now);
    match req {
        Request::UpdateBlockedSites { sites } => {
            let mut focus = state.focus.lock().await;
            let mut rules = state.rules.lock().await;
            let conn = state.conn.lock().await;
            let update = focus::update_blocked_sites(&conn, &mut focus, &mut rules, &sites)?;
            Ok(Reply::status("rules updated").with_data(update))
        }
        Request::GetBlockedSites => {
            let conn = state.conn.lock().await;
            let sites = crate::blocking::blocked_sites(&conn)?;
            Ok(Reply::data(json!({ "blockedSites": sites })))
        }
        Request::GetStats => {
            let conn = state.conn.lock().await;
            Ok(Reply::data(progress::stats(&conn)?))
        }
        Request::UpdateXp { amount } => {
            let mut conn = state.conn.lock().await;
            let new_xp = progress::add_xp(&mut conn, amount)?;
            Ok(Reply::status("XP updated").with_data(json!({ "newXP": new_xp })))
        }
        Request::SaveQuickNote { note, page_info } => {
            let mut conn = state.conn.lock().await;
            notes::save_quick_note(&mut conn, &note, page_info, today, now)?;
            Ok(Reply::status("quick note saved"))
        }
        Request::PageVisited { page_info } => {
            let mut conn = state.conn.lock().await;
            record_visit(&mut conn, &page_info.url, today, now)?;
            Ok(Reply::status("page visit logged"))
        }
        Request::StartFocusSession { additional_sites } => {
            let mut focus = state.focus.lock().await;
            let mut rules = state.rules.lock().await;
            let conn = state.conn.lock().await;
            let started =
                focus::start_session(&conn, &mut focus, &mut rules, &additional_sites, now)?;
            Ok(Reply::status("focus session started").with_data(started))
        }
        Request::EndFocusSession => {
            let mut focus = state.focus.lock().await;
            let mut rules = state.rules.lock().await;
            let mut conn = state.conn.lock().await;
            match focus::end_session(&mut conn, &mut focus, &mut rules, now)? {
                Some(ended) => {
                    let msg = format!(
                        "Focus session complete: {} min, +{} XP",
                        ended.duration, ended.xp_earned
                    );
                    state.notifications.lock().await.push(
                        NotificationKind::Focus,
                        "Focus session ended",
                        msg,
                        None,
                        now,
                    );
                    Ok(Reply::status("focus session ended").with_data(ended))
                }
                None => Ok(Reply::status("no active focus session")),
            }
        }
        Request::GetTabData => {
            let acc = state.tracker.lock().await;
            Ok(Reply::data(acc.views()))
        }
        Request::GetDailyStats { days } => {
            let conn = state.conn.lock().await;
            let stats = aggregate::daily_stats(&conn, today, days.unwrap_or(DEFAULT_STATS_DAYS))?;
            Ok(Reply::data(stats))
        }
        Request::GetCurrentStats | Request::SaveData => {
            let summary = aggregation_pass(state, now).await?;
            Ok(Reply::status("saved").with_data(summary))
        }
        Request::SetReminderAlarm { reminder } => {
            let at = parse_rfc3339(&reminder.reminder_date_time)
                .ok_or(AppError::InvalidReminderTime)?;
            state.alarms.lock().await.arm(reminder.id, at);
            Ok(Reply::status("alarm set"))
        }
        Request::UpdateBookmarks => {
            let added = bookmark_pass(state, now).await?;
            Ok(Reply::status("bookmarks updated").with_data(json!({ "added": added })))
        }
        Request::RemoveBookmark { bookmark_id } => {
            let mut conn = state.conn.lock().await;
            bookmarks::remove(&mut conn, bookmark_id)?;
            Ok(Reply::status("bookmark removed"))
        }
        Request::AddReminder { reminder } => {
            let mut alarms = state.alarms.lock().await;
            let mut conn = state.conn.lock().await;
            let r = reminders::add(&mut conn, reminder, now, state.tz)?;
            if let Some(at) = r.due_at() {
                alarms.arm(r.id, at);
            }
            Ok(Reply::status("reminder added").with_data(r))
        }
        Request::GetReminders => {
            let conn = state.conn.lock().await;
            Ok(Reply::data(reminders::list(&conn)?))
        }
        Request::CompleteReminder { id } => {
            let mut alarms = state.alarms.lock().await;
            let mut conn = state.conn.lock().await;
            let r = reminders::complete(&mut conn, id, now)?;
            alarms.cancel(id);
            Ok(Reply::status("reminder completed").with_data(r))
        }
        Request::SnoozeReminder { id } => {
            let mut alarms = state.alarms.lock().await;
            let mut conn = state.conn.lock().await;
            let r = reminders::snooze(&mut conn, id, now)?;
            if let Some(at) = r.due_at() {
                alarms.arm(id, at);
            }
            Ok(Reply::status("reminder snoozed").with_data(r))
        }
        Request::DeleteReminder { id } => {
            let mut alarms = state.alarms.lock().await;
            let mut conn = state.conn.lock().await;
            reminders::delete(&mut conn, id)?;
            alarms.cancel(id);
            Ok(Reply::status("reminder deleted"))
        }
        Request::AddGoal { goal } => {
            let mut conn = state.conn.lock().await;
            Ok(Reply::status("goal added").with_data(goals::add(&mut conn, goal, now)?))
        }
        Request::GetGoals => {
            let conn = state.conn.lock().await;
            Ok(Reply::data(goals::list(&conn)?))
        }
        Request::UpdateGoalProgress { id, increment } => {
            let mut conn = state.conn.lock().await;
            let p = goals::add_progress(&mut conn, id, increment, now)?;
            let status = if p.just_completed { "goal completed" } else { "goal progress updated" };
            Ok(Reply::status(status).with_data(p))
        }
        Request::CompleteGoal { id } => {
            let mut conn = state.conn.lock().await;
            Ok(Reply::status("goal completed").with_data(goals::complete(&mut conn, id, now)?))
        }
        Request::DeleteGoal { id } => {
            let mut conn = state.conn.lock().await;
            goals::delete(&mut conn, id)?;
            Ok(Reply::status("goal deleted"))
        }
        Request::AddNote { content } => {
            let mut conn = state.conn.lock().await;
            let note = notes::add(&mut conn, &content, today, now)?;
            Ok(Reply::status("note saved").with_data(note))
        }
        Request::GetNotes => {
            let conn = state.conn.lock().await;
            Ok(Reply::data(json!({
                "notes": notes::list(&conn)?,
                "quickNotes": notes::quick_notes(&conn)?,
            })))
        }
        Request::DeleteNote { id } => {
            let mut conn = state.conn.lock().await;
            notes::delete(&mut conn, id)?;
            Ok(Reply::status("note deleted"))
        }
        Request::AddBookmark { bookmark } => {
            let mut conn = state.conn.lock().await;
            let b = bookmarks::add_custom(&mut conn, bookmark, now)?;
            Ok(Reply::status("bookmark added").with_data(b))
        }
        Request::GetBookmarks { category } => {
            let conn = state.conn.lock().await;
            Ok(Reply::data(bookmarks::list_sorted(&conn, category.as_deref())?))
        }
        Request::ExportBookmarks => {
            let conn = state.conn.lock().await;
            Ok(Reply::data(bookmarks::export(&conn, now)?))
        }
        Request::ImportBookmarks { data } => {
            let mut conn = state.conn.lock().await;
            let out = bookmarks::import(&mut conn, &data, now)?;
            Ok(Reply::status("bookmarks imported").with_data(out))
        }
        Request::GetPomodoroSettings => {
            let conn = state.conn.lock().await;
            Ok(Reply::data(focus::load_pomodoro_settings(&conn)?))
        }
        Request::SavePomodoroSettings { settings } => {
            let conn = state.conn.lock().await;
            let saved = focus::save_pomodoro_settings(&conn, settings)?;
            Ok(Reply::status("settings saved").with_data(saved))
        }
        Request::PomodoroComplete => {
            let mut focus = state.focus.lock().await;
            let conn = state.conn.lock().await;
            let settings = focus::load_pomodoro_settings(&conn)?;
            let finished = focus.cycle().phase;
            let cycle = focus.cycle_mut();
            cycle.advance();
            let minutes = cycle.phase_minutes(&settings);
            let cycle = cycle.clone();
            drop(conn);
            drop(focus);

            if settings.notification_enabled {
                let message = if finished == PomodoroPhase::Focus {
                    "Focus session completed! Take a break!"
                } else {
                    "Break time is over! Back to focus!"
                };
                state.notifications.lock().await.push(
                    NotificationKind::Focus,
                    "StudyFlow Pomodoro",
                    message,
                    None,
                    now,
                );
            }
            Ok(Reply::status("phase advanced").with_data(json!({
                "phase": cycle.phase,
                "sessionCount": cycle.session_count,
                "minutes": minutes,
            })))
        }
    }
}

/// Checkpoint the current tab and rewrite today's summary.
pub async fn aggregation_pass(
    state: &AppState,
    now: OffsetDateTime,
) -> Result<aggregate::DailySummary, AppError> {
    let settings = *state.settings.lock().await;
    let mut acc = state.tracker.lock().await;
    let mut rollover = state.rollover.lock().await;
    let mut conn = state.conn.lock().await;
    let summary = aggregate::run_tick(&mut conn, &mut acc, &mut rollover, settings, now, state.tz)?;
    drop(conn);
    state.notifications.lock().await.push(
        NotificationKind::DataUpdated,
        "Data updated",
        format!("{} min tracked today", summary.total_time),
        None,
        now,
    );
    Ok(summary)
}

/// Promote long-lived productive tabs into bookmarks.
pub async fn bookmark_pass(state: &AppState, now: OffsetDateTime) -> Result<usize, AppError> {
    let min_minutes = state.settings.lock().await.bookmark_min_minutes;
    let views = state.tracker.lock().await.views();
    let mut conn = state.conn.lock().await;
    let added = bookmarks::sync_from_tabs(&mut conn, &views, min_minutes, now)?;
    if added > 0 {
        info!("{added} new productive bookmarks");
    }
    Ok(added)
}

/// Logged at the `/message` boundary for requests that fail validation.
pub fn log_rejected(ty: &str, err: &AppError) {
    warn!("message {ty} rejected: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::at;
    use crate::state::test_state;
    use crate::store;
    use time::Duration;

    async fn send(state: &AppState, payload: Value, now: OffsetDateTime) -> Reply {
        match parse(payload) {
            Parsed::Request(req) => dispatch(state, req, now).await.unwrap(),
            Parsed::Unknown(_) => Reply::unknown_type(),
            Parsed::Invalid(err) => panic!("invalid: {err}"),
        }
    }

    #[tokio::test]
    async fn unknown_type_is_reported() {
        let state = test_state(at("2026-02-15T10:00:00Z"));
        let r = send(&state, json!({"type": "SELF_DESTRUCT"}), at("2026-02-15T10:00:00Z")).await;
        assert!(!r.ok);
        assert_eq!(r.status, Some("unknown message type"));
        assert!(matches!(parse(json!({"nope": 1})), Parsed::Unknown(_)));
        assert!(matches!(parse(json!({"type": "REMOVE_BOOKMARK"})), Parsed::Invalid(_)));
    }

    #[test]
    fn every_known_type_has_a_variant() {
        let minimal = |ty: &str| -> Value {
            match ty {
                "SET_REMINDER_ALARM" => {
                    json!({"type": ty, "reminder": {"id": 1, "reminderDateTime": "x"}})
                }
                "REMOVE_BOOKMARK" => json!({"type": ty, "bookmarkId": 1}),
                "ADD_REMINDER" => json!({"type": ty, "reminder": {}}),
                "ADD_GOAL" => json!({"type": ty, "goal": {}}),
                "ADD_BOOKMARK" => json!({"type": ty, "bookmark": {}}),
                "COMPLETE_REMINDER" | "SNOOZE_REMINDER" | "DELETE_REMINDER"
                | "UPDATE_GOAL_PROGRESS" | "COMPLETE_GOAL" | "DELETE_GOAL" | "DELETE_NOTE" => {
                    json!({"type": ty, "id": 1})
                }
                _ => json!({"type": ty}),
            }
        };
        for ty in KNOWN_TYPES {
            assert!(matches!(parse(minimal(ty)), Parsed::Request(_)), "{ty}");
        }
    }

    #[tokio::test]
    async fn focus_session_roundtrip() {
        let t0 = at("2026-02-15T10:00:00Z");
        let state = test_state(t0);
        send(&state, json!({"type": "UPDATE_BLOCKED_SITES", "sites": ["reddit.com"]}), t0).await;

        let start = json!({"type": "START_FOCUS_SESSION", "additionalSites": ["youtube.com"]});
        let r = send(&state, start, t0).await;
        assert_eq!(r.status, Some("focus session started"));
        assert_eq!(r.data.unwrap()["rules"]["addRules"].as_array().unwrap().len(), 2);

        let end = json!({"type": "END_FOCUS_SESSION"});
        let r = send(&state, end.clone(), t0 + Duration::minutes(30)).await;
        let data = r.data.unwrap();
        assert_eq!(data["duration"], 30);
        assert_eq!(data["xpEarned"], 60);
        assert_eq!(state.rules.lock().await.rules().len(), 1);

        let r = send(&state, end, t0 + Duration::minutes(31)).await;
        assert_eq!(r.status, Some("no active focus session"));
        assert!(state.notifications.lock().await.latest_id() >= 1);
    }

    #[tokio::test]
    async fn add_reminder_arms_alarm() {
        let t0 = at("2026-02-15T10:00:00Z");
        let state = test_state(t0);
        let r = send(
            &state,
            json!({"type": "ADD_REMINDER", "reminder": {
                "title": "Quiz", "date": "2026-02-15", "time": "11:00"
            }}),
            t0,
        )
        .await;
        assert!(r.ok);
        assert_eq!(state.alarms.lock().await.len(), 1);

        let err = match parse(json!({"type": "ADD_REMINDER", "reminder": {
            "title": "Quiz", "date": "2026-02-15", "time": "09:00"
        }})) {
            Parsed::Request(req) => dispatch(&state, req, t0).await.unwrap_err(),
            _ => panic!("expected request"),
        };
        assert_eq!(err.code(), "reminder_in_past");
    }

    #[tokio::test]
    async fn corrupt_reminders_list_as_empty() {
        let t0 = at("2026-02-15T10:00:00Z");
        let state = test_state(t0);
        {
            let conn = state.conn.lock().await;
            store::kv_set(&conn, store::REMINDERS_KEY, &json!({"oops": 1})).unwrap();
            store::kv_set(&conn, store::SITE_TIME_KEY, &json!([1, 2])).unwrap();
        }
        let r = send(&state, json!({"type": "GET_REMINDERS"}), t0).await;
        assert!(r.ok);
        assert_eq!(r.data.unwrap(), json!([]));

        let r = send(&state, json!({"type": "GET_STATS"}), t0).await;
        assert!(r.ok);
        assert_eq!(r.data.unwrap()["siteTime"], json!({}));
    }

    #[tokio::test]
    async fn tab_data_and_current_stats() {
        let t0 = at("2026-02-15T10:00:00Z");
        let state = test_state(t0);
        state
            .tracker
            .lock()
            .await
            .activate(1, "https://github.com", Some("GitHub"), t0);

        let r = send(&state, json!({"type": "saveData"}), t0 + Duration::minutes(2)).await;
        let data = r.data.unwrap();
        assert_eq!(data["totalTime"], 2);
        assert_eq!(data["productiveTime"], 2);

        let r = send(&state, json!({"type": "getTabData"}), t0 + Duration::minutes(2)).await;
        assert_eq!(r.data.unwrap()[0]["timeSpent"], 2);

        let r = send(&state, json!({"type": "getDailyStats", "days": 3}), t0).await;
        assert_eq!(r.data.unwrap().as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn update_xp_and_stats() {
        let t0 = at("2026-02-15T10:00:00Z");
        let state = test_state(t0);
        let r = send(&state, json!({"type": "UPDATE_XP", "amount": 15}), t0).await;
        assert_eq!(r.data.unwrap()["newXP"], 15 + progress::DAILY_ACTIVITY_XP);
        let r = send(&state, json!({"type": "GET_STATS"}), t0).await;
        assert_eq!(r.data.unwrap()["streak"], 1);
    }

    #[tokio::test]
    async fn pomodoro_complete_advances_cycle() {
        let t0 = at("2026-02-15T10:00:00Z");
        let state = test_state(t0);
        let r = send(&state, json!({"type": "POMODORO_COMPLETE"}), t0).await;
        let data = r.data.unwrap();
        assert_eq!(data["phase"], "break");
        assert_eq!(data["sessionCount"], 2);
        assert_eq!(data["minutes"], 5);
    }
}
