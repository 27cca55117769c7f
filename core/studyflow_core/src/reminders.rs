use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use time::{Duration, OffsetDateTime, UtcOffset};
use tracing::{info, warn};

use crate::clock::{next_id, parse_local_datetime, parse_rfc3339, rfc3339};
use crate::error::AppError;
use crate::progress::award_xp;
use crate::store::{self, StoreError, StoreResult, REMINDERS_KEY};

pub const SNOOZE_MINUTES: i64 = 10;
pub const ADD_REMINDER_XP: i64 = 5;
pub const COMPLETE_REMINDER_XP: i64 = 10;
const DUE_WINDOW_MS: i128 = 60_000;

fn default_category() -> String {
    "general".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: String,
    pub time: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub notified: bool,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub reminder_date_time: String,
}

impl Reminder {
    pub fn due_at(&self) -> Option<OffsetDateTime> {
        parse_rfc3339(&self.reminder_date_time)
    }

    /// Within one minute of its time, and neither completed nor notified.
    pub fn is_due(&self, now: OffsetDateTime) -> bool {
        if self.completed || self.notified {
            return false;
        }
        self.due_at()
            .is_some_and(|t| (now - t).whole_milliseconds().abs() < DUE_WINDOW_MS)
    }

    fn sort_key(&self) -> (Option<OffsetDateTime>, i64) {
        (self.due_at(), self.id)
    }
}

#[derive(Debug, Deserialize)]
pub struct NewReminder {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default = "default_category")]
    pub category: String,
}

/// One-shot timers keyed by reminder id.
#[derive(Debug, Default)]
pub struct AlarmBook {
    alarms: BTreeMap<i64, OffsetDateTime>,
}

impl AlarmBook {
    /// Re-arming an id replaces its previous time.
    pub fn arm(&mut self, reminder_id: i64, at: OffsetDateTime) {
        self.alarms.insert(reminder_id, at);
    }

    pub fn cancel(&mut self, reminder_id: i64) -> bool {
        self.alarms.remove(&reminder_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    /// Removes and returns every alarm whose time has come.
    pub fn take_due(&mut self, now: OffsetDateTime) -> Vec<i64> {
        let due: Vec<i64> = self
            .alarms
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in &due {
            self.alarms.remove(id);
        }
        due
    }
}

fn sort_reminders(list: &mut [Reminder]) {
    list.sort_by_key(Reminder::sort_key);
}

pub fn list(conn: &Connection) -> StoreResult<Vec<Reminder>> {
    store::kv_read_or_default(conn, REMINDERS_KEY)
}

pub fn add(
    conn: &mut Connection,
    new: NewReminder,
    now: OffsetDateTime,
    tz: UtcOffset,
) -> Result<Reminder, AppError> {
    let title = new.title.trim();
    if title.is_empty() {
        return Err(AppError::MissingTitle);
    }
    let at =
        parse_local_datetime(&new.date, &new.time, tz).ok_or(AppError::InvalidReminderTime)?;
    if at <= now {
        return Err(AppError::ReminderInPast);
    }

    let title = title.to_string();
    store::transact(conn, |tx| {
        let mut reminders: Vec<Reminder> = store::kv_get_or_default(tx, REMINDERS_KEY)?;
        let reminder = Reminder {
            id: next_id(reminders.iter().map(|r| r.id), now),
            title,
            description: new.description.trim().to_string(),
            date: new.date.trim().to_string(),
            time: new.time.trim().to_string(),
            category: new.category,
            completed: false,
            notified: false,
            created_at: rfc3339(now),
            completed_at: None,
            reminder_date_time: rfc3339(at),
        };
        reminders.push(reminder.clone());
        sort_reminders(&mut reminders);
        store::kv_set(tx, REMINDERS_KEY, &reminders)?;
        award_xp(tx, ADD_REMINDER_XP)?;
        info!("reminder {} set for {}", reminder.id, reminder.reminder_date_time);
        Ok(reminder)
    })
}

/// Marks the reminder completed. XP is only awarded the first time.
pub fn complete(
    conn: &mut Connection,
    id: i64,
    now: OffsetDateTime,
) -> Result<Reminder, AppError> {
    store::transact(conn, |tx| {
        let mut reminders: Vec<Reminder> = store::kv_get_or_default(tx, REMINDERS_KEY)?;
        let r = reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(AppError::NotFound)?;
        let first = !r.completed;
        if first {
            r.completed = true;
            r.completed_at = Some(rfc3339(now));
        }
        let out = r.clone();
        store::kv_set(tx, REMINDERS_KEY, &reminders)?;
        if first {
            award_xp(tx, COMPLETE_REMINDER_XP)?;
        }
        Ok(out)
    })
}

/// Pushes the reminder `SNOOZE_MINUTES` past `now` and clears `notified`.
/// The caller re-arms the alarm with the returned time.
pub fn snooze(conn: &mut Connection, id: i64, now: OffsetDateTime) -> Result<Reminder, AppError> {
    let at = now + Duration::minutes(SNOOZE_MINUTES);
    store::kv_try_update(conn, REMINDERS_KEY, |reminders: &mut Vec<Reminder>| {
        let r = reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(AppError::NotFound)?;
        r.reminder_date_time = rfc3339(at);
        r.notified = false;
        let out = r.clone();
        sort_reminders(reminders);
        Ok(out)
    })
}

pub fn delete(conn: &mut Connection, id: i64) -> Result<(), AppError> {
    store::kv_try_update(conn, REMINDERS_KEY, |reminders: &mut Vec<Reminder>| {
        let before = reminders.len();
        reminders.retain(|r| r.id != id);
        if reminders.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    })
}

/// Marks and returns the reminders to announce now: those inside the due
/// window plus those whose alarm fired. Completed or already notified
/// reminders are never returned.
pub fn check_due(
    conn: &mut Connection,
    now: OffsetDateTime,
    fired: &[i64],
) -> StoreResult<Vec<Reminder>> {
    let fired: HashSet<i64> = fired.iter().copied().collect();
    store::transact(conn, |tx| {
        let mut reminders: Vec<Reminder> = store::kv_read_or_default(tx, REMINDERS_KEY)?;
        let mut out = Vec::new();
        for r in reminders.iter_mut() {
            let alarm = fired.contains(&r.id) && !r.completed && !r.notified;
            if alarm || r.is_due(now) {
                r.notified = true;
                out.push(r.clone());
            }
        }
        if !out.is_empty() {
            store::kv_set(tx, REMINDERS_KEY, &reminders)?;
        }
        Ok::<_, StoreError>(out)
    })
}

/// Arms an alarm for every pending reminder still in the future.
pub fn rearm_pending(
    conn: &Connection,
    alarms: &mut AlarmBook,
    now: OffsetDateTime,
) -> StoreResult<usize> {
    let mut armed = 0;
    for r in list(conn)? {
        if r.completed || r.notified {
            continue;
        }
        match r.due_at() {
            Some(at) if at > now => {
                alarms.arm(r.id, at);
                armed += 1;
            }
            Some(_) => {}
            None => warn!("reminder {} has malformed time {}", r.id, r.reminder_date_time),
        }
    }
    Ok(armed)
}
