use rusqlite::Connection;
use std::sync::Arc;
use time::{Date, OffsetDateTime, UtcOffset};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::aggregate::Rollover;
use crate::blocking::{self, RuleSet};
use crate::clock;
use crate::focus::FocusState;
use crate::notify::NotificationQueue;
use crate::progress;
use crate::reminders::{self, AlarmBook};
use crate::settings::{self, AppSettings};
use crate::store::StoreResult;
use crate::tracker::{self, TabAccountant};

/// Everything handlers and timers share.
///
/// Locks are taken in field order (tracker, rollover, focus, rules, alarms,
/// conn, notifications) and never the other way round.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Mutex<TabAccountant>>,
    pub rollover: Arc<Mutex<Rollover>>,
    pub focus: Arc<Mutex<FocusState>>,
    pub rules: Arc<Mutex<RuleSet>>,
    pub alarms: Arc<Mutex<AlarmBook>>,
    pub conn: Arc<Mutex<Connection>>,
    pub notifications: Arc<Mutex<NotificationQueue>>,
    pub settings: Arc<Mutex<AppSettings>>,
    pub tz: UtcOffset,
}

impl AppState {
    /// Loads persisted state, installs the stored block list, re-arms
    /// pending reminders and counts today toward the streak.
    pub fn load(mut conn: Connection, tz: UtcOffset, now: OffsetDateTime) -> StoreResult<Self> {
        let settings = settings::load_or_init(&conn)?;
        let mut acc = tracker::load_accountant(&conn, now)?;
        tracker::persist_dirty(&mut conn, &mut acc)?;
        let rollover = Rollover::load(&conn)?;
        if let Some(last) = rollover.last_date() {
            info!("last aggregated day {last}");
        }

        let mut rules = RuleSet::default();
        rules.replace_all(&blocking::blocked_sites(&conn)?);

        let mut alarms = AlarmBook::default();
        let armed = reminders::rearm_pending(&conn, &mut alarms, now)?;
        if armed > 0 {
            info!("re-armed {armed} reminder alarms");
        }

        match progress::update_streak_and_xp(&mut conn, clock::today(now, tz)) {
            Ok(streak) => info!("streak {} day(s), {} xp", streak.streak, streak.xp),
            Err(err) => error!("streak update failed: {err}"),
        }

        Ok(Self {
            tracker: Arc::new(Mutex::new(acc)),
            rollover: Arc::new(Mutex::new(rollover)),
            focus: Arc::new(Mutex::new(FocusState::default())),
            rules: Arc::new(Mutex::new(rules)),
            alarms: Arc::new(Mutex::new(alarms)),
            conn: Arc::new(Mutex::new(conn)),
            notifications: Arc::new(Mutex::new(NotificationQueue::default())),
            settings: Arc::new(Mutex::new(settings)),
            tz,
        })
    }

    pub fn today(&self, now: OffsetDateTime) -> Date {
        clock::today(now, self.tz)
    }
}

#[cfg(test)]
pub fn test_state(now: OffsetDateTime) -> AppState {
    AppState::load(crate::store::test_conn(), UtcOffset::UTC, now).unwrap()
}
