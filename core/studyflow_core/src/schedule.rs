use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::messages::{aggregation_pass, bookmark_pass};
use crate::notify::{quote_for, NotificationKind};
use crate::reminders;
use crate::state::AppState;

/// Periods for the background timers, in seconds.
#[derive(Clone, Copy, Debug)]
pub struct Schedule {
    pub aggregate_seconds: u64,
    pub reminder_check_seconds: u64,
    pub bookmark_sync_seconds: u64,
    pub motivation_seconds: u64,
}

/// Fires armed alarms and sweeps for anything inside the due window.
/// Returns how many reminder notifications were queued.
pub async fn reminder_tick(state: &AppState, now: OffsetDateTime) -> Result<usize, AppError> {
    let fired = {
        let mut alarms = state.alarms.lock().await;
        let fired = alarms.take_due(now);
        if !fired.is_empty() {
            debug!("{} alarms fired, {} still armed", fired.len(), alarms.len());
        }
        fired
    };
    let checked = {
        let mut conn = state.conn.lock().await;
        reminders::check_due(&mut conn, now, &fired)
    };
    let due = match checked {
        Ok(due) => due,
        Err(err) => {
            // Nothing was marked notified; give the fired alarms another go.
            let mut alarms = state.alarms.lock().await;
            for id in &fired {
                alarms.arm(*id, now);
            }
            return Err(err.into());
        }
    };
    let mut queue = state.notifications.lock().await;
    for r in &due {
        info!("reminder due: {}", r.title);
        queue.push_reminder(r, now);
    }
    Ok(due.len())
}

pub async fn motivation_tick(state: &AppState, now: OffsetDateTime) {
    let quote = quote_for(state.today(now));
    state.notifications.lock().await.push(
        NotificationKind::Motivation,
        "StudyFlow Motivation",
        quote,
        None,
        now,
    );
}

fn every(seconds: u64) -> tokio::time::Interval {
    let mut ticker = interval(Duration::from_secs(seconds.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Spawns one task per timer. The first aggregation and reminder ticks run
/// immediately; motivation waits a full period.
pub fn spawn_all(state: AppState, schedule: Schedule) {
    let s = state.clone();
    tokio::spawn(async move {
        let mut ticker = every(schedule.aggregate_seconds);
        loop {
            ticker.tick().await;
            if let Err(err) = aggregation_pass(&s, OffsetDateTime::now_utc()).await {
                error!("aggregation failed: {err}");
            }
        }
    });

    let s = state.clone();
    tokio::spawn(async move {
        let mut ticker = every(schedule.reminder_check_seconds);
        loop {
            ticker.tick().await;
            if let Err(err) = reminder_tick(&s, OffsetDateTime::now_utc()).await {
                error!("reminder check failed: {err}");
            }
        }
    });

    let s = state.clone();
    tokio::spawn(async move {
        let mut ticker = every(schedule.bookmark_sync_seconds);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(err) = bookmark_pass(&s, OffsetDateTime::now_utc()).await {
                error!("bookmark sync failed: {err}");
            }
        }
    });

    tokio::spawn(async move {
        let mut ticker = every(schedule.motivation_seconds);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            motivation_tick(&state, OffsetDateTime::now_utc()).await;
        }
    });
}
