use serde::Serialize;
use std::collections::VecDeque;
use time::{Date, OffsetDateTime};

use crate::clock::rfc3339;
use crate::reminders::Reminder;

pub const QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_POLL_LIMIT: usize = 50;

pub const QUOTES: [&str; 4] = [
    "Stay focused and never give up!",
    "Every small step counts!",
    "Consistency is the key to success!",
    "Great things take time. Keep going!",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Reminder,
    Motivation,
    DataUpdated,
    Focus,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_id: Option<i64>,
}

/// Bounded queue read by polling with the last id seen.
#[derive(Debug)]
pub struct NotificationQueue {
    items: VecDeque<Notification>,
    next_id: u64,
    capacity: usize,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::with_capacity(QUEUE_CAPACITY)
    }
}

impl NotificationQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            next_id: 1,
            capacity: capacity.max(1),
        }
    }

    /// Appends and returns the new id. A `DataUpdated` directly following
    /// another one replaces it.
    pub fn push(
        &mut self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        reminder_id: Option<i64>,
        now: OffsetDateTime,
    ) -> u64 {
        if kind == NotificationKind::DataUpdated
            && self.items.back().is_some_and(|n| n.kind == NotificationKind::DataUpdated)
        {
            self.items.pop_back();
        }
        while self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        let id = self.next_id;
        self.next_id += 1;
        self.items.push_back(Notification {
            id,
            kind,
            title: title.into(),
            message: message.into(),
            created_at: rfc3339(now),
            reminder_id,
        });
        id
    }

    pub fn push_reminder(&mut self, r: &Reminder, now: OffsetDateTime) -> u64 {
        let message = if r.description.is_empty() {
            format!("{} reminder is due!", r.category)
        } else {
            r.description.clone()
        };
        self.push(
            NotificationKind::Reminder,
            format!("Reminder: {}", r.title),
            message,
            Some(r.id),
            now,
        )
    }

    /// Up to `limit` notifications with an id greater than `after`, oldest first.
    pub fn after(&self, after: u64, limit: usize) -> Vec<Notification> {
        self.items
            .iter()
            .filter(|n| n.id > after)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Id of the newest notification ever queued, 0 if none.
    pub fn latest_id(&self) -> u64 {
        self.next_id - 1
    }
}

pub fn quote_for(date: Date) -> &'static str {
    let idx = date.to_julian_day().rem_euclid(QUOTES.len() as i32) as usize;
    QUOTES[idx]
}
