use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::clock::{next_id, rfc3339};
use crate::error::AppError;
use crate::progress::award_xp;
use crate::store::{self, StoreResult, GOALS_KEY};

pub const ADD_GOAL_XP: i64 = 10;
pub const GOAL_PROGRESS_XP: i64 = 5;
pub const GOAL_COMPLETE_XP: i64 = 50;

fn default_target() -> i64 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_target")]
    pub target: i64,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub completed: bool,
    pub created_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewGoal {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub target: Option<i64>,
}

/// Outcome of a progress step.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub goal: Goal,
    pub just_completed: bool,
    pub xp_awarded: i64,
}

pub fn list(conn: &Connection) -> StoreResult<Vec<Goal>> {
    store::kv_read_or_default(conn, GOALS_KEY)
}

pub fn add(conn: &mut Connection, new: NewGoal, now: OffsetDateTime) -> Result<Goal, AppError> {
    let title = new.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::MissingTitle);
    }
    store::transact(conn, |tx| {
        let mut goals: Vec<Goal> = store::kv_get_or_default(tx, GOALS_KEY)?;
        let goal = Goal {
            id: next_id(goals.iter().map(|g| g.id), now),
            title,
            description: new.description.trim().to_string(),
            category: new.category,
            target: new.target.unwrap_or(1).max(1),
            progress: 0,
            completed: false,
            created_at: rfc3339(now),
            completed_at: None,
        };
        goals.insert(0, goal.clone());
        store::kv_set(tx, GOALS_KEY, &goals)?;
        award_xp(tx, ADD_GOAL_XP)?;
        Ok(goal)
    })
}

pub fn add_progress(
    conn: &mut Connection,
    id: i64,
    increment: i64,
    now: OffsetDateTime,
) -> Result<GoalProgress, AppError> {
    store::transact(conn, |tx| {
        let mut goals: Vec<Goal> = store::kv_get_or_default(tx, GOALS_KEY)?;
        let g = goals.iter_mut().find(|g| g.id == id).ok_or(AppError::NotFound)?;
        g.progress = g.progress.saturating_add(increment);

        let just_completed = !g.completed && g.progress >= g.target;
        let xp_awarded = if just_completed {
            g.completed = true;
            g.completed_at = Some(rfc3339(now));
            GOAL_COMPLETE_XP
        } else {
            GOAL_PROGRESS_XP
        };
        let goal = g.clone();
        store::kv_set(tx, GOALS_KEY, &goals)?;
        award_xp(tx, xp_awarded)?;
        Ok(GoalProgress { goal, just_completed, xp_awarded })
    })
}

/// Sets progress to the target. Completing twice awards nothing the second time.
pub fn complete(conn: &mut Connection, id: i64, now: OffsetDateTime) -> Result<Goal, AppError> {
    store::transact(conn, |tx| {
        let mut goals: Vec<Goal> = store::kv_get_or_default(tx, GOALS_KEY)?;
        let g = goals.iter_mut().find(|g| g.id == id).ok_or(AppError::NotFound)?;
        let first = !g.completed;
        g.progress = g.target;
        if first {
            g.completed = true;
            g.completed_at = Some(rfc3339(now));
        }
        let goal = g.clone();
        store::kv_set(tx, GOALS_KEY, &goals)?;
        if first {
            award_xp(tx, GOAL_COMPLETE_XP)?;
        }
        Ok(goal)
    })
}

pub fn delete(conn: &mut Connection, id: i64) -> Result<(), AppError> {
    store::kv_try_update(conn, GOALS_KEY, |goals: &mut Vec<Goal>| {
        let before = goals.len();
        goals.retain(|g| g.id != id);
        if goals.len() == before {
            Err(AppError::NotFound)
        } else {
            Ok(())
        }
    })
}
