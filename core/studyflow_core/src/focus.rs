use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use crate::blocking::{self, normalize_sites, RuleSet, RuleUpdate};
use crate::progress::add_xp;
use crate::store::{self, StoreResult, POMODORO_SETTINGS_KEY};

pub const MAX_FOCUS_XP: i64 = 100;
const LONG_BREAK_EVERY: u32 = 4;

/// Two XP per whole minute, capped.
pub fn focus_xp(minutes: i64) -> i64 {
    minutes.max(0).saturating_mul(2).min(MAX_FOCUS_XP)
}

#[derive(Debug)]
struct FocusSession {
    started_at: OffsetDateTime,
    /// Stored blocked sites when the session began; restored at the end.
    original_sites: Vec<String>,
    extra_sites: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusStarted {
    pub blocked_sites: Vec<String>,
    pub restarted: bool,
    pub rules: RuleUpdate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusEnded {
    pub duration: i64,
    pub xp_earned: i64,
    pub rules: RuleUpdate,
}

#[derive(Debug, Default)]
pub struct FocusState {
    session: Option<FocusSession>,
    cycle: PomodoroCycle,
}

impl FocusState {
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn started_at(&self) -> Option<OffsetDateTime> {
        self.session.as_ref().map(|s| s.started_at)
    }

    /// Sites to install while a session runs: the snapshot plus extras.
    fn combined_sites(&self) -> Option<Vec<String>> {
        self.session.as_ref().map(|s| {
            let mut all = s.original_sites.clone();
            all.extend(s.extra_sites.iter().cloned());
            normalize_sites(&all)
        })
    }

    pub fn cycle(&self) -> &PomodoroCycle {
        &self.cycle
    }

    pub fn cycle_mut(&mut self) -> &mut PomodoroCycle {
        &mut self.cycle
    }
}

/// Starts (or restarts) a focus session and installs the combined block list.
/// A restart resets the clock but keeps the original snapshot.
pub fn start_session(
    conn: &Connection,
    focus: &mut FocusState,
    rules: &mut RuleSet,
    additional: &[String],
    now: OffsetDateTime,
) -> StoreResult<FocusStarted> {
    let restarted = focus.session.is_some();
    let original_sites = match focus.session.take() {
        Some(prev) => prev.original_sites,
        None => blocking::blocked_sites(conn)?,
    };
    focus.session = Some(FocusSession {
        started_at: now,
        original_sites,
        extra_sites: normalize_sites(additional),
    });
    focus.cycle = PomodoroCycle::default();

    let blocked_sites = focus.combined_sites().unwrap_or_default();
    info!("focus session started, blocking {} sites", blocked_sites.len());
    let update = rules.replace_all(&blocked_sites);
    Ok(FocusStarted {
        blocked_sites,
        restarted,
        rules: update,
    })
}

/// Ends the session, awards the bonus and restores the snapshot rules.
/// `None` when no session is running.
pub fn end_session(
    conn: &mut Connection,
    focus: &mut FocusState,
    rules: &mut RuleSet,
    now: OffsetDateTime,
) -> StoreResult<Option<FocusEnded>> {
    let Some(session) = focus.session.take() else {
        return Ok(None);
    };
    let duration = (now - session.started_at).whole_minutes().max(0);
    let xp_earned = focus_xp(duration);
    // Unblock first: a failed XP write must not leave the extras installed.
    let update = rules.replace_all(&session.original_sites);
    add_xp(conn, xp_earned)?;
    info!("focus session ended after {duration} min (+{xp_earned} xp)");
    Ok(Some(FocusEnded {
        duration,
        xp_earned,
        rules: update,
    }))
}

/// Replaces the stored block list. During a focus session the new list
/// becomes the snapshot and the session extras stay installed.
pub fn update_blocked_sites(
    conn: &Connection,
    focus: &mut FocusState,
    rules: &mut RuleSet,
    sites: &[String],
) -> StoreResult<RuleUpdate> {
    let stored = blocking::set_blocked_sites(conn, sites)?;
    let install = match focus.session.as_mut() {
        Some(session) => {
            session.original_sites = stored;
            focus.combined_sites().unwrap_or_default()
        }
        None => stored,
    };
    Ok(rules.replace_all(&install))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PomodoroPhase {
    Focus,
    Break,
    LongBreak,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroCycle {
    pub phase: PomodoroPhase,
    pub session_count: u32,
}

impl Default for PomodoroCycle {
    fn default() -> Self {
        Self {
            phase: PomodoroPhase::Focus,
            session_count: 1,
        }
    }
}

impl PomodoroCycle {
    /// Moves to the next phase. Every fourth focus round earns a long break.
    pub fn advance(&mut self) -> PomodoroPhase {
        self.phase = match self.phase {
            PomodoroPhase::Focus => {
                self.session_count += 1;
                if self.session_count % LONG_BREAK_EVERY == 0 {
                    PomodoroPhase::LongBreak
                } else {
                    PomodoroPhase::Break
                }
            }
            PomodoroPhase::Break | PomodoroPhase::LongBreak => PomodoroPhase::Focus,
        };
        self.phase
    }

    pub fn phase_minutes(&self, settings: &PomodoroSettings) -> i64 {
        match self.phase {
            PomodoroPhase::Focus => settings.focus,
            PomodoroPhase::Break => settings.break_minutes,
            PomodoroPhase::LongBreak => settings.long_break,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PomodoroSettings {
    pub focus: i64,
    #[serde(rename = "break")]
    pub break_minutes: i64,
    pub long_break: i64,
    pub sound_enabled: bool,
    pub notification_enabled: bool,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            focus: 25,
            break_minutes: 5,
            long_break: 15,
            sound_enabled: true,
            notification_enabled: true,
        }
    }
}

impl PomodoroSettings {
    /// Non-positive durations fall back to the defaults.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();
        if self.focus <= 0 {
            self.focus = d.focus;
        }
        if self.break_minutes <= 0 {
            self.break_minutes = d.break_minutes;
        }
        if self.long_break <= 0 {
            self.long_break = d.long_break;
        }
        self
    }
}

pub fn load_pomodoro_settings(conn: &Connection) -> StoreResult<PomodoroSettings> {
    Ok(
        store::kv_read_or_default::<Option<PomodoroSettings>>(conn, POMODORO_SETTINGS_KEY)?
            .unwrap_or_default()
            .sanitized(),
    )
}

pub fn save_pomodoro_settings(
    conn: &Connection,
    settings: PomodoroSettings,
) -> StoreResult<PomodoroSettings> {
    let settings = settings.sanitized();
    store::kv_set(conn, POMODORO_SETTINGS_KEY, &settings)?;
    Ok(settings)
}
