use time::{format_description::well_known::Rfc3339, Date, OffsetDateTime, UtcOffset};

const TZ_OFFSET_MINUTES_MIN: i32 = -14 * 60;
const TZ_OFFSET_MINUTES_MAX: i32 = 14 * 60;

pub fn rfc3339(t: OffsetDateTime) -> String {
    t.to_offset(UtcOffset::UTC).format(&Rfc3339).unwrap_or_default()
}

pub fn parse_rfc3339(s: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(s, &Rfc3339).ok()
}

pub fn unix_ms(t: OffsetDateTime) -> i64 {
    (t.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Calendar date of `now` as seen from `tz`.
pub fn today(now: OffsetDateTime, tz: UtcOffset) -> Date {
    now.to_offset(tz).date()
}

pub fn normalize_tz_offset_minutes(v: Option<i32>) -> i32 {
    v.unwrap_or(0)
        .clamp(TZ_OFFSET_MINUTES_MIN, TZ_OFFSET_MINUTES_MAX)
}

pub fn tz_offset_from_minutes(minutes: i32) -> UtcOffset {
    UtcOffset::from_whole_seconds(minutes.saturating_mul(60)).unwrap_or(UtcOffset::UTC)
}

/// `YYYY-MM-DD`.
pub fn parse_date(date: &str) -> Option<Date> {
    let parts: Vec<&str> = date.trim().split('-').collect();
    if parts.len() != 3 {
        return None;
    }
    let y: i32 = parts[0].parse().ok()?;
    let m: u8 = parts[1].parse().ok()?;
    let d: u8 = parts[2].parse().ok()?;
    let month = time::Month::try_from(m).ok()?;
    Date::from_calendar_date(y, month, d).ok()
}

/// `YYYY-MM-DD` + `HH:MM[:SS]` interpreted in `tz`.
pub fn parse_local_datetime(date: &str, hhmm: &str, tz: UtcOffset) -> Option<OffsetDateTime> {
    let day = parse_date(date)?;
    let mut parts = hhmm.trim().split(':');
    let h: u8 = parts.next()?.parse().ok()?;
    let m: u8 = parts.next()?.parse().ok()?;
    let s: u8 = match parts.next() {
        Some(v) => v.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(day.with_hms(h, m, s).ok()?.assume_offset(tz))
}

/// Timestamp-based identifier, bumped past `existing` on collision.
pub fn next_id(existing: impl IntoIterator<Item = i64>, now: OffsetDateTime) -> i64 {
    let candidate = unix_ms(now);
    let mut max_seen: Option<i64> = None;
    let mut collides = false;
    for id in existing {
        if id == candidate {
            collides = true;
        }
        max_seen = Some(max_seen.map_or(id, |m| m.max(id)));
    }
    match (collides, max_seen) {
        (true, Some(m)) => m + 1,
        _ => candidate,
    }
}

#[cfg(test)]
pub fn at(s: &str) -> OffsetDateTime {
    OffsetDateTime::parse(s, &Rfc3339).unwrap()
}
