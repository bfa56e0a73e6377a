//! Time range handling: host time filters, time-slider slices and the
//! resolution of both into CQL-ready ISO-8601 bounds.

use chrono::{
    DateTime, Datelike, Months, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta,
    TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};

/// The host's aggregate time filter, e.g. `{ "from": "now-15m", "to": "now" }`.
///
/// Both ends accept absolute ISO-8601 instants or date-math expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

impl TimeRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Resolve both ends against `now`. Unparseable ends resolve to `None`.
    pub fn bounds(&self, now: DateTime<Utc>) -> TimeBounds {
        TimeBounds {
            min: parse_date_math(&self.from, now, false),
            max: parse_date_math(&self.to, now, true),
        }
    }
}

/// A `[from, to)` window selected on the time slider, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timeslice {
    pub from: f64,
    pub to: f64,
}

/// Resolved instants of a time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeBounds {
    pub min: Option<DateTime<Utc>>,
    pub max: Option<DateTime<Utc>>,
}

/// Resolve the `(start, stop)` pair used by the time predicate.
///
/// A timeslice wins over the aggregate range. A missing stop defaults to
/// `now`; a missing start is returned as `None`, which suppresses the
/// time predicate downstream.
pub fn resolve_time_bounds(
    timeslice: Option<&Timeslice>,
    time_range: Option<&TimeRange>,
    now: DateTime<Utc>,
) -> (Option<String>, Option<String>) {
    if let Some(slice) = timeslice {
        let start = from_epoch_millis(slice.from).map(|dt| to_iso(&dt));
        let stop = from_epoch_millis(slice.to).map(|dt| to_iso(&dt));
        return (start, stop);
    }

    let bounds = time_range.map(|range| range.bounds(now)).unwrap_or_default();
    let stop = to_iso(&bounds.max.unwrap_or(now));
    (bounds.min.map(|dt| to_iso(&dt)), Some(stop))
}

/// Format as ISO-8601 with millisecond precision and a `Z` suffix.
pub fn to_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn from_epoch_millis(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(ms as i64).single()
}

/// Parse an absolute instant (RFC 3339, naive datetime assumed UTC, or bare date).
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Evaluate a date-math expression such as `now-15m`, `now/d` or
/// `2024-01-15T00:00:00Z||+1d`.
///
/// `round_up` rounds `/unit` operations to the last millisecond of the unit
/// instead of its start, as the upper end of a range expects.
pub fn parse_date_math(expr: &str, now: DateTime<Utc>, round_up: bool) -> Option<DateTime<Utc>> {
    let expr = expr.trim();
    if expr.is_empty() {
        return None;
    }
    let (mut dt, mut math) = if let Some(rest) = expr.strip_prefix("now") {
        (now, rest)
    } else if let Some((anchor, rest)) = expr.split_once("||") {
        (parse_instant(anchor)?, rest)
    } else {
        return parse_instant(expr);
    };

    while !math.is_empty() {
        let op = math.chars().next()?;
        math = &math[op.len_utf8()..];
        let digits = math.chars().take_while(|c| c.is_ascii_digit()).count();
        let amount: i64 = if digits == 0 {
            1
        } else {
            math[..digits].parse().ok()?
        };
        math = &math[digits..];
        let unit = math.chars().next()?;
        math = &math[unit.len_utf8()..];

        dt = match op {
            '+' => shift(dt, amount, unit)?,
            '-' => shift(dt, -amount, unit)?,
            '/' if digits == 0 => round(dt, unit, round_up)?,
            _ => return None,
        };
    }
    Some(dt)
}

fn shift(dt: DateTime<Utc>, amount: i64, unit: char) -> Option<DateTime<Utc>> {
    let delta = match unit {
        's' => TimeDelta::try_seconds(amount)?,
        'm' => TimeDelta::try_minutes(amount)?,
        'h' | 'H' => TimeDelta::try_hours(amount)?,
        'd' => TimeDelta::try_days(amount)?,
        'w' => TimeDelta::try_weeks(amount)?,
        'M' => return shift_months(dt, amount),
        'y' => return shift_months(dt, amount.checked_mul(12)?),
        _ => return None,
    };
    dt.checked_add_signed(delta)
}

fn shift_months(dt: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        dt.checked_add_months(magnitude)
    } else {
        dt.checked_sub_months(magnitude)
    }
}

fn round(dt: DateTime<Utc>, unit: char, round_up: bool) -> Option<DateTime<Utc>> {
    let start = match unit {
        's' => dt.with_nanosecond(0)?,
        'm' => dt.with_nanosecond(0)?.with_second(0)?,
        'h' | 'H' => dt.with_nanosecond(0)?.with_second(0)?.with_minute(0)?,
        'd' => Utc.from_utc_datetime(&dt.date_naive().and_hms_opt(0, 0, 0)?),
        'w' => {
            let days_from_monday = i64::from(dt.weekday().num_days_from_monday());
            round(dt, 'd', false)?.checked_sub_signed(TimeDelta::try_days(days_from_monday)?)?
        }
        'M' => Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(dt.year(), dt.month(), 1)?.and_hms_opt(0, 0, 0)?,
        ),
        'y' => Utc.from_utc_datetime(&NaiveDate::from_ymd_opt(dt.year(), 1, 1)?.and_hms_opt(0, 0, 0)?),
        _ => return None,
    };
    if !round_up {
        return Some(start);
    }
    let next = shift(start, 1, unit)?;
    next.checked_sub_signed(TimeDelta::try_milliseconds(1)?)
}
