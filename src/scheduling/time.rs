//! Normalizes user-entered date/time plus a duration into the window both
//! remote create-calls share.
//!
//! The portal takes time in two shapes depending on the method: a naive
//! `YYYY-MM-DD HH:MM:SS` wall-clock string, and ISO-8601 with an offset.
//! Both are derived from the same `TimeWindow` so the calendar event and the
//! deal activity can never disagree about when the meeting is.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat};

use crate::core::error::ScheduleError;

/// Slot size of the time-grid widget, in minutes.
pub const GRID_STEP_MINUTES: i64 = 15;

/// Used when the duration field is empty or not a number.
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// A validated meeting window. `end` is always strictly after `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, duration_minutes: i64) -> Result<Self, ScheduleError> {
        let minutes = if duration_minutes > 0 {
            duration_minutes
        } else {
            DEFAULT_DURATION_MINUTES
        };
        // Checked arithmetic: a duration that overflows the calendar is a
        // validation failure, not a panic
        let end = Duration::try_minutes(minutes)
            .and_then(|d| start.checked_add_signed(d))
            .ok_or_else(|| {
                ScheduleError::Validation(format!("duration is out of range: {} minutes", minutes))
            })?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// `(from, to)` in the portal's naive local format. Seconds are always
    /// `00`; the wall-clock fields are emitted as-is, no timezone math.
    pub fn local_format(&self) -> (String, String) {
        (local_datetime(self.start), local_datetime(self.end))
    }

    /// `(from, to)` as ISO-8601 instants. The wall-clock fields are taken
    /// as UTC since the portal applies the calendar owner's timezone itself.
    pub fn instant_format(&self) -> (String, String) {
        (instant_datetime(self.start), instant_datetime(self.end))
    }
}

fn local_datetime(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M:00").to_string()
}

fn instant_datetime(t: NaiveDateTime) -> String {
    t.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Round `t` up to the next multiple of `step_minutes`. Instants already on
/// the grid are returned unchanged, so reapplying on every edit is safe.
pub fn snap_to_grid(t: NaiveDateTime, step_minutes: i64) -> NaiveDateTime {
    let step = step_minutes * 60;
    let secs = t.and_utc().timestamp();
    let rem = secs.rem_euclid(step);
    if rem == 0 {
        t
    } else {
        t + Duration::seconds(step - rem)
    }
}

/// Coerce the raw duration field. Empty or non-numeric input falls back to
/// the default instead of failing the submission; any positive integer is
/// accepted even though the form steps in multiples of 15.
pub fn duration_minutes(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_DURATION_MINUTES)
}

/// Build a window from a single `datetime-local` value
/// (`YYYY-MM-DDTHH:MM`, seconds optional).
pub fn combined_window(datetime: &str, duration: Option<&str>) -> Result<TimeWindow, ScheduleError> {
    let raw = datetime.trim();
    if raw.is_empty() {
        return Err(ScheduleError::Validation(
            "fill in the date and time".to_string(),
        ));
    }
    let start = parse_local_datetime(raw)?;
    TimeWindow::new(start, duration_minutes(duration))
}

/// Build a window from separate date and time-of-day inputs, snapping the
/// start up to the time-grid boundary.
pub fn split_window(
    date: &str,
    time: &str,
    duration: Option<&str>,
) -> Result<TimeWindow, ScheduleError> {
    let date = date.trim();
    let time = time.trim();
    if date.is_empty() || time.is_empty() {
        return Err(ScheduleError::Validation(
            "fill in the date and time".to_string(),
        ));
    }
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ScheduleError::Validation(format!("invalid date: {}", date)))?;
    let tod = NaiveTime::parse_from_str(time, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .map_err(|_| ScheduleError::Validation(format!("invalid time: {}", time)))?;
    let start = snap_to_grid(day.and_time(tod), GRID_STEP_MINUTES);
    TimeWindow::new(start, duration_minutes(duration))
}

fn parse_local_datetime(raw: &str) -> Result<NaiveDateTime, ScheduleError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M"))
        .map_err(|_| ScheduleError::Validation(format!("invalid date and time: {}", raw)))
}
