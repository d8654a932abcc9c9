//! Hourly time ranges and weekly opening windows.
//!
//! All timestamps are UTC and generation works on whole hours: an hourly slot is
//! identified by the timestamp of its start.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Longest span the weather provider accepts in a single request, in hours.
pub const MAX_WEATHER_WINDOW_HOURS: u32 = 440;

/// Truncate a timestamp to the start of its hour.
pub fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Half-open interval `[start, end)` of UTC time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ConfigError> {
        if end <= start {
            return Err(ConfigError::InvalidTimeRange);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Start timestamps of every whole hour slot that begins inside the range.
    pub fn hours(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        let floored = floor_to_hour(self.start);
        let first = if floored < self.start {
            floored + Duration::hours(1)
        } else {
            floored
        };
        std::iter::successors(Some(first), |ts| Some(*ts + Duration::hours(1)))
            .take_while(move |ts| *ts < self.end)
    }

    /// Split into contiguous sub-ranges no longer than `max_hours` each.
    ///
    /// The pieces are start-inclusive, end-exclusive, never overlap and cover
    /// the whole range.
    pub fn split(&self, max_hours: u32) -> Vec<TimeRange> {
        let step = Duration::try_hours(i64::from(max_hours.max(1)));
        let mut pieces = Vec::new();
        let mut cursor = self.start;
        while cursor < self.end {
            let next = step
                .and_then(|step| cursor.checked_add_signed(step))
                .map_or(self.end, |next| next.min(self.end));
            pieces.push(TimeRange {
                start: cursor,
                end: next,
            });
            cursor = next;
        }
        pieces
    }
}

/// Hours of the day during which something is open or available.
///
/// `start..end` in whole hours. When `start > end` the window wraps midnight
/// (e.g. `20..4`). `end` may be 24.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourWindow {
    start: u8,
    end: u8,
}

impl HourWindow {
    pub fn new(start: u8, end: u8) -> Result<Self, ConfigError> {
        if start > 23 {
            return Err(ConfigError::InvalidHour(start));
        }
        if end > 24 {
            return Err(ConfigError::InvalidHour(end));
        }
        if start == end {
            return Err(ConfigError::EmptyHourWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Every hour of the day.
    pub fn all_day() -> Self {
        Self { start: 0, end: 24 }
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn end(&self) -> u8 {
        self.end
    }

    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        let (start, end) = (u32::from(self.start), u32::from(self.end));
        if self.wraps_midnight() {
            hour >= start || hour < end
        } else {
            hour >= start && hour < end
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.contains_hour(ts.hour())
    }

    /// Number of open hours per day.
    pub fn len_hours(&self) -> u32 {
        (0..24).filter(|h| self.contains_hour(*h)).count() as u32
    }
}

fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

/// Set of weekdays, stored as a bitmask (bit 0 = Monday).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenDays(u8);

impl OpenDays {
    pub fn new<I: IntoIterator<Item = Weekday>>(days: I) -> Result<Self, ConfigError> {
        let mask = days
            .into_iter()
            .fold(0u8, |mask, day| mask | (1 << day.num_days_from_monday()));
        if mask == 0 {
            return Err(ConfigError::EmptyOpenDays);
        }
        Ok(Self(mask))
    }

    /// Inclusive weekday range by index, 0 = Monday. Wraps past Sunday when
    /// `from > to` (e.g. `5..=0` is Saturday, Sunday, Monday).
    pub fn range(from: u8, to: u8) -> Result<Self, ConfigError> {
        let first = weekday_from_index(from).ok_or(ConfigError::InvalidWeekday(from))?;
        weekday_from_index(to).ok_or(ConfigError::InvalidWeekday(to))?;
        let span = (usize::from(to) + 7 - usize::from(from)) % 7 + 1;
        Self::new(std::iter::successors(Some(first), |d| Some(d.succ())).take(span))
    }

    /// Weekdays by index, 0 = Monday.
    pub fn from_indices<I: IntoIterator<Item = u8>>(indices: I) -> Result<Self, ConfigError> {
        let days = indices
            .into_iter()
            .map(|idx| weekday_from_index(idx).ok_or(ConfigError::InvalidWeekday(idx)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(days)
    }

    pub fn all() -> Self {
        Self(0b0111_1111)
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        (0..7u8)
            .filter_map(weekday_from_index)
            .filter(move |day| self.contains(*day))
    }
}

/// Weekly opening schedule of a locale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWindow {
    pub days: OpenDays,
    pub hours: HourWindow,
}

impl OpenWindow {
    pub fn new(days: OpenDays, hours: HourWindow) -> Self {
        Self { days, hours }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.days.contains(ts.weekday()) && self.hours.contains(ts)
    }

    /// Hour slots of `range` that fall inside the window.
    pub fn prune<'a>(&'a self, range: &'a TimeRange) -> impl Iterator<Item = DateTime<Utc>> + 'a {
        range.hours().filter(move |ts| self.contains(*ts))
    }
}

impl Default for OpenWindow {
    /// Monday to Saturday, 08:00 to 20:00.
    fn default() -> Self {
        Self {
            days: OpenDays(0b0011_1111),
            hours: HourWindow { start: 8, end: 20 },
        }
    }
}
