use crate::domain::time_basis::TimeBasis;
use crate::infrastructure::error::EngineError;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// A point in time pinned to a fixed UTC offset.
pub type Instant = DateTime<FixedOffset>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NavigationDirection {
    Previous,
    Next,
}

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interval {
    pub start: Instant,
    pub end: Instant,
}

impl Interval {
    pub fn new(start: Instant, end: Instant) -> Result<Self, EngineError> {
        let interval = Self { start, end };
        interval.validate("interval")?;
        Ok(interval)
    }

    pub fn validate(&self, subject: &str) -> Result<(), EngineError> {
        if self.end <= self.start {
            return Err(EngineError::InvalidInterval {
                subject: subject.to_string(),
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn is_adjacent_to(&self, other: &Interval) -> bool {
        self.end == other.start || other.end == self.start
    }

    pub fn has_same_bounds(&self, other: &Interval) -> bool {
        self.start == other.start && self.end == other.end
    }

    /// True when the interval shares any instant with `[span_start, span_end)`.
    pub fn intersects_span(&self, span_start: &Instant, span_end: &Instant) -> bool {
        self.start < *span_end && *span_start < self.end
    }

    /// Overlapping or touching at either boundary.
    pub fn touches_or_overlaps(&self, other: &Interval) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn shifted(&self, delta: Duration) -> Option<Self> {
        Some(Self {
            start: self.start.checked_add_signed(delta)?,
            end: self.end.checked_add_signed(delta)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub interval: Interval,
    #[serde(default)]
    pub attendee_ids: BTreeSet<String>,
    #[serde(default)]
    pub all_day: bool,
}

impl Event {
    pub fn new(id: impl Into<String>, title: impl Into<String>, interval: Interval) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            interval,
            attendee_ids: BTreeSet::new(),
            all_day: false,
        }
    }

    pub fn with_attendees<I, S>(mut self, attendee_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attendee_ids = attendee_ids
            .into_iter()
            .map(Into::into)
            .map(|attendee_id: String| attendee_id.trim().to_string())
            .filter(|attendee_id| !attendee_id.is_empty())
            .collect();
        self
    }

    pub fn with_all_day(mut self, all_day: bool) -> Self {
        self.all_day = all_day;
        self
    }

    pub fn start(&self) -> Instant {
        self.interval.start
    }

    pub fn end(&self) -> Instant {
        self.interval.end
    }

    /// Attendee ids compare with surrounding whitespace ignored.
    pub fn has_attendee(&self, attendee_id: &str) -> bool {
        let attendee_id = attendee_id.trim();
        self.attendee_ids.contains(attendee_id)
            || self.attendee_ids.iter().any(|stored| stored.trim() == attendee_id)
    }

    pub(crate) fn is_same_event(&self, other_id: &str) -> bool {
        self.id.trim() == other_id.trim()
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.interval.validate(&self.id)
    }

    /// Calendar dates covered by an all-day event, read in `basis`. The end
    /// date is exclusive and always after the start date.
    pub fn all_day_dates(&self, basis: &TimeBasis) -> (NaiveDate, NaiveDate) {
        let start = basis.local_date(&self.interval.start);
        let end_local = basis.anchor(&self.interval.end);
        let end_date = end_local.date_naive();
        let end = if end_local.time() == NaiveTime::MIN {
            end_date
        } else {
            end_date.succ_opt().unwrap_or(end_date)
        };
        let minimum_end = start.succ_opt().unwrap_or(start);
        (start, end.max(minimum_end))
    }
}

pub(crate) fn event_order(left: &Event, right: &Event) -> Ordering {
    left.interval
        .start
        .cmp(&right.interval.start)
        .then_with(|| left.id.cmp(&right.id))
}

/// Orders events by start instant, ties broken by id.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by(event_order);
}

pub fn validate_events(events: &[Event]) -> Result<(), EngineError> {
    events.iter().try_for_each(Event::validate)
}
