use crate::domain::models::Instant;
use crate::infrastructure::error::EngineError;
use chrono::{
    DateTime, Datelike, Days, Duration, FixedOffset, Months, NaiveDate, NaiveTime, TimeZone,
    Weekday,
};

/// Date primitives evaluated in one fixed UTC offset.
///
/// Every "same day", "start of week" and "start of month" question in the
/// engine goes through a `TimeBasis`, so a grid or navigation result never
/// depends on the host's local timezone. The only notion of "now" is the
/// value a caller passes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBasis {
    offset: FixedOffset,
}

impl TimeBasis {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn from_offset_seconds(seconds_east: i32) -> Result<Self, EngineError> {
        FixedOffset::east_opt(seconds_east)
            .map(Self::new)
            .ok_or_else(|| EngineError::InvalidConfig(format!("utc offset out of range: {seconds_east}s")))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn anchor<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> Instant {
        instant.with_timezone(&self.offset)
    }

    pub fn local_date<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> NaiveDate {
        self.anchor(instant).date_naive()
    }

    pub fn date_at_midnight(&self, date: NaiveDate) -> Result<Instant, EngineError> {
        let local_midnight = date.and_time(NaiveTime::MIN);
        let utc_midnight = local_midnight
            .checked_sub_signed(Duration::seconds(i64::from(self.offset.local_minus_utc())))
            .ok_or_else(|| EngineError::DateOutOfRange(format!("midnight of {date} at {}", self.offset)))?;
        Ok(DateTime::from_naive_utc_and_offset(utc_midnight, self.offset))
    }

    /// `[midnight, next midnight)` of the given date.
    pub fn day_span(&self, date: NaiveDate) -> Result<(Instant, Instant), EngineError> {
        let next = next_date(date)?;
        Ok((self.date_at_midnight(date)?, self.date_at_midnight(next)?))
    }

    pub fn today<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<Instant, EngineError> {
        self.start_of_day(now)
    }

    pub fn start_of_day<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> Result<Instant, EngineError> {
        self.date_at_midnight(self.local_date(instant))
    }

    pub fn start_of_week<Tz: TimeZone>(
        &self,
        instant: &DateTime<Tz>,
        week_starts_on: Weekday,
    ) -> Result<Instant, EngineError> {
        let date = week_start_date(self.local_date(instant), week_starts_on)?;
        self.date_at_midnight(date)
    }

    pub fn start_of_month<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> Result<Instant, EngineError> {
        let date = month_start_date(self.local_date(instant))?;
        self.date_at_midnight(date)
    }

    pub fn add_days(&self, instant: &Instant, days: i64) -> Result<Instant, EngineError> {
        let anchored = self.anchor(instant);
        let magnitude = Days::new(days.unsigned_abs());
        let shifted = if days >= 0 {
            anchored.checked_add_days(magnitude)
        } else {
            anchored.checked_sub_days(magnitude)
        };
        shifted.ok_or_else(|| EngineError::DateOutOfRange(format!("{anchored} + {days} days")))
    }

    /// Calendar-month arithmetic; the day of month is clamped when the target
    /// month is shorter (Jan 31 + 1 month is the last day of February).
    pub fn add_months(&self, instant: &Instant, months: i32) -> Result<Instant, EngineError> {
        let anchored = self.anchor(instant);
        let magnitude = Months::new(months.unsigned_abs());
        let shifted = if months >= 0 {
            anchored.checked_add_months(magnitude)
        } else {
            anchored.checked_sub_months(magnitude)
        };
        shifted.ok_or_else(|| EngineError::DateOutOfRange(format!("{anchored} + {months} months")))
    }

    pub fn add_years(&self, instant: &Instant, years: i32) -> Result<Instant, EngineError> {
        let months = years
            .checked_mul(12)
            .ok_or_else(|| EngineError::DateOutOfRange(format!("{instant} + {years} years")))?;
        self.add_months(instant, months)
    }

    pub fn is_same_day<A: TimeZone, B: TimeZone>(&self, left: &DateTime<A>, right: &DateTime<B>) -> bool {
        self.local_date(left) == self.local_date(right)
    }

    pub fn is_weekend<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> bool {
        is_weekend_date(self.local_date(instant))
    }
}

pub fn is_weekend_date(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn next_date(date: NaiveDate) -> Result<NaiveDate, EngineError> {
    date.succ_opt()
        .ok_or_else(|| EngineError::DateOutOfRange(format!("day after {date}")))
}

/// Rolls `date` back to the most recent `week_starts_on` (or keeps it).
pub fn week_start_date(date: NaiveDate, week_starts_on: Weekday) -> Result<NaiveDate, EngineError> {
    let back = (date.weekday().num_days_from_monday() + 7 - week_starts_on.num_days_from_monday()) % 7;
    date.checked_sub_days(Days::new(u64::from(back)))
        .ok_or_else(|| EngineError::DateOutOfRange(format!("week start before {date}")))
}

pub fn month_start_date(date: NaiveDate) -> Result<NaiveDate, EngineError> {
    date.with_day(1)
        .ok_or_else(|| EngineError::DateOutOfRange(format!("first day of month for {date}")))
}

pub fn month_end_date(first_of_month: NaiveDate) -> Result<NaiveDate, EngineError> {
    first_of_month
        .checked_add_months(Months::new(1))
        .and_then(|next_month| next_month.pred_opt())
        .ok_or_else(|| EngineError::DateOutOfRange(format!("last day of month for {first_of_month}")))
}
