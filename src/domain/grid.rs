use crate::domain::models::{Event, Instant, ViewType, event_order, validate_events};
use crate::domain::time_basis::{
    TimeBasis, is_weekend_date, month_end_date, next_date, week_start_date,
};
use crate::infrastructure::error::EngineError;
use chrono::{Datelike, Duration, NaiveDate, Timelike, Weekday};
use serde::Serialize;
use std::ops::Range;
use tracing::debug;

pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;
const DAYS_PER_WEEK: usize = 7;
const MONTHS_PER_YEAR: u32 = 12;

/// Hour buckets `[start, end)` shown by week and day grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourRange {
    start: u32,
    end: u32,
}

impl HourRange {
    pub fn new(start: u32, end: u32) -> Result<Self, EngineError> {
        if end > 24 {
            return Err(EngineError::view_parameter("end_hour", end));
        }
        if start >= end {
            return Err(EngineError::view_parameter(
                "hour_range",
                format!("[{start}, {end})"),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn full_day() -> Self {
        Self { start: 0, end: 24 }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start && hour < self.end
    }

    pub fn hours(&self) -> Range<u32> {
        self.start..self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridOptions {
    pub week_starts_on: Weekday,
    pub hours: HourRange,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            week_starts_on: Weekday::Sun,
            hours: HourRange::full_day(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub is_today: bool,
    pub is_in_primary_period: bool,
    pub is_weekend: bool,
    pub events: Vec<Event>,
}

impl CalendarCell {
    fn new(date: NaiveDate, today: NaiveDate, is_in_primary_period: bool) -> Self {
        Self {
            date,
            is_today: date == today,
            is_in_primary_period,
            is_weekend: is_weekend_date(date),
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    /// Zero-based month index (0 = January).
    pub month0: u32,
    pub week_starts_on: Weekday,
    pub weeks: Vec<Vec<CalendarCell>>,
}

impl MonthGrid {
    pub fn cells(&self) -> impl Iterator<Item = &CalendarCell> {
        self.weeks.iter().flatten()
    }

    pub fn primary_cells(&self) -> impl Iterator<Item = &CalendarCell> {
        self.cells().filter(|cell| cell.is_in_primary_period)
    }

    pub fn cell_count(&self) -> usize {
        self.weeks.iter().map(Vec::len).sum()
    }

    pub fn row_count(&self) -> usize {
        self.weeks.len()
    }

    pub fn cell(&self, date: NaiveDate) -> Option<&CalendarCell> {
        self.cells().find(|cell| cell.date == date)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.cells().next().map(|cell| cell.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.cells().last().map(|cell| cell.date)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub hour: u32,
    pub start: Instant,
    pub end: Instant,
    pub events: Vec<Event>,
}

/// Hourly layout shared by the week and day views.
///
/// `days` holds one header cell per day carrying that day's all-day events.
/// Timed events are anchored once, to the slot of their start hour; those
/// whose anchor hour is outside `hours` land in `omitted` so the caller can
/// show an overflow indicator.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimeGrid {
    pub days: Vec<CalendarCell>,
    pub hours: HourRange,
    pub slots: Vec<TimeSlot>,
    pub omitted: Vec<Event>,
}

impl TimeGrid {
    pub fn slots_for(&self, date: NaiveDate) -> impl Iterator<Item = &TimeSlot> {
        self.slots.iter().filter(move |slot| slot.date == date)
    }

    pub fn slot(&self, date: NaiveDate, hour: u32) -> Option<&TimeSlot> {
        self.slots
            .iter()
            .find(|slot| slot.date == date && slot.hour == hour)
    }

    pub fn has_overflow(&self) -> bool {
        !self.omitted.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthSummary {
    pub grid: MonthGrid,
    pub event_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct YearGrid {
    pub year: i32,
    pub months: Vec<MonthSummary>,
}

impl YearGrid {
    pub fn total_events(&self) -> usize {
        self.months.iter().map(|month| month.event_count).sum()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Grid {
    Month(MonthGrid),
    Week(TimeGrid),
    Day(TimeGrid),
    Year(YearGrid),
}

impl Grid {
    pub fn view(&self) -> ViewType {
        match self {
            Grid::Month(_) => ViewType::Month,
            Grid::Week(_) => ViewType::Week,
            Grid::Day(_) => ViewType::Day,
            Grid::Year(_) => ViewType::Year,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBuilder {
    basis: TimeBasis,
    options: GridOptions,
}

impl GridBuilder {
    pub fn new(basis: TimeBasis, options: GridOptions) -> Self {
        Self { basis, options }
    }

    pub fn basis(&self) -> TimeBasis {
        self.basis
    }

    pub fn options(&self) -> GridOptions {
        self.options
    }

    pub fn build(
        &self,
        reference: &Instant,
        view: ViewType,
        events: &[Event],
        now: &Instant,
    ) -> Result<Grid, EngineError> {
        validate_events(events)?;
        let date = self.basis.local_date(reference);
        let today = self.basis.local_date(now);
        let grid = match view {
            ViewType::Month => Grid::Month(self.build_month(date.year(), date.month0(), events, today)?),
            ViewType::Week => {
                let first_day = week_start_date(checked_year(date)?, self.options.week_starts_on)?;
                Grid::Week(self.build_time_grid(first_day, DAYS_PER_WEEK, events, today)?)
            }
            ViewType::Day => Grid::Day(self.build_time_grid(checked_year(date)?, 1, events, today)?),
            ViewType::Year => Grid::Year(self.build_year(date.year(), events, today)?),
        };
        debug!(?view, %date, event_count = events.len(), "built calendar grid");
        Ok(grid)
    }

    pub fn month(
        &self,
        year: i32,
        month0: u32,
        events: &[Event],
        now: &Instant,
    ) -> Result<MonthGrid, EngineError> {
        validate_events(events)?;
        self.build_month(year, month0, events, self.basis.local_date(now))
    }

    pub fn week(
        &self,
        reference: &Instant,
        events: &[Event],
        now: &Instant,
    ) -> Result<TimeGrid, EngineError> {
        validate_events(events)?;
        let date = checked_year(self.basis.local_date(reference))?;
        let first_day = week_start_date(date, self.options.week_starts_on)?;
        self.build_time_grid(first_day, DAYS_PER_WEEK, events, self.basis.local_date(now))
    }

    pub fn day(
        &self,
        reference: &Instant,
        events: &[Event],
        now: &Instant,
    ) -> Result<TimeGrid, EngineError> {
        validate_events(events)?;
        let date = checked_year(self.basis.local_date(reference))?;
        self.build_time_grid(date, 1, events, self.basis.local_date(now))
    }

    pub fn year(&self, year: i32, events: &[Event], now: &Instant) -> Result<YearGrid, EngineError> {
        validate_events(events)?;
        self.build_year(year, events, self.basis.local_date(now))
    }

    fn build_month(
        &self,
        year: i32,
        month0: u32,
        events: &[Event],
        today: NaiveDate,
    ) -> Result<MonthGrid, EngineError> {
        let first = first_of_month(year, month0)?;
        let last = month_end_date(first)?;
        let grid_start = week_start_date(first, self.options.week_starts_on)?;

        let mut weeks = Vec::new();
        let mut cursor = grid_start;
        while cursor <= last {
            let mut week = Vec::with_capacity(DAYS_PER_WEEK);
            for _ in 0..DAYS_PER_WEEK {
                let is_primary = cursor.year() == year && cursor.month0() == month0;
                week.push(CalendarCell::new(cursor, today, is_primary));
                cursor = next_date(cursor)?;
            }
            weeks.push(week);
        }
        let grid_end = cursor;

        for event in events {
            let Some(anchor) = self.anchor_date(event, grid_start, grid_end)? else {
                continue;
            };
            let index = (anchor - grid_start).num_days() as usize;
            if let Some(cell) = weeks
                .get_mut(index / DAYS_PER_WEEK)
                .and_then(|week| week.get_mut(index % DAYS_PER_WEEK))
            {
                cell.events.push(event.clone());
            }
        }
        for cell in weeks.iter_mut().flatten() {
            cell.events.sort_by(event_order);
        }

        Ok(MonthGrid {
            year,
            month0,
            week_starts_on: self.options.week_starts_on,
            weeks,
        })
    }

    fn build_time_grid(
        &self,
        first_day: NaiveDate,
        day_count: usize,
        events: &[Event],
        today: NaiveDate,
    ) -> Result<TimeGrid, EngineError> {
        let hours = self.options.hours;
        let slots_per_day = hours.len() as usize;
        let mut days = Vec::with_capacity(day_count);
        let mut slots = Vec::with_capacity(day_count * slots_per_day);

        let mut cursor = first_day;
        for _ in 0..day_count {
            days.push(CalendarCell::new(cursor, today, true));
            let midnight = self.basis.date_at_midnight(cursor)?;
            for hour in hours.hours() {
                let start = midnight + Duration::hours(i64::from(hour));
                slots.push(TimeSlot {
                    date: cursor,
                    hour,
                    start,
                    end: start + Duration::hours(1),
                    events: Vec::new(),
                });
            }
            cursor = next_date(cursor)?;
        }

        let window_start = self.basis.date_at_midnight(first_day)?;
        let window_end = self.basis.date_at_midnight(cursor)?;
        let mut omitted = Vec::new();

        for event in events {
            if event.all_day {
                let (start, end) = event.all_day_dates(&self.basis);
                for cell in days
                    .iter_mut()
                    .filter(|cell| cell.date >= start && cell.date < end)
                {
                    cell.events.push(event.clone());
                }
                continue;
            }

            if !event.interval.intersects_span(&window_start, &window_end) {
                continue;
            }
            let anchor = self.basis.anchor(&event.interval.start.max(window_start));
            let hour = anchor.hour();
            if !hours.contains(hour) {
                omitted.push(event.clone());
                continue;
            }
            let day_index = (anchor.date_naive() - first_day).num_days() as usize;
            let slot_index = day_index * slots_per_day + (hour - hours.start()) as usize;
            if let Some(slot) = slots.get_mut(slot_index) {
                slot.events.push(event.clone());
            }
        }

        for cell in &mut days {
            cell.events.sort_by(event_order);
        }
        for slot in &mut slots {
            slot.events.sort_by(event_order);
        }
        omitted.sort_by(event_order);

        Ok(TimeGrid {
            days,
            hours,
            slots,
            omitted,
        })
    }

    fn build_year(&self, year: i32, events: &[Event], today: NaiveDate) -> Result<YearGrid, EngineError> {
        let mut months = Vec::with_capacity(MONTHS_PER_YEAR as usize);
        for month0 in 0..MONTHS_PER_YEAR {
            let grid = self.build_month(year, month0, events, today)?;
            let event_count = events
                .iter()
                .map(|event| self.start_date(event))
                .filter(|date| date.year() == year && date.month0() == month0)
                .count();
            months.push(MonthSummary { grid, event_count });
        }
        Ok(YearGrid { year, months })
    }

    /// Date of the cell an event is bucketed into for a grid spanning
    /// `[span_start, span_end)`, or `None` when the event lies outside it.
    fn anchor_date(
        &self,
        event: &Event,
        span_start: NaiveDate,
        span_end: NaiveDate,
    ) -> Result<Option<NaiveDate>, EngineError> {
        if event.all_day {
            let (start, end) = event.all_day_dates(&self.basis);
            if start >= span_end || end <= span_start {
                return Ok(None);
            }
            return Ok(Some(start.max(span_start)));
        }

        let window_start = self.basis.date_at_midnight(span_start)?;
        let window_end = self.basis.date_at_midnight(span_end)?;
        if !event.interval.intersects_span(&window_start, &window_end) {
            return Ok(None);
        }
        Ok(Some(self.basis.local_date(&event.interval.start.max(window_start))))
    }

    fn start_date(&self, event: &Event) -> NaiveDate {
        if event.all_day {
            event.all_day_dates(&self.basis).0
        } else {
            self.basis.local_date(&event.interval.start)
        }
    }
}

fn checked_year(date: NaiveDate) -> Result<NaiveDate, EngineError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        return Err(EngineError::view_parameter("year", date.year()));
    }
    Ok(date)
}

fn first_of_month(year: i32, month0: u32) -> Result<NaiveDate, EngineError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(EngineError::view_parameter("year", year));
    }
    if month0 >= MONTHS_PER_YEAR {
        return Err(EngineError::view_parameter("month", month0));
    }
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
        .ok_or_else(|| EngineError::view_parameter("month", format!("{year}-{month0}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Interval;
    use chrono::DateTime;
    use proptest::prelude::*;

    fn basis() -> TimeBasis {
        TimeBasis::from_offset_seconds(9 * 3600).expect("valid offset")
    }

    fn builder(week_starts_on: Weekday, hours: HourRange) -> GridBuilder {
        GridBuilder::new(basis(), GridOptions { week_starts_on, hours })
    }

    fn fixed_time(value: &str) -> Instant {
        DateTime::parse_from_rfc3339(value).expect("valid datetime")
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn event(id: &str, start: &str, end: &str) -> Event {
        Event::new(
            id,
            format!("Event {id}"),
            Interval::new(fixed_time(start), fixed_time(end)).expect("valid interval"),
        )
    }

    fn now() -> Instant {
        fixed_time("2025-02-14T12:00:00+09:00")
    }

    fn ids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|event| event.id.as_str()).collect()
    }

    #[test]
    fn february_2025_with_sunday_start_pads_into_adjacent_months() {
        let grid = builder(Weekday::Sun, HourRange::full_day())
            .month(2025, 1, &[], &now())
            .expect("month grid");

        assert_eq!(grid.row_count(), 5);
        assert_eq!(grid.cell_count(), 35);
        assert_eq!(grid.first_date(), Some(date("2025-01-26")));
        assert_eq!(grid.last_date(), Some(date("2025-03-01")));
        let leading = grid
            .cells()
            .take_while(|cell| !cell.is_in_primary_period)
            .count();
        let trailing = grid
            .cells()
            .filter(|cell| cell.date > date("2025-02-28"))
            .count();
        assert_eq!(leading, 6);
        assert_eq!(trailing, 1);
        assert_eq!(grid.primary_cells().count(), 28);
    }

    #[test]
    fn february_2026_with_sunday_start_fits_four_rows_exactly() {
        let grid = builder(Weekday::Sun, HourRange::full_day())
            .month(2026, 1, &[], &now())
            .expect("month grid");

        assert_eq!(grid.row_count(), 4);
        assert_eq!(grid.cell_count(), 28);
        assert!(grid.cells().all(|cell| cell.is_in_primary_period));
        assert_eq!(grid.first_date(), Some(date("2026-02-01")));
    }

    #[test]
    fn march_2025_with_monday_start_needs_six_rows() {
        let grid = builder(Weekday::Mon, HourRange::full_day())
            .month(2025, 2, &[], &now())
            .expect("month grid");

        assert_eq!(grid.row_count(), 6);
        assert_eq!(grid.first_date(), Some(date("2025-02-24")));
        assert_eq!(grid.last_date(), Some(date("2025-04-06")));
        assert!(grid.weeks.iter().all(|week| week[0].date.weekday() == Weekday::Mon));
    }

    #[test]
    fn month_rejects_out_of_range_parameters() {
        let builder = builder(Weekday::Sun, HourRange::full_day());
        assert!(matches!(
            builder.month(2025, 12, &[], &now()),
            Err(EngineError::InvalidViewParameters { parameter: "month", .. })
        ));
        assert!(matches!(
            builder.month(0, 0, &[], &now()),
            Err(EngineError::InvalidViewParameters { parameter: "year", .. })
        ));
    }

    #[test]
    fn hour_range_rejects_empty_and_overlong_ranges() {
        assert!(HourRange::new(9, 9).is_err());
        assert!(HourRange::new(10, 8).is_err());
        assert!(HourRange::new(0, 25).is_err());
        let range = HourRange::new(8, 20).expect("valid range");
        assert_eq!(range.len(), 12);
        assert!(range.contains(8));
        assert!(!range.contains(20));
    }

    #[test]
    fn month_buckets_events_by_start_date_in_basis_offset() {
        let timed = event("timed", "2025-02-10T10:00:00+09:00", "2025-02-10T11:00:00+09:00");
        // 20:00 UTC is the next morning in Tokyo
        let late_utc = event("late-utc", "2025-02-11T20:00:00Z", "2025-02-11T21:00:00Z");
        let all_day = event("holiday", "2025-02-11T00:00:00Z", "2025-02-12T00:00:00Z").with_all_day(true);
        let carried_in = event("carried-in", "2025-01-20T09:00:00+09:00", "2025-01-28T09:00:00+09:00");
        let outside = event("outside", "2025-04-01T09:00:00+09:00", "2025-04-01T10:00:00+09:00");

        let grid = builder(Weekday::Sun, HourRange::full_day())
            .month(2025, 1, &[timed, late_utc, all_day, carried_in, outside], &now())
            .expect("month grid");

        let cell = |value: &str| grid.cell(date(value)).expect("cell exists");
        assert_eq!(ids(&cell("2025-02-10").events), vec!["timed"]);
        assert_eq!(ids(&cell("2025-02-11").events), vec!["holiday"]);
        assert_eq!(ids(&cell("2025-02-12").events), vec!["late-utc"]);
        assert_eq!(ids(&cell("2025-01-26").events), vec!["carried-in"]);
        assert!(grid.cells().all(|cell| !ids(&cell.events).contains(&"outside")));
    }

    #[test]
    fn all_day_event_written_in_utc_lands_on_basis_date() {
        // all of 2025-02-11 in Tokyo, serialized as UTC instants
        let holiday = event("holiday", "2025-02-10T15:00:00Z", "2025-02-11T15:00:00Z").with_all_day(true);
        let builder = builder(Weekday::Sun, HourRange::full_day());

        let month = builder
            .month(2025, 1, std::slice::from_ref(&holiday), &now())
            .expect("month grid");
        let month_dates: Vec<NaiveDate> = month
            .cells()
            .filter(|cell| !cell.events.is_empty())
            .map(|cell| cell.date)
            .collect();
        assert_eq!(month_dates, vec![date("2025-02-11")]);

        let week = builder
            .week(&fixed_time("2025-02-11T12:00:00+09:00"), std::slice::from_ref(&holiday), &now())
            .expect("week grid");
        let header_dates: Vec<NaiveDate> = week
            .days
            .iter()
            .filter(|cell| !cell.events.is_empty())
            .map(|cell| cell.date)
            .collect();
        assert_eq!(header_dates, vec![date("2025-02-11")]);
        assert!(week.slots.iter().all(|slot| slot.events.is_empty()));

        let year = builder
            .year(2025, std::slice::from_ref(&holiday), &now())
            .expect("year grid");
        assert_eq!(year.months[1].event_count, 1);
    }

    #[test]
    fn month_cells_flag_today_and_weekends() {
        let grid = builder(Weekday::Sun, HourRange::full_day())
            .month(2025, 1, &[], &now())
            .expect("month grid");
        let today: Vec<NaiveDate> = grid.cells().filter(|cell| cell.is_today).map(|cell| cell.date).collect();
        assert_eq!(today, vec![date("2025-02-14")]);
        assert!(grid.cell(date("2025-02-15")).expect("saturday").is_weekend);
        assert!(!grid.cell(date("2025-02-14")).expect("friday").is_weekend);
    }

    #[test]
    fn cell_events_are_ordered_by_start_then_id() {
        let later = event("a-later", "2025-02-10T15:00:00+09:00", "2025-02-10T16:00:00+09:00");
        let tie_b = event("b-tie", "2025-02-10T09:00:00+09:00", "2025-02-10T10:00:00+09:00");
        let tie_a = event("a-tie", "2025-02-10T09:00:00+09:00", "2025-02-10T09:30:00+09:00");

        let grid = builder(Weekday::Sun, HourRange::full_day())
            .month(2025, 1, &[later, tie_b, tie_a], &now())
            .expect("month grid");
        assert_eq!(
            ids(&grid.cell(date("2025-02-10")).expect("cell").events),
            vec!["a-tie", "b-tie", "a-later"]
        );
    }

    #[test]
    fn week_grid_anchors_events_to_start_hour_and_reports_overflow() {
        let hours = HourRange::new(8, 20).expect("hours");
        let in_range = event("standup", "2025-02-05T09:30:00+09:00", "2025-02-05T09:45:00+09:00");
        let long = event("workshop", "2025-02-05T10:00:00+09:00", "2025-02-05T12:00:00+09:00");
        let early = event("early", "2025-02-06T06:00:00+09:00", "2025-02-06T07:00:00+09:00");
        let late = event("late", "2025-02-06T20:00:00+09:00", "2025-02-06T21:00:00+09:00");
        let all_day = event("offsite", "2025-02-06T00:00:00+09:00", "2025-02-08T00:00:00+09:00").with_all_day(true);
        let next_week = event("next-week", "2025-02-10T09:00:00+09:00", "2025-02-10T10:00:00+09:00");

        let grid = builder(Weekday::Sun, hours)
            .week(
                &fixed_time("2025-02-05T12:00:00+09:00"),
                &[in_range, long, early, late, all_day, next_week],
                &now(),
            )
            .expect("week grid");

        assert_eq!(grid.days.len(), 7);
        assert_eq!(grid.days[0].date, date("2025-02-02"));
        assert_eq!(grid.slots.len(), 7 * 12);
        assert_eq!(grid.slots_for(date("2025-02-05")).count(), 12);

        let wednesday = date("2025-02-05");
        assert_eq!(ids(&grid.slot(wednesday, 9).expect("9h").events), vec!["standup"]);
        assert_eq!(ids(&grid.slot(wednesday, 10).expect("10h").events), vec!["workshop"]);
        assert!(grid.slot(wednesday, 11).expect("11h").events.is_empty());

        assert!(grid.has_overflow());
        assert_eq!(ids(&grid.omitted), vec!["early", "late"]);

        assert_eq!(ids(&grid.days[4].events), vec!["offsite"]);
        assert_eq!(ids(&grid.days[5].events), vec!["offsite"]);
        assert!(grid.days[6].events.is_empty());
        assert!(grid.slots.iter().all(|slot| !ids(&slot.events).contains(&"next-week")));
    }

    #[test]
    fn week_grid_clamps_events_started_before_window() {
        let hours = HourRange::new(8, 20).expect("hours");
        let overnight = event("overnight", "2025-02-01T23:00:00+09:00", "2025-02-02T02:00:00+09:00");
        let grid = builder(Weekday::Sun, hours)
            .week(&fixed_time("2025-02-05T12:00:00+09:00"), &[overnight], &now())
            .expect("week grid");
        assert_eq!(ids(&grid.omitted), vec!["overnight"]);

        let full = builder(Weekday::Sun, HourRange::full_day())
            .week(
                &fixed_time("2025-02-05T12:00:00+09:00"),
                &[event("overnight", "2025-02-01T23:00:00+09:00", "2025-02-02T02:00:00+09:00")],
                &now(),
            )
            .expect("week grid");
        assert_eq!(ids(&full.slot(date("2025-02-02"), 0).expect("midnight").events), vec!["overnight"]);
    }

    #[test]
    fn day_grid_covers_single_day_in_basis_offset() {
        let grid = builder(Weekday::Sun, HourRange::full_day())
            .day(
                &fixed_time("2025-02-14T01:00:00Z"),
                &[event("late", "2025-02-14T23:30:00+09:00", "2025-02-15T00:30:00+09:00")],
                &now(),
            )
            .expect("day grid");

        assert_eq!(grid.days.len(), 1);
        assert!(grid.days[0].is_today);
        assert_eq!(grid.slots.len(), 24);
        let slot = grid.slot(date("2025-02-14"), 23).expect("23h");
        assert_eq!(slot.start, fixed_time("2025-02-14T23:00:00+09:00"));
        assert_eq!(ids(&slot.events), vec!["late"]);
    }

    #[test]
    fn year_grid_holds_twelve_months_with_start_counts() {
        let events = vec![
            event("jan", "2025-01-15T09:00:00+09:00", "2025-01-15T10:00:00+09:00"),
            event("feb-1", "2025-02-01T09:00:00+09:00", "2025-02-01T10:00:00+09:00"),
            event("feb-2", "2025-02-20T09:00:00+09:00", "2025-02-20T10:00:00+09:00"),
            event("dec-utc", "2025-12-31T16:00:00Z", "2025-12-31T17:00:00Z"),
        ];
        let grid = builder(Weekday::Sun, HourRange::full_day())
            .year(2025, &events, &now())
            .expect("year grid");

        assert_eq!(grid.months.len(), 12);
        assert_eq!(grid.months[0].event_count, 1);
        assert_eq!(grid.months[1].event_count, 2);
        assert_eq!(grid.months[11].event_count, 0);
        assert_eq!(grid.total_events(), 3);
        assert_eq!(grid.months[11].grid.month0, 11);
    }

    #[test]
    fn build_dispatches_on_view_type() {
        let builder = builder(Weekday::Mon, HourRange::new(9, 17).expect("hours"));
        let reference = fixed_time("2025-07-09T10:00:00+09:00");
        for view in [ViewType::Day, ViewType::Week, ViewType::Month, ViewType::Year] {
            let grid = builder.build(&reference, view, &[], &now()).expect("grid");
            assert_eq!(grid.view(), view);
        }
        match builder.build(&reference, ViewType::Month, &[], &now()).expect("grid") {
            Grid::Month(month) => assert_eq!((month.year, month.month0), (2025, 6)),
            other => panic!("unexpected grid: {:?}", other.view()),
        }
    }

    #[test]
    fn build_rejects_invalid_events_before_computing() {
        let mut broken = event("broken", "2025-02-10T10:00:00+09:00", "2025-02-10T11:00:00+09:00");
        broken.interval.end = broken.interval.start;
        let result = builder(Weekday::Sun, HourRange::full_day()).build(
            &now(),
            ViewType::Month,
            &[broken],
            &now(),
        );
        assert!(matches!(result, Err(EngineError::InvalidInterval { .. })));
    }

    fn weekday_strategy() -> impl Strategy<Value = Weekday> {
        prop::sample::select(vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ])
    }

    // Month grids are whole weeks and contain every day of the month exactly once
    proptest! {
        #[test]
        fn property3_month_grid_covers_month_in_whole_weeks(
            year in 1900i32..2200,
            month0 in 0u32..12,
            week_starts_on in weekday_strategy()
        ) {
            let grid = builder(week_starts_on, HourRange::full_day())
                .month(year, month0, &[], &now())
                .expect("month grid");

            prop_assert_eq!(grid.cell_count() % 7, 0);
            prop_assert!((4..=6).contains(&grid.row_count()));

            let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1).expect("first");
            let last = month_end_date(first).expect("last");
            let mut day = first;
            while day <= last {
                let matches = grid.cells().filter(|cell| cell.date == day).count();
                prop_assert_eq!(matches, 1);
                prop_assert!(grid.cell(day).expect("cell").is_in_primary_period);
                day = day.succ_opt().expect("next");
            }
            prop_assert_eq!(grid.primary_cells().count(), last.day() as usize);
            prop_assert_eq!(grid.weeks[0][0].date.weekday(), week_starts_on);
        }
    }

    // Every event intersecting the covered span is placed somewhere
    proptest! {
        #[test]
        fn property4_intersecting_events_are_never_dropped(
            specs in prop::collection::vec((0i64..(90 * 24 * 60), 1i64..(3 * 24 * 60), any::<bool>()), 1..20),
            start_hour in 0u32..12,
            span in 1u32..12
        ) {
            let origin = fixed_time("2025-01-01T00:00:00+09:00");
            let events: Vec<Event> = specs
                .iter()
                .enumerate()
                .map(|(index, (start, length, all_day))| {
                    Event::new(
                        format!("evt-{index}"),
                        "generated",
                        Interval::new(
                            origin + Duration::minutes(*start),
                            origin + Duration::minutes(start + length),
                        ).expect("interval"),
                    )
                    .with_all_day(*all_day)
                })
                .collect();
            let hours = HourRange::new(start_hour, start_hour + span).expect("hours");
            let builder = builder(Weekday::Sun, hours);

            let month = builder.month(2025, 1, &events, &now()).expect("month");
            let grid_start = month.first_date().expect("first");
            let grid_end = month.last_date().expect("last").succ_opt().expect("end");
            for event in &events {
                let intersects = if event.all_day {
                    let (start, end) = event.all_day_dates(&basis());
                    start < grid_end && end > grid_start
                } else {
                    event.interval.intersects_span(
                        &basis().date_at_midnight(grid_start).expect("start"),
                        &basis().date_at_midnight(grid_end).expect("end"),
                    )
                };
                let placed = month.cells().any(|cell| cell.events.iter().any(|candidate| candidate.id == event.id));
                prop_assert_eq!(intersects, placed);
            }

            let week = builder.week(&fixed_time("2025-02-12T00:00:00+09:00"), &events, &now()).expect("week");
            let window_start = basis().date_at_midnight(week.days[0].date).expect("start");
            let window_end = basis().date_at_midnight(week.days[6].date.succ_opt().expect("end")).expect("end");
            for event in &events {
                let intersects = if event.all_day {
                    let (start, end) = event.all_day_dates(&basis());
                    start <= week.days[6].date && end > week.days[0].date
                } else {
                    event.interval.intersects_span(&window_start, &window_end)
                };
                let placed = week.days.iter().any(|cell| cell.events.iter().any(|candidate| candidate.id == event.id))
                    || week.slots.iter().any(|slot| slot.events.iter().any(|candidate| candidate.id == event.id))
                    || week.omitted.iter().any(|candidate| candidate.id == event.id);
                prop_assert_eq!(intersects, placed);
            }
        }
    }
}
