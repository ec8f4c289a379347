use crate::domain::availability::{AvailabilityResult, check_availability, unavailable_attendees};
use crate::domain::conflict::{ConflictCheck, ConflictDetector};
use crate::domain::grid::{Grid, GridBuilder, MonthGrid, YearGrid};
use crate::domain::models::{Event, Instant, NavigationDirection, ViewType};
use crate::domain::navigator::Navigator;
use crate::domain::time_basis::TimeBasis;
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::error::EngineError;
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use tracing::{debug, info};

/// Conflict and availability results for one candidate, as rendered together.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConflictVerdict {
    pub conflicts: ConflictCheck,
    pub availability: Vec<AvailabilityResult>,
}

impl ConflictVerdict {
    pub fn has_conflict(&self) -> bool {
        self.conflicts.has_conflict() || self.availability.iter().any(|result| !result.is_available)
    }

    pub fn unavailable_attendees(&self) -> Vec<&str> {
        unavailable_attendees(&self.availability)
    }
}

#[derive(Debug, Clone)]
pub struct CalendarEngine {
    config: EngineConfig,
    basis: TimeBasis,
    navigator: Navigator,
    grid_builder: GridBuilder,
    detector: ConflictDetector,
}

impl CalendarEngine {
    /// Builds an engine from `config`, resolving a named timezone to the
    /// offset in effect at `resolved_at`.
    pub fn new<Tz: TimeZone>(config: EngineConfig, resolved_at: &DateTime<Tz>) -> Result<Self, EngineError> {
        config.validate()?;
        let basis = TimeBasis::new(config.resolve_offset(resolved_at)?);
        let grid_builder = GridBuilder::new(basis, config.grid_options()?);
        let detector = ConflictDetector::new(config.allow_adjacent);
        info!(
            offset = %basis.offset(),
            week_starts_on = %config.week_starts_on,
            allow_adjacent = config.allow_adjacent,
            "calendar engine configured"
        );
        Ok(Self {
            config,
            basis,
            navigator: Navigator::new(basis),
            grid_builder,
            detector,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn time_basis(&self) -> TimeBasis {
        self.basis
    }

    pub fn navigate(
        &self,
        date: &Instant,
        view: ViewType,
        direction: NavigationDirection,
    ) -> Result<Instant, EngineError> {
        self.navigator.step(date, view, direction)
    }

    pub fn today<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<Instant, EngineError> {
        self.navigator.today(now)
    }

    pub fn build_grid(
        &self,
        reference: &Instant,
        view: ViewType,
        events: &[Event],
        now: &Instant,
    ) -> Result<Grid, EngineError> {
        self.grid_builder.build(reference, view, events, now)
    }

    pub fn month_grid(
        &self,
        year: i32,
        month0: u32,
        events: &[Event],
        now: &Instant,
    ) -> Result<MonthGrid, EngineError> {
        self.grid_builder.month(year, month0, events, now)
    }

    pub fn year_grid(&self, year: i32, events: &[Event], now: &Instant) -> Result<YearGrid, EngineError> {
        self.grid_builder.year(year, events, now)
    }

    pub fn check_conflicts(&self, candidate: &Event, existing: &[Event]) -> Result<ConflictCheck, EngineError> {
        self.detector.check_conflicts(candidate, existing)
    }

    pub fn check_availability(
        &self,
        candidate: &Event,
        existing: &[Event],
    ) -> Result<Vec<AvailabilityResult>, EngineError> {
        check_availability(candidate, existing)
    }

    pub fn evaluate(&self, candidate: &Event, existing: &[Event]) -> Result<ConflictVerdict, EngineError> {
        let verdict = ConflictVerdict {
            conflicts: self.check_conflicts(candidate, existing)?,
            availability: self.check_availability(candidate, existing)?,
        };
        debug!(
            candidate_id = %candidate.id,
            has_conflict = verdict.has_conflict(),
            "evaluated candidate"
        );
        Ok(verdict)
    }
}
