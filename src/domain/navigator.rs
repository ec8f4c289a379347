use crate::domain::models::{Instant, NavigationDirection, ViewType};
use crate::domain::time_basis::TimeBasis;
use crate::infrastructure::error::EngineError;
use chrono::{DateTime, TimeZone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigator {
    basis: TimeBasis,
}

impl Navigator {
    pub fn new(basis: TimeBasis) -> Self {
        Self { basis }
    }

    pub fn next(&self, date: &Instant, view: ViewType) -> Result<Instant, EngineError> {
        self.step(date, view, NavigationDirection::Next)
    }

    pub fn previous(&self, date: &Instant, view: ViewType) -> Result<Instant, EngineError> {
        self.step(date, view, NavigationDirection::Previous)
    }

    pub fn today<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<Instant, EngineError> {
        self.basis.today(now)
    }

    pub fn step(
        &self,
        date: &Instant,
        view: ViewType,
        direction: NavigationDirection,
    ) -> Result<Instant, EngineError> {
        let sign = match direction {
            NavigationDirection::Next => 1,
            NavigationDirection::Previous => -1,
        };
        match view {
            ViewType::Day => self.basis.add_days(date, sign),
            ViewType::Week => self.basis.add_days(date, 7 * sign),
            ViewType::Month => self.basis.add_months(date, sign as i32),
            ViewType::Year => self.basis.add_years(date, sign as i32),
        }
    }
}
