pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::bootstrap_engine;
pub use application::calendar_engine::{CalendarEngine, ConflictVerdict};
pub use application::conflict_check::{
    AuthoritativeEventSource, CheckCompletion, CheckTicket, ConflictCheckCoordinator, Debouncer,
    RetryPolicy, TieredVerdict, TwoTierConflictChecker, VerdictTier,
};
pub use domain::availability::{AvailabilityResult, check_attendees, check_availability};
pub use domain::conflict::{
    ConflictCheck, ConflictDetector, ConflictKind, ConflictReport, Severity, check_conflicts,
};
pub use domain::grid::{
    CalendarCell, Grid, GridBuilder, GridOptions, HourRange, MonthGrid, TimeGrid, TimeSlot,
    YearGrid,
};
pub use domain::models::{Event, Instant, Interval, NavigationDirection, ViewType};
pub use domain::navigator::Navigator;
pub use domain::time_basis::TimeBasis;
pub use infrastructure::config::EngineConfig;
pub use infrastructure::error::EngineError;
pub use infrastructure::event_mapper::{EventRecord, decode_event_record, encode_event_record};
pub use infrastructure::event_snapshot::{EventSnapshotRepository, InMemoryEventSnapshotRepository};
pub use infrastructure::logging::init_tracing;
