use crate::domain::models::{Event, Interval, event_order, validate_events};
use crate::infrastructure::error::EngineError;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MESSAGE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Duplicate,
    Overlap,
    Adjacent,
}

impl ConflictKind {
    pub fn severity(self) -> Severity {
        match self {
            ConflictKind::Duplicate | ConflictKind::Overlap => Severity::Error,
            ConflictKind::Adjacent => Severity::Warning,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ConflictKind::Duplicate => "duplicates",
            ConflictKind::Overlap => "overlaps",
            ConflictKind::Adjacent => "directly follows or precedes",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictReport {
    pub kind: ConflictKind,
    pub severity: Severity,
    pub with_event: Event,
    pub message: String,
}

impl ConflictReport {
    fn new(kind: ConflictKind, with_event: &Event) -> Self {
        let message = format!(
            "{} \"{}\" ({} - {})",
            kind.describe(),
            with_event.title,
            with_event.interval.start.format(MESSAGE_TIME_FORMAT),
            with_event.interval.end.format(MESSAGE_TIME_FORMAT),
        );
        Self {
            kind,
            severity: kind.severity(),
            with_event: with_event.clone(),
            message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictCheck {
    pub candidate_id: String,
    pub conflicts: Vec<ConflictReport>,
}

impl ConflictCheck {
    pub fn has_conflict(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.conflicts.iter().map(|report| report.severity).max()
    }

    /// Whether any report is severe enough to block a write.
    pub fn is_blocking(&self) -> bool {
        self.highest_severity() == Some(Severity::Error)
    }

    pub fn conflicting_ids(&self) -> Vec<&str> {
        self.conflicts
            .iter()
            .map(|report| report.with_event.id.as_str())
            .collect()
    }
}

/// Raw interval relationship, in priority order duplicate > overlap > adjacent.
pub fn classify_intervals(left: &Interval, right: &Interval) -> Option<ConflictKind> {
    if left.has_same_bounds(right) {
        return Some(ConflictKind::Duplicate);
    }
    if left.overlaps(right) {
        return Some(ConflictKind::Overlap);
    }
    if left.is_adjacent_to(right) {
        return Some(ConflictKind::Adjacent);
    }
    None
}

/// Event-level classification: identical bounds only count as a duplicate
/// when the titles match too, otherwise they are an overlap.
pub fn classify_events(left: &Event, right: &Event) -> Option<ConflictKind> {
    match classify_intervals(&left.interval, &right.interval)? {
        ConflictKind::Duplicate if left.title != right.title => Some(ConflictKind::Overlap),
        kind => Some(kind),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictDetector {
    allow_adjacent: bool,
}

impl ConflictDetector {
    pub fn new(allow_adjacent: bool) -> Self {
        Self { allow_adjacent }
    }

    pub fn allows_adjacent(&self) -> bool {
        self.allow_adjacent
    }

    pub fn classify(&self, candidate: &Event, existing: &Event) -> Option<ConflictKind> {
        match classify_events(candidate, existing)? {
            ConflictKind::Adjacent if self.allow_adjacent => None,
            kind => Some(kind),
        }
    }

    pub fn check_conflicts(
        &self,
        candidate: &Event,
        existing_events: &[Event],
    ) -> Result<ConflictCheck, EngineError> {
        candidate.validate()?;
        validate_events(existing_events)?;

        let mut colliding: Vec<(&Event, ConflictKind)> = existing_events
            .iter()
            .filter(|existing| !existing.is_same_event(&candidate.id))
            .filter_map(|existing| self.classify(candidate, existing).map(|kind| (existing, kind)))
            .collect();
        colliding.sort_by(|(left, _), (right, _)| event_order(left, right));

        let conflicts: Vec<ConflictReport> = colliding
            .into_iter()
            .map(|(existing, kind)| ConflictReport::new(kind, existing))
            .collect();

        debug!(
            candidate_id = %candidate.id,
            existing = existing_events.len(),
            conflicts = conflicts.len(),
            allow_adjacent = self.allow_adjacent,
            "checked candidate for conflicts"
        );

        Ok(ConflictCheck {
            candidate_id: candidate.id.clone(),
            conflicts,
        })
    }
}

pub fn check_conflicts(
    candidate: &Event,
    existing_events: &[Event],
    allow_adjacent: bool,
) -> Result<ConflictCheck, EngineError> {
    ConflictDetector::new(allow_adjacent).check_conflicts(candidate, existing_events)
}
