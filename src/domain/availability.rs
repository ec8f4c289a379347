use crate::domain::models::{Event, Interval, event_order, validate_events};
use crate::infrastructure::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityResult {
    pub attendee_id: String,
    pub is_available: bool,
    pub conflicting_events: Vec<Event>,
}

/// Free/busy for each attendee of `candidate`.
///
/// Only strict overlap makes an attendee busy; back-to-back meetings never
/// do. The candidate's own id is ignored so an edit-in-place does not block
/// itself. An empty attendee set yields an empty result.
pub fn check_availability(
    candidate: &Event,
    existing_events: &[Event],
) -> Result<Vec<AvailabilityResult>, EngineError> {
    candidate.validate()?;
    check_attendees(
        &candidate.interval,
        candidate.attendee_ids.iter().map(String::as_str),
        existing_events,
        Some(candidate.id.as_str()),
    )
}

pub fn check_attendees<'a>(
    interval: &Interval,
    attendee_ids: impl IntoIterator<Item = &'a str>,
    existing_events: &[Event],
    exclude_event_id: Option<&str>,
) -> Result<Vec<AvailabilityResult>, EngineError> {
    interval.validate("candidate")?;
    validate_events(existing_events)?;

    let attendees: BTreeSet<&str> = attendee_ids
        .into_iter()
        .map(str::trim)
        .filter(|attendee_id| !attendee_id.is_empty())
        .collect();

    let overlapping: Vec<&Event> = existing_events
        .iter()
        .filter(|event| !exclude_event_id.is_some_and(|excluded| event.is_same_event(excluded)))
        .filter(|event| event.interval.overlaps(interval))
        .collect();

    let results: Vec<AvailabilityResult> = attendees
        .into_iter()
        .map(|attendee_id| {
            let mut conflicting_events: Vec<Event> = overlapping
                .iter()
                .filter(|event| event.has_attendee(attendee_id))
                .map(|event| (*event).clone())
                .collect();
            conflicting_events.sort_by(event_order);
            AvailabilityResult {
                attendee_id: attendee_id.to_string(),
                is_available: conflicting_events.is_empty(),
                conflicting_events,
            }
        })
        .collect();

    debug!(
        attendees = results.len(),
        busy = results.iter().filter(|result| !result.is_available).count(),
        "checked attendee availability"
    );
    Ok(results)
}

pub fn unavailable_attendees(results: &[AvailabilityResult]) -> Vec<&str> {
    results
        .iter()
        .filter(|result| !result.is_available)
        .map(|result| result.attendee_id.as_str())
        .collect()
}
