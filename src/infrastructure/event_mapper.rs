use crate::domain::models::{Event, Instant, Interval};
use crate::domain::time_basis::{TimeBasis, next_date};
use crate::infrastructure::error::EngineError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Wire shape of an event as the transport layer hands it over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub start: String,
    pub end: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendee_ids: Vec<String>,
    #[serde(default)]
    pub all_day: bool,
}

struct ParsedBound {
    instant: Instant,
    date_only: bool,
}

pub fn decode_event_record(record: &EventRecord, offset: FixedOffset) -> Result<Event, EngineError> {
    let id = record.id.trim();
    if id.is_empty() {
        return Err(EngineError::InvalidEventRecord(
            "event.id must not be empty".to_string(),
        ));
    }

    let basis = TimeBasis::new(offset);
    let start = parse_bound(&record.start, "start", id, &basis)?;
    let mut end = parse_bound(&record.end, "end", id, &basis)?;

    // a date-only all-day record may repeat its start date as the end date
    if record.all_day && start.date_only && end.date_only && end.instant == start.instant {
        let following = next_date(start.instant.date_naive())?;
        end.instant = basis.date_at_midnight(following)?;
    }

    let interval = Interval {
        start: start.instant,
        end: end.instant,
    };
    interval.validate(id)?;

    let attendee_ids: BTreeSet<String> = record
        .attendee_ids
        .iter()
        .map(|attendee_id| attendee_id.trim())
        .filter(|attendee_id| !attendee_id.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    Ok(Event {
        id: id.to_string(),
        title: record
            .title
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        interval,
        attendee_ids,
        all_day: record.all_day,
    })
}

pub fn decode_event_records(
    records: &[EventRecord],
    offset: FixedOffset,
) -> Result<Vec<Event>, EngineError> {
    records
        .iter()
        .map(|record| decode_event_record(record, offset))
        .collect()
}

pub fn encode_event_record(event: &Event) -> EventRecord {
    let midnight_bounds = event.interval.start.time() == NaiveTime::MIN
        && event.interval.end.time() == NaiveTime::MIN;
    let (start, end) = if event.all_day && midnight_bounds {
        (
            event.interval.start.format(DATE_FORMAT).to_string(),
            event.interval.end.format(DATE_FORMAT).to_string(),
        )
    } else {
        (
            event.interval.start.to_rfc3339(),
            event.interval.end.to_rfc3339(),
        )
    };

    EventRecord {
        id: event.id.clone(),
        title: (!event.title.is_empty()).then(|| event.title.clone()),
        start,
        end,
        attendee_ids: event.attendee_ids.iter().cloned().collect(),
        all_day: event.all_day,
    }
}

fn parse_bound(
    value: &str,
    field_name: &str,
    event_id: &str,
    basis: &TimeBasis,
) -> Result<ParsedBound, EngineError> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(ParsedBound {
            instant: parsed,
            date_only: false,
        });
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return Ok(ParsedBound {
            instant: basis.date_at_midnight(date)?,
            date_only: true,
        });
    }
    Err(EngineError::InvalidEventRecord(format!(
        "event {event_id} {field_name} must be RFC3339 or YYYY-MM-DD, got '{value}'"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).expect("valid offset")
    }

    fn sample_record() -> EventRecord {
        EventRecord {
            id: " evt-1 ".to_string(),
            title: Some(" Design review ".to_string()),
            start: "2025-02-03T09:00:00+09:00".to_string(),
            end: "2025-02-03T10:00:00+09:00".to_string(),
            attendee_ids: vec!["alice".to_string(), " ".to_string(), "bob ".to_string()],
            all_day: false,
        }
    }

    #[test]
    fn decode_trims_fields_and_keeps_written_offset() {
        let mut record = sample_record();
        record.end = "2025-02-03T01:00:00Z".to_string();
        let event = decode_event_record(&record, jst()).expect("decode");

        assert_eq!(event.id, "evt-1");
        assert_eq!(event.title, "Design review");
        assert_eq!(
            event.attendee_ids.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["alice", "bob"]
        );
        assert_eq!(event.interval.end.offset().local_minus_utc(), 0);
        assert_eq!(event.interval.duration(), chrono::Duration::hours(1));
    }

    #[test]
    fn decode_all_day_dates_in_configured_offset() {
        let record = EventRecord {
            id: "holiday".to_string(),
            title: Some("National Foundation Day".to_string()),
            start: "2025-02-11".to_string(),
            end: "2025-02-11".to_string(),
            attendee_ids: Vec::new(),
            all_day: true,
        };
        let event = decode_event_record(&record, jst()).expect("decode");

        assert!(event.all_day);
        assert_eq!(event.interval.start.to_rfc3339(), "2025-02-11T00:00:00+09:00");
        assert_eq!(event.interval.end.to_rfc3339(), "2025-02-12T00:00:00+09:00");

        let encoded = encode_event_record(&event);
        assert_eq!(encoded.start, "2025-02-11");
        assert_eq!(encoded.end, "2025-02-12");
    }

    #[test]
    fn decode_rejects_invalid_records() {
        let mut empty_id = sample_record();
        empty_id.id = "  ".to_string();
        assert!(matches!(
            decode_event_record(&empty_id, jst()),
            Err(EngineError::InvalidEventRecord(_))
        ));

        let mut bad_timestamp = sample_record();
        bad_timestamp.start = "tomorrow morning".to_string();
        assert!(matches!(
            decode_event_record(&bad_timestamp, jst()),
            Err(EngineError::InvalidEventRecord(_))
        ));

        let mut reversed = sample_record();
        reversed.end = "2025-02-03T08:00:00+09:00".to_string();
        assert!(matches!(
            decode_event_record(&reversed, jst()),
            Err(EngineError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn decode_batch_fails_on_first_invalid_record() {
        let mut broken = sample_record();
        broken.id = "evt-2".to_string();
        broken.end = broken.start.clone();

        assert_eq!(decode_event_records(&[sample_record()], jst()).expect("decode").len(), 1);
        assert!(decode_event_records(&[sample_record(), broken], jst()).is_err());
    }

    #[test]
    fn encode_timed_event_and_decode_back() {
        let event = decode_event_record(&sample_record(), jst()).expect("decode");
        let encoded = encode_event_record(&event);
        assert_eq!(encoded.start, "2025-02-03T09:00:00+09:00");
        assert_eq!(encoded.title.as_deref(), Some("Design review"));

        let decoded = decode_event_record(&encoded, jst()).expect("decode again");
        assert_eq!(decoded, event);
    }

    #[test]
    fn record_uses_camel_case_wire_names() {
        let json = r#"{"id":"evt-9","start":"2025-02-03T09:00:00Z","end":"2025-02-03T10:00:00Z","attendeeIds":["erin"],"allDay":false}"#;
        let record: EventRecord = serde_json::from_str(json).expect("deserialize record");
        assert_eq!(record.attendee_ids, vec!["erin".to_string()]);
        assert!(record.title.is_none());
        let event = decode_event_record(&record, jst()).expect("decode");
        assert_eq!(event.title, "");
    }
}
