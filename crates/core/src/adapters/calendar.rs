// crates/core/src/adapters/calendar.rs

use std::fmt;

use crate::error::AdapterError;
use crate::providers::{CalendarApi, PRIMARY_CALENDAR};
use crate::types::{format_timestamp, CreatedEvent, EventRequest, TimeInterval};

/// Free/busy answer for a query window.
///
/// Busy intervals are kept exactly as the provider returned them. Free gaps
/// are not derived here. A free answer carries the window boundaries as text
/// so a caller can echo its own input back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Free { start: String, end: String },
    Busy(Vec<TimeInterval>),
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Free { start, end } => write!(
                f,
                "The calendar is completely free between {start} and {end}."
            ),
            Availability::Busy(intervals) => {
                f.write_str("The following time slots are busy:")?;
                for interval in intervals {
                    write!(
                        f,
                        "\n- From {} to {}",
                        format_timestamp(&interval.start()),
                        format_timestamp(&interval.end())
                    )?;
                }
                Ok(())
            }
        }
    }
}

pub fn query_availability<A: CalendarApi + ?Sized>(
    api: &A,
    window: &TimeInterval,
) -> Result<Availability, AdapterError> {
    let busy = api.free_busy(window, PRIMARY_CALENDAR)?;
    if busy.is_empty() {
        return Ok(Availability::Free {
            start: format_timestamp(&window.start()),
            end: format_timestamp(&window.end()),
        });
    }
    Ok(Availability::Busy(busy))
}

/// Validate and query a window given as raw RFC 3339 text.
///
/// The provider sees the normalised interval; a free answer repeats `start`
/// and `end` exactly as supplied.
pub fn query_availability_between<A: CalendarApi + ?Sized>(
    api: &A,
    start: &str,
    end: &str,
) -> Result<Availability, AdapterError> {
    let window =
        TimeInterval::parse(start, end).map_err(|e| AdapterError::InvalidInput(e.to_string()))?;
    Ok(match query_availability(api, &window)? {
        Availability::Free { .. } => Availability::Free {
            start: start.to_string(),
            end: end.to_string(),
        },
        busy => busy,
    })
}

/// Insert one event on the primary calendar. Not idempotent.
pub fn create_event<A: CalendarApi + ?Sized>(
    api: &A,
    request: &EventRequest,
) -> Result<CreatedEvent, AdapterError> {
    api.insert_event(PRIMARY_CALENDAR, request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeCalendar {
        busy: Vec<TimeInterval>,
        fail: bool,
        inserted: RefCell<Vec<EventRequest>>,
    }

    impl CalendarApi for FakeCalendar {
        fn free_busy(
            &self,
            _window: &TimeInterval,
            calendar_id: &str,
        ) -> Result<Vec<TimeInterval>, AdapterError> {
            assert_eq!(calendar_id, "primary");
            if self.fail {
                return Err(AdapterError::Transport("connection reset".into()));
            }
            Ok(self.busy.clone())
        }

        fn insert_event(
            &self,
            _calendar_id: &str,
            request: &EventRequest,
        ) -> Result<CreatedEvent, AdapterError> {
            self.inserted.borrow_mut().push(request.clone());
            Ok(CreatedEvent {
                id: "evt123".into(),
                html_link: "https://calendar.google.com/event?eid=evt123".into(),
            })
        }
    }

    fn interval(start: &str, end: &str) -> TimeInterval {
        TimeInterval::parse(start, end).unwrap()
    }

    #[test]
    fn empty_busy_set_reports_window_boundaries() {
        let window = interval("2024-09-02T09:00:00Z", "2024-09-06T17:00:00Z");
        let result = query_availability(&FakeCalendar::default(), &window).unwrap();
        assert_eq!(
            result.to_string(),
            "The calendar is completely free between 2024-09-02T09:00:00Z and 2024-09-06T17:00:00Z."
        );
    }

    #[test]
    fn free_answer_echoes_boundaries_as_supplied() {
        let result = query_availability_between(
            &FakeCalendar::default(),
            "2024-09-01T09:00:00+02:00",
            "2024-09-01T17:00:00.000Z",
        )
        .unwrap();
        assert_eq!(
            result.to_string(),
            "The calendar is completely free between 2024-09-01T09:00:00+02:00 and 2024-09-01T17:00:00.000Z."
        );
    }

    #[test]
    fn inverted_raw_window_is_invalid_input() {
        let err = query_availability_between(
            &FakeCalendar::default(),
            "2024-09-01T17:00:00Z",
            "2024-09-01T18:00:00+02:00",
        )
        .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidInput(_)));
    }

    #[test]
    fn busy_intervals_are_listed_in_provider_order() {
        let calendar = FakeCalendar {
            busy: vec![
                interval("2024-09-02T15:00:00Z", "2024-09-02T16:00:00Z"),
                interval("2024-09-02T09:00:00Z", "2024-09-02T10:00:00Z"),
                interval("2024-09-02T09:30:00Z", "2024-09-02T11:00:00Z"),
            ],
            ..FakeCalendar::default()
        };
        let window = interval("2024-09-02T00:00:00Z", "2024-09-03T00:00:00Z");

        assert_eq!(
            query_availability(&calendar, &window).unwrap().to_string(),
            "The following time slots are busy:\n\
             - From 2024-09-02T15:00:00Z to 2024-09-02T16:00:00Z\n\
             - From 2024-09-02T09:00:00Z to 2024-09-02T10:00:00Z\n\
             - From 2024-09-02T09:30:00Z to 2024-09-02T11:00:00Z"
        );
    }

    #[test]
    fn provider_failure_is_an_adapter_error() {
        let calendar = FakeCalendar {
            fail: true,
            ..FakeCalendar::default()
        };
        let window = interval("2024-09-02T00:00:00Z", "2024-09-03T00:00:00Z");
        let err = query_availability(&calendar, &window).unwrap_err();
        assert_eq!(
            crate::error::in_band(err),
            "ERROR: transport failure: connection reset"
        );
    }

    #[test]
    fn created_event_text_carries_provider_id() {
        let calendar = FakeCalendar::default();
        let request = EventRequest {
            summary: "Planning".into(),
            when: interval("2024-09-02T10:00:00Z", "2024-09-02T10:30:00Z"),
            attendees: vec![],
        };

        let created = create_event(&calendar, &request).unwrap();
        assert!(created.to_string().contains("evt123"));
        assert_eq!(calendar.inserted.borrow().as_slice(), &[request]);
    }
}
