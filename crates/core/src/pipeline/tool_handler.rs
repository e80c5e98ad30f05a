// crates/core/src/pipeline/tool_handler.rs

//! The four stage tools: argument parsing, adapter call, text flattening.

use std::cell::RefCell;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::tool_defs;
use crate::adapters::{create_event, query_availability_between, search_mailbox};
use crate::ai_client::Tool;
use crate::engine::BoundTool;
use crate::error::{in_band, AdapterError};
use crate::gate::SlotPicker;
use crate::providers::{CalendarApi, MailApi};
use crate::types::{EventRequest, ProposedSlot, TimeInterval};

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: &str) -> Result<T, String> {
    serde_json::from_str(arguments).map_err(|e| {
        in_band(AdapterError::InvalidInput(format!(
            "malformed arguments for {tool}: {e}"
        )))
    })
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    #[serde(default)]
    query: Option<String>,
}

/// Mailbox search. An omitted query falls back to the run's configured one.
pub struct MailboxTool<'p, A: ?Sized> {
    api: &'p A,
    default_query: String,
}

impl<'p, A: MailApi + ?Sized> MailboxTool<'p, A> {
    pub fn new(api: &'p A, default_query: impl Into<String>) -> Self {
        Self {
            api,
            default_query: default_query.into(),
        }
    }
}

impl<A: MailApi + ?Sized> BoundTool for MailboxTool<'_, A> {
    fn name(&self) -> &'static str {
        tool_defs::SEARCH_MAILBOX
    }

    fn definition(&self) -> Tool {
        tool_defs::search_mailbox()
    }

    fn invoke(&mut self, arguments: &str) -> String {
        let args: SearchArgs = match parse_args(self.name(), arguments) {
            Ok(args) => args,
            Err(text) => return text,
        };
        let query = args
            .query
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| self.default_query.clone());

        match search_mailbox(self.api, &query) {
            Ok(result) => result.to_string(),
            Err(e) => in_band(e),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AvailabilityArgs {
    start_time: String,
    end_time: String,
}

pub struct AvailabilityTool<'p, A: ?Sized> {
    api: &'p A,
}

impl<'p, A: CalendarApi + ?Sized> AvailabilityTool<'p, A> {
    pub fn new(api: &'p A) -> Self {
        Self { api }
    }
}

impl<A: CalendarApi + ?Sized> BoundTool for AvailabilityTool<'_, A> {
    fn name(&self) -> &'static str {
        tool_defs::QUERY_AVAILABILITY
    }

    fn definition(&self) -> Tool {
        tool_defs::query_availability()
    }

    fn invoke(&mut self, arguments: &str) -> String {
        let args: AvailabilityArgs = match parse_args(self.name(), arguments) {
            Ok(args) => args,
            Err(text) => return text,
        };
        match query_availability_between(self.api, &args.start_time, &args.end_time) {
            Ok(availability) => availability.to_string(),
            Err(e) => in_band(e),
        }
    }
}

/// The slot a human selected at the gate, shared by the confirmation and
/// booking tools of one run. Empty until the gate returns a selection.
#[derive(Debug, Clone, Default)]
pub struct Approval {
    slot: Rc<RefCell<Option<ProposedSlot>>>,
}

impl Approval {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self) -> Option<ProposedSlot> {
        self.slot.borrow().clone()
    }

    fn record(&self, slot: ProposedSlot) {
        *self.slot.borrow_mut() = Some(slot);
    }
}

#[derive(Debug, Deserialize)]
struct ConfirmArgs {
    proposed_slots: Vec<ProposedSlot>,
}

/// Human confirmation. Opens the gate at most once per run.
pub struct ConfirmationTool<'g> {
    picker: &'g mut dyn SlotPicker,
    approval: Approval,
    outcome: Option<String>,
}

impl<'g> ConfirmationTool<'g> {
    pub fn new(picker: &'g mut dyn SlotPicker, approval: Approval) -> Self {
        Self {
            picker,
            approval,
            outcome: None,
        }
    }
}

impl BoundTool for ConfirmationTool<'_> {
    fn name(&self) -> &'static str {
        tool_defs::CONFIRM_SLOT
    }

    fn definition(&self) -> Tool {
        tool_defs::confirm_slot()
    }

    fn invoke(&mut self, arguments: &str) -> String {
        if let Some(previous) = &self.outcome {
            return in_band(AdapterError::InvalidInput(format!(
                "confirmation was already requested this run; its result was: {previous}"
            )));
        }
        let args: ConfirmArgs = match parse_args(self.name(), arguments) {
            Ok(args) => args,
            Err(text) => return text,
        };
        if args.proposed_slots.is_empty() {
            return in_band(AdapterError::InvalidInput(
                "proposed_slots must not be empty".to_string(),
            ));
        }

        let output = match self.picker.pick(&args.proposed_slots) {
            Ok(slot) => {
                self.approval.record(slot.clone());
                slot.to_string()
            }
            Err(e) => in_band(e),
        };
        self.outcome = Some(output.clone());
        output
    }
}

#[derive(Debug, Deserialize)]
struct EventArgs {
    summary: String,
    start: String,
    end: String,
    #[serde(default)]
    attendees: Vec<String>,
}

/// Event creation. Submits at most one insert per run, and only after the
/// gate recorded a human selection.
pub struct BookingTool<'p, A: ?Sized> {
    api: &'p A,
    approval: Approval,
    outcome: Option<String>,
}

impl<'p, A: CalendarApi + ?Sized> BookingTool<'p, A> {
    pub fn new(api: &'p A, approval: Approval) -> Self {
        Self {
            api,
            approval,
            outcome: None,
        }
    }
}

impl<A: CalendarApi + ?Sized> BoundTool for BookingTool<'_, A> {
    fn name(&self) -> &'static str {
        tool_defs::CREATE_EVENT
    }

    fn definition(&self) -> Tool {
        tool_defs::create_event()
    }

    fn invoke(&mut self, arguments: &str) -> String {
        if let Some(previous) = &self.outcome {
            return in_band(AdapterError::InvalidInput(format!(
                "an event insert was already submitted this run; its result was: {previous}"
            )));
        }
        let Some(approved) = self.approval.slot() else {
            return in_band(AdapterError::InvalidInput(
                "no slot was confirmed by the user; nothing will be booked".to_string(),
            ));
        };
        let args: EventArgs = match parse_args(self.name(), arguments) {
            Ok(args) => args,
            Err(text) => return text,
        };
        let when = match TimeInterval::parse(&args.start, &args.end) {
            Ok(when) => when,
            Err(e) => return in_band(AdapterError::InvalidInput(e.to_string())),
        };
        // Free-text selections cannot be compared to an interval.
        if let ProposedSlot::Interval(confirmed) = approved {
            if confirmed != when {
                return in_band(AdapterError::InvalidInput(format!(
                    "requested time {when} differs from the confirmed slot {confirmed}"
                )));
            }
        }
        let request = EventRequest {
            summary: args.summary,
            when,
            attendees: args.attendees,
        };

        // A failed insert may still have reached the provider, so it counts.
        let output = match create_event(self.api, &request) {
            Ok(created) => created.to_string(),
            Err(e) => in_band(e),
        };
        self.outcome = Some(output.clone());
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{is_in_band_error, GateError};
    use crate::types::CreatedEvent;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingCalendar {
        windows: RefCell<Vec<TimeInterval>>,
        inserted: RefCell<Vec<EventRequest>>,
    }

    impl CalendarApi for RecordingCalendar {
        fn free_busy(
            &self,
            window: &TimeInterval,
            _calendar_id: &str,
        ) -> Result<Vec<TimeInterval>, AdapterError> {
            self.windows.borrow_mut().push(*window);
            Ok(vec![])
        }

        fn insert_event(
            &self,
            _calendar_id: &str,
            request: &EventRequest,
        ) -> Result<CreatedEvent, AdapterError> {
            self.inserted.borrow_mut().push(request.clone());
            Ok(CreatedEvent {
                id: "evt123".into(),
                html_link: "https://calendar.example/evt123".into(),
            })
        }
    }

    struct FirstPicker {
        opened: usize,
    }

    impl SlotPicker for FirstPicker {
        fn pick<'o>(&mut self, options: &'o [ProposedSlot]) -> Result<&'o ProposedSlot, GateError> {
            self.opened += 1;
            options.first().ok_or(GateError::NoOptions)
        }
    }

    #[test]
    fn availability_rejects_inverted_window_without_calling_provider() {
        let calendar = RecordingCalendar::default();
        let mut tool = AvailabilityTool::new(&calendar);

        let out = tool.invoke(r#"{"start_time":"2024-09-02T10:00:00Z","end_time":"2024-09-02T09:00:00Z"}"#);
        assert!(is_in_band_error(&out));
        assert!(calendar.windows.borrow().is_empty());

        let out = tool.invoke(r#"{"start_time":"2024-09-02T09:00:00Z","end_time":"2024-09-02T10:00:00Z"}"#);
        assert_eq!(
            out,
            "The calendar is completely free between 2024-09-02T09:00:00Z and 2024-09-02T10:00:00Z."
        );
    }

    #[test]
    fn free_window_is_echoed_as_the_actor_wrote_it() {
        let calendar = RecordingCalendar::default();
        let out = AvailabilityTool::new(&calendar).invoke(
            r#"{"start_time":"2024-09-01T09:00:00+02:00","end_time":"2024-09-01T17:00:00.000Z"}"#,
        );
        assert_eq!(
            out,
            "The calendar is completely free between 2024-09-01T09:00:00+02:00 and 2024-09-01T17:00:00.000Z."
        );
        assert_eq!(
            calendar.windows.borrow().as_slice(),
            &[TimeInterval::parse("2024-09-01T07:00:00Z", "2024-09-01T17:00:00Z").unwrap()]
        );
    }

    #[test]
    fn malformed_arguments_are_in_band() {
        let calendar = RecordingCalendar::default();
        let out = AvailabilityTool::new(&calendar).invoke("not json");
        assert!(out.starts_with("ERROR: invalid input: malformed arguments for query_availability"));
    }

    #[test]
    fn confirmation_opens_the_gate_once() {
        let mut picker = FirstPicker { opened: 0 };
        let approval = Approval::new();
        {
            let mut tool = ConfirmationTool::new(&mut picker, approval.clone());
            let args = r#"{"proposed_slots":["Mon 10:00",{"start":"2024-09-03T14:00:00Z","end":"2024-09-03T14:30:00Z"}]}"#;

            assert_eq!(tool.invoke(args), "Mon 10:00");
            let again = tool.invoke(args);
            assert!(is_in_band_error(&again));
            assert!(again.contains("Mon 10:00"));
        }
        assert_eq!(picker.opened, 1);
        assert_eq!(approval.slot(), Some(ProposedSlot::Text("Mon 10:00".into())));
    }

    #[test]
    fn confirmation_rejects_empty_option_list() {
        let mut picker = FirstPicker { opened: 0 };
        let approval = Approval::new();
        let out = ConfirmationTool::new(&mut picker, approval.clone()).invoke(r#"{"proposed_slots":[]}"#);
        assert!(is_in_band_error(&out));
        assert_eq!(picker.opened, 0);
        assert_eq!(approval.slot(), None);
    }

    fn approved(start: &str, end: &str) -> Approval {
        let approval = Approval::new();
        approval.record(ProposedSlot::Interval(TimeInterval::parse(start, end).unwrap()));
        approval
    }

    #[test]
    fn booking_inserts_at_most_once() {
        let calendar = RecordingCalendar::default();
        let approval = approved("2024-09-03T14:00:00Z", "2024-09-03T14:30:00Z");
        let mut tool = BookingTool::new(&calendar, approval);
        let args = r#"{"summary":"Q3 sync","start":"2024-09-03T14:00:00Z","end":"2024-09-03T14:30:00Z","attendees":["bob@example.com"]}"#;

        let first = tool.invoke(args);
        assert!(first.contains("evt123"));
        let second = tool.invoke(args);
        assert!(is_in_band_error(&second));

        let inserted = calendar.inserted.borrow();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].attendees, vec!["bob@example.com".to_string()]);
        assert_eq!(
            inserted[0].when,
            TimeInterval::parse("2024-09-03T14:00:00Z", "2024-09-03T14:30:00Z").unwrap()
        );
    }

    #[test]
    fn booking_with_inverted_bounds_is_not_submitted() {
        let calendar = RecordingCalendar::default();
        let approval = approved("2024-09-03T14:00:00Z", "2024-09-03T15:00:00Z");
        let mut tool = BookingTool::new(&calendar, approval);
        let out = tool.invoke(r#"{"summary":"x","start":"2024-09-03T15:00:00Z","end":"2024-09-03T14:00:00Z"}"#);
        assert!(is_in_band_error(&out));
        assert!(calendar.inserted.borrow().is_empty());

        // A rejected request does not use up the single insert.
        let out = tool.invoke(r#"{"summary":"x","start":"2024-09-03T14:00:00Z","end":"2024-09-03T15:00:00Z"}"#);
        assert!(out.contains("evt123"));
    }

    #[test]
    fn booking_without_a_confirmed_slot_is_refused() {
        let calendar = RecordingCalendar::default();
        let mut tool = BookingTool::new(&calendar, Approval::new());
        let out = tool.invoke(r#"{"summary":"x","start":"2024-09-03T14:00:00Z","end":"2024-09-03T15:00:00Z"}"#);
        assert!(is_in_band_error(&out));
        assert!(out.contains("no slot was confirmed"));
        assert!(calendar.inserted.borrow().is_empty());
    }

    #[test]
    fn booking_a_different_time_than_confirmed_is_refused() {
        let calendar = RecordingCalendar::default();
        let approval = approved("2024-09-03T14:00:00Z", "2024-09-03T14:30:00Z");
        let mut tool = BookingTool::new(&calendar, approval);
        let out = tool.invoke(r#"{"summary":"x","start":"2024-09-04T14:00:00Z","end":"2024-09-04T14:30:00Z"}"#);
        assert!(is_in_band_error(&out));
        assert!(calendar.inserted.borrow().is_empty());
    }

    #[test]
    fn free_text_confirmation_allows_any_valid_interval() {
        let calendar = RecordingCalendar::default();
        let approval = Approval::new();
        approval.record(ProposedSlot::Text("Tuesday afternoon".into()));
        let out = BookingTool::new(&calendar, approval)
            .invoke(r#"{"summary":"x","start":"2024-09-03T14:00:00Z","end":"2024-09-03T15:00:00Z"}"#);
        assert!(out.contains("evt123"));
        assert_eq!(calendar.inserted.borrow().len(), 1);
    }
}
