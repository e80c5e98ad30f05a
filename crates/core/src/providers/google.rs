// crates/core/src/providers/google.rs

//! Gmail and Google Calendar over blocking HTTPS.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{CalendarApi, Connector, GmailMessage, MailApi, MessageList, Providers};
use crate::auth::Credential;
use crate::error::AdapterError;
use crate::types::{format_timestamp, CreatedEvent, EventRequest, TimeInterval};

const GMAIL_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const CALENDAR_BASE: &str = "https://www.googleapis.com/calendar/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Gmail + Calendar client bound to one credential.
pub struct GoogleApi<'c> {
    client: Client,
    credential: &'c Credential,
}

impl<'c> GoogleApi<'c> {
    pub fn new(credential: &'c Credential) -> Result<Self, AdapterError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, credential })
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AdapterError> {
        let response = request
            .bearer_auth(self.credential.access_token())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AdapterError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>()?)
    }
}

impl MailApi for GoogleApi<'_> {
    fn list_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>, AdapterError> {
        let max = max_results.to_string();
        let list: MessageList = self.send(
            self.client
                .get(format!("{GMAIL_BASE}/messages"))
                .query(&[("q", query), ("maxResults", max.as_str())]),
        )?;
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    fn get_message(&self, id: &str) -> Result<GmailMessage, AdapterError> {
        self.send(
            self.client
                .get(format!("{GMAIL_BASE}/messages/{}", urlencoding::encode(id)))
                .query(&[("format", "full")]),
        )
    }
}

#[derive(Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, CalendarBusy>,
}

#[derive(Deserialize)]
struct CalendarBusy {
    #[serde(default)]
    busy: Vec<TimeInterval>,
    #[serde(default)]
    errors: Vec<CalendarIssue>,
}

#[derive(Deserialize)]
struct CalendarIssue {
    #[serde(default)]
    domain: String,
    #[serde(default)]
    reason: String,
}

#[derive(Serialize)]
struct EventBody<'a> {
    summary: &'a str,
    start: EventTime,
    end: EventTime,
    attendees: Vec<Attendee<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: String,
}

#[derive(Serialize)]
struct Attendee<'a> {
    email: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertedEvent {
    id: String,
    #[serde(default)]
    html_link: String,
}

impl CalendarApi for GoogleApi<'_> {
    fn free_busy(
        &self,
        window: &TimeInterval,
        calendar_id: &str,
    ) -> Result<Vec<TimeInterval>, AdapterError> {
        let body = json!({
            "timeMin": format_timestamp(&window.start()),
            "timeMax": format_timestamp(&window.end()),
            "items": [{ "id": calendar_id }],
        });
        let response: FreeBusyResponse =
            self.send(self.client.post(format!("{CALENDAR_BASE}/freeBusy")).json(&body))?;

        let mut calendars = response.calendars;
        let Some(calendar) = calendars.remove(calendar_id) else {
            return Err(AdapterError::Provider(format!(
                "free/busy response has no entry for calendar '{calendar_id}'"
            )));
        };
        if let Some(issue) = calendar.errors.first() {
            return Err(AdapterError::Provider(format!(
                "{}: {}",
                issue.domain, issue.reason
            )));
        }
        Ok(calendar.busy)
    }

    fn insert_event(
        &self,
        calendar_id: &str,
        request: &EventRequest,
    ) -> Result<CreatedEvent, AdapterError> {
        let body = event_body(request);
        let inserted: InsertedEvent = self.send(
            self.client
                .post(format!(
                    "{CALENDAR_BASE}/calendars/{}/events",
                    urlencoding::encode(calendar_id)
                ))
                .json(&body),
        )?;
        Ok(CreatedEvent {
            id: inserted.id,
            html_link: inserted.html_link,
        })
    }
}

fn event_body(request: &EventRequest) -> EventBody<'_> {
    EventBody {
        summary: &request.summary,
        start: EventTime {
            date_time: format_timestamp(&request.when.start()),
        },
        end: EventTime {
            date_time: format_timestamp(&request.when.end()),
        },
        attendees: request
            .attendees
            .iter()
            .map(|email| Attendee { email })
            .collect(),
    }
}

/// Builds a [`GoogleApi`] per run.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleConnector;

impl Connector for GoogleConnector {
    fn connect<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> Result<Box<dyn Providers + 'a>, AdapterError> {
        Ok(Box::new(GoogleApi::new(credential)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_body_uses_calendar_field_names() {
        let request = EventRequest {
            summary: "Planning".into(),
            when: TimeInterval::parse("2024-09-02T10:00:00Z", "2024-09-02T10:30:00Z").unwrap(),
            attendees: vec!["a@example.com".into()],
        };
        assert_eq!(
            serde_json::to_value(event_body(&request)).unwrap(),
            json!({
                "summary": "Planning",
                "start": { "dateTime": "2024-09-02T10:00:00Z" },
                "end": { "dateTime": "2024-09-02T10:30:00Z" },
                "attendees": [{ "email": "a@example.com" }]
            })
        );
    }

    #[test]
    fn free_busy_response_keeps_provider_order() {
        let response: FreeBusyResponse = serde_json::from_value(json!({
            "kind": "calendar#freeBusy",
            "calendars": {
                "primary": {
                    "busy": [
                        { "start": "2024-09-02T15:00:00Z", "end": "2024-09-02T16:00:00Z" },
                        { "start": "2024-09-02T09:00:00Z", "end": "2024-09-02T10:00:00Z" }
                    ]
                }
            }
        }))
        .unwrap();

        let busy = &response.calendars["primary"].busy;
        assert_eq!(busy[0].to_string(), "2024-09-02T15:00:00Z to 2024-09-02T16:00:00Z");
        assert_eq!(busy[1].to_string(), "2024-09-02T09:00:00Z to 2024-09-02T10:00:00Z");
    }

    #[test]
    fn free_busy_errors_are_captured() {
        let response: FreeBusyResponse = serde_json::from_value(json!({
            "calendars": {
                "primary": { "errors": [{ "domain": "global", "reason": "notFound" }], "busy": [] }
            }
        }))
        .unwrap();
        let issue = &response.calendars["primary"].errors[0];
        assert_eq!(issue.reason, "notFound");
    }
}
