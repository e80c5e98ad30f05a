// crates/core/src/providers/mod.rs

//! Provider-facing API seams and their wire payloads.
//!
//! Adapters are written against [`MailApi`] and [`CalendarApi`] only, so they
//! can be exercised against in-memory fakes.

mod google;

use serde::Deserialize;

use crate::auth::Credential;
use crate::error::AdapterError;
use crate::types::{CreatedEvent, EventRequest, TimeInterval};

pub use google::{GoogleApi, GoogleConnector};

/// Calendar every query and insert targets.
pub const PRIMARY_CALENDAR: &str = "primary";

/// Read-only mailbox operations.
pub trait MailApi {
    fn list_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>, AdapterError>;

    fn get_message(&self, id: &str) -> Result<GmailMessage, AdapterError>;
}

/// Calendar operations.
pub trait CalendarApi {
    /// Busy intervals inside `window`, in provider order.
    fn free_busy(
        &self,
        window: &TimeInterval,
        calendar_id: &str,
    ) -> Result<Vec<TimeInterval>, AdapterError>;

    fn insert_event(
        &self,
        calendar_id: &str,
        request: &EventRequest,
    ) -> Result<CreatedEvent, AdapterError>;
}

impl<T: MailApi + ?Sized> MailApi for &T {
    fn list_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>, AdapterError> {
        (**self).list_message_ids(query, max_results)
    }

    fn get_message(&self, id: &str) -> Result<GmailMessage, AdapterError> {
        (**self).get_message(id)
    }
}

impl<T: CalendarApi + ?Sized> CalendarApi for &T {
    fn free_busy(
        &self,
        window: &TimeInterval,
        calendar_id: &str,
    ) -> Result<Vec<TimeInterval>, AdapterError> {
        (**self).free_busy(window, calendar_id)
    }

    fn insert_event(
        &self,
        calendar_id: &str,
        request: &EventRequest,
    ) -> Result<CreatedEvent, AdapterError> {
        (**self).insert_event(calendar_id, request)
    }
}

/// Both provider surfaces behind one object.
pub trait Providers: MailApi + CalendarApi {}

impl<T: MailApi + CalendarApi + ?Sized> Providers for T {}

/// Binds provider clients to a resolved credential for the length of one run.
pub trait Connector {
    fn connect<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> Result<Box<dyn Providers + 'a>, AdapterError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Gmail wire types
// ─────────────────────────────────────────────────────────────────────────────

/// `users.messages.get?format=full` payload, reduced to what the mailbox
/// adapter reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Option<Vec<Header>>,
    #[serde(default)]
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PartBody {
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MessageList {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageRef {
    pub id: String,
}
