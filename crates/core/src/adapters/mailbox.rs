// crates/core/src/adapters/mailbox.rs

use std::fmt;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

use crate::error::{AdapterError, DataShapeError};
use crate::providers::{GmailMessage, MailApi, MessagePart};
use crate::types::Message;

/// Upper bound on messages fetched per search.
pub const MAX_MESSAGES: u32 = 5;

const NO_MESSAGES: &str = "No messages.";
const SEPARATOR: &str = "---";

/// Gmail encodes part bodies as base64url, with or without padding.
const BODY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// One search hit: a parsed message or a marker for one that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailItem {
    Message(Message),
    Unparsed { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailSearch {
    NoMessages,
    Found(Vec<MailItem>),
}

impl fmt::Display for MailItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailItem::Message(msg) => {
                writeln!(f, "Thread: {}", msg.thread_id)?;
                writeln!(f, "Subject: {}", msg.subject)?;
                if let Some(from) = &msg.from {
                    writeln!(f, "From: {from}")?;
                }
                write!(f, "Body: {}", msg.body)
            }
            MailItem::Unparsed { id } => write!(f, "Could not parse message {id}."),
        }
    }
}

impl fmt::Display for MailSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailSearch::NoMessages => f.write_str(NO_MESSAGES),
            MailSearch::Found(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "\n{SEPARATOR}\n")?;
                    }
                    item.fmt(f)?;
                }
                Ok(())
            }
        }
    }
}

/// Run a provider query and parse up to [`MAX_MESSAGES`] hits.
///
/// A message with an unexpected shape becomes [`MailItem::Unparsed`]; the rest
/// of the batch is unaffected.
pub fn search_mailbox<A: MailApi + ?Sized>(api: &A, query: &str) -> Result<MailSearch, AdapterError> {
    let ids = api.list_message_ids(query, MAX_MESSAGES)?;
    if ids.is_empty() {
        return Ok(MailSearch::NoMessages);
    }

    let mut items = Vec::with_capacity(ids.len());
    for id in ids.iter().take(MAX_MESSAGES as usize) {
        let raw = api.get_message(id)?;
        let item = match parse_message(&raw) {
            Ok(message) => MailItem::Message(message),
            Err(err) => MailItem::Unparsed {
                id: err.message_id().to_string(),
            },
        };
        items.push(item);
    }
    Ok(MailSearch::Found(items))
}

/// Reduce a full Gmail payload to a [`Message`].
///
/// A missing `text/plain` part gives an empty body. Missing headers, thread id
/// or subject, or a plain-text part that does not decode, are shape errors.
pub fn parse_message(raw: &GmailMessage) -> Result<Message, DataShapeError> {
    let id = raw.id.clone();
    let payload = raw
        .payload
        .as_ref()
        .ok_or_else(|| DataShapeError::MissingField {
            id: id.clone(),
            field: "payload",
        })?;
    let headers = payload
        .headers
        .as_ref()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| DataShapeError::MissingHeaders { id: id.clone() })?;

    let header = |name: &str| {
        headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
    };

    let thread_id = raw
        .thread_id
        .clone()
        .ok_or_else(|| DataShapeError::MissingField {
            id: id.clone(),
            field: "threadId",
        })?;
    let subject = header("Subject").ok_or_else(|| DataShapeError::MissingField {
        id: id.clone(),
        field: "Subject",
    })?;

    let body = match find_plain_text(payload) {
        Some(part) => decode_body(&id, part)?,
        None => String::new(),
    };

    Ok(Message {
        thread_id,
        subject,
        from: header("From"),
        body,
    })
}

fn find_plain_text(part: &MessagePart) -> Option<&MessagePart> {
    if part.mime_type.eq_ignore_ascii_case("text/plain") {
        return Some(part);
    }
    part.parts.iter().find_map(find_plain_text)
}

fn decode_body(id: &str, part: &MessagePart) -> Result<String, DataShapeError> {
    let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) else {
        return Ok(String::new());
    };
    let bytes = BODY_ENGINE
        .decode(data.trim())
        .map_err(|e| DataShapeError::UndecodableBody {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|e| DataShapeError::UndecodableBody {
        id: id.to_string(),
        reason: e.to_string(),
    })
}
