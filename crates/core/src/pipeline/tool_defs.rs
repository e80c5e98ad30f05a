// crates/core/src/pipeline/tool_defs.rs

//! Function definitions offered to each stage's actor.

use serde_json::json;

use crate::ai_client::Tool;

pub const SEARCH_MAILBOX: &str = "search_mailbox";
pub const QUERY_AVAILABILITY: &str = "query_availability";
pub const CONFIRM_SLOT: &str = "confirm_slot";
pub const CREATE_EVENT: &str = "create_event";

pub fn search_mailbox() -> Tool {
    Tool::function(
        SEARCH_MAILBOX,
        "Search the mailbox and return up to 5 matching messages with thread id, subject, sender and plain-text body.",
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Mailbox search query, e.g. 'is:unread subject:meeting'."
                }
            },
            "required": ["query"]
        }),
    )
}

pub fn query_availability() -> Tool {
    Tool::function(
        QUERY_AVAILABILITY,
        "List the busy intervals of the primary calendar between two instants. Free slots are not computed.",
        json!({
            "type": "object",
            "properties": {
                "start_time": {
                    "type": "string",
                    "description": "Window start, RFC 3339 (e.g. 2024-09-02T09:00:00Z)."
                },
                "end_time": {
                    "type": "string",
                    "description": "Window end, RFC 3339. Must be after start_time."
                }
            },
            "required": ["start_time", "end_time"]
        }),
    )
}

pub fn confirm_slot() -> Tool {
    Tool::function(
        CONFIRM_SLOT,
        "Ask the human to choose one of the proposed meeting times. Blocks until they answer. Call it once.",
        json!({
            "type": "object",
            "properties": {
                "proposed_slots": {
                    "type": "array",
                    "description": "Candidate slots, in the order to present them.",
                    "items": {
                        "anyOf": [
                            { "type": "string" },
                            {
                                "type": "object",
                                "properties": {
                                    "start": { "type": "string" },
                                    "end": { "type": "string" }
                                },
                                "required": ["start", "end"]
                            }
                        ]
                    },
                    "minItems": 1
                }
            },
            "required": ["proposed_slots"]
        }),
    )
}

pub fn create_event() -> Tool {
    Tool::function(
        CREATE_EVENT,
        "Create one event on the primary calendar. Not idempotent: call it once for the confirmed slot.",
        json!({
            "type": "object",
            "properties": {
                "summary": { "type": "string", "description": "Event title." },
                "start": { "type": "string", "description": "Start, RFC 3339." },
                "end": { "type": "string", "description": "End, RFC 3339. Must be after start." },
                "attendees": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Attendee email addresses. May be empty."
                }
            },
            "required": ["summary", "start", "end"]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_definition_is_a_named_object_function() {
        for (tool, name) in [
            (search_mailbox(), SEARCH_MAILBOX),
            (query_availability(), QUERY_AVAILABILITY),
            (confirm_slot(), CONFIRM_SLOT),
            (create_event(), CREATE_EVENT),
        ] {
            assert_eq!(tool.name, name);
            assert_eq!(tool.tool_type, "function");
            assert_eq!(tool.parameters["type"], "object");
            assert!(tool.parameters["required"].is_array());
        }
    }
}
