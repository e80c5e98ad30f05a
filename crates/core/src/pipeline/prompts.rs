// crates/core/src/pipeline/prompts.rs

//! Actor definitions for the four stages.

use super::tool_defs;
use super::{Stage, WorkflowRequest};
use crate::engine::ActorSpec;
use crate::types::format_timestamp;

pub fn actor_specs(request: &WorkflowRequest) -> [ActorSpec; 4] {
    let start = format_timestamp(&request.window.start());
    let end = format_timestamp(&request.window.end());
    let topic_hint = match &request.topic {
        Some(topic) => format!(" Prefer requests about: {topic}."),
        None => String::new(),
    };

    [
        ActorSpec {
            stage: Stage::Triage,
            role: "email triage specialist".to_string(),
            goal: format!(
                "Search the mailbox with the query `{query}` and identify the most recent \
                 message that asks for a meeting.{topic_hint} Extract its topic, the requested \
                 timeframe if any, and the participants' email addresses.",
                query = request.mailbox_query
            ),
            backstory: "You read incoming mail quickly and pick out actionable scheduling requests."
                .to_string(),
            expected_output: "The meeting topic, the participants' email addresses, and any \
                              timing constraints from the message. Say so plainly if no \
                              meeting request was found."
                .to_string(),
            tool: tool_defs::SEARCH_MAILBOX,
        },
        ActorSpec {
            stage: Stage::SlotSearch,
            role: "calendar scheduling assistant".to_string(),
            goal: format!(
                "Query the calendar's busy intervals between {start} and {end} and propose \
                 two or three candidate meeting slots that do not overlap any busy interval \
                 and fit the request found by triage."
            ),
            backstory: "You know how to read a free/busy report and find open time.".to_string(),
            expected_output: "A numbered list of two or three candidate slots, each with an \
                              RFC 3339 start and end in UTC."
                .to_string(),
            tool: tool_defs::QUERY_AVAILABILITY,
        },
        ActorSpec {
            stage: Stage::Confirmation,
            role: "confirmation coordinator".to_string(),
            goal: "Present the proposed slots to the human exactly once and report the slot \
                   they choose."
                .to_string(),
            backstory: "You never pick a time on the human's behalf.".to_string(),
            expected_output: "The chosen slot exactly as the tool returned it.".to_string(),
            tool: tool_defs::CONFIRM_SLOT,
        },
        ActorSpec {
            stage: Stage::Booking,
            role: "calendar booking agent".to_string(),
            goal: "Create one calendar event for the confirmed slot, using the topic as the \
                   summary and the participants from triage as attendees."
                .to_string(),
            backstory: "You write to the calendar carefully and only once.".to_string(),
            expected_output: "The event creation result text returned by the tool.".to_string(),
            tool: tool_defs::CREATE_EVENT,
        },
    ]
}
