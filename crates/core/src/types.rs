// crates/core/src/types.rs

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IntervalError;

/// Render a timestamp the way every adapter prints it: RFC 3339 in UTC with a
/// `Z` suffix, fractional seconds only when present.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse an RFC 3339 timestamp with any offset and normalise it to UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, IntervalError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| IntervalError::Timestamp {
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

/// A UTC time range with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawInterval {
    start: String,
    end: String,
}

impl TryFrom<RawInterval> for TimeInterval {
    type Error = IntervalError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        TimeInterval::parse(&raw.start, &raw.end)
    }
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, IntervalError> {
        if start >= end {
            return Err(IntervalError::NotIncreasing {
                start: format_timestamp(&start),
                end: format_timestamp(&end),
            });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, IntervalError> {
        Self::new(parse_timestamp(start)?, parse_timestamp(end)?)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            format_timestamp(&self.start),
            format_timestamp(&self.end)
        )
    }
}

/// A mailbox message reduced to what triage needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub thread_id: String,
    pub subject: String,
    pub from: Option<String>,
    pub body: String,
}

/// One human-presentable candidate meeting time.
///
/// Actors may propose slots either as free text or as explicit intervals; the
/// confirmation gate treats both the same way.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ProposedSlot {
    Interval(TimeInterval),
    Text(String),
}

impl fmt::Display for ProposedSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposedSlot::Interval(interval) => interval.fmt(f),
            ProposedSlot::Text(text) => f.write_str(text),
        }
    }
}

/// Everything needed to insert one calendar event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRequest {
    pub summary: String,
    pub when: TimeInterval,
    pub attendees: Vec<String>,
}

/// Provider acknowledgement of an inserted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEvent {
    pub id: String,
    pub html_link: String,
}

impl fmt::Display for CreatedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event created successfully. Event ID: {}, Link: {}",
            self.id, self.html_link
        )
    }
}
