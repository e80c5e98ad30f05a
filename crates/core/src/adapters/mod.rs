// crates/core/src/adapters/mod.rs

//! Typed adapters over the provider APIs.
//!
//! Each adapter returns a structured result; rendering to actor-facing text
//! happens through `Display`, and failures are flattened with
//! [`crate::error::in_band`] by the tool layer.

pub mod calendar;
pub mod mailbox;

pub use calendar::{create_event, query_availability, query_availability_between, Availability};
pub use mailbox::{parse_message, search_mailbox, MailItem, MailSearch, MAX_MESSAGES};
