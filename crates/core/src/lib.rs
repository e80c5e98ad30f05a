// crates/core/src/lib.rs

//! Core of the meeting scheduling assistant.
//!
//! The workflow runs four stages in a fixed order (triage, slot search,
//! confirmation, booking). Each stage is one reasoning-engine actor bound to
//! exactly one adapter, and every adapter call runs on a credential resolved
//! once per run.

pub mod adapters;
pub mod ai_client;
pub mod auth;
pub mod cancel;
pub mod engine;
pub mod error;
pub mod foundry_client;
pub mod gate;
pub mod observer;
pub mod pipeline;
pub mod providers;
pub mod types;
