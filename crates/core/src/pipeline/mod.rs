// crates/core/src/pipeline/mod.rs

//! The four-stage workflow and the driver that runs it once per request.
//!
//! Stages run strictly in order: triage, slot search, confirmation, booking.
//! Each actor gets exactly one tool and the accumulated text of the stages
//! before it. The driver does not retry or roll back; adapter failures travel
//! forward as in-band text.

mod context;
pub mod prompts;
pub mod tool_defs;
pub mod tool_handler;

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::auth::CredentialSource;
use crate::cancel::CancelToken;
use crate::engine::{ActorSpec, BoundTool, ReasoningEngine};
use crate::error::{IntervalError, WorkflowError};
use crate::gate::SlotPicker;
use crate::observer::{NoopObserver, Observer};
use crate::providers::{Connector, Providers};
use crate::types::TimeInterval;

pub use context::PipelineContext;
pub use prompts::actor_specs;
use tool_handler::{Approval, AvailabilityTool, BookingTool, ConfirmationTool, MailboxTool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Triage,
    SlotSearch,
    Confirmation,
    Booking,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Triage,
        Stage::SlotSearch,
        Stage::Confirmation,
        Stage::Booking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Triage => "triage",
            Stage::SlotSearch => "slot-search",
            Stage::Confirmation => "confirmation",
            Stage::Booking => "booking",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs of one workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRequest {
    pub mailbox_query: String,
    /// Window the slot search queries.
    pub window: TimeInterval,
    pub topic: Option<String>,
}

impl WorkflowRequest {
    /// Request whose search window covers `days` days from `now`.
    pub fn upcoming(
        mailbox_query: impl Into<String>,
        now: DateTime<Utc>,
        days: i64,
        topic: Option<String>,
    ) -> Result<Self, IntervalError> {
        let end = Duration::try_days(days)
            .and_then(|span| now.checked_add_signed(span))
            .ok_or(IntervalError::OutOfRange { days })?;
        Ok(Self {
            mailbox_query: mailbox_query.into(),
            window: TimeInterval::new(now, end)?,
            topic,
        })
    }
}

/// Runs bound actors in order and accumulates their output.
pub struct Pipeline<'a> {
    engine: &'a dyn ReasoningEngine,
    observer: &'a dyn Observer,
    cancel: CancelToken,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        engine: &'a dyn ReasoningEngine,
        observer: &'a dyn Observer,
        cancel: CancelToken,
    ) -> Self {
        Self {
            engine,
            observer,
            cancel,
        }
    }

    pub fn run_stages(
        &self,
        actors: &[ActorSpec; 4],
        tools: [&mut dyn BoundTool; 4],
    ) -> Result<PipelineContext, WorkflowError> {
        let mut context = PipelineContext::new();

        for (actor, tool) in actors.iter().zip(tools) {
            if self.cancel.is_cancelled() {
                return Err(WorkflowError::Cancelled(actor.stage));
            }
            if actor.tool != tool.name() {
                return Err(WorkflowError::Engine {
                    stage: actor.stage,
                    source: anyhow::anyhow!(
                        "actor expects tool '{}' but '{}' is bound",
                        actor.tool,
                        tool.name()
                    ),
                });
            }

            self.observer.stage_started(actor.stage);
            let output = self
                .engine
                .run(actor, tool, &context.render(), self.observer)
                .map_err(|source| WorkflowError::Engine {
                    stage: actor.stage,
                    source,
                })?;
            self.observer.stage_finished(actor.stage, &output);

            context.record(actor.stage, output);
        }

        Ok(context)
    }
}

/// One run: resolve a credential, bind the four tools to it, run the stages,
/// return the booking stage's text.
pub struct Driver<'a> {
    credentials: &'a dyn CredentialSource,
    connector: &'a dyn Connector,
    engine: &'a dyn ReasoningEngine,
    observer: &'a dyn Observer,
    cancel: CancelToken,
}

impl<'a> Driver<'a> {
    pub fn new(
        credentials: &'a dyn CredentialSource,
        connector: &'a dyn Connector,
        engine: &'a dyn ReasoningEngine,
    ) -> Self {
        Self {
            credentials,
            connector,
            engine,
            observer: &NoopObserver,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn Observer) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(
        &self,
        request: &WorkflowRequest,
        picker: &mut dyn SlotPicker,
    ) -> Result<String, WorkflowError> {
        let credential = self.credentials.acquire()?;
        let providers = self
            .connector
            .connect(&credential)
            .map_err(WorkflowError::Connect)?;
        let api: &dyn Providers = providers.as_ref();

        let mut mailbox = MailboxTool::new(api, request.mailbox_query.clone());
        let mut availability = AvailabilityTool::new(api);
        let approval = Approval::new();
        let mut confirmation = ConfirmationTool::new(picker, approval.clone());
        let mut booking = BookingTool::new(api, approval);

        let actors = actor_specs(request);
        let context = Pipeline::new(self.engine, self.observer, self.cancel.clone()).run_stages(
            &actors,
            [&mut mailbox, &mut availability, &mut confirmation, &mut booking],
        )?;

        Ok(context.final_output().unwrap_or_default().to_string())
    }
}
