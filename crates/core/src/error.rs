// crates/core/src/error.rs

//! Error taxonomy for the scheduling workflow.
//!
//! Only [`AuthError`] may end a run before it produces output. Adapter, data
//! shape and gate errors are flattened into in-band text at the tool boundary
//! with [`in_band`].

use std::fmt::Display;
use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

/// Prefix carried by every tool output that describes a failure.
pub const ERROR_MARKER: &str = "ERROR";

/// Flatten an error into the text an actor sees.
pub fn in_band(err: impl Display) -> String {
    format!("{ERROR_MARKER}: {err}")
}

/// Whether a tool output is an in-band failure description.
pub fn is_in_band_error(output: &str) -> bool {
    output.starts_with(ERROR_MARKER)
}

/// Credential acquisition failures. All of them are fatal to a run.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("client application config is missing or invalid: {0}")]
    MissingClientConfig(String),
    #[error("consent was denied: {0}")]
    ConsentDenied(String),
    #[error("authorization callback state did not match the request")]
    StateMismatch,
    #[error("token endpoint rejected the request: {0}")]
    TokenRejected(String),
    #[error("consent flow failed: {0}")]
    Consent(String),
    #[error("failed to persist credential to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Transport or provider failure inside an adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("HTTP {status} - {body}")]
    Http { status: u16, body: String },
    #[error("could not decode provider response: {0}")]
    Decode(String),
    #[error("provider reported an error: {0}")]
    Provider(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AdapterError::Decode(err.to_string())
        } else {
            AdapterError::Transport(err.to_string())
        }
    }
}

/// A single provider payload that does not have the expected shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataShapeError {
    #[error("message {id} has no headers")]
    MissingHeaders { id: String },
    #[error("message {id} is missing {field}")]
    MissingField { id: String, field: &'static str },
    #[error("message {id} has an undecodable body: {reason}")]
    UndecodableBody { id: String, reason: String },
}

impl DataShapeError {
    /// Identifier of the message that failed to parse.
    pub fn message_id(&self) -> &str {
        match self {
            DataShapeError::MissingHeaders { id }
            | DataShapeError::MissingField { id, .. }
            | DataShapeError::UndecodableBody { id, .. } => id,
        }
    }
}

/// Invalid time bounds.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntervalError {
    #[error("interval start {start} is not before end {end}")]
    NotIncreasing { start: String, end: String },
    #[error("'{value}' is not an RFC 3339 timestamp: {reason}")]
    Timestamp { value: String, reason: String },
    #[error("a window of {days} days is out of range")]
    OutOfRange { days: i64 },
}

/// Why the confirmation gate returned without a selection.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("no options were offered for confirmation")]
    NoOptions,
    #[error("input closed before a slot was selected")]
    InputClosed,
    #[error("no slot was selected before the confirmation deadline")]
    TimedOut,
    #[error("confirmation was cancelled")]
    Cancelled,
    #[error("console I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal failure of a workflow run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("authorization failed: {0}")]
    Auth(#[from] AuthError),
    #[error("{stage} stage failed: {source}")]
    Engine {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
    #[error("could not reach the provider APIs: {0}")]
    Connect(AdapterError),
    #[error("run cancelled before the {0} stage")]
    Cancelled(Stage),
}
