// crates/core/src/observer.rs

//! Progress reporting collaborator injected by the caller.
//!
//! The pipeline never touches process-wide logging state. Everything it wants
//! to report goes through an [`Observer`]; every method has an empty default.

use crate::pipeline::Stage;

pub trait Observer {
    fn stage_started(&self, _stage: Stage) {}

    fn engine_step(&self, _stage: Stage, _step: usize) {}

    fn tool_called(&self, _stage: Stage, _tool: &str, _arguments: &str) {}

    fn tool_returned(&self, _stage: Stage, _tool: &str, _output: &str, _is_error: bool) {}

    fn engine_message(&self, _stage: Stage, _text: &str) {}

    fn stage_finished(&self, _stage: Stage, _output: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}
