// crates/host/src/observer.rs

use tracing::{debug, info, warn};

use sched_assist_core::observer::Observer;
use sched_assist_core::pipeline::Stage;

use crate::log;

/// Console progress plus a `tracing` event per callback.
pub struct ConsoleObserver;

impl Observer for ConsoleObserver {
    fn stage_started(&self, stage: Stage) {
        log::stage_banner(stage);
        info!(%stage, "stage started");
    }

    fn engine_step(&self, stage: Stage, step: usize) {
        log::step(stage, step);
        debug!(%stage, step, "engine step");
    }

    fn tool_called(&self, stage: Stage, tool: &str, arguments: &str) {
        log::tool_call(stage, tool, arguments);
        info!(%stage, tool, "tool called");
    }

    fn tool_returned(&self, stage: Stage, tool: &str, output: &str, is_error: bool) {
        log::tool_result(stage, tool, output, is_error);
        if is_error {
            warn!(%stage, tool, output, "tool reported a failure");
        } else {
            debug!(%stage, tool, bytes = output.len(), "tool returned");
        }
    }

    fn engine_message(&self, stage: Stage, text: &str) {
        log::response(stage, text);
    }

    fn stage_finished(&self, stage: Stage, _output: &str) {
        log::done(stage);
        info!(%stage, "stage finished");
    }
}
