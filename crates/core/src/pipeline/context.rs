// crates/core/src/pipeline/context.rs

use super::Stage;

/// Text outputs of the stages run so far, in order. Lives for one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    entries: Vec<(Stage, String)>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, stage: Stage, output: String) {
        self.entries.push((stage, output));
    }

    pub fn entries(&self) -> &[(Stage, String)] {
        &self.entries
    }

    pub fn output_of(&self, stage: Stage) -> Option<&str> {
        self.entries
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, text)| text.as_str())
    }

    /// Text of the most recent stage.
    pub fn final_output(&self) -> Option<&str> {
        self.entries.last().map(|(_, text)| text.as_str())
    }

    /// Context text handed to the next actor.
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return "No earlier stage output.".to_string();
        }
        self.entries
            .iter()
            .map(|(stage, text)| format!("Output of the {stage} stage:\n{text}"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
