// crates/core/src/engine.rs

//! The reasoning capability each stage runs on.
//!
//! A stage is an [`ActorSpec`] plus exactly one [`BoundTool`]. Engines only
//! ever see that one tool, so an actor cannot reach another stage's side
//! effects.

use std::thread;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::ai_client::{AiClient, InputItem, ResponseItem, Tool};
use crate::error::{in_band, is_in_band_error, AdapterError};
use crate::observer::Observer;
use crate::pipeline::Stage;

/// Role, goal and output contract for one stage's actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorSpec {
    pub stage: Stage,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub expected_output: String,
    /// Name of the one tool this actor may call.
    pub tool: &'static str,
}

impl ActorSpec {
    /// System instructions for the model.
    pub fn instructions(&self) -> String {
        format!(
            "You are the {role}. {backstory}\n\n\
             Goal: {goal}\n\n\
             You have exactly one tool, `{tool}`. Call it when you need data or need to act; \
             do not invent its results. Tool outputs starting with \"ERROR:\" describe a failure; \
             you may retry with corrected arguments or report the failure.\n\n\
             When finished, reply with plain text only. Expected output: {expected}",
            role = self.role,
            backstory = self.backstory,
            goal = self.goal,
            tool = self.tool,
            expected = self.expected_output,
        )
    }
}

/// A single external capability an actor can invoke.
///
/// `invoke` never fails out of band: every failure is returned as in-band
/// `ERROR: ...` text.
pub trait BoundTool {
    fn name(&self) -> &'static str;

    fn definition(&self) -> Tool;

    fn invoke(&mut self, arguments: &str) -> String;
}

/// Given an actor, its tool and the upstream context, produce the stage's text.
pub trait ReasoningEngine {
    fn run(
        &self,
        actor: &ActorSpec,
        tool: &mut dyn BoundTool,
        context: &str,
        observer: &dyn Observer,
    ) -> Result<String>;
}

/// Model-driven tool loop: ask, execute requested calls, feed results back,
/// stop at the first plain-text answer.
pub struct ToolLoopEngine<'a, C: AiClient> {
    client: &'a C,
    max_steps: usize,
    step_delay: Duration,
}

impl<'a, C: AiClient> ToolLoopEngine<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            max_steps: 12,
            step_delay: Duration::from_millis(500),
        }
    }

    /// Pause between model turns (rate limiting).
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

impl<C: AiClient> ReasoningEngine for ToolLoopEngine<'_, C> {
    fn run(
        &self,
        actor: &ActorSpec,
        tool: &mut dyn BoundTool,
        context: &str,
        observer: &dyn Observer,
    ) -> Result<String> {
        let instructions = actor.instructions();
        let tools = [tool.definition()];
        let mut input = vec![InputItem::user(context)];

        for step in 0..self.max_steps {
            observer.engine_step(actor.stage, step + 1);

            if step > 0 && !self.step_delay.is_zero() {
                thread::sleep(self.step_delay);
            }

            let response = self.client.respond(&instructions, input.clone(), &tools)?;

            if response.has_function_calls() {
                for item in &response.items {
                    let ResponseItem::FunctionCall {
                        call_id,
                        name,
                        arguments,
                    } = item
                    else {
                        continue;
                    };

                    observer.tool_called(actor.stage, name, arguments);
                    input.push(InputItem::function_call(call_id, name, arguments));

                    let output = if name == tool.name() {
                        tool.invoke(arguments)
                    } else {
                        in_band(AdapterError::InvalidInput(format!(
                            "tool '{name}' is not available; the only tool is '{}'",
                            tool.name()
                        )))
                    };
                    observer.tool_returned(actor.stage, name, &output, is_in_band_error(&output));
                    input.push(InputItem::function_output(call_id, output));
                }
            } else if let Some(text) = response.text() {
                observer.engine_message(actor.stage, text);
                return Ok(text.to_string());
            }
        }

        bail!(
            "{} actor reached {} steps without a final answer",
            actor.stage,
            self.max_steps
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_client::Response;
    use crate::observer::NoopObserver;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct ScriptedClient {
        replies: RefCell<VecDeque<Response>>,
        seen: RefCell<Vec<(String, Vec<InputItem>, Vec<String>)>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Response>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl AiClient for ScriptedClient {
        fn respond(&self, instructions: &str, input: Vec<InputItem>, tools: &[Tool]) -> Result<Response> {
            self.seen.borrow_mut().push((
                instructions.to_string(),
                input,
                tools.iter().map(|t| t.name.clone()).collect(),
            ));
            self.replies
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }
    }

    struct EchoTool {
        calls: Vec<String>,
    }

    impl BoundTool for EchoTool {
        fn name(&self) -> &'static str {
            "search_mailbox"
        }

        fn definition(&self) -> Tool {
            Tool::function("search_mailbox", "echo", json!({ "type": "object" }))
        }

        fn invoke(&mut self, arguments: &str) -> String {
            self.calls.push(arguments.to_string());
            format!("echo {arguments}")
        }
    }

    fn call(id: &str, name: &str, args: &str) -> ResponseItem {
        ResponseItem::FunctionCall {
            call_id: id.into(),
            name: name.into(),
            arguments: args.into(),
        }
    }

    fn actor() -> ActorSpec {
        ActorSpec {
            stage: Stage::Triage,
            role: "inbox triager".into(),
            goal: "find the request".into(),
            backstory: "You read mail.".into(),
            expected_output: "a summary".into(),
            tool: "search_mailbox",
        }
    }

    #[test]
    fn executes_bound_tool_then_returns_text() {
        let client = ScriptedClient::new(vec![
            Response {
                items: vec![call("c1", "search_mailbox", r#"{"query":"q"}"#)],
            },
            Response {
                items: vec![ResponseItem::Message("found one".into())],
            },
        ]);
        let engine = ToolLoopEngine::new(&client).with_step_delay(Duration::ZERO);
        let mut tool = EchoTool { calls: vec![] };

        let out = engine.run(&actor(), &mut tool, "ctx", &NoopObserver).unwrap();

        assert_eq!(out, "found one");
        assert_eq!(tool.calls, vec![r#"{"query":"q"}"#.to_string()]);

        let seen = client.seen.borrow();
        assert_eq!(seen[0].2, vec!["search_mailbox".to_string()]);
        assert_eq!(seen[0].1, vec![InputItem::user("ctx")]);
        assert_eq!(
            seen[1].1.last(),
            Some(&InputItem::function_output("c1", r#"echo {"query":"q"}"#.to_string()))
        );
        assert!(seen[0].0.contains("find the request"));
    }

    #[test]
    fn calls_to_other_tools_get_in_band_errors() {
        let client = ScriptedClient::new(vec![
            Response {
                items: vec![call("c1", "create_event", "{}")],
            },
            Response {
                items: vec![ResponseItem::Message("gave up".into())],
            },
        ]);
        let engine = ToolLoopEngine::new(&client).with_step_delay(Duration::ZERO);
        let mut tool = EchoTool { calls: vec![] };

        engine.run(&actor(), &mut tool, "ctx", &NoopObserver).unwrap();

        assert!(tool.calls.is_empty());
        let seen = client.seen.borrow();
        let InputItem::FunctionCallOutput { output, .. } = seen[1].1.last().unwrap() else {
            panic!("expected a function output");
        };
        assert!(is_in_band_error(output));
        assert!(output.contains("create_event"));
    }

    #[test]
    fn step_limit_is_an_engine_error() {
        let replies = (0..3)
            .map(|i| Response {
                items: vec![call(&format!("c{i}"), "search_mailbox", "{}")],
            })
            .collect();
        let client = ScriptedClient::new(replies);
        let engine = ToolLoopEngine::new(&client)
            .with_step_delay(Duration::ZERO)
            .with_max_steps(3);
        let mut tool = EchoTool { calls: vec![] };

        let err = engine
            .run(&actor(), &mut tool, "ctx", &NoopObserver)
            .unwrap_err();
        assert!(err.to_string().contains("3 steps"));
        assert_eq!(tool.calls.len(), 3);
    }

    #[test]
    fn client_failure_propagates() {
        let client = ScriptedClient::new(vec![]);
        let engine = ToolLoopEngine::new(&client).with_step_delay(Duration::ZERO);
        let mut tool = EchoTool { calls: vec![] };
        assert!(engine.run(&actor(), &mut tool, "ctx", &NoopObserver).is_err());
    }
}
