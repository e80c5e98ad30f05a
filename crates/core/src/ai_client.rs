// crates/core/src/ai_client.rs

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Abstract AI/LLM client speaking a Responses-style protocol with tool calls.
///
/// Implementations can use Azure Foundry, OpenAI, a local model, or a
/// scripted double in tests.
pub trait AiClient {
    /// Send one turn: system instructions, the running input list, and the
    /// tools the model may call.
    fn respond(&self, instructions: &str, input: Vec<InputItem>, tools: &[Tool])
        -> Result<Response>;
}

/// One entry of the conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputItem {
    Message {
        role: String,
        content: String,
    },
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
}

impl InputItem {
    pub fn user(text: &str) -> Self {
        Self::Message {
            role: "user".to_string(),
            content: text.to_string(),
        }
    }

    pub fn assistant(text: &str) -> Self {
        Self::Message {
            role: "assistant".to_string(),
            content: text.to_string(),
        }
    }

    pub fn function_call(call_id: &str, name: &str, arguments: &str) -> Self {
        Self::FunctionCall {
            call_id: call_id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    pub fn function_output(call_id: &str, output: String) -> Self {
        Self::FunctionCallOutput {
            call_id: call_id.to_string(),
            output,
        }
    }
}

/// A function tool definition in Responses API shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl Tool {
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            tool_type: "function".to_string(),
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// Parsed model output for one turn.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub items: Vec<ResponseItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseItem {
    Message(String),
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
}

impl Response {
    pub fn has_function_calls(&self) -> bool {
        self.items
            .iter()
            .any(|item| matches!(item, ResponseItem::FunctionCall { .. }))
    }

    /// First text message in the response, if any.
    pub fn text(&self) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            ResponseItem::Message(text) => Some(text.as_str()),
            _ => None,
        })
    }
}
