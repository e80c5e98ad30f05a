// crates/core/src/foundry_client.rs

//! Azure AI Foundry client for the Responses API.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ai_client::{AiClient, InputItem, Response, ResponseItem, Tool};

const DEFAULT_API_VERSION: &str = "2025-03-01-preview";
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 16000;
const MAX_ATTEMPTS: u32 = 3;

/// Connection settings for the Foundry Responses API.
///
/// Environment variables:
/// - FOUNDRY_ENDPOINT: e.g. "https://myresource.openai.azure.com"
/// - FOUNDRY_DEPLOYMENT: e.g. "gpt-4o"
/// - FOUNDRY_API_KEY: your API key
/// - FOUNDRY_API_VERSION (optional), default "2025-03-01-preview"
/// - FOUNDRY_MAX_TOKENS (optional), default 16000
/// - FOUNDRY_DEBUG (optional): log request and response bodies at debug level
#[derive(Clone)]
pub struct FoundryConfig {
    pub endpoint: String,
    pub deployment: String,
    pub api_key: String,
    pub api_version: String,
    pub max_output_tokens: u32,
    pub debug_bodies: bool,
}

impl FoundryConfig {
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("FOUNDRY_ENDPOINT").context("FOUNDRY_ENDPOINT not set")?;
        let deployment =
            std::env::var("FOUNDRY_DEPLOYMENT").context("FOUNDRY_DEPLOYMENT not set")?;
        let api_key = std::env::var("FOUNDRY_API_KEY").context("FOUNDRY_API_KEY not set")?;
        let api_version = std::env::var("FOUNDRY_API_VERSION")
            .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());
        let max_output_tokens = std::env::var("FOUNDRY_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS);

        Ok(Self {
            endpoint,
            deployment,
            api_key,
            api_version,
            max_output_tokens,
            debug_bodies: std::env::var("FOUNDRY_DEBUG").is_ok(),
        })
    }

    fn responses_url(&self) -> String {
        format!(
            "{}/openai/responses?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.api_version
        )
    }
}

/// Azure AI Foundry client using the Responses API. This is the reasoning
/// engine backend the stage actors run on.
pub struct FoundryClient {
    client: Client,
    url: String,
    config: FoundryConfig,
}

impl FoundryClient {
    pub fn new(config: FoundryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("failed to build Foundry HTTP client")?;

        debug!(deployment = %config.deployment, "using Foundry Responses API");

        Ok(Self {
            client,
            url: config.responses_url(),
            config,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(FoundryConfig::from_env()?)
    }
}

/// Request body for Responses API.
#[derive(Serialize)]
struct ResponsesRequest {
    model: String,
    input: Vec<InputItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    tool_choice: String,
    store: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// Response from Responses API.
#[derive(Deserialize, Debug)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<ResponsesOutputItem>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
enum ResponsesOutputItem {
    #[serde(rename = "message")]
    Message {
        #[serde(default)]
        content: Vec<ResponsesContent>,
    },
    #[serde(rename = "function_call")]
    FunctionCall {
        #[serde(default)]
        call_id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        arguments: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
enum ResponsesContent {
    #[serde(rename = "output_text")]
    OutputText { text: String },
    #[serde(other)]
    Other,
}

impl AiClient for FoundryClient {
    fn respond(
        &self,
        instructions: &str,
        input: Vec<InputItem>,
        tools: &[Tool],
    ) -> Result<Response> {
        let request = ResponsesRequest {
            model: self.config.deployment.clone(),
            input,
            instructions: Some(instructions.to_string()),
            tools: tools.to_vec(),
            tool_choice: "auto".to_string(),
            store: false,
            max_output_tokens: Some(self.config.max_output_tokens),
        };

        let mut last_error = None;

        if self.config.debug_bodies {
            debug!(url = %self.url, model = %self.config.deployment, "Foundry request");
            if let Ok(json) = serde_json::to_string_pretty(&request) {
                debug!("request body:\n{}", preview(&json, 2000));
            }
        }

        for attempt in 1..=MAX_ATTEMPTS {
            let resp = self
                .client
                .post(&self.url)
                .header("api-key", &self.config.api_key)
                .json(&request)
                .send();

            match resp {
                Ok(r) => {
                    if !r.status().is_success() {
                        let status = r.status();
                        let body = r.text().unwrap_or_default();

                        if status.as_u16() == 429 || status.is_server_error() {
                            let delay = backoff_secs(status.as_u16(), attempt);
                            warn!(
                                attempt,
                                %status,
                                delay_secs = delay,
                                "Foundry request throttled or failed: {}",
                                preview(&body, 500)
                            );
                            last_error = Some(anyhow::anyhow!("HTTP {} - {}", status, body));
                            std::thread::sleep(Duration::from_secs(delay));
                            continue;
                        }

                        anyhow::bail!("Foundry request failed: HTTP {} - {}", status, body);
                    }

                    let raw_text = r.text().context("failed to read response body")?;

                    if self.config.debug_bodies {
                        debug!("response body: {}", preview(&raw_text, 500));
                    }

                    let parsed: ResponsesResponse = serde_json::from_str(&raw_text)
                        .context("failed to parse Foundry response")?;

                    return Ok(convert_output(parsed));
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Foundry network error, retrying");
                    last_error = Some(anyhow::anyhow!("network error: {}", e));
                    std::thread::sleep(Duration::from_secs(attempt as u64));
                    continue;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("request failed after retries")))
    }
}

/// Flatten the Responses API output list into our [`Response`] type.
fn convert_output(parsed: ResponsesResponse) -> Response {
    let mut items = Vec::new();

    for item in parsed.output {
        match item {
            ResponsesOutputItem::Message { content } => {
                let text: String = content
                    .into_iter()
                    .filter_map(|c| match c {
                        ResponsesContent::OutputText { text } => Some(text),
                        _ => None,
                    })
                    .collect();
                if !text.is_empty() {
                    items.push(ResponseItem::Message(text));
                }
            }
            ResponsesOutputItem::FunctionCall {
                call_id,
                name,
                arguments,
            } => {
                items.push(ResponseItem::FunctionCall {
                    call_id,
                    name,
                    arguments,
                });
            }
            ResponsesOutputItem::Unknown => {}
        }
    }

    Response { items }
}

/// Seconds to wait before retrying: quadratic for 429 (5, 20, 45), linear otherwise.
fn backoff_secs(status: u16, attempt: u32) -> u64 {
    let attempt = attempt as u64;
    if status == 429 {
        5 * attempt * attempt
    } else {
        attempt * 2
    }
}

fn preview(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_items_are_flattened_in_order() {
        let parsed: ResponsesResponse = serde_json::from_str(
            r#"{
                "output": [
                    { "type": "reasoning", "summary": [] },
                    { "type": "function_call", "call_id": "call_1", "name": "query_availability",
                      "arguments": "{\"start_time\":\"2024-09-01T09:00:00Z\"}" },
                    { "type": "message", "content": [
                        { "type": "output_text", "text": "Checking " },
                        { "type": "refusal", "refusal": "n/a" },
                        { "type": "output_text", "text": "your calendar." }
                    ] }
                ]
            }"#,
        )
        .unwrap();

        let response = convert_output(parsed);
        assert_eq!(response.items.len(), 2);
        assert!(matches!(
            &response.items[0],
            ResponseItem::FunctionCall { name, .. } if name == "query_availability"
        ));
        assert_eq!(response.text(), Some("Checking your calendar."));
    }

    #[test]
    fn throttling_backs_off_harder_than_server_errors() {
        assert_eq!(backoff_secs(429, 1), 5);
        assert_eq!(backoff_secs(429, 3), 45);
        assert_eq!(backoff_secs(503, 3), 6);
    }

    #[test]
    fn responses_url_joins_endpoint_and_version() {
        let config = FoundryConfig {
            endpoint: "https://example.openai.azure.com/".into(),
            deployment: "gpt-4o".into(),
            api_key: "k".into(),
            api_version: "2025-03-01-preview".into(),
            max_output_tokens: 100,
            debug_bodies: false,
        };
        assert_eq!(
            config.responses_url(),
            "https://example.openai.azure.com/openai/responses?api-version=2025-03-01-preview"
        );
    }

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(preview("héllo", 2), "hé");
        assert_eq!(preview("hi", 10), "hi");
    }
}
