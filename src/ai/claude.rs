use crate::ai::prompt::{build_rollup_prompt, normalize_bullets};
use crate::api::{check_status, TextSummarizer};
use crate::error::{DigestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const CLAUDE_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const DEFAULT_MAX_TOKENS: u32 = 1024;

const SERVICE: &str = "Claude";

const ROLLUP_SYSTEM_PROMPT: &str = "You summarize engineering work for a team status channel. \
Be concise and concrete. Never invent work that is not in the input.";

/// Claude Messages API client used for rollups
pub struct ClaudeClient {
    api_key: String,
    client: Client,
    model: String,
    max_tokens: u32,
}

impl ClaudeClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            api_key,
            client,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn request(&self, system: Option<&str>, prompt: String) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: system.map(str::to_string),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
        }
    }

    /// Send a single-turn prompt and return the first text block
    pub async fn complete(&self, system: Option<&str>, prompt: String) -> Result<String> {
        let request = self.request(system, prompt);

        let response = self
            .client
            .post(CLAUDE_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", CLAUDE_VERSION)
            .json(&request)
            .send()
            .await?;
        let response = check_status(SERVICE, response).await?;
        let body: MessagesResponse = response.json().await?;

        if let Some(ref usage) = body.usage {
            debug!(
                model = %self.model,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "rollup generated"
            );
        }
        if body.stop_reason.as_deref() == Some("max_tokens") {
            warn!(max_tokens = self.max_tokens, "rollup truncated at max_tokens");
        }

        body.first_text()
            .ok_or_else(|| DigestError::claude_api("no text block in response"))
    }
}

#[async_trait]
impl TextSummarizer for ClaudeClient {
    async fn summarize(&self, text: &str) -> Result<String> {
        let response = self
            .complete(Some(ROLLUP_SYSTEM_PROMPT), build_rollup_prompt(text))
            .await?;
        Ok(normalize_bullets(&response))
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

impl MessagesResponse {
    fn first_text(self) -> Option<String> {
        self.content
            .into_iter()
            .find(|block| block.block_type == "text")
            .map(|block| block.text)
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ClaudeClient::new("sk-ant-test-key".to_string()).unwrap();
        assert_eq!(client.model, DEFAULT_MODEL);
        assert_eq!(client.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_client_builder() {
        let client = ClaudeClient::new("sk-ant-test-key".to_string())
            .unwrap()
            .with_model("claude-3-opus-20240229".to_string())
            .with_max_tokens(2048);

        assert_eq!(client.model, "claude-3-opus-20240229");
        assert_eq!(client.max_tokens, 2048);
    }

    #[test]
    fn test_request_omits_missing_system_prompt() {
        let client = ClaudeClient::new("sk-ant-test-key".to_string()).unwrap();

        let bare = serde_json::to_value(client.request(None, "hi".to_string())).unwrap();
        assert!(bare.get("system").is_none());
        assert_eq!(bare["messages"][0]["role"], "user");

        let with_system =
            serde_json::to_value(client.request(Some(ROLLUP_SYSTEM_PROMPT), "hi".to_string()))
                .unwrap();
        assert_eq!(with_system["system"], ROLLUP_SYSTEM_PROMPT);
    }

    #[test]
    fn test_response_skips_non_text_blocks() {
        let response: MessagesResponse = serde_json::from_value(serde_json::json!({
            "content": [
                { "type": "thinking" },
                { "type": "text", "text": "- shipped search" }
            ],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 120, "output_tokens": 8 }
        }))
        .unwrap();
        assert_eq!(response.usage.as_ref().map(|u| u.output_tokens), Some(8));
        assert_eq!(response.first_text().as_deref(), Some("- shipped search"));
    }
}
