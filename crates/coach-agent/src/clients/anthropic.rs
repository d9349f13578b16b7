use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AgentConfig;
use crate::error::{LessonError, ServiceError};
use crate::llm::{ContentBlock, LessonModel, Message, ModelTurn, StopReason, ToolDefinition};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_ATTEMPTS: u32 = 3;

pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<StopReason>,
}

impl AnthropicClient {
    pub fn new(config: &AgentConfig) -> Result<Self, LessonError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LessonError::Config("ANTHROPIC_API_KEY not set".into()))?;

        let client = Client::builder()
            .user_agent("ChessCoach/1.0")
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LessonError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl LessonModel for AnthropicClient {
    async fn respond(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelTurn, ServiceError> {
        let request = MessageRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages,
            tools,
        };

        let mut attempt = 0;
        loop {
            let resp = self
                .client
                .post(MESSAGES_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&request)
                .send()
                .await?;

            let status = resp.status();
            if status.is_success() {
                let body: MessageResponse = resp.json().await?;
                debug!(
                    blocks = body.content.len(),
                    stop_reason = ?body.stop_reason,
                    "Model response"
                );
                return Ok(ModelTurn {
                    content: body.content,
                    stop_reason: body.stop_reason,
                });
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                attempt += 1;
                if attempt >= MAX_ATTEMPTS {
                    return Err(ServiceError::RateLimited(MAX_ATTEMPTS));
                }
                let wait = Duration::from_secs(2u64.pow(attempt));
                warn!(attempt, wait_secs = wait.as_secs(), "Rate limited, backing off");
                tokio::time::sleep(wait).await;
                continue;
            }

            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                status: status.as_u16(),
                body,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let config = AgentConfig::default();
        assert!(matches!(
            AnthropicClient::new(&config),
            Err(LessonError::Config(_))
        ));
    }

    #[test]
    fn test_request_shape() {
        let messages = vec![Message::user_text("hi")];
        let tools = crate::tools::tool_definitions();
        let request = MessageRequest {
            model: "claude-sonnet-4-5",
            max_tokens: 1024,
            system: "coach",
            messages: &messages,
            tools: &tools,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");
        assert_eq!(json["tools"].as_array().map(Vec::len), Some(6));
        assert!(json["tools"][0].get("input_schema").is_some());

        let no_tools = MessageRequest {
            tools: &[],
            ..request
        };
        assert!(serde_json::to_value(&no_tools).unwrap().get("tools").is_none());
    }
}
