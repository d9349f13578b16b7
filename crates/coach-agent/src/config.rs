//! Agent configuration from environment variables

use std::env;

#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Required by the Anthropic client, not by the agent itself
    pub api_key: Option<String>,

    pub model: String,

    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 4096,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_key = env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let model = env::var("ANTHROPIC_MODEL").unwrap_or(defaults.model);

        let max_tokens = env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_tokens);

        Self {
            api_key,
            model,
            max_tokens,
        }
    }
}
