//! OpenAI Engine
//!
//! OpenAI Chat Completions APIを使用するテストケース生成エンジン。

use std::fmt;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{build_http_client, read_success_body, TestCaseEngine, DEFAULT_TEMPERATURE, SYSTEM_PROMPT};
use crate::config::{EngineConfig, ProviderKind, ProviderSettings};
use crate::error::{Result, TestcaseGenError};

/// 公式エンドポイント
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
}

/// OpenAIエンジン
pub struct OpenAiEngine {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiEngine {
    /// APIキーとプロバイダー設定からエンジンを生成する
    pub fn new(api_key: impl Into<String>, settings: &ProviderSettings) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(TestcaseGenError::Config(
                "OpenAI API key is required".to_string(),
            ));
        }

        let base_url = settings.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
        Ok(Self {
            client: build_http_client(settings, base_url)?,
            endpoint: format!("{}/chat/completions", base_url),
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let api_key = config.api_key_for(ProviderKind::OpenAi)?;
        Self::new(api_key, &config.openai)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Debug for OpenAiEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiEngine")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl TestCaseEngine for OpenAiEngine {
    fn provider(&self) -> &str {
        ProviderKind::OpenAi.display_name()
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "Sending chat completion request");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let body = read_success_body(self.provider(), response)?;
        let parsed: ChatResponse = serde_json::from_str(&body)?;

        if let Some(usage) = &parsed.usage {
            info!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI token usage"
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                TestcaseGenError::Provider("OpenAI response contained no message content".to_string())
            })
    }
}
