//! Gemini Engine
//!
//! Google Gemini generateContent APIを使用するテストケース生成エンジン。

use std::fmt;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{build_http_client, read_success_body, TestCaseEngine, DEFAULT_TEMPERATURE, SYSTEM_PROMPT};
use crate::config::{EngineConfig, ProviderKind, ProviderSettings};
use crate::error::{Result, TestcaseGenError};

/// 公式エンドポイント
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// APIキーを渡すヘッダー（URLにキーを含めない）
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u64>,
    #[serde(default)]
    candidates_token_count: Option<u64>,
}

impl GenerateContentResponse {
    /// 最初の候補のテキストパートを連結する
    fn into_text(self) -> Result<String> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!("Gemini blocked the prompt: {}", r))
                .unwrap_or_else(|| "Gemini response contained no candidates".to_string());
            return Err(TestcaseGenError::Provider(reason));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(TestcaseGenError::Provider(format!(
                "Gemini response contained no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }
}

/// Geminiエンジン
pub struct GeminiEngine {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl GeminiEngine {
    /// APIキーとプロバイダー設定からエンジンを生成する
    pub fn new(api_key: impl Into<String>, settings: &ProviderSettings) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(TestcaseGenError::Config(
                "Gemini API key is required".to_string(),
            ));
        }

        let base_url = settings.base_url.as_deref().unwrap_or(GEMINI_BASE_URL);
        Ok(Self {
            client: build_http_client(settings, base_url)?,
            endpoint: format!("{}/models/{}:generateContent", base_url, settings.model),
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let api_key = config.api_key_for(ProviderKind::Gemini)?;
        Self::new(api_key, &config.gemini)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Debug for GeminiEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiEngine")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl TestCaseEngine for GeminiEngine {
    fn provider(&self) -> &str {
        ProviderKind::Gemini.display_name()
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        // gemini-proはsystemInstructionに対応しないため、指示を本文の先頭に付ける
        let text = format!("{}\n\n{}", SYSTEM_PROMPT, prompt);
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &text }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "Sending generateContent request");
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()?;

        let body = read_success_body(self.provider(), response)?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;

        if let Some(usage) = &parsed.usage_metadata {
            info!(
                prompt_tokens = usage.prompt_token_count,
                completion_tokens = usage.candidates_token_count,
                "Gemini token usage"
            );
        }

        parsed.into_text()
    }
}
